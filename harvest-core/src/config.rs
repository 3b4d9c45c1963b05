use serde::Deserialize;

use crate::misfit::Norm;

/// Tuning knobs for a harvesting run.
///
/// Seeds read `mu`, `delta` and `compact`, data modules read `norm` and
/// `use_shape`, and the solver reads `max_rounds`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Order of the residual norm (1 or 2).
    pub norm: Norm,
    /// Compactness regularizing parameter, before grid-size scaling.
    pub mu: f64,
    /// Minimum relative misfit decrease required to accept an accretion.
    pub delta: f64,
    /// Impose compactness algorithmically instead of through `mu`.
    pub compact: bool,
    /// Use the shape-of-anomaly misfit instead of the plain data misfit.
    pub use_shape: bool,
    /// Stop after this many growth rounds even if seeds can still grow.
    pub max_rounds: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            norm: Norm::L1,
            mu: 0.0,
            delta: 0.0001,
            compact: false,
            use_shape: false,
            max_rounds: None,
        }
    }
}
