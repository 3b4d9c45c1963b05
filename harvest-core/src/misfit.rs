//! Residual norms shared by the data modules.

use serde::Deserialize;

use crate::error::HarvestError;

/// Order of the norm used to measure residual vectors.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8")]
pub enum Norm {
    L1,
    L2,
}

impl TryFrom<u8> for Norm {
    type Error = HarvestError;

    fn try_from(order: u8) -> Result<Self, Self::Error> {
        match order {
            1 => Ok(Norm::L1),
            2 => Ok(Norm::L2),
            other => Err(HarvestError::InvalidNorm(other)),
        }
    }
}

impl Norm {
    /// The numeric order of this norm.
    pub fn order(self) -> u8 {
        match self {
            Norm::L1 => 1,
            Norm::L2 => 2,
        }
    }

    /// Norm of a vector.
    pub fn of(self, values: &[f64]) -> f64 {
        self.of_iter(values.iter().copied())
    }

    /// Norm of `a - b`, without allocating the difference.
    ///
    /// ### Panics
    /// Panics if the slices have different lengths.
    pub fn of_difference(self, a: &[f64], b: &[f64]) -> f64 {
        assert_eq!(a.len(), b.len());
        self.of_iter(a.iter().zip(b).map(|(x, y)| x - y))
    }

    pub(crate) fn of_iter(self, values: impl Iterator<Item = f64>) -> f64 {
        match self {
            Norm::L1 => values.map(f64::abs).sum(),
            Norm::L2 => values.map(|v| v * v).sum::<f64>().sqrt(),
        }
    }
}
