//! Data modules: observed data plus the predicted data of the growing
//! estimate.
//!
//! A [`DataModule`] answers two questions for the seeds:
//!
//! 1. [`DataModule::testdrive`]: what would the misfit be if this cell
//!    joined the estimate?
//! 2. [`DataModule::update`]: fold this cell into the predicted data for
//!    good.
//!
//! The effect of a cell is computed once, when it is first test-driven, and
//! kept in a cache until the cell is committed. Cells that are test-driven
//! but never committed stay in the cache.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::Deserialize;
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::kernel;
use crate::mesh::{Mesh, Prism};
use crate::misfit::Norm;
use crate::survey::ObservationSet;
use crate::types::{CellId, DENSITY, Properties};

/// Potential-field component measured by a data module.
///
/// The order of the variants is the order in which [`wrap_data`] builds
/// modules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Gz,
    Gxx,
    Gxy,
    Gxz,
    Gyy,
    Gyz,
    Gzz,
}

impl Component {
    pub const ALL: [Component; 7] = [
        Component::Gz,
        Component::Gxx,
        Component::Gxy,
        Component::Gxz,
        Component::Gyy,
        Component::Gyz,
        Component::Gzz,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::Gz => "gz",
            Component::Gxx => "gxx",
            Component::Gxy => "gxy",
            Component::Gxz => "gxz",
            Component::Gyy => "gyy",
            Component::Gyz => "gyz",
            Component::Gzz => "gzz",
        }
    }

    /// Physical property the component depends on.
    pub fn property(self) -> &'static str {
        DENSITY
    }

    /// Effect of a single prism with property `value` at `points`.
    pub fn forward(self, value: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
        let f = match self {
            Component::Gz => kernel::gz,
            Component::Gxx => kernel::gxx,
            Component::Gxy => kernel::gxy,
            Component::Gxz => kernel::gxz,
            Component::Gyy => kernel::gyy,
            Component::Gyz => kernel::gyz,
            Component::Gzz => kernel::gzz,
        };
        f(value, prism, points)
    }

    /// Noiseless data produced by a model made of `(prism, value)` pairs.
    pub fn synthetic(self, points: &[DVec3], model: &[(Prism, f64)]) -> Vec<f64> {
        let mut data = vec![0.0; points.len()];
        for (prism, value) in model {
            for (d, e) in data.iter_mut().zip(self.forward(*value, prism, points)) {
                *d += e;
            }
        }
        data
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown component '{s}'"))
    }
}

/// Observed data of one component and the predicted data of the estimate.
#[derive(Debug)]
pub struct DataModule<'m> {
    component: Component,
    mesh: &'m dyn Mesh,
    points: Vec<DVec3>,
    observed: Vec<f64>,
    predicted: Vec<f64>,
    norm: Norm,
    weight: f64,
    /// Effects of cells that were test-driven but not committed yet.
    effects: HashMap<CellId, Vec<f64>>,
}

impl<'m> DataModule<'m> {
    /// Wraps `observed` data of `component`, measured at `observations`.
    ///
    /// ### Errors
    /// - [`HarvestError::NotImplemented`] if `use_shape` is set.
    /// - [`HarvestError::DataLength`] if the data and points disagree in length.
    /// - [`HarvestError::ZeroData`] if the observed data norm is zero.
    pub fn new(
        component: Component,
        observed: Vec<f64>,
        observations: &ObservationSet,
        mesh: &'m dyn Mesh,
        norm: Norm,
        use_shape: bool,
    ) -> Result<Self> {
        if use_shape {
            return Err(HarvestError::NotImplemented("shape-of-anomaly misfit"));
        }
        if observed.len() != observations.len() {
            return Err(HarvestError::DataLength {
                data: observed.len(),
                points: observations.len(),
            });
        }
        let scale = norm.of(&observed);
        if scale == 0.0 || !scale.is_finite() {
            return Err(HarvestError::ZeroData);
        }
        Ok(Self {
            component,
            mesh,
            points: observations.points.clone(),
            predicted: vec![0.0; observed.len()],
            observed,
            norm,
            weight: 1.0 / scale,
            effects: HashMap::new(),
        })
    }

    pub fn component(&self) -> Component {
        self.component
    }

    /// Name of the physical property this module responds to.
    pub fn property(&self) -> &'static str {
        self.component.property()
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    pub fn predicted(&self) -> &[f64] {
        &self.predicted
    }

    /// Number of cells whose effect is cached but not committed.
    pub fn cached_effects(&self) -> usize {
        self.effects.len()
    }

    /// `true` if a cell with these properties cannot change this module's data.
    #[inline]
    pub fn is_indifferent(&self, props: &Properties) -> bool {
        !props.contains_key(self.property())
    }

    /// Effect of `cell` with the given properties at every observation point.
    ///
    /// An absent (masked or out of range) cell, or a property set this
    /// module is indifferent to, has no effect.
    pub fn effect_of(&self, cell: CellId, props: &Properties) -> Vec<f64> {
        match (self.mesh.cell(cell), props.get(self.property())) {
            (Some(prism), Some(&value)) => self.component.forward(value, &prism, &self.points),
            _ => vec![0.0; self.points.len()],
        }
    }

    /// Weighted norm of the residual between observed and `predicted` data.
    ///
    /// ### Panics
    /// Panics if `predicted` does not hold one value per observation point.
    pub fn misfit(&self, predicted: &[f64]) -> f64 {
        self.weight * self.norm.of_difference(&self.observed, predicted)
    }

    /// Misfit of the current predicted data.
    pub fn current_misfit(&self) -> f64 {
        self.misfit(&self.predicted)
    }

    /// Misfit the module would have if `cell` were part of the estimate.
    ///
    /// Only the effect cache is touched.
    pub fn testdrive(&mut self, cell: CellId, props: &Properties) -> f64 {
        if self.is_indifferent(props) {
            return self.current_misfit();
        }
        self.cache_effect(cell, props);
        let effect = &self.effects[&cell];
        let residual = self
            .observed
            .iter()
            .zip(&self.predicted)
            .zip(effect)
            .map(|((o, p), e)| o - (p + e));
        self.weight * self.norm.of_iter(residual)
    }

    /// Adds the effect of `cell` to the predicted data.
    ///
    /// Every cell must be committed at most once; committing it again counts
    /// its effect twice.
    pub fn update(&mut self, cell: CellId, props: &Properties) {
        if self.is_indifferent(props) {
            return;
        }
        self.cache_effect(cell, props);
        if let Some(effect) = self.effects.remove(&cell) {
            for (p, e) in self.predicted.iter_mut().zip(effect) {
                *p += e;
            }
        }
    }

    fn cache_effect(&mut self, cell: CellId, props: &Properties) {
        if !self.effects.contains_key(&cell) {
            let effect = self.effect_of(cell, props);
            self.effects.insert(cell, effect);
        }
    }
}

/// Builds one data module per `(component, observed)` pair, all measured at
/// the same `observations`.
///
/// Modules come out in [`Component`] order (gz first), whatever the input
/// order. For data measured at different points, call this once per point
/// set and concatenate the results.
pub fn wrap_data<'m>(
    mesh: &'m dyn Mesh,
    observations: &ObservationSet,
    data: impl IntoIterator<Item = (Component, Vec<f64>)>,
    norm: Norm,
    use_shape: bool,
) -> Result<Vec<DataModule<'m>>> {
    info!(
        use_shape,
        norm = norm.order(),
        points = observations.len(),
        "creating prism data modules"
    );
    let mut data: Vec<_> = data.into_iter().collect();
    data.sort_by_key(|(component, _)| *component);
    data.into_iter()
        .map(|(component, observed)| {
            DataModule::new(component, observed, observations, mesh, norm, use_shape)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PrismMesh;
    use approx::assert_relative_eq;

    fn mesh() -> PrismMesh {
        PrismMesh::new([0.0, 2.0, 0.0, 2.0, 0.0, 2.0], (2, 2, 2)).unwrap()
    }

    fn survey() -> ObservationSet {
        ObservationSet::regular_grid([-1.0, 3.0, -1.0, 3.0], (5, 5), -1.0)
    }

    fn density(value: f64) -> Properties {
        Properties::from([(DENSITY.to_string(), value)])
    }

    fn cells(mesh: &PrismMesh, indices: &[CellId], value: f64) -> Vec<(Prism, f64)> {
        indices
            .iter()
            .map(|&i| (mesh.cell(i).unwrap(), value))
            .collect()
    }

    #[test]
    fn component_names_round_trip_through_from_str() {
        for c in Component::ALL {
            assert_eq!(c.name().parse::<Component>().unwrap(), c);
            assert_eq!(c.to_string(), c.name());
            assert_eq!(c.property(), DENSITY);
        }
        assert_eq!("GZZ".parse::<Component>().unwrap(), Component::Gzz);
        assert!("gx".parse::<Component>().is_err());
    }

    #[test]
    fn new_rejects_shape_of_anomaly_and_bad_data() {
        let mesh = mesh();
        let obs = survey();
        let data = vec![1.0; obs.len()];
        assert!(matches!(
            DataModule::new(Component::Gz, data.clone(), &obs, &mesh, Norm::L2, true),
            Err(HarvestError::NotImplemented(_))
        ));
        assert!(matches!(
            DataModule::new(Component::Gz, vec![1.0; 3], &obs, &mesh, Norm::L2, false),
            Err(HarvestError::DataLength { data: 3, points: 25 })
        ));
        assert!(matches!(
            DataModule::new(Component::Gz, vec![0.0; obs.len()], &obs, &mesh, Norm::L1, false),
            Err(HarvestError::ZeroData)
        ));
    }

    #[test]
    fn misfit_is_weighted_by_the_observed_norm() {
        let mesh = mesh();
        let obs = ObservationSet::from_points(vec![DVec3::ZERO, DVec3::X]);
        let dm = DataModule::new(Component::Gz, vec![3.0, -4.0], &obs, &mesh, Norm::L2, false).unwrap();
        // Nothing predicted yet: the residual is the data itself.
        assert_relative_eq!(dm.current_misfit(), 1.0);
        assert_relative_eq!(dm.misfit(&[3.0, 0.0]), 4.0 / 5.0);

        let dm = DataModule::new(Component::Gz, vec![3.0, -4.0], &obs, &mesh, Norm::L1, false).unwrap();
        assert_relative_eq!(dm.misfit(&[3.0, 0.0]), 4.0 / 7.0);
    }

    #[test]
    #[should_panic]
    fn misfit_needs_one_prediction_per_point() {
        let mesh = mesh();
        let obs = ObservationSet::from_points(vec![DVec3::ZERO, DVec3::X]);
        let dm = DataModule::new(Component::Gz, vec![3.0, -4.0], &obs, &mesh, Norm::L2, false).unwrap();
        dm.misfit(&[3.0]);
    }

    #[test]
    fn testdrive_does_not_change_predicted_data() {
        let mesh = mesh();
        let obs = survey();
        let observed = Component::Gz.synthetic(&obs.points, &cells(&mesh, &[0, 1], 1000.0));
        let mut dm = DataModule::new(Component::Gz, observed, &obs, &mesh, Norm::L2, false).unwrap();

        let before = dm.current_misfit();
        let trial = dm.testdrive(0, &density(1000.0));
        assert!(trial < before);
        assert!(dm.predicted().iter().all(|&p| p == 0.0));
        assert_eq!(dm.cached_effects(), 1);
        assert_relative_eq!(dm.current_misfit(), before);
    }

    #[test]
    fn testdrive_is_indifferent_to_other_properties() {
        let mesh = mesh();
        let obs = survey();
        let observed = Component::Gzz.synthetic(&obs.points, &cells(&mesh, &[0], 1000.0));
        let mut dm = DataModule::new(Component::Gzz, observed, &obs, &mesh, Norm::L1, false).unwrap();
        dm.update(0, &density(500.0));
        let current = dm.current_misfit();
        let predicted = dm.predicted().to_vec();

        let magnetic = Properties::from([("susceptibility".to_string(), 0.1)]);
        assert_eq!(dm.testdrive(1, &magnetic), current);
        assert_eq!(dm.cached_effects(), 0);

        dm.update(1, &magnetic);
        assert_eq!(dm.predicted(), predicted.as_slice());
    }

    #[test]
    fn update_commits_the_cached_effect_and_evicts_it() {
        let mesh = mesh();
        let obs = survey();
        let observed = Component::Gz.synthetic(&obs.points, &cells(&mesh, &[0, 1], 1000.0));
        let mut dm = DataModule::new(Component::Gz, observed, &obs, &mesh, Norm::L2, false).unwrap();

        dm.update(0, &density(1000.0));
        let trial = dm.testdrive(1, &density(1000.0));
        assert_eq!(dm.cached_effects(), 1);
        dm.update(1, &density(1000.0));
        assert_eq!(dm.cached_effects(), 0);

        assert_relative_eq!(dm.current_misfit(), trial);
        assert_relative_eq!(dm.current_misfit(), 0.0, epsilon = 1e-12);
        for (p, o) in dm.predicted().iter().zip(dm.observed()) {
            assert_relative_eq!(*p, *o, max_relative = 1e-12);
        }
    }

    #[test]
    fn update_without_testdrive_computes_the_effect() {
        let mesh = mesh();
        let obs = survey();
        let observed = Component::Gxz.synthetic(&obs.points, &cells(&mesh, &[3], -200.0));
        let mut dm = DataModule::new(Component::Gxz, observed.clone(), &obs, &mesh, Norm::L1, false).unwrap();
        dm.update(3, &density(-200.0));
        assert_eq!(dm.predicted(), observed.as_slice());
        assert_eq!(dm.cached_effects(), 0);
    }

    #[test]
    fn effect_of_an_absent_cell_is_zero() {
        let mut mesh = mesh();
        mesh.mask([2]);
        let obs = survey();
        let observed = vec![1.0; obs.len()];
        let dm = DataModule::new(Component::Gz, observed, &obs, &mesh, Norm::L1, false).unwrap();
        assert!(dm.effect_of(2, &density(1.0)).iter().all(|&e| e == 0.0));
        assert!(dm.effect_of(99, &density(1.0)).iter().all(|&e| e == 0.0));
    }

    #[test]
    fn wrap_data_builds_modules_in_component_order() {
        let mesh = mesh();
        let obs = survey();
        let data = vec![1.0; obs.len()];
        let dms = wrap_data(
            &mesh,
            &obs,
            [
                (Component::Gzz, data.clone()),
                (Component::Gz, data.clone()),
                (Component::Gxy, data),
            ],
            Norm::L2,
            false,
        )
        .unwrap();
        let order: Vec<_> = dms.iter().map(DataModule::component).collect();
        assert_eq!(order, vec![Component::Gz, Component::Gxy, Component::Gzz]);
    }

    #[test]
    fn wrap_data_fails_on_shape_of_anomaly() {
        let mesh = mesh();
        let obs = survey();
        let result = wrap_data(&mesh, &obs, [(Component::Gz, vec![1.0; obs.len()])], Norm::L1, true);
        assert!(matches!(result, Err(HarvestError::NotImplemented(_))));
    }
}
