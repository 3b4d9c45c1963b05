//! Seeds: the anomalies that grow one cell at a time.
//!
//! A seed starts as the mesh cell holding a user-given point and keeps a
//! frontier of free neighboring cells it could grow into. On every call to
//! [`Seed::grow`] it test-drives each frontier cell against the data
//! modules and lets its [`Judge`] pick at most one to accrete.

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use tracing::{debug, info, warn};

use crate::data::DataModule;
use crate::error::{HarvestError, Result};
use crate::mesh::{Mesh, Prism};
use crate::registry::Registry;
use crate::types::{CellId, Properties};

/// Geometry of the elements a seed is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedKind {
    Prism,
}

/// Acceptance rule for accretions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Judge {
    /// Must decrease the misfit by at least `delta` (relative), then the
    /// smallest goal function wins.
    #[default]
    Standard,
    /// Compactness imposed algorithmically. Not available.
    Compact,
}

/// A cell accepted into the estimate of a seed.
#[derive(Clone, Debug, PartialEq)]
pub struct Accretion {
    pub cell: CellId,
    pub properties: Properties,
    /// Goal function after the accretion.
    pub goal: f64,
    /// Data misfit after the accretion.
    pub misfit: f64,
}

/// A seed made of right rectangular prisms of a [`Mesh`].
#[derive(Debug)]
pub struct Seed<'m> {
    mesh: &'m dyn Mesh,
    point: DVec3,
    home: CellId,
    home_prism: Prism,
    props: Properties,
    /// Cells of the estimate, home first, in accretion order.
    claimed: Vec<CellId>,
    /// Candidate cells, in the order they were found.
    frontier: Vec<CellId>,
    /// Corner-to-corner distance from the home cell, for frontier cells only.
    distances: HashMap<CellId, f64>,
    /// Inverse of the mean mesh extent; scales `mu`.
    weight: f64,
    mu: f64,
    delta: f64,
    reg: f64,
    full_neighbors: bool,
}

impl<'m> Seed<'m> {
    /// Places a seed on the mesh cell containing `point`.
    ///
    /// ### Errors
    /// - [`HarvestError::LocationNotFound`] if `point` is outside the mesh
    ///   or on a masked cell.
    /// - [`HarvestError::NotImplemented`] for [`Judge::Compact`].
    pub fn new(
        point: DVec3,
        props: Properties,
        mesh: &'m dyn Mesh,
        mu: f64,
        delta: f64,
        judge: Judge,
    ) -> Result<Self> {
        if judge == Judge::Compact {
            return Err(HarvestError::NotImplemented("compact judge"));
        }
        let (home, home_prism) = mesh
            .locate(point)
            .and_then(|index| mesh.cell(index).map(|prism| (index, prism)))
            .ok_or(HarvestError::LocationNotFound(point))?;

        let [x1, x2, y1, y2, z1, z2] = mesh.bounds();
        let weight = 3.0 / ((x2 - x1) + (y2 - y1) + (z2 - z1));

        Ok(Self {
            mesh,
            point,
            home,
            home_prism,
            props,
            claimed: vec![home],
            frontier: Vec::new(),
            distances: HashMap::new(),
            weight,
            mu: mu * weight,
            delta,
            reg: 0.0,
            full_neighbors: false,
        })
    }

    /// Also grow through edges and vertices, not only through faces.
    pub fn with_full_neighbors(mut self, full: bool) -> Self {
        self.full_neighbors = full;
        self
    }

    pub fn mesh(&self) -> &'m dyn Mesh {
        self.mesh
    }

    pub fn kind(&self) -> SeedKind {
        SeedKind::Prism
    }

    /// The point the seed was placed at.
    pub fn point(&self) -> DVec3 {
        self.point
    }

    pub fn home(&self) -> CellId {
        self.home
    }

    pub fn properties(&self) -> &Properties {
        &self.props
    }

    /// Cells of the estimate, home first.
    pub fn claimed(&self) -> &[CellId] {
        &self.claimed
    }

    pub fn frontier(&self) -> &[CellId] {
        &self.frontier
    }

    pub fn distance(&self, cell: CellId) -> Option<f64> {
        self.distances.get(&cell).copied()
    }

    /// Regularizing parameter, already scaled by the mesh size.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu * self.weight;
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn set_delta(&mut self, delta: f64) {
        self.delta = delta;
    }

    /// This seed's share of the regularizing function.
    pub fn regularization(&self) -> f64 {
        self.reg
    }

    /// `true` if both seeds carry at least one common property.
    pub fn shares_property(&self, other: &Seed<'_>) -> bool {
        self.props.keys().any(|p| other.props.contains_key(p))
    }

    /// The home prism together with the seed's physical properties.
    pub fn get_prism(&self) -> (Prism, Properties) {
        (self.home_prism, self.props.clone())
    }

    /// Fills the initial frontier with the free neighbors of the home cell.
    ///
    /// Every seed's home cell must already be claimed in `registry`. Seeds
    /// initialized earlier win contested cells.
    pub fn initialize(&mut self, registry: &mut Registry) {
        self.admit_neighbors(self.home, registry);
    }

    /// Tries to accrete one frontier cell.
    ///
    /// `total_regularization` is the regularizing function summed over all
    /// seeds; `goal` and `misfit` are the values after the last accretion.
    /// Returns `None` if no frontier cell passes the judge.
    pub fn grow(
        &mut self,
        dms: &mut [DataModule<'_>],
        registry: &mut Registry,
        total_regularization: f64,
        goal: f64,
        misfit: f64,
    ) -> Option<Accretion> {
        let mut best: Option<(usize, f64, f64)> = None;
        for (i, &cell) in self.frontier.iter().enumerate() {
            let trial_misfit: f64 = dms.iter_mut().map(|dm| dm.testdrive(cell, &self.props)).sum();
            if !self.decreases(trial_misfit, misfit) {
                continue;
            }
            let trial_goal = trial_misfit + (self.mu * self.distances[&cell] + total_regularization);
            if best.is_none_or(|(_, g, _)| trial_goal < g) {
                best = Some((i, trial_goal, trial_misfit));
            }
        }

        let Some((i, goal_after, misfit_after)) = best else {
            debug!(home = self.home, goal, misfit, "seed cannot grow");
            return None;
        };
        let cell = self.frontier.remove(i);
        let distance = self.distances.remove(&cell).unwrap_or_default();
        self.claimed.push(cell);
        self.reg += self.mu * distance;
        registry.claim(cell, &self.props);
        self.admit_neighbors(cell, registry);

        debug!(
            home = self.home,
            cell,
            goal = goal_after,
            misfit = misfit_after,
            "accretion"
        );
        Some(Accretion {
            cell,
            properties: self.props.clone(),
            goal: goal_after,
            misfit: misfit_after,
        })
    }

    /// Standard judge gate: the misfit must drop by at least `delta` of its
    /// current value.
    #[inline]
    fn decreases(&self, trial: f64, misfit: f64) -> bool {
        trial < misfit && (trial - misfit).abs() / misfit >= self.delta
    }

    /// Adds the free neighbors of `cell` to the frontier.
    fn admit_neighbors(&mut self, cell: CellId, registry: &mut Registry) {
        let origin = self.home_prism.corner();
        for n in self.mesh.neighbors(cell, self.full_neighbors) {
            if !registry.is_free(n, &self.props) {
                continue;
            }
            let Some(prism) = self.mesh.cell(n) else {
                continue;
            };
            registry.enter_frontier(n, &self.props);
            self.frontier.push(n);
            self.distances.insert(n, prism.corner().distance(origin));
        }
    }
}

/// Seeds built by [`sow_prisms`] and the input points that were dropped
/// because another seed already sat on their cell.
#[derive(Debug)]
pub struct Sowing<'m> {
    pub seeds: Vec<Seed<'m>>,
    pub duplicates: Vec<DVec3>,
}

/// Places one seed per point, with the `i`th value of every property column.
///
/// A point falling in the same cell as an earlier one is skipped and
/// reported in [`Sowing::duplicates`]. A point that cannot be located
/// aborts the whole sowing.
pub fn sow_prisms<'m>(
    points: &[DVec3],
    props: &BTreeMap<String, Vec<f64>>,
    mesh: &'m dyn Mesh,
    mu: f64,
    delta: f64,
    judge: Judge,
) -> Result<Sowing<'m>> {
    info!(mu, delta, seeds = points.len(), "generating prism seeds");
    for (name, values) in props {
        if values.len() != points.len() {
            return Err(HarvestError::PropertyLength(
                name.clone(),
                values.len(),
                points.len(),
            ));
        }
    }

    let mut seeds: Vec<Seed<'m>> = Vec::with_capacity(points.len());
    let mut duplicates = Vec::new();
    for (i, &point) in points.iter().enumerate() {
        let sprops: Properties = props
            .iter()
            .map(|(name, values)| (name.clone(), values[i]))
            .collect();
        let seed = Seed::new(point, sprops, mesh, mu, delta, judge)?;
        if seeds.iter().any(|s| s.home == seed.home) {
            warn!(%point, cell = seed.home, "duplicate seed found, ignoring it");
            duplicates.push(point);
        } else {
            seeds.push(seed);
        }
    }
    Ok(Sowing { seeds, duplicates })
}
