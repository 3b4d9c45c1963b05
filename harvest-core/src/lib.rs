//! Robust 3-D gravity inversion by planting anomalous densities.
//!
//! Main components:
//! - [`mesh`] — regular prism meshes, cell lookup and neighborhoods.
//! - [`kernel`] — closed-form gravity and gravity-gradient effects of a prism.
//! - [`survey`] — observation points and synthetic survey helpers.
//! - [`data`] — data modules: observed vs. predicted data and their misfit.
//! - [`seed`] — seeds that grow by accreting neighboring cells.
//! - [`registry`] — which cells each property's seeds own or eye.
//! - [`solver`] — the harvesting loop and its result.
//! - [`estimate`] — sparse per-property models built from the seeds.
//! - [`io`] — plain-text seed and observation loaders.
//! - [`config`] — tuning knobs for a run.
//! - [`misfit`] — residual norms.
//! - [`error`] — error type shared by the crate.
//! - [`types`] — shared type aliases and IDs.

pub mod config;
pub mod data;
pub mod error;
pub mod estimate;
pub mod io;
pub mod kernel;
pub mod mesh;
pub mod misfit;
pub mod registry;
pub mod seed;
pub mod solver;
pub mod survey;
pub mod types;

pub use error::{HarvestError, Result};
pub use solver::{HarvestResult, Harvester, harvest};
