use std::collections::BTreeMap;

/// Identifier for a cell of a [`crate::mesh::Mesh`].
///
/// This is the linear index `i + j*nx + k*nx*ny`, and is only meaningful
/// for the mesh it was computed against.
pub type CellId = usize;

/// Physical property values carried by a seed, keyed by property name
/// (e.g. `"density"`).
///
/// Ordered so that iteration, and therefore logging and estimate assembly,
/// is deterministic.
pub type Properties = BTreeMap<String, f64>;

/// Property name used by every gravity data module.
pub const DENSITY: &str = "density";
