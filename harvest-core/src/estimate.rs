use std::collections::BTreeMap;

use crate::seed::Seed;
use crate::types::CellId;

/// Physical property values over a mesh, stored only where they are set.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseModel {
    size: usize,
    values: BTreeMap<CellId, f64>,
}

impl SparseModel {
    /// An empty model over a mesh of `size` cells.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, cell: CellId, value: f64) {
        self.values.insert(cell, value);
    }

    /// Value of `cell`, or `None` if the cell is not part of the estimate.
    pub fn get(&self, cell: CellId) -> Option<f64> {
        self.values.get(&cell).copied()
    }

    /// `(cell, value)` pairs in increasing cell order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, f64)> + '_ {
        self.values.iter().map(|(&c, &v)| (c, v))
    }

    /// Number of cells with a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of cells in the mesh the model lives on.
    pub fn size(&self) -> usize {
        self.size
    }

    /// One value per mesh cell, `default` where nothing was estimated.
    pub fn to_dense(&self, default: f64) -> Vec<f64> {
        let mut dense = vec![default; self.size];
        for (cell, value) in self.iter() {
            if let Some(slot) = dense.get_mut(cell) {
                *slot = value;
            }
        }
        dense
    }
}

/// Estimated models, one per physical property name.
pub type Estimate = BTreeMap<String, SparseModel>;

/// Concatenates the cells claimed by every seed into one model per property.
pub fn cat_estimate(seeds: &[Seed<'_>]) -> Estimate {
    let mut estimate = Estimate::new();
    for seed in seeds {
        let size = seed.mesh().size();
        for (prop, &value) in seed.properties() {
            let model = estimate
                .entry(prop.clone())
                .or_insert_with(|| SparseModel::new(size));
            for &cell in seed.claimed() {
                model.insert(cell, value);
            }
        }
    }
    estimate
}
