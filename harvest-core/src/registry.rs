use std::collections::{HashMap, HashSet};

use crate::types::{CellId, Properties};

/// Claimed and frontier cells of every seed, keyed by property name.
///
/// Seeds that share a physical property compete for the same cells, so a
/// cell may be claimed by, or sit in the frontier of, at most one seed per
/// property. Seeds never look at each other directly; they ask the
/// registry instead.
#[derive(Debug, Default)]
pub struct Registry {
    claimed: HashMap<String, HashSet<CellId>>,
    frontier: HashMap<String, HashSet<CellId>>,
}

fn contains(sets: &HashMap<String, HashSet<CellId>>, cell: CellId, props: &Properties) -> bool {
    props
        .keys()
        .any(|p| sets.get(p).is_some_and(|cells| cells.contains(&cell)))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a seed sharing one of `props` has claimed `cell`.
    pub fn is_claimed(&self, cell: CellId, props: &Properties) -> bool {
        contains(&self.claimed, cell, props)
    }

    /// `true` if `cell` is in the frontier of a seed sharing one of `props`.
    pub fn is_frontier(&self, cell: CellId, props: &Properties) -> bool {
        contains(&self.frontier, cell, props)
    }

    /// `true` if a seed with `props` may add `cell` to its frontier.
    #[inline]
    pub fn is_free(&self, cell: CellId, props: &Properties) -> bool {
        !self.is_claimed(cell, props) && !self.is_frontier(cell, props)
    }

    /// Records `cell` as part of the estimate of a seed with `props`.
    /// Claims are permanent; the cell also leaves that seed's frontier.
    pub fn claim(&mut self, cell: CellId, props: &Properties) {
        for p in props.keys() {
            self.claimed.entry(p.clone()).or_default().insert(cell);
            if let Some(cells) = self.frontier.get_mut(p) {
                cells.remove(&cell);
            }
        }
    }

    pub fn enter_frontier(&mut self, cell: CellId, props: &Properties) {
        for p in props.keys() {
            self.frontier.entry(p.clone()).or_default().insert(cell);
        }
    }
}
