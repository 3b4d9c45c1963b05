//! The harvesting loop.
//!
//! A run has two phases:
//! 1. Initialization: every seed claims its home cell, fills its frontier
//!    (in input order, so earlier seeds win contested cells) and the home
//!    cells are committed to every data module.
//! 2. Growth: rounds in which every seed, in input order, tries one
//!    accretion. Accepted cells are committed to the data modules right
//!    away, so later seeds in the same round see them. A round where no
//!    seed grows ends the run.
//!
//! [`harvest`] runs both phases to completion. [`Harvester`] exposes the
//! growth phase one round at a time.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::data::DataModule;
use crate::error::{HarvestError, Result};
use crate::estimate::{Estimate, cat_estimate};
use crate::registry::Registry;
use crate::seed::{Accretion, Seed};

/// Accretions accepted during one growth round, in seed order.
pub type Round = Vec<Accretion>;

/// Outcome of a harvesting run.
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestResult {
    pub estimate: Estimate,
    /// Goal function before growth, then after every accretion.
    pub goals: Vec<f64>,
    /// Data misfit before growth, then after every accretion.
    pub misfits: Vec<f64>,
}

impl HarvestResult {
    /// Number of accretions performed.
    pub fn accretions(&self) -> usize {
        self.goals.len().saturating_sub(1)
    }

    pub fn final_goal(&self) -> f64 {
        self.goals.last().copied().unwrap_or_default()
    }

    pub fn final_misfit(&self) -> f64 {
        self.misfits.last().copied().unwrap_or_default()
    }
}

/// Step-by-step driver of the growth phase.
///
/// Iterating a `Harvester` yields one [`Round`] per growth round that
/// accepted at least one accretion.
#[derive(Debug)]
pub struct Harvester<'a, 'm> {
    dms: &'a mut [DataModule<'m>],
    seeds: &'a mut [Seed<'m>],
    registry: Registry,
    goals: Vec<f64>,
    misfits: Vec<f64>,
    rounds: usize,
    max_rounds: Option<usize>,
    done: bool,
}

impl<'a, 'm> Harvester<'a, 'm> {
    /// Runs the initialization phase.
    ///
    /// ### Errors
    /// - [`HarvestError::NoSeeds`] if `seeds` is empty.
    /// - [`HarvestError::MixedSeedKinds`] if the seeds are not all of the
    ///   same kind.
    /// - [`HarvestError::DuplicateSeed`] if two seeds sharing a property sit
    ///   on the same cell.
    ///
    /// All are checked before anything is mutated.
    pub fn new(dms: &'a mut [DataModule<'m>], seeds: &'a mut [Seed<'m>]) -> Result<Self> {
        let first = seeds.first().ok_or(HarvestError::NoSeeds)?.kind();
        if seeds.iter().any(|s| s.kind() != first) {
            return Err(HarvestError::MixedSeedKinds);
        }
        for (i, seed) in seeds.iter().enumerate() {
            let taken = seeds[..i]
                .iter()
                .any(|earlier| earlier.home() == seed.home() && earlier.shares_property(seed));
            if taken {
                return Err(HarvestError::DuplicateSeed {
                    point: seed.point(),
                    cell: seed.home(),
                });
            }
        }

        let mut registry = Registry::new();
        for seed in seeds.iter() {
            registry.claim(seed.home(), seed.properties());
        }
        for seed in seeds.iter_mut() {
            seed.initialize(&mut registry);
        }
        for dm in dms.iter_mut() {
            for seed in seeds.iter() {
                dm.update(seed.home(), seed.properties());
            }
        }

        // No accretions yet, so the regularizing function is zero.
        let goal: f64 = dms.iter().map(DataModule::current_misfit).sum();
        info!(
            seeds = seeds.len(),
            data_modules = dms.len(),
            goal,
            "initialized harvest"
        );

        Ok(Self {
            dms,
            seeds,
            registry,
            goals: vec![goal],
            misfits: vec![goal],
            rounds: 0,
            max_rounds: None,
            done: false,
        })
    }

    /// Stop after `max_rounds` growth rounds even if seeds could still grow.
    pub fn with_max_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Runs one growth round.
    ///
    /// Returns `None` once a round accepts nothing (or the round limit is
    /// hit); every later call returns `None` as well.
    pub fn step(&mut self) -> Option<Round> {
        if self.done {
            return None;
        }
        if self.max_rounds.is_some_and(|max| self.rounds >= max) {
            warn!(rounds = self.rounds, "round limit reached, stopping growth");
            self.done = true;
            return None;
        }

        let mut round = Round::new();
        for i in 0..self.seeds.len() {
            let total_regularization: f64 = self.seeds.iter().map(Seed::regularization).sum();
            let (goal, misfit) = self.current();
            let Some(accretion) = self.seeds[i].grow(
                self.dms,
                &mut self.registry,
                total_regularization,
                goal,
                misfit,
            ) else {
                continue;
            };
            self.goals.push(accretion.goal);
            self.misfits.push(accretion.misfit);
            for dm in self.dms.iter_mut() {
                dm.update(accretion.cell, &accretion.properties);
            }
            round.push(accretion);
        }
        self.rounds += 1;
        debug!(round = self.rounds, accretions = round.len(), "growth round");

        if round.is_empty() {
            self.done = true;
            None
        } else {
            Some(round)
        }
    }

    /// Runs growth rounds until no seed can grow.
    pub fn run(&mut self) {
        while self.step().is_some() {}
    }

    /// Current `(goal, misfit)`.
    pub fn current(&self) -> (f64, f64) {
        (
            self.goals.last().copied().unwrap_or_default(),
            self.misfits.last().copied().unwrap_or_default(),
        )
    }

    /// Number of growth rounds run so far, including the final empty one.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Estimate and histories as they stand now.
    pub fn result(&self) -> HarvestResult {
        HarvestResult {
            estimate: cat_estimate(self.seeds),
            goals: self.goals.clone(),
            misfits: self.misfits.clone(),
        }
    }
}

impl Iterator for Harvester<'_, '_> {
    type Item = Round;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

/// Grows `seeds` until the predicted data in `dms` stop improving.
///
/// Seed order matters: it breaks ties for contested cells and sets the
/// order of the goal and misfit histories.
pub fn harvest<'m>(dms: &mut [DataModule<'m>], seeds: &mut [Seed<'m>]) -> Result<HarvestResult> {
    harvest_with_limit(dms, seeds, None)
}

/// [`harvest`] with an optional cap on the number of growth rounds.
pub fn harvest_with_limit<'m>(
    dms: &mut [DataModule<'m>],
    seeds: &mut [Seed<'m>],
    max_rounds: Option<usize>,
) -> Result<HarvestResult> {
    info!("harvesting inversion results from planting anomalous densities");
    let start = Instant::now();
    let mut harvester = Harvester::new(dms, seeds)?.with_max_rounds(max_rounds);
    harvester.run();
    let result = harvester.result();

    let elapsed = start.elapsed();
    let accretions = result.accretions();
    let per_accretion = if accretions > 0 {
        elapsed / accretions as u32
    } else {
        elapsed
    };
    info!(
        final_goal = result.final_goal(),
        accretions,
        rounds = harvester.rounds(),
        ?elapsed,
        ?per_accretion,
        "harvest finished"
    );
    Ok(result)
}
