//! Weighted MaxWalkSAT local search.
//!
//! The engine searches truth assignments minimizing the total weight of
//! violated clauses. Each step picks an unhappy clause (see below) and flips
//! one of its atoms: with probability `p` a uniformly random one (random walk
//! move), otherwise the one whose flip lowers the cost the most, ties going
//! to the lowest atom index (greedy move). The best world seen so far is kept.
//!
//! ## Cost
//!
//! A clause with non-negative weight is *unhappy* when it is violated; a
//! clause with negative weight is unhappy when it is satisfied. The cost of a
//! world is the sum of `|w|` over unhappy clauses, split into a hard and a
//! soft part which are compared lexicographically: any violated hard clause
//! outweighs all soft clauses. The cost differs from the plain sum of violated
//! weights by a constant, which [`MaxWalkSat::best_violated_weight`] adds back.
//!
//! ## Lifecycle
//!
//! `Idle -> Running -> Converged | StepLimitReached | Cancelled`. The run
//! converges when no clause is unhappy, since no flip can improve on that.
//! Cancellation is checked between steps and leaves the best world intact.
//!
//! # Example
//!
//! ```
//! use mpe_rs::clause::WeightedFormula;
//! use mpe_rs::formula::Formula;
//! use mpe_rs::kb::ClausalKb;
//! use mpe_rs::types::AtomId;
//! use mpe_rs::walksat::{MaxWalkSat, SearchConfig, SearchStatus};
//! use mpe_rs::world::PossibleWorld;
//!
//! let (a, b) = (Formula::atom(AtomId::new(0)), Formula::atom(AtomId::new(1)));
//! let formulas = [
//!     WeightedFormula::new(Formula::implies(a.clone(), b.clone()), 2.0),
//!     WeightedFormula::new(a, 1.0),
//! ];
//! let kb = ClausalKb::from_formulas(&formulas, true).unwrap();
//!
//! let mut sat = MaxWalkSat::with_config(&kb, 2, SearchConfig::default().with_seed(7)).unwrap();
//! sat.set_initial_state(PossibleWorld::new(2)).unwrap();
//! let status = sat.run().unwrap();
//!
//! assert_eq!(status, SearchStatus::Converged);
//! assert_eq!(sat.best_violated_weight(), Some(0.0));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::clause::WeightedClause;
use crate::error::{Error, Result};
use crate::kb::{ClausalKb, ClauseId};
use crate::types::AtomId;
use crate::world::{Evidence, PossibleWorld};

/// Random number generator driving the search.
pub type SearchRng = ChaCha8Rng;

/// Tolerance for comparing accumulated costs.
const EPS: f64 = 1e-9;

/// Cost of a world: number of unhappy clauses of infinite weight, then weight
/// of unhappy hard clauses, then of unhappy soft ones.
///
/// Infinite weights are counted rather than summed, so removing a satisfied
/// clause of weight `inf` never yields `inf - inf`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Cost {
    pub infinite: i64,
    pub hard: f64,
    pub soft: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        infinite: 0,
        hard: 0.0,
        soft: 0.0,
    };

    fn of(clause: &WeightedClause) -> Cost {
        let w = clause.weight().abs();
        if w.is_infinite() {
            Cost { infinite: 1, ..Cost::ZERO }
        } else if clause.is_hard() {
            Cost { hard: w, ..Cost::ZERO }
        } else {
            Cost { soft: w, ..Cost::ZERO }
        }
    }

    /// Total weight, infinite if any clause of infinite weight is unhappy.
    pub fn total(self) -> f64 {
        if self.infinite > 0 {
            f64::INFINITY
        } else {
            self.hard + self.soft
        }
    }

    /// Lexicographic comparison, with tolerance on the finite parts.
    pub fn compare(self, other: Cost) -> Ordering {
        if self.infinite != other.infinite {
            return self.infinite.cmp(&other.infinite);
        }
        if (self.hard - other.hard).abs() > EPS {
            return self.hard.total_cmp(&other.hard);
        }
        if (self.soft - other.soft).abs() > EPS {
            return self.soft.total_cmp(&other.soft);
        }
        Ordering::Equal
    }

    pub fn is_better_than(self, other: Cost) -> bool {
        self.compare(other) == Ordering::Less
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            infinite: self.infinite + rhs.infinite,
            hard: self.hard + rhs.hard,
            soft: self.soft + rhs.soft,
        }
    }
}

impl Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost {
            infinite: self.infinite - rhs.infinite,
            hard: self.hard - rhs.hard,
            soft: self.soft - rhs.soft,
        }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        *self = *self + rhs;
    }
}

impl SubAssign for Cost {
    fn sub_assign(&mut self, rhs: Cost) {
        *self = *self - rhs;
    }
}

/// Picks the clause to repair among the unhappy ones.
pub trait ClauseSelector: Send {
    /// `unhappy` is never empty. `clauses` is indexed by [`ClauseId::index`].
    fn select(&mut self, unhappy: &[ClauseId], clauses: &[WeightedClause], rng: &mut SearchRng) -> ClauseId;
}

/// Built-in clause selection policies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ClauseSelection {
    /// Uniformly random unhappy clause.
    #[default]
    Uniform,
    /// Hard clauses first, then largest `|weight|`, ties to the lowest clause index.
    Heaviest,
}

impl ClauseSelection {
    pub fn selector(self) -> Box<dyn ClauseSelector> {
        match self {
            ClauseSelection::Uniform => Box::new(UniformSelector),
            ClauseSelection::Heaviest => Box::new(HeaviestSelector),
        }
    }
}

#[derive(Debug, Default)]
pub struct UniformSelector;

impl ClauseSelector for UniformSelector {
    fn select(&mut self, unhappy: &[ClauseId], _clauses: &[WeightedClause], rng: &mut SearchRng) -> ClauseId {
        unhappy[rng.random_range(0..unhappy.len())]
    }
}

#[derive(Debug, Default)]
pub struct HeaviestSelector;

impl ClauseSelector for HeaviestSelector {
    fn select(&mut self, unhappy: &[ClauseId], clauses: &[WeightedClause], _rng: &mut SearchRng) -> ClauseId {
        let key = |id: &ClauseId| {
            let c = &clauses[id.index()];
            (c.is_hard(), c.weight().abs())
        };
        let mut best = unhappy[0];
        for &id in &unhappy[1..] {
            let (hard, weight) = key(&id);
            let (best_hard, best_weight) = key(&best);
            let better = match hard.cmp(&best_hard) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => match weight.total_cmp(&best_weight) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => id < best,
                },
            };
            if better {
                best = id;
            }
        }
        best
    }
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_steps: usize,
    /// Probability of a random walk move; greedy moves happen with `1 - p`.
    pub p: f64,
    pub seed: u64,
    pub selection: ClauseSelection,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            p: 0.5,
            seed: 0,
            selection: ClauseSelection::Uniform,
        }
    }
}

impl SearchConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the random walk probability; it is checked when the engine is built.
    pub fn with_p(mut self, p: f64) -> Self {
        self.p = p;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_selection(mut self, selection: ClauseSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Fails with [`Error::InvalidProbability`] if `p` is not in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        check_probability(self.p)
    }
}

fn check_probability(p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::InvalidProbability { p })
    }
}

/// Shared flag for stopping a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Idle,
    Running,
    /// No clause is unhappy.
    Converged,
    StepLimitReached,
    Cancelled,
}

/// A new best world was found.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Improvement {
    /// Number of steps executed when the world was found (0 for the initial world).
    pub step: usize,
    pub violated_weight: f64,
}

pub struct MaxWalkSat {
    clauses: Vec<WeightedClause>,
    /// For each atom, the clauses it occurs in along with the literal's polarity.
    occurrences: Vec<Vec<(ClauseId, bool)>>,
    num_atoms: usize,
    /// Evidence atoms, never flipped.
    fixed: Vec<bool>,
    evidence: Evidence,
    /// Sum of negative clause weights, the gap between cost and violated weight.
    offset: f64,

    state: Option<PossibleWorld>,
    best: Option<PossibleWorld>,
    num_true: Vec<u32>,
    unhappy: Vec<ClauseId>,
    /// Position of each clause in `unhappy`, if it is there.
    unhappy_pos: Vec<Option<usize>>,
    cost: Cost,
    best_cost: Cost,

    p: f64,
    max_steps: usize,
    rng: SearchRng,
    selector: Box<dyn ClauseSelector>,
    cancel: Option<CancelToken>,
    status: SearchStatus,
    steps: usize,
    improvements: Vec<Improvement>,
}

impl fmt::Debug for MaxWalkSat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxWalkSat")
            .field("clauses", &self.clauses.len())
            .field("atoms", &self.num_atoms)
            .field("p", &self.p)
            .field("max_steps", &self.max_steps)
            .field("status", &self.status)
            .field("steps", &self.steps)
            .field("best_cost", &self.best_cost)
            .finish()
    }
}

impl MaxWalkSat {
    /// Builds an engine over the clauses of `kb` and a universe of `num_atoms` atoms.
    pub fn new(kb: &ClausalKb, num_atoms: usize) -> Result<Self> {
        Self::with_config(kb, num_atoms, SearchConfig::default())
    }

    pub fn with_config(kb: &ClausalKb, num_atoms: usize, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        if num_atoms == 0 {
            return Err(Error::NotInitialized {
                reason: "the atom universe is empty".to_string(),
            });
        }

        let mut occurrences = vec![Vec::new(); num_atoms];
        let mut offset = 0.0;
        for (i, clause) in kb.iter().enumerate() {
            for &lit in clause.lits() {
                let atom = lit.atom();
                if atom.index() >= num_atoms {
                    return Err(Error::AtomOutOfUniverse {
                        atom: atom.to_string(),
                        universe: num_atoms,
                    });
                }
                occurrences[atom.index()].push((ClauseId(i), lit.is_positive()));
            }
            if clause.weight() < 0.0 {
                offset += clause.weight();
            }
        }
        debug!("Indexed {} clauses over {} atoms", kb.len(), num_atoms);

        Ok(Self {
            clauses: kb.clauses().to_vec(),
            occurrences,
            num_atoms,
            fixed: vec![false; num_atoms],
            evidence: Evidence::new(),
            offset,
            state: None,
            best: None,
            num_true: vec![0; kb.len()],
            unhappy: Vec::new(),
            unhappy_pos: vec![None; kb.len()],
            cost: Cost::ZERO,
            best_cost: Cost::ZERO,
            p: config.p,
            max_steps: config.max_steps,
            rng: SearchRng::seed_from_u64(config.seed),
            selector: config.selection.selector(),
            cancel: None,
            status: SearchStatus::Idle,
            steps: 0,
            improvements: Vec::new(),
        })
    }

    /// Fixes evidence atoms. They are written into the current world (if any)
    /// and never flipped afterwards.
    pub fn set_evidence(&mut self, evidence: &Evidence) -> Result<()> {
        for (atom, _) in evidence.iter() {
            if atom.index() >= self.num_atoms {
                return Err(Error::AtomOutOfUniverse {
                    atom: atom.to_string(),
                    universe: self.num_atoms,
                });
            }
        }
        self.fixed.fill(false);
        for (atom, _) in evidence.iter() {
            self.fixed[atom.index()] = true;
        }
        self.evidence = evidence.clone();
        if let Some(state) = self.state.take() {
            self.set_initial_state(state)?;
        }
        Ok(())
    }

    /// Sets the world the search starts from, overriding evidence atoms.
    pub fn set_initial_state(&mut self, mut world: PossibleWorld) -> Result<()> {
        if world.len() != self.num_atoms {
            return Err(Error::NotInitialized {
                reason: format!("initial world has {} atoms, expected {}", world.len(), self.num_atoms),
            });
        }
        self.evidence.apply(&mut world)?;

        self.unhappy.clear();
        self.unhappy_pos.fill(None);
        self.cost = Cost::ZERO;
        for (i, clause) in self.clauses.iter().enumerate() {
            let n = clause.lits().iter().filter(|&&lit| world.satisfies(lit)).count();
            self.num_true[i] = n as u32;
            if is_unhappy(clause, n > 0) {
                self.unhappy_pos[i] = Some(self.unhappy.len());
                self.unhappy.push(ClauseId(i));
                self.cost += Cost::of(clause);
            }
        }

        self.best = Some(world.clone());
        self.state = Some(world);
        self.best_cost = self.cost;
        self.steps = 0;
        self.status = SearchStatus::Idle;
        self.improvements = vec![Improvement {
            step: 0,
            violated_weight: self.cost.total() + self.offset,
        }];
        Ok(())
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    /// Replaces the clause selection policy.
    pub fn set_selector(&mut self, selector: Box<dyn ClauseSelector>) {
        self.selector = selector;
    }

    /// Fails with [`Error::InvalidProbability`] if `p` is not in `[0, 1]`,
    /// keeping the previous value.
    pub fn set_p(&mut self, p: f64) -> Result<()> {
        check_probability(p)?;
        self.p = p;
        Ok(())
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }
}

/// Whether a clause adds to the cost given its satisfaction.
fn is_unhappy(clause: &WeightedClause, satisfied: bool) -> bool {
    if clause.weight() >= 0.0 {
        !satisfied
    } else {
        satisfied
    }
}

// Search
impl MaxWalkSat {
    /// Runs up to `max_steps` steps from the current world.
    pub fn run(&mut self) -> Result<SearchStatus> {
        if self.state.is_none() {
            return Err(Error::NotInitialized {
                reason: "no initial state".to_string(),
            });
        }

        info!(
            "MaxWalkSAT: {} clauses, {} atoms, max_steps = {}, p = {}, initial violated weight = {}",
            self.clauses.len(),
            self.num_atoms,
            self.max_steps,
            self.p,
            self.violated_weight()
        );

        self.status = SearchStatus::Running;
        let mut status = SearchStatus::StepLimitReached;
        for _ in 0..self.max_steps {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                status = SearchStatus::Cancelled;
                break;
            }
            if self.unhappy.is_empty() {
                status = SearchStatus::Converged;
                break;
            }
            self.step();
        }
        self.status = status;

        info!(
            "MaxWalkSAT: {:?} after {} steps, best violated weight = {}",
            status,
            self.steps,
            self.best_cost.total() + self.offset
        );
        Ok(status)
    }

    fn step(&mut self) {
        self.steps += 1;

        let clause = self.selector.select(&self.unhappy, &self.clauses, &mut self.rng);
        let candidates: Vec<AtomId> = self.clauses[clause.index()]
            .lits()
            .iter()
            .map(|lit| lit.atom())
            .filter(|a| !self.fixed[a.index()])
            .collect();
        if candidates.is_empty() {
            // Only evidence atoms, nothing to flip.
            return;
        }

        let atom = if self.rng.random_bool(self.p) {
            candidates[self.rng.random_range(0..candidates.len())]
        } else {
            self.greedy_choice(&candidates)
        };
        self.flip(atom);

        if self.cost.is_better_than(self.best_cost) {
            self.best_cost = self.cost;
            self.best = self.state.clone();
            let violated_weight = self.cost.total() + self.offset;
            self.improvements.push(Improvement {
                step: self.steps,
                violated_weight,
            });
            trace!("step {}: new best violated weight {}", self.steps, violated_weight);
        }
    }

    /// The candidate whose flip lowers the cost the most; candidates come in
    /// ascending atom order and only a strictly better delta replaces the pick.
    fn greedy_choice(&self, candidates: &[AtomId]) -> AtomId {
        let mut best = candidates[0];
        let mut best_delta = self.delta(best);
        for &atom in &candidates[1..] {
            let delta = self.delta(atom);
            if delta.is_better_than(best_delta) {
                best = atom;
                best_delta = delta;
            }
        }
        best
    }

    /// Change in cost if the atom were flipped.
    fn delta(&self, atom: AtomId) -> Cost {
        let Some(state) = &self.state else {
            return Cost::ZERO;
        };
        let value = state.get(atom);
        let mut delta = Cost::ZERO;
        for &(c, positive) in &self.occurrences[atom.index()] {
            let clause = &self.clauses[c.index()];
            let n = self.num_true[c.index()];
            let n_after = if positive == value { n - 1 } else { n + 1 };
            let (sat, sat_after) = (n > 0, n_after > 0);
            if sat != sat_after {
                if is_unhappy(clause, sat_after) {
                    delta += Cost::of(clause);
                } else {
                    delta -= Cost::of(clause);
                }
            }
        }
        delta
    }

    fn flip(&mut self, atom: AtomId) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let value = state.flip(atom);
        for k in 0..self.occurrences[atom.index()].len() {
            let (c, positive) = self.occurrences[atom.index()][k];
            let i = c.index();
            let was_sat = self.num_true[i] > 0;
            if positive == value {
                self.num_true[i] += 1;
            } else {
                self.num_true[i] -= 1;
            }
            let sat = self.num_true[i] > 0;
            if was_sat != sat {
                self.update_unhappy(c, sat);
            }
        }
    }

    fn update_unhappy(&mut self, c: ClauseId, satisfied: bool) {
        let clause = &self.clauses[c.index()];
        let cost = Cost::of(clause);
        if is_unhappy(clause, satisfied) {
            self.unhappy_pos[c.index()] = Some(self.unhappy.len());
            self.unhappy.push(c);
            self.cost += cost;
        } else if let Some(pos) = self.unhappy_pos[c.index()].take() {
            self.unhappy.swap_remove(pos);
            if let Some(&moved) = self.unhappy.get(pos) {
                self.unhappy_pos[moved.index()] = Some(pos);
            }
            self.cost -= cost;
        }
    }
}

// Results
impl MaxWalkSat {
    /// The best world found so far, `None` before an initial state is set.
    pub fn best_state(&self) -> Option<&PossibleWorld> {
        self.best.as_ref()
    }

    /// The current world.
    pub fn state(&self) -> Option<&PossibleWorld> {
        self.state.as_ref()
    }

    /// Total weight of the clauses violated by the best world.
    pub fn best_violated_weight(&self) -> Option<f64> {
        self.best.as_ref().map(|_| self.best_cost.total() + self.offset)
    }

    pub fn best_cost(&self) -> Cost {
        self.best_cost
    }

    /// Total weight of the clauses violated by the current world.
    pub fn violated_weight(&self) -> f64 {
        self.cost.total() + self.offset
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    /// Steps executed since the initial state was set.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Every new best world, in the order found, starting with the initial one.
    pub fn improvements(&self) -> &[Improvement] {
        &self.improvements
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }
}
