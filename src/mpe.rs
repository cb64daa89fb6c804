//! MAP inference over a ground model.
//!
//! The driver takes what a grounding pipeline produces (the universe of ground
//! atoms, weighted formulas over them, and evidence), compiles the formulas
//! into a [`ClausalKb`] with non-negative weights, and runs [`MaxWalkSat`]
//! once. Query answers are 0/1 "probabilities": `1.0` if the atom is true in
//! the best world found, `0.0` otherwise.

use std::fmt;

use log::debug;

use crate::atoms::GroundAtoms;
use crate::clause::WeightedFormula;
use crate::error::Result;
use crate::kb::ClausalKb;
use crate::types::AtomId;
use crate::walksat::{CancelToken, MaxWalkSat, SearchConfig, SearchStatus};
use crate::world::{Evidence, PossibleWorld};

/// Answer to a single query.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub atom: String,
    pub probability: f64,
}

impl fmt::Display for InferenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.probability, self.atom)
    }
}

/// Output of a grounding pipeline.
#[derive(Debug, Clone, Default)]
pub struct GroundModel {
    pub atoms: GroundAtoms,
    pub formulas: Vec<WeightedFormula>,
    pub evidence: Evidence,
    /// World to start the search from; all atoms false if not given.
    pub initial_world: Option<PossibleWorld>,
}

impl GroundModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_formula(&mut self, wf: WeightedFormula) {
        self.formulas.push(wf);
    }

    /// Records an observed value for a known atom.
    pub fn observe(&mut self, name: &str, value: bool) -> Result<()> {
        let atom = self.atoms.lookup(name)?;
        self.evidence.set(atom, value);
        Ok(())
    }
}

/// A MAP inference algorithm answering queries about ground atoms.
pub trait MapInference {
    /// Runs the algorithm with the given step budget and answers the queries, in order.
    fn infer(&mut self, queries: &[&str], max_steps: usize) -> Result<Vec<InferenceResult>>;

    /// The atom universe queries are resolved against.
    fn atoms(&self) -> &GroundAtoms;

    /// The most probable world found, if inference has produced one.
    fn solution(&self) -> Option<&PossibleWorld>;

    fn algorithm_name(&self) -> String;

    /// `1.0` if the atom is true in the solution, `0.0` otherwise.
    fn result(&self, atom: AtomId) -> f64 {
        match self.solution() {
            Some(world) if atom.index() < world.len() && world.get(atom) => 1.0,
            _ => 0.0,
        }
    }

    /// Answers the queries from the current solution without running anything.
    fn results(&self, queries: &[&str]) -> Result<Vec<InferenceResult>> {
        queries
            .iter()
            .map(|&name| {
                let atom = self.atoms().lookup(name)?;
                Ok(InferenceResult {
                    atom: name.to_string(),
                    probability: self.result(atom),
                })
            })
            .collect()
    }
}

/// MAP inference by weighted MaxWalkSAT.
#[derive(Debug)]
pub struct MaxWalkSatInference {
    atoms: GroundAtoms,
    kb: ClausalKb,
    engine: MaxWalkSat,
}

impl MaxWalkSatInference {
    /// Compiles the model and prepares the search.
    ///
    /// Formulas with negative weight are negated, so every clause handed to
    /// the search has a non-negative weight.
    pub fn new(model: &GroundModel, config: SearchConfig) -> Result<Self> {
        let kb = ClausalKb::from_formulas(&model.formulas, true)?;
        debug!(
            "Compiled {} formulas into {} clauses over {} atoms",
            kb.num_formulas(),
            kb.len(),
            model.atoms.len()
        );

        let mut engine = MaxWalkSat::with_config(&kb, model.atoms.len(), config)?;
        engine.set_evidence(&model.evidence)?;
        let initial = match &model.initial_world {
            Some(world) => world.clone(),
            None => model.atoms.world(),
        };
        engine.set_initial_state(initial)?;

        Ok(Self {
            atoms: model.atoms.clone(),
            kb,
            engine,
        })
    }

    pub fn kb(&self) -> &ClausalKb {
        &self.kb
    }

    pub fn engine(&self) -> &MaxWalkSat {
        &self.engine
    }

    pub fn p(&self) -> f64 {
        self.engine.p()
    }

    pub fn set_p(&mut self, p: f64) -> Result<()> {
        self.engine.set_p(p)
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.engine.set_cancel_token(token);
    }

    pub fn status(&self) -> SearchStatus {
        self.engine.status()
    }
}

impl MapInference for MaxWalkSatInference {
    /// Runs the search once more from where it stopped.
    fn infer(&mut self, queries: &[&str], max_steps: usize) -> Result<Vec<InferenceResult>> {
        // Resolve names first so a bad query does not cost a search.
        for name in queries {
            self.atoms.lookup(name)?;
        }
        self.engine.set_max_steps(max_steps);
        self.engine.run()?;
        self.results(queries)
    }

    fn atoms(&self) -> &GroundAtoms {
        &self.atoms
    }

    fn solution(&self) -> Option<&PossibleWorld> {
        self.engine.best_state()
    }

    fn algorithm_name(&self) -> String {
        format!("MaxWalkSAT[p={}]", self.engine.p())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::error::Error;
    use crate::formula::Formula;

    /// `a => b` with `a` likely and `b` observed false.
    fn model() -> GroundModel {
        let mut model = GroundModel::new();
        let a = Formula::atom(model.atoms.intern("a"));
        let b = Formula::atom(model.atoms.intern("b"));
        model.atoms.intern("c");
        model.add_formula(WeightedFormula::hard(Formula::implies(a.clone(), b), 10.0));
        model.add_formula(WeightedFormula::new(a, 1.0));
        model
    }

    #[test]
    fn test_algorithm_name() {
        let mut inference = MaxWalkSatInference::new(&model(), SearchConfig::default()).unwrap();
        assert_eq!(inference.algorithm_name(), "MaxWalkSAT[p=0.5]");
        inference.set_p(0.25).unwrap();
        assert_eq!(inference.algorithm_name(), "MaxWalkSAT[p=0.25]");
        assert!(inference.set_p(2.0).is_err());
        assert_eq!(inference.algorithm_name(), "MaxWalkSAT[p=0.25]");
    }

    #[test]
    fn test_infer_answers_in_order() {
        let mut inference = MaxWalkSatInference::new(&model(), SearchConfig::default().with_seed(3)).unwrap();
        let results = inference.infer(&["b", "a", "c"], 1000).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.atom.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(results[0].probability, 1.0);
        assert_eq!(results[1].probability, 1.0);
        assert_eq!(results[2].probability, 0.0);
        assert_eq!(inference.status(), SearchStatus::Converged);
    }

    #[test]
    fn test_evidence_respected() {
        let mut model = model();
        model.observe("b", false).unwrap();
        let mut inference = MaxWalkSatInference::new(&model, SearchConfig::default()).unwrap();
        let results = inference.infer(&["a", "b"], 1000).unwrap();
        // With b false the hard implication forces a to be false.
        assert_eq!(results[0].probability, 0.0);
        assert_eq!(results[1].probability, 0.0);
        assert_eq!(inference.engine().best_violated_weight(), Some(1.0));
    }

    #[test]
    fn test_negative_weights_compiled_positive() {
        let mut model = GroundModel::new();
        let a = Formula::atom(model.atoms.intern("a"));
        model.add_formula(WeightedFormula::new(a, -2.0));
        model.initial_world = Some(PossibleWorld::from_values(&[true]));
        let mut inference = MaxWalkSatInference::new(&model, SearchConfig::default()).unwrap();
        assert!(inference.kb().iter().all(|c| c.weight() >= 0.0));
        let results = inference.infer(&["a"], 100).unwrap();
        assert_eq!(results[0].probability, 0.0);
    }

    #[test]
    fn test_unknown_query() {
        let mut inference = MaxWalkSatInference::new(&model(), SearchConfig::default()).unwrap();
        let err = inference.infer(&["d"], 10).unwrap_err();
        assert_eq!(err, Error::UnknownAtom { name: "d".to_string() });
        assert_eq!(inference.engine().steps(), 0);
    }

    #[test]
    fn test_observe_unknown_atom() {
        let mut model = model();
        assert!(matches!(model.observe("z", true), Err(Error::UnknownAtom { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfig {
            p: -1.0,
            ..SearchConfig::default()
        };
        let err = MaxWalkSatInference::new(&model(), config).unwrap_err();
        assert_eq!(err, Error::InvalidProbability { p: -1.0 });
    }

    #[test]
    fn test_empty_model_rejected() {
        let err = MaxWalkSatInference::new(&GroundModel::new(), SearchConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotInitialized { .. }));
    }

    #[test]
    fn test_result_display() {
        let r = InferenceResult {
            atom: "smokes(Anna)".to_string(),
            probability: 1.0,
        };
        assert_eq!(r.to_string(), "1 smokes(Anna)");
    }
}
