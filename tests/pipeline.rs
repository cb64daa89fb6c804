//! End-to-end tests: node declarations, ground atoms, knowledge base, search and queries.

use std::collections::HashMap;

use mpe_rs::atoms::GroundAtoms;
use mpe_rs::clause::{WeightedClause, WeightedFormula};
use mpe_rs::error::Error;
use mpe_rs::formula::Formula;
use mpe_rs::kb::ClausalKb;
use mpe_rs::mpe::{GroundModel, MapInference, MaxWalkSatInference};
use mpe_rs::node::{Domain, NodeSpec};
use mpe_rs::types::AtomId;
use mpe_rs::walksat::{MaxWalkSat, SearchConfig, SearchStatus};
use mpe_rs::world::PossibleWorld;

const EPS: f64 = 1e-9;

fn bind(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
}

// ─── Declarations to Literals ──────────────────────────────────────────────────

#[test]
fn declaration_to_ground_atoms() {
    let node: NodeSpec = "Takes(s,c)".parse().unwrap();
    assert!(node.is_relation());
    assert_eq!(node.variable_name(&["Ann", "Logic"]).unwrap(), "Takes(Ann,Logic)");

    let binding = bind(&[("s", "Ann"), ("c", "Logic")]);
    let pos = node.to_literal(&Domain::boolean(), 0, Some(&binding)).unwrap();
    let neg = node.to_literal(&Domain::boolean(), 1, Some(&binding)).unwrap();
    assert_eq!(pos, "takes(Ann,Logic)");
    assert_eq!(neg, "!takes(Ann,Logic)");

    let mut atoms = GroundAtoms::new();
    let p = atoms.parse_literal(&pos).unwrap();
    let n = atoms.parse_literal(&neg).unwrap();
    assert_eq!(atoms.len(), 1);
    assert_eq!(n, Formula::not(p));
}

#[test]
fn non_boolean_value_becomes_last_argument() {
    let node: NodeSpec = "Grade(s,c)".parse().unwrap();
    let domain = Domain::new(["a", "b", "c"]);
    let lit = node
        .to_literal(&domain, 1, Some(&bind(&[("s", "Ann"), ("c", "Logic")])))
        .unwrap();
    assert_eq!(lit, "grade(Ann,Logic,B)");

    let err = node.to_literal(&domain, 3, None).unwrap_err();
    assert!(matches!(err, Error::ValueOutOfDomain { index: 3, size: 3, .. }));
}

#[test]
fn arity_mismatch_reports_node() {
    let node: NodeSpec = "+cause(x)|OR:y".parse().unwrap();
    let err = node.variable_name(&["a", "b"]).unwrap_err();
    assert_eq!(
        err,
        Error::ArityMismatch {
            node: "+cause(x)|OR:y".to_string(),
            expected: 1,
            actual: 2,
        }
    );
}

// ─── Knowledge Base ────────────────────────────────────────────────────────────

#[test]
fn weights_sum_to_formula_weight() {
    let mut atoms = GroundAtoms::new();
    let a = Formula::atom(atoms.intern("a"));
    let b = Formula::atom(atoms.intern("b"));
    let c = Formula::atom(atoms.intern("c"));

    let formulas = [
        WeightedFormula::new(Formula::iff(a.clone(), b.clone()), 0.7),
        WeightedFormula::new(Formula::or([Formula::and([a.clone(), b.clone()]), c.clone()]), 1.3),
        WeightedFormula::new(Formula::and([a, Formula::implies(b, c.clone()), c]), 2.9),
    ];
    let mut kb = ClausalKb::new();
    for wf in &formulas {
        let id = kb.add_formula(wf, false).unwrap();
        let total: f64 = kb.clauses_of(id).map(|(_, clause)| clause.weight()).sum();
        assert!((total - wf.weight).abs() < EPS, "{} splits into weights summing to {}", wf, total);
        for (cid, _) in kb.clauses_of(id) {
            assert_eq!(kb.origin_of(cid), &wf.formula);
        }
    }
}

#[test]
fn no_tautology_reaches_the_base() {
    let x = Formula::atom(AtomId::new(0));
    let y = Formula::atom(AtomId::new(1));
    // (x => y) v (y => x) is valid.
    let valid = Formula::or([Formula::implies(x.clone(), y.clone()), Formula::implies(y.clone(), x.clone())]);
    let formulas = [
        WeightedFormula::new(valid, 1.0),
        WeightedFormula::new(Formula::iff(x.clone(), Formula::not(y)), 1.0),
        WeightedFormula::new(Formula::or([x.clone(), Formula::not(x)]), 1.0),
    ];
    let kb = ClausalKb::from_formulas(&formulas, false).unwrap();
    for clause in &kb {
        let lits = clause.lits();
        assert!(lits.windows(2).all(|w| w[0].atom() != w[1].atom()));
    }
    assert_eq!(kb.num_formulas(), 3);
}

#[test]
fn negated_weights_rank_worlds_alike() {
    let mut atoms = GroundAtoms::new();
    let a = Formula::atom(atoms.intern("a"));
    let b = Formula::atom(atoms.intern("b"));
    let c = Formula::atom(atoms.intern("c"));
    let formulas = [
        WeightedFormula::new(a, -1.2),
        WeightedFormula::new(Formula::not(b), -0.4),
        WeightedFormula::new(c, 2.0),
    ];

    let positive = ClausalKb::from_formulas(&formulas, true).unwrap();
    let negative = ClausalKb::from_formulas(&formulas, false).unwrap();
    assert!(positive.iter().all(|c| c.weight() >= 0.0));
    assert!(negative.iter().any(|c| c.weight() < 0.0));

    // Both objectives differ by the same constant in every world.
    let cost = |kb: &ClausalKb, world: &PossibleWorld| -> f64 {
        kb.iter().filter(|c| !c.is_satisfied(world)).map(WeightedClause::weight).sum()
    };
    let mut gap = None;
    for bits in 0..8u8 {
        let world = PossibleWorld::from_values(&[bits & 1 != 0, bits & 2 != 0, bits & 4 != 0]);
        let d = cost(&positive, &world) - cost(&negative, &world);
        match gap {
            None => gap = Some(d),
            Some(g) => assert!((d - g).abs() < EPS),
        }
    }
}

#[test]
fn unsatisfiable_formula_is_reported() {
    let a = Formula::atom(AtomId::new(0));
    let wf = WeightedFormula::hard(Formula::and([a.clone(), Formula::not(a)]), 10.0);
    let kb = ClausalKb::from_formulas([&wf], false).unwrap();
    // a ^ !a is two unit clauses, not a constant; only constant false is rejected.
    assert_eq!(kb.len(), 2);

    let wf = WeightedFormula::hard(Formula::implies(Formula::TRUE, Formula::FALSE), 10.0);
    let err = ClausalKb::from_formulas([&wf], false).unwrap_err();
    assert!(matches!(err, Error::UnsatisfiableHardFormula { index: 0, .. }));
}

#[test]
fn non_numeric_weight_is_rejected() {
    let a = Formula::atom(AtomId::new(0));
    let b = Formula::atom(AtomId::new(1));
    let wf = WeightedFormula::new(Formula::and([a.clone(), b]), f64::NAN);
    let mut kb = ClausalKb::new();
    let err = kb.add_formula(&wf, false).unwrap_err();
    assert!(matches!(err, Error::InvalidWeight { .. }));
    assert!(kb.is_empty());
    assert_eq!(kb.num_formulas(), 0);

    // Negated to +inf when positive weights are required.
    let wf = WeightedFormula::hard(a, f64::NEG_INFINITY);
    assert!(ClausalKb::from_formulas([&wf], false).is_err());
    let kb = ClausalKb::from_formulas([&wf], true).unwrap();
    assert_eq!(kb.clauses()[0].weight(), f64::INFINITY);
}

// ─── Search ────────────────────────────────────────────────────────────────────

#[test]
fn contradicting_hard_units_cost_exactly_one_clause() {
    let a = AtomId::new(0);
    let mut kb = ClausalKb::new();
    kb.add_clause(WeightedClause::new([a.pos()], 10.0, true).unwrap());
    kb.add_clause(WeightedClause::new([a.neg()], 10.0, true).unwrap());

    for initial in [false, true] {
        let mut sat = MaxWalkSat::with_config(&kb, 1, SearchConfig::default().with_max_steps(1000)).unwrap();
        sat.set_initial_state(PossibleWorld::from_values(&[initial])).unwrap();
        assert_eq!(sat.run().unwrap(), SearchStatus::StepLimitReached);
        let best = sat.best_violated_weight().unwrap();
        assert!((best - 10.0).abs() < EPS, "best violated weight {}", best);
    }
}

#[test]
fn zero_steps_return_initial_state() {
    let kb = ClausalKb::from_formulas(
        [&WeightedFormula::new(Formula::atom(AtomId::new(1)), 1.0)],
        true,
    )
    .unwrap();
    let initial = PossibleWorld::from_values(&[true, false, true]);
    let mut sat = MaxWalkSat::new(&kb, 3).unwrap();
    sat.set_initial_state(initial.clone()).unwrap();
    sat.set_max_steps(0);
    sat.run().unwrap();
    assert_eq!(sat.best_state(), Some(&initial));
}

#[test]
fn greedy_runs_are_reproducible() {
    let mut atoms = GroundAtoms::new();
    let ids: Vec<_> = (0..8).map(|i| Formula::atom(atoms.intern(&format!("x{}", i)))).collect();
    let mut formulas = Vec::new();
    for i in 0..8 {
        let j = (i + 3) % 8;
        formulas.push(WeightedFormula::new(Formula::iff(ids[i].clone(), Formula::not(ids[j].clone())), 1.0 + i as f64));
        formulas.push(WeightedFormula::new(ids[i].clone(), 0.3));
    }
    let kb = ClausalKb::from_formulas(&formulas, true).unwrap();

    let run = || {
        let config = SearchConfig::default().with_p(0.0).with_seed(99).with_max_steps(300);
        let mut sat = MaxWalkSat::with_config(&kb, atoms.len(), config).unwrap();
        sat.set_initial_state(atoms.world()).unwrap();
        sat.run().unwrap();
        (sat.improvements().to_vec(), sat.best_state().cloned())
    };
    assert_eq!(run(), run());
}

// ─── MAP Inference ─────────────────────────────────────────────────────────────

#[test]
fn smokers_map_state() {
    let smokes: NodeSpec = "Smokes(x)".parse().unwrap();
    let cancer: NodeSpec = "Cancer(x)".parse().unwrap();
    let boolean = Domain::boolean();

    let mut model = GroundModel::new();
    for person in ["Anna", "Bob"] {
        let b = bind(&[("x", person)]);
        let s = model.atoms.parse_literal(&smokes.to_literal(&boolean, 0, Some(&b)).unwrap()).unwrap();
        let c = model.atoms.parse_literal(&cancer.to_literal(&boolean, 0, Some(&b)).unwrap()).unwrap();
        model.add_formula(WeightedFormula::new(Formula::implies(s, c.clone()), 1.5));
        // Cancer is rare.
        model.add_formula(WeightedFormula::new(c, -0.5));
    }
    model.observe("smokes(Anna)", true).unwrap();
    model.observe("smokes(Bob)", false).unwrap();

    let mut inference = MaxWalkSatInference::new(&model, SearchConfig::default().with_seed(5)).unwrap();
    let results = inference.infer(&["cancer(Anna)", "cancer(Bob)", "smokes(Anna)"], 10_000).unwrap();
    let probabilities: Vec<f64> = results.iter().map(|r| r.probability).collect();
    assert_eq!(probabilities, [1.0, 0.0, 1.0]);
    assert_eq!(inference.status(), SearchStatus::StepLimitReached);
    assert!((inference.engine().best_violated_weight().unwrap() - 0.5).abs() < EPS);
}

#[test]
fn infinite_weight_formula_must_hold() {
    let mut model = GroundModel::new();
    let a = Formula::atom(model.atoms.intern("a"));
    let b = Formula::atom(model.atoms.intern("b"));
    // a ^ b split in two still leaves each conjunct infinitely heavy.
    model.add_formula(WeightedFormula::hard(Formula::and([a.clone(), b.clone()]), f64::INFINITY));
    model.add_formula(WeightedFormula::new(Formula::not(a), 3.0));
    model.add_formula(WeightedFormula::new(Formula::not(b), 3.0));

    let config = SearchConfig::default().with_p(0.0).with_max_steps(50);
    let mut inference = MaxWalkSatInference::new(&model, config).unwrap();
    let results = inference.infer(&["a", "b"], 50).unwrap();
    assert_eq!(results[0].probability, 1.0);
    assert_eq!(results[1].probability, 1.0);
    assert!((inference.engine().best_violated_weight().unwrap() - 6.0).abs() < EPS);
}

#[test]
fn unknown_query_is_an_error() {
    let mut model = GroundModel::new();
    let a = Formula::atom(model.atoms.intern("a"));
    model.add_formula(WeightedFormula::new(a, 1.0));
    let mut inference = MaxWalkSatInference::new(&model, SearchConfig::default()).unwrap();
    let err = inference.infer(&["a", "b"], 10).unwrap_err();
    assert_eq!(err, Error::UnknownAtom { name: "b".to_string() });
}
