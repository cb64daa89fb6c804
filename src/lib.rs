//! # mpe-rs: Most Probable Explanation by weighted MaxWalkSAT
//!
//! **`mpe-rs`** is the propositional core of a relational MAP inference system.
//! It covers the path from relational node declarations down to the most
//! probable truth assignment of a grounded model.
//!
//! ## Pipeline
//!
//! 1. **Declarations**: nodes such as `smokes(x)` or `#cause(x)|OR:y` are parsed
//!    into [`NodeSpec`][crate::node::NodeSpec]s, which synthesize ground variable
//!    names and textual literals like `!smokes(Anna)`.
//! 2. **Ground atoms**: literal text is interned into dense
//!    [`AtomId`][crate::types::AtomId]s by [`GroundAtoms`][crate::atoms::GroundAtoms].
//! 3. **Knowledge base**: [`WeightedFormula`][crate::clause::WeightedFormula]s are
//!    converted to CNF and split into weighted clauses by
//!    [`ClausalKb`][crate::kb::ClausalKb], which remembers where each clause came from.
//! 4. **Search**: [`MaxWalkSat`][crate::walksat::MaxWalkSat] looks for the world
//!    minimizing the total weight of violated clauses, hard clauses first.
//! 5. **Queries**: [`MaxWalkSatInference`][crate::mpe::MaxWalkSatInference] answers
//!    queries about atoms with `1.0` or `0.0` depending on the best world found.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use mpe_rs::clause::WeightedFormula;
//! use mpe_rs::formula::Formula;
//! use mpe_rs::mpe::{GroundModel, MapInference, MaxWalkSatInference};
//! use mpe_rs::node::{Domain, NodeSpec};
//! use mpe_rs::walksat::SearchConfig;
//!
//! let smokes: NodeSpec = "Smokes(x)".parse().unwrap();
//! let cancer: NodeSpec = "Cancer(x)".parse().unwrap();
//! let anna = HashMap::from([("x".to_string(), "Anna".to_string())]);
//!
//! // Literal text for "Anna smokes" and "Anna has cancer".
//! let s = smokes.to_literal(&Domain::boolean(), 0, Some(&anna)).unwrap();
//! let c = cancer.to_literal(&Domain::boolean(), 0, Some(&anna)).unwrap();
//! assert_eq!(s, "smokes(Anna)");
//!
//! let mut model = GroundModel::new();
//! let s = model.atoms.parse_literal(&s).unwrap();
//! let c = model.atoms.parse_literal(&c).unwrap();
//! model.add_formula(WeightedFormula::new(Formula::implies(s, c), 1.5));
//! model.observe("smokes(Anna)", true).unwrap();
//!
//! let mut inference = MaxWalkSatInference::new(&model, SearchConfig::default().with_seed(1)).unwrap();
//! let results = inference.infer(&["cancer(Anna)"], 1000).unwrap();
//! assert_eq!(results[0].probability, 1.0);
//! ```
//!
//! ## Core Components
//!
//! - **[`node`]**: Node declaration parser and literal synthesis.
//! - **[`formula`]**: Propositional formulas and CNF conversion.
//! - **[`kb`]**: The weighted clausal knowledge base.
//! - **[`walksat`]**: The MaxWalkSAT local search engine.
//! - **[`mpe`]**: The MAP inference driver.

pub mod atoms;
pub mod clause;
pub mod error;
pub mod formula;
pub mod kb;
pub mod mpe;
pub mod node;
pub mod types;
pub mod walksat;
pub mod world;
