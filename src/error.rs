//! Error type shared by the parser, the knowledge base and the search engine.

use thiserror::Error;

/// Errors produced while parsing node declarations, building clausal
/// knowledge bases, or running local search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A node declaration does not follow `[#|+]name(p1,...)[|MODE:a1,...|a1,...]`.
    #[error("Malformed node declaration '{declaration}': {reason}")]
    MalformedDeclaration { declaration: String, reason: String },

    /// Actual parameters supplied to a node do not match its formal parameters.
    #[error("Invalid number of actual parameters supplied for {node}: expected {expected}, got {actual}")]
    ArityMismatch { node: String, expected: usize, actual: usize },

    /// The clause contains both polarities of one atom and is always satisfied.
    #[error("Clause {clause} is a tautology")]
    Tautology { clause: String },

    /// The formula is not a disjunction of literals.
    #[error("Formula {formula} is not a clause")]
    NotAClause { formula: String },

    /// CNF conversion reduced a formula to the constant false.
    #[error("Formula #{index} ({formula}) is unsatisfiable")]
    UnsatisfiableHardFormula { index: usize, formula: String },

    /// Search was invoked without a usable initial state.
    #[error("Search is not initialized: {reason}")]
    NotInitialized { reason: String },

    /// An atom id lies outside the universe the engine was built for.
    #[error("Atom {atom} is outside of the universe of {universe} atoms")]
    AtomOutOfUniverse { atom: String, universe: usize },

    /// No ground atom with this name exists.
    #[error("Unknown ground atom '{name}'")]
    UnknownAtom { name: String },

    /// A clause weight is NaN or negative infinity.
    #[error("Clause {clause} has invalid weight {weight}")]
    InvalidWeight { clause: String, weight: f64 },

    /// A probability parameter lies outside `[0, 1]`.
    #[error("Probability {p} is outside of [0, 1]")]
    InvalidProbability { p: f64 },

    /// A value index does not address the node's domain.
    #[error("Value index {index} is out of the domain of {node} (size {size})")]
    ValueOutOfDomain { node: String, index: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
