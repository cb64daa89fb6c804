//! Weighted formulas and weighted clauses.

use std::fmt::{self, Display};

use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::types::Lit;
use crate::world::PossibleWorld;

/// A formula with a weight; hard formulas must hold in every admissible world.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFormula {
    pub formula: Formula,
    pub weight: f64,
    pub is_hard: bool,
}

impl WeightedFormula {
    pub fn new(formula: Formula, weight: f64) -> Self {
        Self {
            formula,
            weight,
            is_hard: false,
        }
    }

    pub fn hard(formula: Formula, weight: f64) -> Self {
        Self {
            formula,
            weight,
            is_hard: true,
        }
    }

    /// The negated formula with the negated weight.
    ///
    /// `!f` with weight `-w` ranks worlds the same as `f` with weight `w`.
    pub fn negated(&self) -> Self {
        Self {
            formula: Formula::not(self.formula.clone()),
            weight: -self.weight,
            is_hard: self.is_hard,
        }
    }
}

impl Display for WeightedFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hard {
            write!(f, "{}.", self.formula)
        } else {
            write!(f, "{} {}", self.weight, self.formula)
        }
    }
}

/// A disjunction of literals with a weight.
///
/// # Invariants
///
/// - Literals are sorted and free of duplicates
/// - No atom occurs with both polarities
/// - The clause is not empty
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedClause {
    lits: Vec<Lit>,
    weight: f64,
    is_hard: bool,
}

impl WeightedClause {
    /// Creates a clause from its literals.
    ///
    /// Fails with [`Error::Tautology`] if some atom occurs with both
    /// polarities, and with [`Error::NotAClause`] if there are no literals.
    /// The weight may be `+inf` (a clause that must hold) but neither NaN nor
    /// `-inf`, which fail with [`Error::InvalidWeight`].
    pub fn new(lits: impl IntoIterator<Item = Lit>, weight: f64, is_hard: bool) -> Result<Self> {
        let mut lits: Vec<Lit> = lits.into_iter().collect();
        if lits.is_empty() {
            return Err(Error::NotAClause {
                formula: Formula::FALSE.to_string(),
            });
        }
        lits.sort();
        lits.dedup();
        // Sorting places `a` right before `!a`.
        if lits.windows(2).any(|w| w[0].atom() == w[1].atom()) {
            return Err(Error::Tautology {
                clause: Formula::clause(lits).to_string(),
            });
        }
        if weight.is_nan() || weight == f64::NEG_INFINITY {
            return Err(Error::InvalidWeight {
                clause: Formula::clause(lits).to_string(),
                weight,
            });
        }
        Ok(Self { lits, weight, is_hard })
    }

    /// Creates a clause from a formula that is a literal or a disjunction of literals.
    pub fn from_formula(formula: &Formula, weight: f64, is_hard: bool) -> Result<Self> {
        let lits = formula.as_clause().ok_or_else(|| Error::NotAClause {
            formula: formula.to_string(),
        })?;
        Self::new(lits, weight, is_hard)
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_hard(&self) -> bool {
        self.is_hard
    }

    pub fn is_satisfied(&self, world: &PossibleWorld) -> bool {
        self.lits.iter().any(|&lit| world.satisfies(lit))
    }

    /// The clause as a formula.
    pub fn to_formula(&self) -> Formula {
        if self.lits.len() == 1 {
            Formula::lit(self.lits[0])
        } else {
            Formula::clause(self.lits.iter().copied())
        }
    }
}

impl Display for WeightedClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hard {
            write!(f, "{}.", self.to_formula())
        } else {
            write!(f, "{} {}", self.weight, self.to_formula())
        }
    }
}
