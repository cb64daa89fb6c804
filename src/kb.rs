//! Weighted clausal knowledge base.
//!
//! A [`ClausalKb`] is built from weighted formulas: each formula is converted
//! to CNF and split into clauses that share its weight equally. The base keeps
//! the mapping in both directions, from every clause to the formula it came
//! from, and from every formula to the clauses it produced, in insertion order.
//!
//! The base is append-only. Once built it is read-only, so several search
//! engines may be constructed from the same base concurrently.

use std::fmt::{self, Display};

use log::debug;

use crate::clause::{WeightedClause, WeightedFormula};
use crate::error::{Error, Result};
use crate::formula::Formula;

/// Index of a formula in a [`ClausalKb`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormulaId(usize);

impl FormulaId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a clause in a [`ClausalKb`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClauseId(pub(crate) usize);

impl ClauseId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClausalKb {
    clauses: Vec<WeightedClause>,
    /// Originating formula of each clause.
    origin: Vec<FormulaId>,
    /// Formulas as they were converted (after weight normalization).
    formulas: Vec<WeightedFormula>,
    /// Clauses of each formula, in insertion order.
    formula_clauses: Vec<Vec<ClauseId>>,
}

impl ClausalKb {
    /// Creates an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a knowledge base from a collection of weighted formulas.
    ///
    /// If `require_positive_weights` is set, formulas with negative weight are
    /// negated so that all clause weights are non-negative.
    pub fn from_formulas<'a>(
        formulas: impl IntoIterator<Item = &'a WeightedFormula>,
        require_positive_weights: bool,
    ) -> Result<Self> {
        let mut kb = Self::new();
        for wf in formulas {
            kb.add_formula(wf, require_positive_weights)?;
        }
        Ok(kb)
    }

    /// Adds an arbitrary formula, converting it to CNF and splitting it into clauses.
    ///
    /// A CNF with `k` conjuncts yields clauses of weight `w / k` each.
    /// Tautological conjuncts are dropped. A formula whose CNF is the constant
    /// true produces no clauses; one whose CNF is the constant false is
    /// rejected with [`Error::UnsatisfiableHardFormula`] and leaves the base unchanged.
    ///
    /// The caller's formula is not modified; the (possibly negated) copy is
    /// what the base records as the origin of the new clauses.
    pub fn add_formula(&mut self, wf: &WeightedFormula, require_positive_weights: bool) -> Result<FormulaId> {
        let wf = if require_positive_weights && wf.weight < 0.0 {
            wf.negated()
        } else {
            wf.clone()
        };

        let cnf = wf.formula.to_cnf();
        let index = self.formulas.len();

        let clauses = match &cnf {
            Formula::Const(true) => {
                debug!("Formula #{} ({}) is always satisfied, no clauses added", index, wf.formula);
                vec![]
            }
            Formula::Const(false) => {
                return Err(Error::UnsatisfiableHardFormula {
                    index,
                    formula: wf.formula.to_string(),
                });
            }
            Formula::And(children) => {
                let weight = wf.weight / children.len() as f64;
                let mut clauses = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(clause) = non_tautological(WeightedClause::from_formula(child, weight, wf.is_hard))? {
                        clauses.push(clause);
                    }
                }
                clauses
            }
            clause => non_tautological(WeightedClause::from_formula(clause, wf.weight, wf.is_hard))?
                .into_iter()
                .collect(),
        };

        debug!("Formula #{} ({}) yields {} clause(s)", index, wf.formula, clauses.len());
        Ok(self.push(wf, clauses))
    }

    /// Adds a clause that is its own originating formula.
    pub fn add_clause(&mut self, wc: WeightedClause) -> FormulaId {
        let wf = WeightedFormula {
            formula: wc.to_formula(),
            weight: wc.weight(),
            is_hard: wc.is_hard(),
        };
        self.push(wf, vec![wc])
    }

    fn push(&mut self, wf: WeightedFormula, clauses: Vec<WeightedClause>) -> FormulaId {
        let formula_id = FormulaId(self.formulas.len());
        let mut ids = Vec::with_capacity(clauses.len());
        for clause in clauses {
            ids.push(ClauseId(self.clauses.len()));
            self.clauses.push(clause);
            self.origin.push(formula_id);
        }
        self.formulas.push(wf);
        self.formula_clauses.push(ids);
        formula_id
    }
}

/// Turns a tautology into `None`, keeping other errors.
fn non_tautological(clause: Result<WeightedClause>) -> Result<Option<WeightedClause>> {
    match clause {
        Ok(clause) => Ok(Some(clause)),
        Err(Error::Tautology { clause }) => {
            debug!("Dropping tautological clause {}", clause);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// Getters
impl ClausalKb {
    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn num_formulas(&self) -> usize {
        self.formulas.len()
    }

    pub fn clauses(&self) -> &[WeightedClause] {
        &self.clauses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeightedClause> {
        self.clauses.iter()
    }

    pub fn clause(&self, id: ClauseId) -> &WeightedClause {
        &self.clauses[id.0]
    }

    pub fn formula(&self, id: FormulaId) -> &WeightedFormula {
        &self.formulas[id.0]
    }

    /// The formula (before CNF conversion) that produced the clause.
    pub fn origin_of(&self, id: ClauseId) -> &Formula {
        &self.formulas[self.origin[id.0].0].formula
    }

    pub fn origin_id(&self, id: ClauseId) -> FormulaId {
        self.origin[id.0]
    }

    /// The clauses produced by the formula, in insertion order.
    pub fn clauses_of(&self, id: FormulaId) -> impl Iterator<Item = (ClauseId, &WeightedClause)> + '_ {
        self.formula_clauses[id.0].iter().map(move |&c| (c, &self.clauses[c.0]))
    }

    /// Every formula together with the clauses it was split into.
    pub fn formulas_and_clauses(&self) -> impl Iterator<Item = (&WeightedFormula, &[ClauseId])> + '_ {
        self.formulas
            .iter()
            .zip(self.formula_clauses.iter())
            .map(|(wf, ids)| (wf, ids.as_slice()))
    }

    /// One past the largest atom index referenced by any clause.
    pub fn num_atoms(&self) -> usize {
        self.clauses
            .iter()
            .flat_map(|c| c.lits().iter())
            .map(|lit| lit.atom().index() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a ClausalKb {
    type Item = &'a WeightedClause;
    type IntoIter = std::slice::Iter<'a, WeightedClause>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for ClausalKb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            writeln!(f, "{:4}  {}", i + 1, clause)?;
        }
        Ok(())
    }
}
