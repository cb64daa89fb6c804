//! Propositional formulas over ground atoms and their conversion to CNF.
//!
//! [`Formula`] is a closed set of connectives. [`Formula::to_cnf`] returns one
//! of three shapes, which is all the clausal knowledge base has to distinguish:
//!
//! - `Formula::Const(b)` when the formula simplifies to a truth constant,
//! - a single clause (a literal, or `Formula::Or` of literals),
//! - `Formula::And` of two or more clauses.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Write};

use crate::types::{AtomId, Lit};
use crate::world::PossibleWorld;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Const(bool),
    Atom(AtomId),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
}

// Constructors
impl Formula {
    pub const TRUE: Formula = Formula::Const(true);
    pub const FALSE: Formula = Formula::Const(false);

    pub fn atom(atom: AtomId) -> Self {
        Formula::Atom(atom)
    }

    pub fn lit(lit: Lit) -> Self {
        let atom = Formula::Atom(lit.atom());
        if lit.is_positive() {
            atom
        } else {
            Formula::not(atom)
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        Formula::Not(Box::new(f))
    }

    pub fn and(children: impl IntoIterator<Item = Formula>) -> Self {
        Formula::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Formula>) -> Self {
        Formula::Or(children.into_iter().collect())
    }

    pub fn implies(lhs: Formula, rhs: Formula) -> Self {
        Formula::Implies(Box::new(lhs), Box::new(rhs))
    }

    pub fn iff(lhs: Formula, rhs: Formula) -> Self {
        Formula::Iff(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of the given literals.
    pub fn clause(lits: impl IntoIterator<Item = Lit>) -> Self {
        Formula::Or(lits.into_iter().map(Formula::lit).collect())
    }
}

// Queries
impl Formula {
    /// Evaluates the formula in the given world.
    pub fn eval(&self, world: &PossibleWorld) -> bool {
        match self {
            Formula::Const(b) => *b,
            Formula::Atom(a) => world.get(*a),
            Formula::Not(f) => !f.eval(world),
            Formula::And(fs) => fs.iter().all(|f| f.eval(world)),
            Formula::Or(fs) => fs.iter().any(|f| f.eval(world)),
            Formula::Implies(a, b) => !a.eval(world) || b.eval(world),
            Formula::Iff(a, b) => a.eval(world) == b.eval(world),
        }
    }

    /// All atoms occurring in the formula.
    pub fn atoms(&self) -> BTreeSet<AtomId> {
        let mut atoms = BTreeSet::new();
        self.collect_atoms(&mut atoms);
        atoms
    }

    fn collect_atoms(&self, atoms: &mut BTreeSet<AtomId>) {
        match self {
            Formula::Const(_) => {}
            Formula::Atom(a) => {
                atoms.insert(*a);
            }
            Formula::Not(f) => f.collect_atoms(atoms),
            Formula::And(fs) | Formula::Or(fs) => fs.iter().for_each(|f| f.collect_atoms(atoms)),
            Formula::Implies(a, b) | Formula::Iff(a, b) => {
                a.collect_atoms(atoms);
                b.collect_atoms(atoms);
            }
        }
    }

    /// Returns the literal if the formula is an atom or a negated atom.
    pub fn as_lit(&self) -> Option<Lit> {
        match self {
            Formula::Atom(a) => Some(a.pos()),
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Atom(a) => Some(a.neg()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the literals if the formula is a single clause.
    pub fn as_clause(&self) -> Option<Vec<Lit>> {
        match self {
            Formula::Or(fs) => fs.iter().map(Formula::as_lit).collect(),
            f => f.as_lit().map(|lit| vec![lit]),
        }
    }
}

type Clauses = Vec<Vec<Lit>>;

// CNF conversion
impl Formula {
    /// Converts the formula to conjunctive normal form.
    ///
    /// Negations are pushed to the atoms, disjunctions are distributed over
    /// conjunctions and truth constants are folded away. Duplicate literals
    /// within a clause are merged; clauses with complementary literals are
    /// kept, it is up to the consumer to reject them.
    pub fn to_cnf(&self) -> Formula {
        let clauses = self.cnf_clauses(true);
        if clauses.is_empty() {
            return Formula::TRUE;
        }
        if clauses.iter().any(|c| c.is_empty()) {
            return Formula::FALSE;
        }
        let mut clauses: Vec<Formula> = clauses.into_iter().map(clause_formula).collect();
        if clauses.len() == 1 {
            clauses.pop().unwrap_or(Formula::TRUE)
        } else {
            Formula::And(clauses)
        }
    }

    /// Clauses of this formula (or of its negation, if `positive` is false).
    ///
    /// The empty conjunction is true, and a conjunction with an empty clause is false.
    fn cnf_clauses(&self, positive: bool) -> Clauses {
        match self {
            Formula::Const(b) => {
                if *b == positive {
                    vec![]
                } else {
                    vec![vec![]]
                }
            }
            Formula::Atom(a) => vec![vec![Lit::new(*a, positive)]],
            Formula::Not(f) => f.cnf_clauses(!positive),
            Formula::And(fs) if positive => conjoin(fs.iter().map(|f| f.cnf_clauses(true))),
            Formula::Or(fs) if !positive => conjoin(fs.iter().map(|f| f.cnf_clauses(false))),
            Formula::And(fs) => distribute(fs.iter().map(|f| f.cnf_clauses(false))),
            Formula::Or(fs) => distribute(fs.iter().map(|f| f.cnf_clauses(true))),
            Formula::Implies(a, b) => {
                if positive {
                    distribute([a.cnf_clauses(false), b.cnf_clauses(true)])
                } else {
                    conjoin([a.cnf_clauses(true), b.cnf_clauses(false)])
                }
            }
            Formula::Iff(a, b) => {
                if positive {
                    // (!a v b) ^ (a v !b)
                    conjoin([
                        distribute([a.cnf_clauses(false), b.cnf_clauses(true)]),
                        distribute([a.cnf_clauses(true), b.cnf_clauses(false)]),
                    ])
                } else {
                    // (a v b) ^ (!a v !b)
                    conjoin([
                        distribute([a.cnf_clauses(true), b.cnf_clauses(true)]),
                        distribute([a.cnf_clauses(false), b.cnf_clauses(false)]),
                    ])
                }
            }
        }
    }
}

fn conjoin(parts: impl IntoIterator<Item = Clauses>) -> Clauses {
    let mut result = Vec::new();
    for part in parts {
        if part.iter().any(|c| c.is_empty()) {
            return vec![vec![]];
        }
        result.extend(part);
    }
    result
}

fn distribute(parts: impl IntoIterator<Item = Clauses>) -> Clauses {
    // Start from the single empty clause, the unit of disjunction.
    let mut acc: Clauses = vec![vec![]];
    for part in parts {
        let mut next = Vec::with_capacity(acc.len() * part.len());
        for lhs in &acc {
            for rhs in &part {
                let mut clause = lhs.clone();
                for &lit in rhs {
                    if !clause.contains(&lit) {
                        clause.push(lit);
                    }
                }
                next.push(clause);
            }
        }
        acc = next;
        if acc.is_empty() {
            break;
        }
    }
    acc
}

fn clause_formula(mut lits: Vec<Lit>) -> Formula {
    if lits.len() == 1 {
        Formula::lit(lits.remove(0))
    } else {
        Formula::clause(lits)
    }
}

// Rendering
impl Formula {
    /// Renders the formula, naming atoms with the given function.
    pub fn render(&self, name: impl Fn(AtomId) -> String) -> String {
        let mut out = String::new();
        self.write_to(&mut out, &name).expect("writing to a String cannot fail");
        out
    }

    fn write_to<W: Write + ?Sized>(&self, out: &mut W, name: &dyn Fn(AtomId) -> String) -> fmt::Result {
        match self {
            Formula::Const(true) => write!(out, "True"),
            Formula::Const(false) => write!(out, "False"),
            Formula::Atom(a) => write!(out, "{}", name(*a)),
            Formula::Not(f) => {
                write!(out, "!")?;
                f.write_to(out, name)
            }
            Formula::And(fs) => write_joined(out, fs.iter(), "^", name),
            Formula::Or(fs) => write_joined(out, fs.iter(), "v", name),
            Formula::Implies(a, b) => write_joined(out, [a.as_ref(), b.as_ref()].into_iter(), "=>", name),
            Formula::Iff(a, b) => write_joined(out, [a.as_ref(), b.as_ref()].into_iter(), "<=>", name),
        }
    }
}

fn write_joined<'a, W: Write + ?Sized>(
    out: &mut W,
    fs: impl Iterator<Item = &'a Formula>,
    sep: &str,
    name: &dyn Fn(AtomId) -> String,
) -> fmt::Result {
    write!(out, "(")?;
    for (i, f) in fs.enumerate() {
        if i > 0 {
            write!(out, " {} ", sep)?;
        }
        f.write_to(out, name)?;
    }
    write!(out, ")")
}

impl Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, &|a: AtomId| a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(i: u32) -> Formula {
        Formula::atom(AtomId::new(i))
    }

    /// Checks that `cnf` is equivalent to `f` on every world over `n` atoms.
    fn assert_equivalent(f: &Formula, cnf: &Formula, n: usize) {
        for bits in 0..(1u32 << n) {
            let values: Vec<bool> = (0..n).map(|i| bits & (1 << i) != 0).collect();
            let world = PossibleWorld::from_values(&values);
            assert_eq!(f.eval(&world), cnf.eval(&world), "mismatch on {:?}", world);
        }
    }

    fn is_cnf(f: &Formula) -> bool {
        match f {
            Formula::And(cs) => cs.len() >= 2 && cs.iter().all(|c| c.as_clause().is_some()),
            Formula::Const(_) => true,
            c => c.as_clause().is_some(),
        }
    }

    #[test]
    fn test_literal_is_own_cnf() {
        assert_eq!(a(0).to_cnf(), a(0));
        assert_eq!(Formula::not(a(0)).to_cnf(), Formula::not(a(0)));
        assert_eq!(Formula::not(Formula::not(a(0))).to_cnf(), a(0));
    }

    #[test]
    fn test_constants() {
        assert_eq!(Formula::TRUE.to_cnf(), Formula::TRUE);
        assert_eq!(Formula::not(Formula::TRUE).to_cnf(), Formula::FALSE);
        assert_eq!(Formula::or([a(0), Formula::TRUE]).to_cnf(), Formula::TRUE);
        assert_eq!(Formula::and([a(0), Formula::FALSE]).to_cnf(), Formula::FALSE);
        assert_eq!(Formula::and([a(0), Formula::not(a(0))]).to_cnf().as_clause(), None);
    }

    #[test]
    fn test_implication_is_clause() {
        let f = Formula::implies(a(0), a(1));
        let cnf = f.to_cnf();
        assert_eq!(cnf.as_clause(), Some(vec![AtomId::new(0).neg(), AtomId::new(1).pos()]));
        assert_equivalent(&f, &cnf, 2);
    }

    #[test]
    fn test_distribution() {
        // (a0 ^ a1) v a2 == (a0 v a2) ^ (a1 v a2)
        let f = Formula::or([Formula::and([a(0), a(1)]), a(2)]);
        let cnf = f.to_cnf();
        match &cnf {
            Formula::And(cs) => assert_eq!(cs.len(), 2),
            other => panic!("expected conjunction, got {}", other),
        }
        assert_equivalent(&f, &cnf, 3);
    }

    #[test]
    fn test_random_shapes_equivalent() {
        let formulas = [
            Formula::iff(a(0), Formula::and([a(1), Formula::not(a(2))])),
            Formula::not(Formula::implies(Formula::or([a(0), a(1)]), a(2))),
            Formula::not(Formula::iff(a(0), a(1))),
            Formula::or([Formula::and([a(0), a(1)]), Formula::and([a(2), a(3)])]),
            Formula::and([Formula::or([a(0), Formula::FALSE]), Formula::implies(a(3), Formula::TRUE)]),
        ];
        for f in &formulas {
            let cnf = f.to_cnf();
            assert!(is_cnf(&cnf), "{} is not in CNF: {}", f, cnf);
            assert_equivalent(f, &cnf, 4);
        }
    }

    #[test]
    fn test_duplicate_literals_merged() {
        let f = Formula::or([a(0), a(0), a(1)]);
        assert_eq!(f.to_cnf().as_clause().map(|c| c.len()), Some(2));
    }

    #[test]
    fn test_atoms() {
        let f = Formula::implies(a(3), Formula::or([a(1), Formula::not(a(3))]));
        let atoms: Vec<u32> = f.atoms().into_iter().map(AtomId::id).collect();
        assert_eq!(atoms, vec![1, 3]);
    }

    #[test]
    fn test_display() {
        let f = Formula::implies(a(0), Formula::or([Formula::not(a(1)), a(2)]));
        assert_eq!(f.to_string(), "(a0 => (!a1 v a2))");
        assert_eq!(f.render(|x| format!("p{}", x.id())), "(p0 => (!p1 v p2))");
    }
}
