//! Type-safe wrappers for ground atoms and signed literals.
//!
//! Atoms are identified by dense 0-based indices into the universe of ground
//! atoms, so they can address packed truth assignments directly. A literal
//! pairs an atom with a polarity.
use std::fmt;
use std::ops::Neg;

/// A ground atom identifier (0-indexed).
///
/// # Invariants
///
/// - Atom IDs are dense: a universe of `n` atoms uses IDs `0..n`
/// - Atom IDs are stable for the lifetime of the universe that issued them
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AtomId(u32);

impl AtomId {
    /// Creates an atom identifier from a raw index.
    pub const fn new(index: u32) -> Self {
        AtomId(index)
    }

    /// Returns the raw atom index as a `usize`.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw atom ID as a `u32`.
    pub const fn id(self) -> u32 {
        self.0
    }

    /// The positive literal of this atom.
    pub const fn pos(self) -> Lit {
        Lit::new(self, true)
    }

    /// The negative literal of this atom.
    pub const fn neg(self) -> Lit {
        Lit::new(self, false)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl From<AtomId> for usize {
    fn from(atom: AtomId) -> Self {
        atom.index()
    }
}

/// A signed atom: the atom itself (positive) or its negation.
///
/// Ordering is by atom first, then positive before negative, so sorted
/// clauses place both polarities of an atom next to each other.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit {
    atom: AtomId,
    negated: bool,
}

impl Lit {
    pub const fn new(atom: AtomId, positive: bool) -> Self {
        Lit { atom, negated: !positive }
    }

    pub const fn atom(self) -> AtomId {
        self.atom
    }

    pub const fn is_positive(self) -> bool {
        !self.negated
    }

    pub const fn is_negated(self) -> bool {
        self.negated
    }

    /// Returns the negation of this literal.
    pub const fn negate(self) -> Self {
        Lit {
            atom: self.atom,
            negated: !self.negated,
        }
    }

    /// Whether the literal holds when its atom has the given truth value.
    pub const fn holds(self, value: bool) -> bool {
        value != self.negated
    }

    /// Signed 1-based integer (DIMACS convention).
    pub fn to_dimacs(self) -> i64 {
        let v = self.atom.id() as i64 + 1;
        if self.negated {
            -v
        } else {
            v
        }
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}", self.atom)
    }
}
