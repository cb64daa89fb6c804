//! Truth assignments over a fixed universe of ground atoms.
//!
//! A [`PossibleWorld`] is a packed bit vector: bit `i` holds the truth value
//! of atom `i`. Unlike a growable bit set, its length is fixed at creation
//! and equals the size of the atom universe.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{AtomId, Lit};

/// A truth assignment to every atom of a universe.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PossibleWorld {
    /// Storage: each u64 holds 64 truth values
    words: Vec<u64>,
    /// Number of atoms in the universe
    len: usize,
}

impl PossibleWorld {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates a world of `len` atoms, all false.
    pub fn new(len: usize) -> Self {
        let num_words = len.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            len,
        }
    }

    /// Creates a world from explicit truth values, atom `i` taking `values[i]`.
    pub fn from_values(values: &[bool]) -> Self {
        let mut world = Self::new(values.len());
        for (i, &value) in values.iter().enumerate() {
            world.set(AtomId::new(i as u32), value);
        }
        world
    }

    /// Number of atoms in the universe.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Returns the truth value of the atom.
    ///
    /// # Panics
    ///
    /// Panics if the atom is outside of the universe.
    #[inline]
    pub fn get(&self, atom: AtomId) -> bool {
        let index = atom.index();
        assert!(index < self.len, "Atom {} is outside of the world of size {}", atom, self.len);
        let (word, bit) = Self::word_and_bit(index);
        (self.words[word] >> bit) & 1 != 0
    }

    /// Sets the truth value of the atom.
    #[inline]
    pub fn set(&mut self, atom: AtomId, value: bool) {
        let index = atom.index();
        assert!(index < self.len, "Atom {} is outside of the world of size {}", atom, self.len);
        let (word, bit) = Self::word_and_bit(index);
        let mask = 1u64 << bit;
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Negates the truth value of the atom, returning the new value.
    #[inline]
    pub fn flip(&mut self, atom: AtomId) -> bool {
        let index = atom.index();
        assert!(index < self.len, "Atom {} is outside of the world of size {}", atom, self.len);
        let (word, bit) = Self::word_and_bit(index);
        self.words[word] ^= 1u64 << bit;
        (self.words[word] >> bit) & 1 != 0
    }

    /// Whether the literal holds in this world.
    #[inline]
    pub fn satisfies(&self, lit: Lit) -> bool {
        lit.holds(self.get(lit.atom()))
    }

    /// Number of true atoms.
    pub fn count_true(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns an iterator over the atoms that are true.
    pub fn true_atoms(&self) -> TrueAtoms<'_> {
        TrueAtoms {
            world: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl fmt::Debug for PossibleWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PossibleWorld(")?;
        for i in 0..self.len {
            let bit = if self.get(AtomId::new(i as u32)) { '1' } else { '0' };
            write!(f, "{}", bit)?;
        }
        write!(f, ")")
    }
}

/// Iterator over the true atoms of a [`PossibleWorld`].
pub struct TrueAtoms<'a> {
    world: &'a PossibleWorld,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for TrueAtoms<'_> {
    type Item = AtomId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1; // Clear lowest set bit
                let index = self.word_idx * PossibleWorld::BITS_PER_WORD + bit_idx;
                return Some(AtomId::new(index as u32));
            }

            self.word_idx += 1;
            if self.word_idx >= self.world.words.len() {
                return None;
            }
            self.current_word = self.world.words[self.word_idx];
        }
    }
}

/// Atoms whose truth values are fixed by observed data.
///
/// Evidence atoms are written into the initial world and are never flipped
/// by local search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    values: BTreeMap<AtomId, bool>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the atom to the value, replacing any earlier observation.
    pub fn set(&mut self, atom: AtomId, value: bool) {
        self.values.insert(atom, value);
    }

    pub fn get(&self, atom: AtomId) -> Option<bool> {
        self.values.get(&atom).copied()
    }

    pub fn contains(&self, atom: AtomId) -> bool {
        self.values.contains_key(&atom)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, bool)> + '_ {
        self.values.iter().map(|(&a, &v)| (a, v))
    }

    /// Writes the observed values into the world.
    pub fn apply(&self, world: &mut PossibleWorld) -> Result<()> {
        for (atom, value) in self.iter() {
            if atom.index() >= world.len() {
                return Err(Error::AtomOutOfUniverse {
                    atom: atom.to_string(),
                    universe: world.len(),
                });
            }
            world.set(atom, value);
        }
        Ok(())
    }
}

impl FromIterator<(AtomId, bool)> for Evidence {
    fn from_iter<I: IntoIterator<Item = (AtomId, bool)>>(iter: I) -> Self {
        Evidence {
            values: iter.into_iter().collect(),
        }
    }
}
