//! The universe of ground atoms.
//!
//! Ground atoms are named by their variable names, e.g. `smokes(Anna)`.
//! [`GroundAtoms`] interns those names into dense [`AtomId`]s.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::types::AtomId;
use crate::world::PossibleWorld;

#[derive(Debug, Clone, Default)]
pub struct GroundAtoms {
    names: Vec<String>,
    index: HashMap<String, AtomId>,
}

impl GroundAtoms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the atom, registering it if it is new.
    pub fn intern(&mut self, name: &str) -> AtomId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = AtomId::new(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<AtomId> {
        self.index.get(name).copied()
    }

    /// Looks up an atom that must exist.
    pub fn lookup(&self, name: &str) -> Result<AtomId> {
        self.get(name).ok_or_else(|| Error::UnknownAtom { name: name.to_string() })
    }

    pub fn name(&self, atom: AtomId) -> Option<&str> {
        self.names.get(atom.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (AtomId::new(i as u32), name.as_str()))
    }

    /// A world over this universe with every atom false.
    pub fn world(&self) -> PossibleWorld {
        PossibleWorld::new(self.len())
    }

    /// Turns literal text such as `smokes(Anna)` or `!smokes(Anna)` into a
    /// formula, registering the atom if it is new.
    pub fn parse_literal(&mut self, text: &str) -> Result<Formula> {
        let text = text.trim();
        let (negated, name) = match text.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, text),
        };
        if name.is_empty() {
            return Err(Error::UnknownAtom { name: text.to_string() });
        }
        let atom = Formula::atom(self.intern(name));
        Ok(if negated { Formula::not(atom) } else { atom })
    }

    /// Renders a formula with atom names instead of ids.
    pub fn render(&self, formula: &Formula) -> String {
        formula.render(|a| match self.name(a) {
            Some(name) => name.to_string(),
            None => a.to_string(),
        })
    }
}
