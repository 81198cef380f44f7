//! # Symbol Tables
//!
//! Bidirectional string ↔ ID maps with a one-way freeze. The state is part of
//! the type: a [`SymbolTable<Growing>`] can create entries, a
//! [`SymbolTable<Frozen>`] can only resolve them.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CorpusError, Result};

/// Integer ID assigned by a [`SymbolTable`].
pub type SymbolId = usize;

/// Marker for tables that still accept new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growing {}

/// Marker for tables that no longer accept new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frozen {}

/// Insertion-ordered bijection between strings and dense IDs.
pub struct SymbolTable<S = Growing> {
    values: Vec<String>,
    index: HashMap<String, SymbolId>,
    state: PhantomData<S>,
}

impl<S> SymbolTable<S> {
    fn from_values(values: Vec<String>) -> std::result::Result<Self, String> {
        let mut index = HashMap::with_capacity(values.len());
        for (id, value) in values.iter().enumerate() {
            if index.insert(value.clone(), id).is_some() {
                return Err(value.clone());
            }
        }
        Ok(Self {
            values,
            index,
            state: PhantomData,
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// ID of `value`, if registered.
    pub fn lookup(&self, value: &str) -> Option<SymbolId> {
        self.index.get(value).copied()
    }

    /// Whether `value` is registered.
    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    /// String registered under `id`.
    pub fn value_of(&self, id: SymbolId) -> Result<&str> {
        self.values
            .get(id)
            .map(String::as_str)
            .ok_or(CorpusError::UnknownSymbolId(id))
    }

    /// Entries in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.values.iter().map(String::as_str).enumerate()
    }
}

impl SymbolTable<Growing> {
    /// Create an empty, growing table.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            index: HashMap::new(),
            state: PhantomData,
        }
    }

    /// Register a value that must not already be present.
    pub fn add(&mut self, value: &str) -> Result<SymbolId> {
        if self.contains(value) {
            return Err(CorpusError::DuplicateSymbol(value.to_string()));
        }
        Ok(self.insert(value))
    }

    /// ID of `value`, registering it first if absent.
    pub fn get_or_add(&mut self, value: &str) -> SymbolId {
        match self.lookup(value) {
            Some(id) => id,
            None => self.insert(value),
        }
    }

    fn insert(&mut self, value: &str) -> SymbolId {
        let id = self.values.len();
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), id);
        id
    }

    /// Stop accepting new entries. IDs are preserved.
    pub fn freeze(self) -> SymbolTable<Frozen> {
        SymbolTable {
            values: self.values,
            index: self.index,
            state: PhantomData,
        }
    }
}

impl SymbolTable<Frozen> {
    /// ID of `value`, or `fallback` when it was never registered.
    pub fn resolve_or(&self, value: &str, fallback: SymbolId) -> SymbolId {
        self.lookup(value).unwrap_or(fallback)
    }
}

impl Default for SymbolTable<Growing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for SymbolTable<S> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            index: self.index.clone(),
            state: PhantomData,
        }
    }
}

impl<S> fmt::Debug for SymbolTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("state", &std::any::type_name::<S>())
            .field("values", &self.values)
            .finish()
    }
}

impl<S> PartialEq for SymbolTable<S> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<S> Serialize for SymbolTable<S> {
    fn serialize<Se: Serializer>(&self, serializer: Se) -> std::result::Result<Se::Ok, Se::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de, S> Deserialize<'de> for SymbolTable<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<String>::deserialize(deserializer)?;
        Self::from_values(values)
            .map_err(|dup| D::Error::custom(format!("duplicate symbol {dup:?}")))
    }
}

/// Something that maps single-codepoint strings to symbols.
///
/// A growing table always answers; a frozen one answers `None` for unseen
/// values so the caller can substitute a sentinel.
pub trait Alphabet {
    /// Symbol for `value`, creating it when the table can grow.
    fn symbol(&mut self, value: &str) -> Option<SymbolId>;
}

impl Alphabet for SymbolTable<Growing> {
    fn symbol(&mut self, value: &str) -> Option<SymbolId> {
        Some(self.get_or_add(value))
    }
}

impl Alphabet for &SymbolTable<Frozen> {
    fn symbol(&mut self, value: &str) -> Option<SymbolId> {
        self.lookup(value)
    }
}

/// A table whose state is decided at run time.
///
/// Owners that freeze at a point only known while running (after the last
/// training read, say) hold one of these and pick the typed table back out
/// when they need to grow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "values", rename_all = "lowercase")]
pub enum StagedTable {
    Growing(SymbolTable<Growing>),
    Frozen(SymbolTable<Frozen>),
}

impl StagedTable {
    pub fn len(&self) -> usize {
        match self {
            Self::Growing(t) => t.len(),
            Self::Frozen(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(&self, value: &str) -> Option<SymbolId> {
        match self {
            Self::Growing(t) => t.lookup(value),
            Self::Frozen(t) => t.lookup(value),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.lookup(value).is_some()
    }

    pub fn value_of(&self, id: SymbolId) -> Result<&str> {
        match self {
            Self::Growing(t) => t.value_of(id),
            Self::Frozen(t) => t.value_of(id),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }

    /// The growing table, or `None` once frozen.
    pub fn growing_mut(&mut self) -> Option<&mut SymbolTable<Growing>> {
        match self {
            Self::Growing(t) => Some(t),
            Self::Frozen(_) => None,
        }
    }

    /// Freeze in place. No-op when already frozen.
    pub fn freeze(&mut self) {
        if let Self::Growing(t) = self {
            let table = std::mem::take(t);
            *self = Self::Frozen(table.freeze());
        }
    }
}

impl From<SymbolTable<Growing>> for StagedTable {
    fn from(table: SymbolTable<Growing>) -> Self {
        Self::Growing(table)
    }
}
