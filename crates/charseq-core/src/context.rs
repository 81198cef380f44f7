//! # Context Map
//!
//! Assigns every distinct encoded word a context ID from a normalized-word
//! vocabulary. Each encoding is allocated once and shared between the
//! registration-order list and the lookup index; lookups borrow the caller's
//! slice, so re-registering a known word neither copies nor allocates.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::NumeralRule;
use crate::symtab::SymbolId;

/// ID in the normalized-word vocabulary.
pub type ContextId = usize;

/// Vocabulary key shared by every numeral.
pub const NUMERAL_KEY: &str = "<NUM>";

/// Vocabulary key of the sentence-boundary context.
pub const BOUNDARY_KEY: &str = "<BOS>";

/// Vocabulary key for encodings that were never registered.
pub const UNKNOWN_KEY: &str = "<UNK>";

/// Padding symbol of synthetic context keys.
pub const SYNTHETIC_PAD: SymbolId = 0;

/// Handle of an interned encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordHandle(usize);

/// Synthetic encoding `[0, id, 0]` for a tag or the sentence boundary.
pub fn synthetic_key(id: SymbolId) -> Vec<SymbolId> {
    vec![SYNTHETIC_PAD, id, SYNTHETIC_PAD]
}

/// Vocabulary key for a raw token: the numeral marker, or the token
/// upper-cased.
///
/// Case folding is full Unicode uppercasing, not per-byte ASCII, so the key
/// may be longer than the token (`straße` becomes `STRASSE`).
///
/// # Examples
/// ```
/// use charseq_core::config::NumeralRule;
/// use charseq_core::context::normalize;
///
/// assert_eq!(normalize("Paris", NumeralRule::Digits), "PARIS");
/// assert_eq!(normalize("2020", NumeralRule::Digits), "<NUM>");
/// assert_eq!(normalize("2,020", NumeralRule::Digits), "2,020");
/// ```
pub fn normalize(token: &str, rule: NumeralRule) -> String {
    if rule.is_numeral(token) {
        NUMERAL_KEY.to_string()
    } else {
        token.to_uppercase()
    }
}

/// Append-only map from encoded word to context ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextMap {
    words: Vec<Arc<[SymbolId]>>,
    contexts: Vec<ContextId>,
    handles: HashMap<Arc<[SymbolId]>, WordHandle>,
}

impl ContextMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered encodings.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Handle of an interned encoding.
    pub fn handle(&self, word: &[SymbolId]) -> Option<WordHandle> {
        self.handles.get(word).copied()
    }

    /// Whether `word` is registered.
    pub fn contains(&self, word: &[SymbolId]) -> bool {
        self.handles.contains_key(word)
    }

    /// Context ID of `word`, if registered.
    pub fn get(&self, word: &[SymbolId]) -> Option<ContextId> {
        self.handle(word).map(|h| self.contexts[h.0])
    }

    /// Context ID behind a handle.
    pub fn context(&self, handle: WordHandle) -> ContextId {
        self.contexts[handle.0]
    }

    /// Encoding behind a handle.
    pub fn word(&self, handle: WordHandle) -> &[SymbolId] {
        &self.words[handle.0]
    }

    /// Register `word`, computing its context only if it is new. The first
    /// registration of an encoding wins.
    pub fn get_or_insert_with<F>(&mut self, word: &[SymbolId], context: F) -> WordHandle
    where
        F: FnOnce() -> ContextId,
    {
        if let Some(handle) = self.handle(word) {
            return handle;
        }
        self.push(word.into(), context())
    }

    /// Register a new encoding; `None` if it is already present.
    pub fn insert_new(&mut self, word: &[SymbolId], context: ContextId) -> Option<WordHandle> {
        if self.contains(word) {
            return None;
        }
        Some(self.push(word.into(), context))
    }

    fn push(&mut self, word: Arc<[SymbolId]>, context: ContextId) -> WordHandle {
        let handle = WordHandle(self.words.len());
        self.handles.insert(Arc::clone(&word), handle);
        self.words.push(word);
        self.contexts.push(context);
        handle
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&[SymbolId], ContextId)> {
        self.words
            .iter()
            .map(|w| &w[..])
            .zip(self.contexts.iter().copied())
    }
}

impl Serialize for ContextMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ContextMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(Vec<SymbolId>, ContextId)>::deserialize(deserializer)?;
        let mut map = ContextMap::new();
        for (word, context) in entries {
            if map.insert_new(&word, context).is_none() {
                return Err(D::Error::custom(format!("duplicate context key {word:?}")));
            }
        }
        Ok(map)
    }
}
