//! # BIO Tag Decomposition
//!
//! Splits raw column tags into a boundary type and an entity label.
//! `B-PER` opens a phrase, `I-PER` continues one, and the bare "other" label
//! is read as a phrase-opening tag of its own.

use std::fmt;

/// Separator between boundary type and label.
pub const TAG_SEPARATOR: char = '-';

/// Position of a token within its phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// First token of a phrase.
    Begin,
    /// Continuation of the current phrase.
    Inside,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Begin => write!(f, "B"),
            Boundary::Inside => write!(f, "I"),
        }
    }
}

/// A decomposed tag borrowing its label from the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BioTag<'a> {
    pub boundary: Boundary,
    pub label: &'a str,
}

/// Reasons a raw tag cannot be decomposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagShapeError {
    /// Wrong number of parts, unknown boundary type, or empty label.
    Malformed,
    /// No separator, and not the "other" label.
    NotOther,
}

impl<'a> BioTag<'a> {
    /// Decompose `raw` given the configured "other" label.
    ///
    /// # Examples
    /// ```
    /// use charseq_core::bio::{BioTag, Boundary};
    ///
    /// let tag = BioTag::parse("I-LOC", "O").unwrap();
    /// assert_eq!(tag.boundary, Boundary::Inside);
    /// assert_eq!(tag.label, "LOC");
    ///
    /// let other = BioTag::parse("O", "O").unwrap();
    /// assert_eq!(other.boundary, Boundary::Begin);
    /// ```
    pub fn parse(raw: &'a str, other: &str) -> Result<Self, TagShapeError> {
        let Some((kind, label)) = raw.split_once(TAG_SEPARATOR) else {
            if raw == other {
                return Ok(Self {
                    boundary: Boundary::Begin,
                    label: raw,
                });
            }
            return Err(TagShapeError::NotOther);
        };

        if label.is_empty() || label.contains(TAG_SEPARATOR) {
            return Err(TagShapeError::Malformed);
        }
        let boundary = match kind {
            "B" => Boundary::Begin,
            "I" => Boundary::Inside,
            _ => return Err(TagShapeError::Malformed),
        };
        Ok(Self { boundary, label })
    }

    /// Whether this tag opens a new phrase.
    pub fn is_begin(&self) -> bool {
        self.boundary == Boundary::Begin
    }
}

impl fmt::Display for BioTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.boundary, TAG_SEPARATOR, self.label)
    }
}
