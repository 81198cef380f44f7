//! # Corpus Configuration
//!
//! Sentinel strings and input-handling policies fixed at corpus construction.

use serde::{Deserialize, Serialize};

/// How the context vocabulary recognizes numerals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumeralRule {
    /// Non-empty strings of ASCII decimal digits only. `"2020"` is a numeral,
    /// `"2,020"` and `"-3"` are not.
    #[default]
    Digits,
    /// Anything that parses as a floating-point value once commas are read as
    /// decimal points (`"3,14"`, `"-2.5"`, `"1e6"`). Must contain a digit, so
    /// `"inf"` and `"NaN"` stay words.
    Locale,
}

impl NumeralRule {
    /// Whether `token` collapses to the numeral context key.
    pub fn is_numeral(self, token: &str) -> bool {
        match self {
            Self::Digits => !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()),
            Self::Locale => {
                token.bytes().any(|b| b.is_ascii_digit())
                    && token.replace(',', ".").parse::<f64>().is_ok()
            }
        }
    }
}

/// What to do with a non-blank line that is not a token/tag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MalformedLinePolicy {
    /// Abort the read with a format error.
    #[default]
    Reject,
    /// Log a warning and ignore the line.
    Skip,
}

/// Seed strings and policies for a [`Corpus`](crate::Corpus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Begin-of-word / begin-of-sentence marker.
    pub begin: String,
    /// End-of-word / end-of-sentence marker.
    pub end: String,
    /// Separator symbol placed between words in the character stream.
    pub space: String,
    /// Substitute for characters unseen once the tables are frozen.
    pub unknown: String,
    /// Label of the non-entity tag.
    pub other_tag: String,
    /// Tag value marking a token as untagged (latent).
    pub latent_tag: String,
    /// Numeral detection for context keys.
    pub numeral_rule: NumeralRule,
    /// Handling of malformed lines.
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            begin: "<s>".into(),
            end: "</s>".into(),
            space: " ".into(),
            unknown: "<unk>".into(),
            other_tag: "O".into(),
            latent_tag: "?".into(),
            numeral_rule: NumeralRule::Digits,
            malformed_lines: MalformedLinePolicy::Reject,
        }
    }
}

impl CorpusConfig {
    /// Create a configuration with default sentinels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the begin, end, space and unknown symbols.
    pub fn with_markers(
        mut self,
        begin: impl Into<String>,
        end: impl Into<String>,
        space: impl Into<String>,
        unknown: impl Into<String>,
    ) -> Self {
        self.begin = begin.into();
        self.end = end.into();
        self.space = space.into();
        self.unknown = unknown.into();
        self
    }

    /// Set the non-entity tag label.
    pub fn with_other_tag(mut self, label: impl Into<String>) -> Self {
        self.other_tag = label.into();
        self
    }

    /// Set the latent tag marker.
    pub fn with_latent_tag(mut self, marker: impl Into<String>) -> Self {
        self.latent_tag = marker.into();
        self
    }

    /// Set the numeral detection rule.
    pub fn with_numeral_rule(mut self, rule: NumeralRule) -> Self {
        self.numeral_rule = rule;
        self
    }

    /// Set the malformed-line policy.
    pub fn with_malformed_lines(mut self, policy: MalformedLinePolicy) -> Self {
        self.malformed_lines = policy;
        self
    }
}
