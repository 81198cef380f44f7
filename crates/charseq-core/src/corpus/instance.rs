use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::EncodedWord;
use crate::symtab::SymbolId;

/// How much of a sentence carries ground-truth tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Annotation {
    /// Every token is tagged.
    Full,
    /// Some, but not all, tokens are tagged.
    Semi,
    /// No token is tagged.
    #[default]
    None,
}

impl Annotation {
    /// Classify a sentence from its tagged and total token counts.
    ///
    /// # Examples
    /// ```
    /// use charseq_core::Annotation;
    ///
    /// assert_eq!(Annotation::classify(3, 3), Annotation::Full);
    /// assert_eq!(Annotation::classify(2, 3), Annotation::Semi);
    /// assert_eq!(Annotation::classify(0, 3), Annotation::None);
    /// ```
    pub fn classify(tagged: usize, total: usize) -> Self {
        if tagged == 0 {
            Self::None
        } else if tagged == total {
            Self::Full
        } else {
            Self::Semi
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Semi => write!(f, "SEMI"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// One phrase of an [`Instance`], with its token span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phrase {
    pub tag: SymbolId,
    pub len: usize,
    /// Index of the first token.
    pub start: usize,
    /// `false` for placeholders standing in for latent tokens.
    pub observed: bool,
}

/// An encoded sentence.
///
/// `tags`, `lens` and `observed` run in parallel, one entry per phrase.
/// Phrase lengths add up to the token count; `words` holds one entry per
/// token plus the closing end-of-sentence word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub chars: Vec<SymbolId>,
    pub words: Vec<EncodedWord>,
    pub tags: Vec<SymbolId>,
    pub lens: Vec<usize>,
    pub observed: Vec<bool>,
    pub annotation: Annotation,
}

impl Instance {
    /// Number of tokens, excluding the end-of-sentence word.
    pub fn token_count(&self) -> usize {
        self.words.len().saturating_sub(1)
    }

    /// Number of tokens covered by observed phrases.
    pub fn tagged_count(&self) -> usize {
        self.phrases().filter(|p| p.observed).map(|p| p.len).sum()
    }

    /// Phrases in sentence order.
    pub fn phrases(&self) -> impl Iterator<Item = Phrase> + '_ {
        let mut start = 0;
        self.tags
            .iter()
            .zip(&self.lens)
            .zip(&self.observed)
            .map(move |((&tag, &len), &observed)| {
                let phrase = Phrase {
                    tag,
                    len,
                    start,
                    observed,
                };
                start += len;
                phrase
            })
    }

    /// Observed phrases whose tag is not `other`.
    pub fn entity_phrases(&self, other: SymbolId) -> impl Iterator<Item = Phrase> + '_ {
        self.phrases().filter(move |p| p.observed && p.tag != other)
    }

    /// Encoded words of a phrase.
    pub fn phrase_words(&self, phrase: &Phrase) -> &[EncodedWord] {
        &self.words[phrase.start..phrase.start + phrase.len]
    }

    pub(crate) fn open_phrase(&mut self, tag: SymbolId, observed: bool) {
        self.tags.push(tag);
        self.lens.push(1);
        self.observed.push(observed);
    }

    /// Extend the last phrase by one token; `false` if there is none.
    pub(crate) fn extend_phrase(&mut self) -> bool {
        match self.lens.last_mut() {
            Some(len) => {
                *len += 1;
                true
            }
            None => false,
        }
    }
}
