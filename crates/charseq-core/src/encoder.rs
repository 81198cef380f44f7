//! # Word Encoder
//!
//! Turns tokens into bracketed sequences of character symbols:
//! `[begin, sym(c1), ..., sym(cn), end]`.

use crate::symtab::{Alphabet, SymbolId};

/// Symbol sequence for one word, markers included.
pub type EncodedWord = Vec<SymbolId>;

/// Split `token` into single-codepoint string slices.
///
/// # Examples
/// ```
/// use charseq_core::encoder::codepoints;
///
/// let chars: Vec<_> = codepoints("naïve").collect();
/// assert_eq!(chars, vec!["n", "a", "ï", "v", "e"]);
/// ```
pub fn codepoints(token: &str) -> impl Iterator<Item = &str> {
    token
        .char_indices()
        .map(move |(start, c)| &token[start..start + c.len_utf8()])
}

/// An encoded token plus the number of characters that fell back to the
/// unknown symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub word: EncodedWord,
    pub unknown: usize,
}

impl Encoded {
    /// Character symbols without the surrounding markers.
    pub fn chars(&self) -> &[SymbolId] {
        &self.word[1..self.word.len() - 1]
    }
}

/// Encodes tokens against an [`Alphabet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordEncoder {
    begin: SymbolId,
    end: SymbolId,
    unknown: SymbolId,
}

impl WordEncoder {
    /// Create an encoder with the given marker and sentinel symbols.
    pub fn new(begin: SymbolId, end: SymbolId, unknown: SymbolId) -> Self {
        Self {
            begin,
            end,
            unknown,
        }
    }

    /// Encode `token`. Growing alphabets register new characters; frozen ones
    /// substitute the unknown symbol and count the substitution.
    pub fn encode<A: Alphabet>(&self, token: &str, alphabet: &mut A) -> Encoded {
        let mut word = Vec::with_capacity(token.len() + 2);
        let mut unknown = 0;
        word.push(self.begin);
        for c in codepoints(token) {
            let sym = alphabet.symbol(c).unwrap_or_else(|| {
                unknown += 1;
                self.unknown
            });
            word.push(sym);
        }
        word.push(self.end);
        Encoded { word, unknown }
    }
}
