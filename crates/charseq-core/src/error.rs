use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a [`CorpusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input could not be opened or read.
    Io,
    /// The input is malformed; the caller may choose to skip or fix it.
    Format,
    /// An internal bookkeeping invariant broke. Never caused by well-formed data.
    Invariant,
}

/// Errors that can occur while reading or encoding a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The corpus file could not be opened or read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file could not be created or written.
    #[error("failed to write {path:?}: {source}")]
    Write {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from an already-open stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A non-blank line did not split into exactly a token and a tag.
    #[error("line {line}: expected 2 columns, found {columns}: {text:?}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// Number of whitespace-separated columns found.
        columns: usize,
        /// The raw line.
        text: String,
    },

    /// A tag contained a separator but did not split into a boundary type and a label.
    #[error("line {line}: malformed tag {tag:?}")]
    MalformedTag {
        /// 1-based line number.
        line: usize,
        /// The raw tag.
        tag: String,
    },

    /// A tag without a separator was not the configured "other" label.
    #[error("line {line}: unexpected tag {tag:?} (bare tags must equal {other:?})")]
    UnexpectedTag {
        /// 1-based line number.
        line: usize,
        /// The raw tag.
        tag: String,
        /// The configured "other" label.
        other: String,
    },

    /// An inside tag appeared before any phrase was opened in the sentence.
    #[error("line {line}: continuation tag {tag:?} without an open phrase")]
    DanglingContinuation {
        /// 1-based line number.
        line: usize,
        /// The raw tag.
        tag: String,
    },

    /// The input line passed to inference encoding holds no tokens.
    #[error("input is empty or whitespace-only")]
    EmptyInput,

    /// A sentence boundary closed a sentence with no phrases.
    #[error("line {line}: sentence has no tagged phrases")]
    EmptySentence {
        /// 1-based line number of the boundary.
        line: usize,
    },

    /// Phrase lengths of a closed sentence do not add up to its token count.
    #[error("line {line}: phrase lengths sum to {phrase_tokens}, sentence has {tokens} tokens")]
    PhraseLengthMismatch {
        /// 1-based line number of the boundary.
        line: usize,
        /// Sum of phrase lengths.
        phrase_tokens: usize,
        /// Number of tokens read.
        tokens: usize,
    },

    /// The end marker is one codepoint, so the end-of-sentence word would
    /// collide with the encoding of a real token.
    #[error("end marker {0:?} must span more than one codepoint")]
    AmbiguousEndMarker(String),

    /// A symbol was added twice to a table.
    #[error("symbol {0:?} is already registered")]
    DuplicateSymbol(String),

    /// A symbol ID has no value in its table.
    #[error("unknown symbol id {0}")]
    UnknownSymbolId(usize),

    /// A synthetic context entry was registered twice.
    #[error("synthetic context {0:?} is already registered")]
    DuplicateSyntheticContext(String),

    /// The operation requires frozen symbol tables.
    #[error("symbol tables must be frozen first")]
    NotFrozen,

    /// The operation requires a finalized corpus.
    #[error("corpus has not been finalized")]
    NotFinalized,

    /// The tag has no synthetic context (the "other" tag, or an unknown ID).
    #[error("no synthetic context for tag id {0}")]
    NoTagContext(usize),

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl CorpusError {
    /// Classifies the error as an I/O, input-format, or invariant failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } | Self::Write { .. } | Self::Io(_) | Self::Snapshot(_) => ErrorKind::Io,
            Self::MalformedLine { .. }
            | Self::MalformedTag { .. }
            | Self::UnexpectedTag { .. }
            | Self::DanglingContinuation { .. }
            | Self::AmbiguousEndMarker(_)
            | Self::EmptyInput => ErrorKind::Format,
            Self::EmptySentence { .. }
            | Self::PhraseLengthMismatch { .. }
            | Self::DuplicateSymbol(_)
            | Self::UnknownSymbolId(_)
            | Self::DuplicateSyntheticContext(_)
            | Self::NotFrozen
            | Self::NotFinalized
            | Self::NoTagContext(_) => ErrorKind::Invariant,
        }
    }

    /// Returns `true` for malformed input that a caller may skip.
    pub fn is_format(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;
