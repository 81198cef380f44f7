//! # Charseq Core
//!
//! Encodes two-column (`token tag`) BIO corpora for character-level sequence
//! models: per-character symbols, per-phrase tag IDs and lengths, a
//! normalized context vocabulary, and per-sentence annotation completeness.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//! use charseq_core::{Annotation, Corpus, CorpusConfig};
//!
//! let mut corpus = Corpus::new(CorpusConfig::default()).unwrap();
//! let data = "John B-PER\nSmith I-PER\nwent ?\n\n";
//! let instances = corpus.read_from(Cursor::new(data), None).unwrap();
//!
//! assert_eq!(instances[0].lens, vec![2, 1]);
//! assert_eq!(instances[0].annotation, Annotation::Semi);
//!
//! corpus.finalize().unwrap();
//! let line = corpus.encode_line("John went").unwrap();
//! assert_eq!(line.token_count(), 2);
//! ```
pub mod bio;
pub mod config;
pub mod context;
pub mod corpus;
pub mod encoder;
pub mod error;
pub mod symtab;

// Re-export primary API
pub use bio::{BioTag, Boundary};
pub use config::{CorpusConfig, MalformedLinePolicy, NumeralRule};
pub use context::{ContextId, ContextMap};
pub use corpus::{Annotation, Corpus, Instance, Phrase, ReadStats, TagContext};
pub use encoder::{EncodedWord, WordEncoder, codepoints};
pub use error::{CorpusError, ErrorKind, Result};
pub use symtab::{Frozen, Growing, StagedTable, SymbolId, SymbolTable};
