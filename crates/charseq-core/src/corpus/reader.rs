//! Line-driven sentence assembly for two-column `token tag` files.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use super::{Corpus, Tables};
use crate::bio::{BioTag, Boundary, TagShapeError};
use crate::config::MalformedLinePolicy;
use crate::context::normalize;
use crate::corpus::instance::{Annotation, Instance};
use crate::error::{CorpusError, Result};
use crate::symtab::SymbolId;

/// Totals of one read pass.
///
/// Token and annotation counts cover every sentence in the file, emitted or
/// not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub sentences: usize,
    pub emitted: usize,
    pub tokens: usize,
    pub tagged: usize,
    pub full: usize,
    pub semi: usize,
    pub none: usize,
    /// Characters replaced by the unknown symbol.
    pub unknown_chars: usize,
    /// Labels replaced by the other tag.
    pub unknown_tags: usize,
    /// Distinct character symbols seen.
    pub unique_symbols: usize,
    /// Lines ignored under [`MalformedLinePolicy::Skip`].
    pub skipped_lines: usize,
}

/// Sentence being accumulated.
struct SentenceBuilder {
    instance: Instance,
    tokens: usize,
    tagged: usize,
}

impl SentenceBuilder {
    fn new(begin: SymbolId) -> Self {
        Self {
            instance: Instance {
                chars: vec![begin],
                ..Instance::default()
            },
            tokens: 0,
            tagged: 0,
        }
    }
}

/// Per-pass state threaded through the line handlers.
struct Pass<'a> {
    filter: Option<&'a BTreeSet<usize>>,
    stats: ReadStats,
    unique: HashSet<SymbolId>,
    index: usize,
    out: Vec<Instance>,
}

impl Pass<'_> {
    /// Whether the current sentence is emitted.
    fn keeps_current(&self) -> bool {
        self.filter.is_none_or(|f| f.contains(&self.index))
    }
}

impl Corpus {
    /// Read every sentence of `path`.
    pub fn read<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<Instance>> {
        self.read_filtered(path, None)
    }

    /// Read `path`, keeping only sentences whose 0-based index is in
    /// `include`. `None` keeps everything.
    ///
    /// Excluded sentences are still validated and counted but never touch
    /// the tables or the context map.
    pub fn read_filtered<P: AsRef<Path>>(
        &mut self,
        path: P,
        include: Option<&BTreeSet<usize>>,
    ) -> Result<Vec<Instance>> {
        let path = path.as_ref();
        info!(?path, filter = include.map(BTreeSet::len), "reading corpus");
        self.read_from(open(path)?, include)
    }

    /// Read the training sentences of `path`, freeze the tables, then read the
    /// test sentences with the frozen tables.
    ///
    /// Characters and labels that only occur in test sentences do not grow
    /// the tables; they resolve to the unknown symbol and the other tag. The
    /// test pass registers nothing in the vocabulary or the context map.
    pub fn read_split<P: AsRef<Path>>(
        &mut self,
        path: P,
        train: &BTreeSet<usize>,
        test: &BTreeSet<usize>,
    ) -> Result<(Vec<Instance>, Vec<Instance>)> {
        let path = path.as_ref();
        let train = self.read_filtered(path, Some(train))?;
        self.freeze();
        let test = self.read_filtered(path, Some(test))?;
        Ok((train, test))
    }

    /// Read sentences from any buffered source.
    pub fn read_from<R: BufRead>(
        &mut self,
        reader: R,
        include: Option<&BTreeSet<usize>>,
    ) -> Result<Vec<Instance>> {
        let mut pass = Pass {
            filter: include,
            stats: ReadStats::default(),
            unique: HashSet::new(),
            index: 0,
            out: Vec::new(),
        };
        let mut sentence = SentenceBuilder::new(self.begin);
        let mut line_no = 0;

        for line in reader.lines() {
            let line = line?;
            line_no += 1;

            let mut columns = line.split_whitespace();
            match (columns.next(), columns.next(), columns.next()) {
                (Some(token), Some(tag), None) => {
                    self.push_token(&mut sentence, token, tag, line_no, &mut pass)?;
                }
                (None, ..) => {
                    let done = std::mem::replace(&mut sentence, SentenceBuilder::new(self.begin));
                    self.close_sentence(done, line_no, &mut pass)?;
                }
                _ => {
                    let columns = line.split_whitespace().count();
                    match self.config.malformed_lines {
                        MalformedLinePolicy::Reject => {
                            return Err(CorpusError::MalformedLine {
                                line: line_no,
                                columns,
                                text: line.clone(),
                            });
                        }
                        MalformedLinePolicy::Skip => {
                            warn!(line = line_no, columns, text = %line, "skipping malformed line");
                            pass.stats.skipped_lines += 1;
                        }
                    }
                }
            }
        }
        if sentence.tokens > 0 {
            self.close_sentence(sentence, line_no + 1, &mut pass)?;
        }

        let mut stats = pass.stats;
        stats.unique_symbols = pass.unique.len();
        info!(
            sentences = stats.sentences,
            emitted = stats.emitted,
            tokens = stats.tokens,
            tagged = stats.tagged,
            "read corpus"
        );
        info!(
            full = stats.full,
            semi = stats.semi,
            none = stats.none,
            unknown_chars = stats.unknown_chars,
            unknown_tags = stats.unknown_tags,
            unique_symbols = stats.unique_symbols,
            "annotation summary"
        );
        self.last_read = Some(stats);
        Ok(pass.out)
    }

    /// Count the sentences in `path` without encoding anything.
    pub fn count_sentences<P: AsRef<Path>>(path: P) -> Result<usize> {
        Self::count_sentences_from(open(path.as_ref())?)
    }

    /// Count the sentences in a buffered source: blank lines that close at
    /// least one token line, plus a trailing unterminated sentence.
    pub fn count_sentences_from<R: BufRead>(reader: R) -> Result<usize> {
        let mut count = 0;
        let mut in_sentence = false;
        for line in reader.lines() {
            let line = line?;
            match line.split_whitespace().count() {
                0 if in_sentence => {
                    count += 1;
                    in_sentence = false;
                }
                2 => in_sentence = true,
                _ => {}
            }
        }
        Ok(count + usize::from(in_sentence))
    }

    fn push_token(
        &mut self,
        sentence: &mut SentenceBuilder,
        token: &str,
        tag: &str,
        line: usize,
        pass: &mut Pass<'_>,
    ) -> Result<()> {
        let keep = pass.keeps_current();
        let instance = &mut sentence.instance;
        let first = instance.words.is_empty();

        if tag == self.config.latent_tag {
            instance.open_phrase(self.other_tag, false);
        } else {
            let bio = BioTag::parse(tag, &self.config.other_tag).map_err(|e| match e {
                TagShapeError::Malformed => CorpusError::MalformedTag {
                    line,
                    tag: tag.to_string(),
                },
                TagShapeError::NotOther => CorpusError::UnexpectedTag {
                    line,
                    tag: tag.to_string(),
                    other: self.config.other_tag.clone(),
                },
            })?;
            match bio.boundary {
                Boundary::Begin => {
                    let id = if keep {
                        self.resolve_tag(bio.label, &mut pass.stats)
                    } else {
                        self.other_tag
                    };
                    instance.open_phrase(id, true);
                }
                Boundary::Inside => {
                    if instance.observed.last() != Some(&true) || !instance.extend_phrase() {
                        return Err(CorpusError::DanglingContinuation {
                            line,
                            tag: tag.to_string(),
                        });
                    }
                }
            }
            sentence.tagged += 1;
            pass.stats.tagged += 1;
        }
        sentence.tokens += 1;
        pass.stats.tokens += 1;

        if !keep {
            return Ok(());
        }
        if !first {
            instance.chars.push(self.space);
        }

        let encoder = self.encoder();
        let (encoded, growing) = match &mut self.tables {
            Tables::Growing { symbols, .. } => (encoder.encode(token, symbols), true),
            Tables::Frozen { symbols, .. } => {
                let mut alphabet = &*symbols;
                (encoder.encode(token, &mut alphabet), false)
            }
        };
        pass.stats.unknown_chars += encoded.unknown;
        pass.unique.extend(encoded.chars().iter().copied());
        instance.chars.extend_from_slice(encoded.chars());

        // Frozen passes resolve contexts through `word_context_id` only.
        if growing {
            if let Some(vocab) = self.vocab.growing_mut() {
                let rule = self.config.numeral_rule;
                self.context_map
                    .get_or_insert_with(&encoded.word, || vocab.get_or_add(&normalize(token, rule)));
            }
        }

        instance.words.push(encoded.word);
        Ok(())
    }

    fn resolve_tag(&mut self, label: &str, stats: &mut ReadStats) -> SymbolId {
        let other = self.other_tag;
        match &mut self.tables {
            Tables::Growing { tags, .. } => tags.get_or_add(label),
            Tables::Frozen { tags, .. } => tags.lookup(label).unwrap_or_else(|| {
                stats.unknown_tags += 1;
                other
            }),
        }
    }

    fn close_sentence(
        &self,
        sentence: SentenceBuilder,
        line: usize,
        pass: &mut Pass<'_>,
    ) -> Result<()> {
        let SentenceBuilder {
            mut instance,
            tokens,
            tagged,
        } = sentence;

        if instance.tags.is_empty() {
            return Err(CorpusError::EmptySentence { line });
        }
        instance.chars.push(self.end);
        instance.words.push(self.end_word());

        let phrase_tokens: usize = instance.lens.iter().sum();
        if phrase_tokens != tokens || instance.lens.contains(&0) {
            return Err(CorpusError::PhraseLengthMismatch {
                line,
                phrase_tokens,
                tokens,
            });
        }

        instance.annotation = Annotation::classify(tagged, tokens);
        match instance.annotation {
            Annotation::Full => pass.stats.full += 1,
            Annotation::Semi => pass.stats.semi += 1,
            Annotation::None => pass.stats.none += 1,
        }
        pass.stats.sentences += 1;

        if pass.keeps_current() {
            pass.out.push(instance);
            pass.stats.emitted += 1;
        }
        pass.index += 1;
        Ok(())
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })
}
