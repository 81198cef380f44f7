//! # Corpus
//!
//! Owns the character, tag and vocabulary tables, the context map, and the
//! synthetic tag/boundary contexts. The lifecycle is strictly ordered:
//!
//! 1. construct with seed sentinels,
//! 2. read training data (tables grow),
//! 3. [`Corpus::finalize`] (tables freeze, synthetic contexts are added),
//! 4. encode inference input through `&self` only.
//!
//! A finalized corpus is never mutated by inference and may be shared across
//! threads.

mod instance;
mod reader;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CorpusConfig;
use crate::context::{BOUNDARY_KEY, ContextId, ContextMap, UNKNOWN_KEY, synthetic_key};
use crate::encoder::{EncodedWord, WordEncoder, codepoints};
use crate::error::{CorpusError, Result};
use crate::symtab::{Frozen, Growing, StagedTable, SymbolId, SymbolTable};

pub use instance::{Annotation, Instance, Phrase};
pub use reader::ReadStats;

/// Character and tag tables, frozen together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
enum Tables {
    Growing {
        symbols: SymbolTable<Growing>,
        tags: SymbolTable<Growing>,
    },
    Frozen {
        symbols: SymbolTable<Frozen>,
        tags: SymbolTable<Frozen>,
    },
}

impl Tables {
    fn freeze(&mut self) {
        let taken = std::mem::replace(
            self,
            Tables::Growing {
                symbols: SymbolTable::new(),
                tags: SymbolTable::new(),
            },
        );
        *self = match taken {
            Tables::Growing { symbols, tags } => Tables::Frozen {
                symbols: symbols.freeze(),
                tags: tags.freeze(),
            },
            frozen => frozen,
        };
    }

    fn symbol_value(&self, id: SymbolId) -> Result<&str> {
        match self {
            Tables::Growing { symbols, .. } => symbols.value_of(id),
            Tables::Frozen { symbols, .. } => symbols.value_of(id),
        }
    }

    fn tag_value(&self, id: SymbolId) -> Result<&str> {
        match self {
            Tables::Growing { tags, .. } => tags.value_of(id),
            Tables::Frozen { tags, .. } => tags.value_of(id),
        }
    }

    fn tag_lookup(&self, label: &str) -> Option<SymbolId> {
        match self {
            Tables::Growing { tags, .. } => tags.lookup(label),
            Tables::Frozen { tags, .. } => tags.lookup(label),
        }
    }

    fn symbol_count(&self) -> usize {
        match self {
            Tables::Growing { symbols, .. } => symbols.len(),
            Tables::Frozen { symbols, .. } => symbols.len(),
        }
    }

    fn tag_count(&self) -> usize {
        match self {
            Tables::Growing { tags, .. } => tags.len(),
            Tables::Frozen { tags, .. } => tags.len(),
        }
    }
}

/// Synthetic context of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagContext {
    /// The `[0, tag, 0]` encoding.
    pub key: EncodedWord,
    /// Its context ID.
    pub context: ContextId,
}

/// Encoded column corpus and its lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    config: CorpusConfig,
    tables: Tables,
    vocab: StagedTable,
    context_map: ContextMap,
    /// Indexed by tag ID; `None` for the other tag.
    tag_contexts: Vec<Option<TagContext>>,
    boundary_context: Option<ContextId>,
    unknown_context: ContextId,
    begin: SymbolId,
    end: SymbolId,
    space: SymbolId,
    unknown: SymbolId,
    other_tag: SymbolId,
    #[serde(skip)]
    last_read: Option<ReadStats>,
}

impl Corpus {
    /// Create a corpus, registering the sentinels of `config`.
    ///
    /// Fails if two character sentinels are equal, or if the end marker is a
    /// single codepoint: the end-of-sentence word `[begin, end, end]` would
    /// then be the encoding of the one-character token spelling the marker.
    pub fn new(config: CorpusConfig) -> Result<Self> {
        if codepoints(&config.end).nth(1).is_none() {
            return Err(CorpusError::AmbiguousEndMarker(config.end));
        }
        let mut symbols = SymbolTable::new();
        let begin = symbols.add(&config.begin)?;
        let end = symbols.add(&config.end)?;
        let space = symbols.add(&config.space)?;
        let unknown = symbols.add(&config.unknown)?;

        let mut tags = SymbolTable::new();
        let other_tag = tags.add(&config.other_tag)?;

        let mut vocab = SymbolTable::new();
        let unknown_context = vocab.add(UNKNOWN_KEY)?;

        Ok(Self {
            config,
            tables: Tables::Growing { symbols, tags },
            vocab: vocab.into(),
            context_map: ContextMap::new(),
            tag_contexts: Vec::new(),
            boundary_context: None,
            unknown_context,
            begin,
            end,
            space,
            unknown,
            other_tag,
            last_read: None,
        })
    }

    /// Configuration the corpus was built with.
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn begin_id(&self) -> SymbolId {
        self.begin
    }

    pub fn end_id(&self) -> SymbolId {
        self.end
    }

    pub fn space_id(&self) -> SymbolId {
        self.space
    }

    pub fn unknown_id(&self) -> SymbolId {
        self.unknown
    }

    pub fn other_tag_id(&self) -> SymbolId {
        self.other_tag
    }

    pub fn begin_value(&self) -> &str {
        &self.config.begin
    }

    pub fn end_value(&self) -> &str {
        &self.config.end
    }

    pub fn space_value(&self) -> &str {
        &self.config.space
    }

    pub fn unknown_value(&self) -> &str {
        &self.config.unknown
    }

    pub fn other_tag_value(&self) -> &str {
        &self.config.other_tag
    }

    /// Synthetic sentence-boundary encoding `[0, begin, 0]`.
    pub fn begin_word(&self) -> EncodedWord {
        synthetic_key(self.begin)
    }

    /// Word closing every sentence: `[begin, end, end]`.
    pub fn end_word(&self) -> EncodedWord {
        vec![self.begin, self.end, self.end]
    }

    pub(crate) fn encoder(&self) -> WordEncoder {
        WordEncoder::new(self.begin, self.end, self.unknown)
    }

    /// Whether the character and tag tables are frozen.
    pub fn is_frozen(&self) -> bool {
        matches!(self.tables, Tables::Frozen { .. })
    }

    /// Whether synthetic contexts have been registered.
    pub fn is_finalized(&self) -> bool {
        self.boundary_context.is_some()
    }

    /// Number of character symbols, sentinels included.
    pub fn symbol_count(&self) -> usize {
        self.tables.symbol_count()
    }

    /// Number of tag labels, the other tag included.
    pub fn tag_count(&self) -> usize {
        self.tables.tag_count()
    }

    /// String of a character symbol.
    pub fn symbol_value(&self, id: SymbolId) -> Result<&str> {
        self.tables.symbol_value(id)
    }

    /// Label of a tag ID.
    pub fn tag_label(&self, id: SymbolId) -> Result<&str> {
        self.tables.tag_value(id)
    }

    /// ID of a tag label.
    pub fn tag_id(&self, label: &str) -> Option<SymbolId> {
        self.tables.tag_lookup(label)
    }

    /// Normalized-word vocabulary. Frozen by [`Corpus::finalize`].
    pub fn vocab(&self) -> &StagedTable {
        &self.vocab
    }

    /// Encoded word → context ID map.
    pub fn context_map(&self) -> &ContextMap {
        &self.context_map
    }

    /// Statistics of the most recent read pass.
    pub fn last_read_stats(&self) -> Option<&ReadStats> {
        self.last_read.as_ref()
    }

    /// Freeze the character and tag tables. No-op when already frozen.
    pub fn freeze(&mut self) {
        if !self.is_frozen() {
            self.tables.freeze();
            info!(
                symbols = self.symbol_count(),
                tags = self.tag_count(),
                "froze symbol tables"
            );
        }
    }

    /// Freeze the tables, register one synthetic context per tag (except
    /// the other tag) plus the sentence-boundary context, then freeze the
    /// vocabulary.
    ///
    /// Must run exactly once; a second call fails with
    /// [`CorpusError::DuplicateSyntheticContext`].
    pub fn finalize(&mut self) -> Result<()> {
        if self.is_finalized() {
            return Err(CorpusError::DuplicateSyntheticContext(BOUNDARY_KEY.to_string()));
        }
        self.freeze();
        let boundary_key = self.begin_word();
        let Tables::Frozen { tags, .. } = &self.tables else {
            return Err(CorpusError::NotFrozen);
        };
        let Some(vocab) = self.vocab.growing_mut() else {
            return Err(CorpusError::DuplicateSyntheticContext(BOUNDARY_KEY.to_string()));
        };

        let mut tag_contexts = vec![None; tags.len()];
        for (tag, label) in tags.iter() {
            if tag == self.other_tag {
                continue;
            }
            let name = format!("<{label}>");
            let key = synthetic_key(tag);
            let context = register_synthetic(vocab, &mut self.context_map, &name, &key)?;
            debug!(tag, %name, context, "registered tag context");
            tag_contexts[tag] = Some(TagContext { key, context });
        }

        let context =
            register_synthetic(vocab, &mut self.context_map, BOUNDARY_KEY, &boundary_key)?;
        self.vocab.freeze();
        self.tag_contexts = tag_contexts;
        self.boundary_context = Some(context);

        info!(
            vocab = self.vocab.len(),
            contexts = self.context_map.len(),
            "finalized corpus"
        );
        Ok(())
    }

    /// Synthetic encoding of a tag.
    pub fn tag_context_key(&self, tag: SymbolId) -> Result<&[SymbolId]> {
        self.tag_context(tag).map(|c| c.key.as_slice())
    }

    /// Context ID of a tag.
    pub fn tag_context_id(&self, tag: SymbolId) -> Result<ContextId> {
        self.tag_context(tag).map(|c| c.context)
    }

    fn tag_context(&self, tag: SymbolId) -> Result<&TagContext> {
        if !self.is_finalized() {
            return Err(CorpusError::NotFinalized);
        }
        self.tag_contexts
            .get(tag)
            .and_then(Option::as_ref)
            .ok_or(CorpusError::NoTagContext(tag))
    }

    /// Context ID of the sentence boundary.
    pub fn bos_context_id(&self) -> Result<ContextId> {
        self.boundary_context.ok_or(CorpusError::NotFinalized)
    }

    /// Context ID of an encoded word, or the unknown-word context.
    pub fn word_context_id(&self, word: &[SymbolId]) -> ContextId {
        self.context_map.get(word).unwrap_or(self.unknown_context)
    }

    /// Context ID used for unregistered encodings.
    pub fn unknown_context_id(&self) -> ContextId {
        self.unknown_context
    }

    /// Encode a whitespace-separated line against the frozen tables.
    ///
    /// Unseen characters become the unknown symbol. The returned instance has
    /// no phrases and is classified [`Annotation::None`].
    pub fn encode_line(&self, line: &str) -> Result<Instance> {
        let Tables::Frozen { symbols, .. } = &self.tables else {
            return Err(CorpusError::NotFrozen);
        };
        let encoder = self.encoder();
        let mut alphabet = symbols;
        let mut instance = Instance::default();
        let mut unknown = 0;

        instance.chars.push(self.begin);
        for token in line.split_whitespace() {
            if !instance.words.is_empty() {
                instance.chars.push(self.space);
            }
            let encoded = encoder.encode(token, &mut alphabet);
            unknown += encoded.unknown;
            instance.chars.extend_from_slice(encoded.chars());
            instance.words.push(encoded.word);
        }
        if instance.words.is_empty() {
            return Err(CorpusError::EmptyInput);
        }
        instance.chars.push(self.end);
        instance.words.push(self.end_word());

        debug!(tokens = instance.token_count(), unknown, "encoded line");
        Ok(instance)
    }

    /// Render a symbol sequence as text.
    pub fn decode(&self, symbols: &[SymbolId]) -> Result<String> {
        let mut out = String::new();
        for &sym in symbols {
            out.push_str(self.symbol_value(sym)?);
        }
        Ok(out)
    }

    /// The character stream of an instance as text.
    pub fn chars_string(&self, instance: &Instance) -> Result<String> {
        self.decode(&instance.chars)
    }

    /// The words of an instance as text, separated by spaces.
    pub fn words_string(&self, instance: &Instance) -> Result<String> {
        let words = instance
            .words
            .iter()
            .map(|w| self.decode(w))
            .collect::<Result<Vec<_>>>()?;
        Ok(words.join(" "))
    }

    /// Rebuild the per-token tag column of an instance.
    ///
    /// # Examples
    /// ```
    /// use std::io::Cursor;
    /// use charseq_core::{Corpus, CorpusConfig};
    ///
    /// let mut corpus = Corpus::new(CorpusConfig::default()).unwrap();
    /// let data = "John B-PER\nSmith I-PER\nwent ?\n\n";
    /// let instances = corpus.read_from(Cursor::new(data), None).unwrap();
    /// assert_eq!(corpus.tagging_string(&instances[0]).unwrap(), "B-PER I-PER ?");
    /// ```
    pub fn tagging_string(&self, instance: &Instance) -> Result<String> {
        let mut tagging = Vec::with_capacity(instance.token_count());
        for phrase in instance.phrases() {
            if !phrase.observed {
                tagging.extend(std::iter::repeat_n(self.config.latent_tag.clone(), phrase.len));
                continue;
            }
            let label = self.tag_label(phrase.tag)?;
            for j in 0..phrase.len {
                if j > 0 {
                    tagging.push(format!("I-{label}"));
                } else if phrase.tag == self.other_tag {
                    tagging.push(label.to_string());
                } else {
                    tagging.push(format!("B-{label}"));
                }
            }
        }
        Ok(tagging.join(" "))
    }

    /// Dump an instance phrase by phrase at debug level.
    pub fn log_instance(&self, instance: &Instance) -> Result<()> {
        let text = self.chars_string(instance)?;
        debug!(
            words = instance.words.len(),
            lens = instance.lens.len(),
            chars = instance.chars.len(),
            annotation = %instance.annotation,
            %text,
            "instance"
        );
        for phrase in instance.phrases() {
            let words = instance
                .phrase_words(&phrase)
                .iter()
                .map(|w| self.decode(w))
                .collect::<Result<Vec<_>>>()?;
            let tag = self.tag_label(phrase.tag)?;
            debug!(
                tag,
                len = phrase.len,
                observed = phrase.observed,
                words = %words.join(" "),
                "phrase"
            );
        }
        Ok(())
    }

    /// Serialize the whole corpus state as JSON.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Restore a corpus written by [`Corpus::to_writer`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write a JSON snapshot to `path`.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let write_err = |source| CorpusError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(write_err)?;
        info!(?path, "saved corpus snapshot");
        Ok(())
    }

    /// Load a JSON snapshot from `path`.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_reader(BufReader::new(file))?;
        info!(
            ?path,
            frozen = corpus.is_frozen(),
            finalized = corpus.is_finalized(),
            "loaded corpus snapshot"
        );
        Ok(corpus)
    }
}

fn register_synthetic(
    vocab: &mut SymbolTable<Growing>,
    context_map: &mut ContextMap,
    name: &str,
    key: &[SymbolId],
) -> Result<ContextId> {
    if vocab.contains(name) || context_map.contains(key) {
        return Err(CorpusError::DuplicateSyntheticContext(name.to_string()));
    }
    let context = vocab.add(name)?;
    context_map.insert_new(key, context);
    Ok(context)
}

#[cfg(test)]
mod tests;
