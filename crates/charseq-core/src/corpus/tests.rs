use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;

use super::*;
use crate::config::{MalformedLinePolicy, NumeralRule};
use crate::context::{NUMERAL_KEY, normalize};
use crate::error::ErrorKind;

const SAMPLE: &str = "\
John B-PER
Smith I-PER
went O
to O
Paris B-LOC

The O
UN B-ORG
met O
in O
2020 O
";

fn corpus() -> Corpus {
    Corpus::new(CorpusConfig::default()).unwrap()
}

fn read(corpus: &mut Corpus, data: &str) -> Result<Vec<Instance>> {
    corpus.read_from(Cursor::new(data), None)
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("charseq-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn assert_well_formed(corpus: &Corpus, instance: &Instance) {
    assert_eq!(instance.tags.len(), instance.lens.len());
    assert_eq!(instance.tags.len(), instance.observed.len());
    assert!(instance.lens.iter().all(|&l| l >= 1));
    assert_eq!(
        instance.lens.iter().sum::<usize>(),
        instance.token_count()
    );
    assert_eq!(instance.words.last(), Some(&corpus.end_word()));
    assert_eq!(instance.chars.first(), Some(&corpus.begin_id()));
    assert_eq!(instance.chars.last(), Some(&corpus.end_id()));
}

#[test]
fn test_seed_sentinels() {
    let corpus = corpus();
    assert_eq!(corpus.begin_id(), 0);
    assert_eq!(corpus.end_id(), 1);
    assert_eq!(corpus.space_id(), 2);
    assert_eq!(corpus.unknown_id(), 3);
    assert_eq!(corpus.other_tag_id(), 0);
    assert_eq!(corpus.symbol_value(corpus.unknown_id()).unwrap(), "<unk>");
    assert_eq!(corpus.other_tag_value(), "O");
    assert_eq!(corpus.begin_word(), vec![0, 0, 0]);
    assert!(!corpus.is_frozen());
    assert!(!corpus.is_finalized());
}

#[test]
fn test_duplicate_sentinels_rejected() {
    let config = CorpusConfig::default().with_markers("<s>", "<s>", " ", "<unk>");
    assert!(matches!(
        Corpus::new(config),
        Err(CorpusError::DuplicateSymbol(_))
    ));
}

#[test]
fn test_single_codepoint_end_marker_rejected() {
    let config = CorpusConfig::default().with_markers("^", "$", " ", "<unk>");
    let err = Corpus::new(config).unwrap_err();
    assert!(matches!(err, CorpusError::AmbiguousEndMarker(ref m) if m == "$"));
    assert_eq!(err.kind(), ErrorKind::Format);

    let config = CorpusConfig::default().with_markers("^", "$$", " ", "<unk>");
    let mut corpus = Corpus::new(config).unwrap();
    read(&mut corpus, "$ O\n\n").unwrap();
    assert_eq!(
        corpus.word_context_id(&corpus.end_word()),
        corpus.unknown_context_id()
    );
}

#[test]
fn test_read_sentences() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, SAMPLE).unwrap();
    assert_eq!(instances.len(), 2);

    let first = &instances[0];
    assert_well_formed(&corpus, first);
    let per = corpus.tag_id("PER").unwrap();
    let loc = corpus.tag_id("LOC").unwrap();
    let other = corpus.other_tag_id();
    assert_eq!(first.tags, vec![per, other, other, loc]);
    assert_eq!(first.lens, vec![2, 1, 1, 1]);
    assert_eq!(first.annotation, Annotation::Full);
    assert_eq!(corpus.chars_string(first).unwrap(), "<s>John Smith went to Paris</s>");
    assert_eq!(
        corpus.words_string(first).unwrap(),
        "<s>John</s> <s>Smith</s> <s>went</s> <s>to</s> <s>Paris</s> <s></s></s>"
    );

    assert_well_formed(&corpus, &instances[1]);
    assert_eq!(instances[1].token_count(), 5);

    let stats = corpus.last_read_stats().unwrap();
    assert_eq!(stats.sentences, 2);
    assert_eq!(stats.emitted, 2);
    assert_eq!(stats.tokens, 10);
    assert_eq!(stats.tagged, 10);
    assert_eq!(stats.full, 2);
}

#[test]
fn test_semi_supervised_sentence() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, "John B-PER\nSmith I-PER\nwent ?\n\n").unwrap();
    assert_eq!(instances.len(), 1);

    let sentence = &instances[0];
    assert_well_formed(&corpus, sentence);
    let per = corpus.tag_id("PER").unwrap();
    let entities: Vec<_> = sentence
        .entity_phrases(corpus.other_tag_id())
        .map(|p| (p.tag, p.len))
        .collect();
    assert_eq!(entities, vec![(per, 2)]);
    assert_eq!(sentence.token_count(), 3);
    assert_eq!(sentence.tagged_count(), 2);
    assert_eq!(sentence.observed, vec![true, false]);
    assert_eq!(sentence.annotation, Annotation::Semi);
    assert_eq!(corpus.tagging_string(sentence).unwrap(), "B-PER I-PER ?");
}

#[test]
fn test_untagged_sentence_is_none() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, "a ?\nb ?\n\n").unwrap();
    assert_eq!(instances[0].annotation, Annotation::None);
    assert_eq!(instances[0].lens, vec![1, 1]);
    assert_eq!(corpus.last_read_stats().unwrap().none, 1);
}

#[test]
fn test_final_sentence_without_blank_line() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, "a O\n\nb O\nc O").unwrap();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[1].token_count(), 2);
}

#[test]
fn test_space_placement() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, "ab B-X\nc I-X\nd O\n\n").unwrap();
    let space = corpus.space_id();
    let chars = &instances[0].chars;
    let spaces: Vec<_> = chars
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == space)
        .map(|(i, _)| i)
        .collect();
    // <s> a b _ c _ d </s>
    assert_eq!(spaces, vec![3, 5]);
    assert_eq!(chars.len(), 8);
}

#[test]
fn test_format_errors() {
    let mut corpus = corpus();
    let err = read(&mut corpus, "a b c\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::MalformedLine { line: 1, columns: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = read(&mut corpus, "a PER\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::UnexpectedTag { line: 1, .. }));

    let err = read(&mut corpus, "a O\nb Q-PER\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::MalformedTag { line: 2, .. }));

    let err = read(&mut corpus, "a I-PER\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::DanglingContinuation { line: 1, .. }));

    let err = read(&mut corpus, "a ?\nb I-PER\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::DanglingContinuation { line: 2, .. }));
}

#[test]
fn test_empty_sentence_is_invariant_error() {
    let mut corpus = corpus();
    let err = read(&mut corpus, "a O\n\n\n").unwrap_err();
    assert!(matches!(err, CorpusError::EmptySentence { line: 3 }));
    assert_eq!(err.kind(), ErrorKind::Invariant);
}

#[test]
fn test_skip_malformed_lines() {
    let config = CorpusConfig::default().with_malformed_lines(MalformedLinePolicy::Skip);
    let mut corpus = Corpus::new(config).unwrap();
    let instances = read(&mut corpus, "-DOCSTART- -X- O O\na O\nb O\n\n").unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].token_count(), 2);
    assert_eq!(corpus.last_read_stats().unwrap().skipped_lines, 1);
}

#[test]
fn test_context_map_is_case_and_numeral_normalized() {
    let mut corpus = corpus();
    read(&mut corpus, "Paris O\nparis O\nPARIS O\n2020 O\n7 O\n2,020 O\n\n").unwrap();

    let encoder = corpus.encoder();
    let frozen = {
        corpus.freeze();
        corpus.clone()
    };
    let Tables::Frozen { symbols, .. } = &frozen.tables else {
        panic!("tables should be frozen");
    };
    let mut alphabet = symbols;
    let mut context = |token: &str| {
        let word = encoder.encode(token, &mut alphabet).word;
        frozen.context_map().get(&word).unwrap()
    };

    let upper = context("PARIS");
    assert_eq!(context("Paris"), upper);
    assert_eq!(context("paris"), upper);
    assert_eq!(context("2020"), context("7"));
    assert_ne!(context("2,020"), context("2020"));

    let vocab = frozen.vocab();
    assert_eq!(vocab.lookup(NUMERAL_KEY), Some(context("2020")));
    assert_eq!(vocab.lookup("2,020"), Some(context("2,020")));
    // <UNK>, PARIS, <NUM>, 2,020
    assert_eq!(vocab.len(), 4);
    assert_eq!(frozen.context_map().len(), 6);
}

#[test]
fn test_locale_numeral_rule() {
    let config = CorpusConfig::default().with_numeral_rule(NumeralRule::Locale);
    let mut corpus = Corpus::new(config).unwrap();
    read(&mut corpus, "2,020 O\n3.5 O\n\n").unwrap();
    assert_eq!(normalize("2,020", corpus.config().numeral_rule), NUMERAL_KEY);
    // <UNK>, <NUM>
    assert_eq!(corpus.vocab().len(), 2);
}

#[test]
fn test_context_registration_is_stable() {
    let mut corpus = corpus();
    read(&mut corpus, "alpha O\nbeta O\n\n").unwrap();
    let before: Vec<_> = corpus
        .context_map()
        .iter()
        .map(|(w, c)| (w.to_vec(), c))
        .collect();

    read(&mut corpus, "beta O\nALPHA O\nalpha O\n\n").unwrap();
    for (word, context) in &before {
        assert_eq!(corpus.context_map().get(word), Some(*context));
    }
    // ALPHA has its own encoding but shares alpha's vocabulary entry.
    assert_eq!(corpus.context_map().len(), 3);
    assert_eq!(corpus.vocab().len(), 3);
}

#[test]
fn test_filtered_read() {
    let mut corpus = corpus();
    let include = BTreeSet::from([1]);
    let instances = corpus.read_from(Cursor::new(SAMPLE), Some(&include)).unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(corpus.words_string(&instances[0]).unwrap().split(' ').count(), 6);

    let stats = corpus.last_read_stats().unwrap();
    assert_eq!(stats.sentences, 2);
    assert_eq!(stats.emitted, 1);
}

#[test]
fn test_read_split_freezes_between_passes() {
    let data = "ab B-PER\n\nxyz B-MISC\n\n";
    let path = temp_file("split.txt", data);
    let mut corpus = corpus();

    let train = BTreeSet::from([0]);
    let test = BTreeSet::from([1]);
    let (train, test) = corpus.read_split(&path, &train, &test).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(train.len(), 1);
    assert_eq!(test.len(), 1);
    assert!(corpus.is_frozen());

    // 4 sentinels + a, b
    assert_eq!(corpus.symbol_count(), 6);
    // O, PER
    assert_eq!(corpus.tag_count(), 2);
    assert_eq!(corpus.tag_id("MISC"), None);

    let unk = corpus.unknown_id();
    assert_eq!(test[0].words[0], vec![0, unk, unk, unk, 1]);
    assert_eq!(test[0].tags, vec![corpus.other_tag_id()]);

    let stats = corpus.last_read_stats().unwrap();
    assert_eq!(stats.unknown_chars, 3);
    assert_eq!(stats.unknown_tags, 1);
}

#[test]
fn test_test_pass_leaves_vocabulary_untouched() {
    let data = "ab B-PER\n\nxyz O\nqqq O\n\n";
    let path = temp_file("split-vocab.txt", data);
    let train = BTreeSet::from([0]);
    let test = BTreeSet::from([1]);

    let mut corpus = corpus();
    corpus.read_filtered(&path, Some(&train)).unwrap();
    corpus.freeze();
    // <UNK>, AB
    assert_eq!(corpus.vocab().len(), 2);
    assert_eq!(corpus.context_map().len(), 1);

    let held_out = corpus.read_filtered(&path, Some(&test)).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(held_out.len(), 1);
    assert_eq!(corpus.vocab().len(), 2);
    assert_eq!(corpus.context_map().len(), 1);
    assert_eq!(corpus.vocab().lookup("XYZ"), None);
    assert_eq!(
        corpus.word_context_id(&held_out[0].words[0]),
        corpus.unknown_context_id()
    );

    corpus.finalize().unwrap();
    let unseen = corpus.encode_line("zzz").unwrap();
    assert_eq!(
        corpus.word_context_id(&unseen.words[0]),
        corpus.unknown_context_id()
    );
}

#[test]
fn test_read_split_registers_only_training_words() {
    let data = "ab B-PER\n\nxyz O\nqqq O\n\n";
    let path = temp_file("split-contexts.txt", data);
    let mut corpus = corpus();
    corpus
        .read_split(&path, &BTreeSet::from([0]), &BTreeSet::from([1]))
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    let vocab: Vec<_> = (0..corpus.vocab().len())
        .map(|id| corpus.vocab().value_of(id).unwrap().to_string())
        .collect();
    assert_eq!(vocab, vec!["<UNK>", "AB"]);
    assert_eq!(corpus.context_map().len(), 1);
}

#[test]
fn test_read_missing_file() {
    let mut corpus = corpus();
    let err = corpus.read("/nonexistent/charseq/corpus.txt").unwrap_err();
    assert!(matches!(err, CorpusError::Read { .. }));
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_count_sentences() {
    assert_eq!(Corpus::count_sentences_from(Cursor::new(SAMPLE)).unwrap(), 2);
    assert_eq!(
        Corpus::count_sentences_from(Cursor::new("a O\n\nb O\n\n")).unwrap(),
        2
    );
    assert_eq!(Corpus::count_sentences_from(Cursor::new("")).unwrap(), 0);

    let path = temp_file("count.txt", SAMPLE);
    assert_eq!(Corpus::count_sentences(&path).unwrap(), 2);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_finalize_registers_synthetic_contexts() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    let vocab_before = corpus.vocab().len();
    let contexts_before = corpus.context_map().len();

    corpus.finalize().unwrap();
    assert!(corpus.is_frozen());
    assert!(corpus.is_finalized());

    // PER, LOC, ORG + boundary
    assert_eq!(corpus.vocab().len(), vocab_before + 4);
    assert_eq!(corpus.context_map().len(), contexts_before + 4);

    let per = corpus.tag_id("PER").unwrap();
    assert_eq!(corpus.tag_context_key(per).unwrap(), &[0, per, 0]);
    let context = corpus.tag_context_id(per).unwrap();
    assert_eq!(corpus.vocab().value_of(context).unwrap(), "<PER>");
    assert_eq!(corpus.word_context_id(&[0, per, 0]), context);

    let bos = corpus.bos_context_id().unwrap();
    assert_eq!(corpus.vocab().value_of(bos).unwrap(), "<BOS>");
    assert_eq!(corpus.word_context_id(&corpus.begin_word()), bos);

    assert!(matches!(
        corpus.tag_context_id(corpus.other_tag_id()),
        Err(CorpusError::NoTagContext(0))
    ));
}

#[test]
fn test_read_after_finalize_keeps_vocabulary() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    corpus.finalize().unwrap();
    assert!(corpus.vocab().is_frozen());
    let vocab = corpus.vocab().len();
    let contexts = corpus.context_map().len();

    let instances = read(&mut corpus, "Berlin B-LOC\nsaid O\n\n").unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(corpus.vocab().len(), vocab);
    assert_eq!(corpus.context_map().len(), contexts);
    assert_eq!(corpus.vocab().lookup("BERLIN"), None);
}

#[test]
fn test_finalize_twice_is_rejected() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    corpus.finalize().unwrap();
    let vocab = corpus.vocab().len();

    let err = corpus.finalize().unwrap_err();
    assert!(matches!(err, CorpusError::DuplicateSyntheticContext(_)));
    assert_eq!(err.kind(), ErrorKind::Invariant);
    assert_eq!(corpus.vocab().len(), vocab);
}

#[test]
fn test_finalize_without_entity_tags_twice_is_rejected() {
    let mut corpus = corpus();
    corpus.finalize().unwrap();
    assert!(matches!(
        corpus.finalize(),
        Err(CorpusError::DuplicateSyntheticContext(ref key)) if key == "<BOS>"
    ));
}

#[test]
fn test_tag_context_requires_finalize() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    let per = corpus.tag_id("PER").unwrap();
    assert!(matches!(
        corpus.tag_context_id(per),
        Err(CorpusError::NotFinalized)
    ));
    assert!(matches!(corpus.bos_context_id(), Err(CorpusError::NotFinalized)));
}

#[test]
fn test_encode_line_requires_frozen() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    assert!(matches!(
        corpus.encode_line("John went"),
        Err(CorpusError::NotFrozen)
    ));
}

#[test]
fn test_encode_line_matches_reader_encoding() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, "John B-PER\nwent O\n\n").unwrap();
    corpus.finalize().unwrap();
    let symbols = corpus.symbol_count();

    let encoded = corpus.encode_line("John went").unwrap();
    assert_eq!(encoded.chars, instances[0].chars);
    assert_eq!(encoded.words, instances[0].words);
    assert!(encoded.tags.is_empty());
    assert_eq!(encoded.annotation, Annotation::None);

    let encoded = corpus.encode_line("Jöhn\tzzz").unwrap();
    let unk = corpus.unknown_id();
    assert_eq!(encoded.words[1], vec![0, unk, unk, unk, 1]);
    assert_eq!(corpus.symbol_count(), symbols);
    assert_eq!(
        corpus.word_context_id(&encoded.words[1]),
        corpus.unknown_context_id()
    );

    assert!(matches!(
        corpus.encode_line("  \t "),
        Err(CorpusError::EmptyInput)
    ));
}

#[test]
fn test_tagging_string_round_trip() {
    let mut corpus = corpus();
    let instances = read(&mut corpus, SAMPLE).unwrap();
    assert_eq!(
        corpus.tagging_string(&instances[0]).unwrap(),
        "B-PER I-PER O O B-LOC"
    );
    assert_eq!(corpus.tagging_string(&instances[1]).unwrap(), "O B-ORG O O O");
    corpus.log_instance(&instances[0]).unwrap();
}

#[test]
fn test_snapshot_round_trip() {
    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    corpus.finalize().unwrap();

    let path = temp_file("snapshot.json", "");
    corpus.save_snapshot(&path).unwrap();
    let restored = Corpus::load_snapshot(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(restored.is_frozen());
    assert!(restored.is_finalized());
    assert_eq!(restored.tables, corpus.tables);
    assert_eq!(restored.context_map(), corpus.context_map());
    assert_eq!(restored.vocab(), corpus.vocab());
    assert_eq!(restored.config(), corpus.config());
    assert!(restored.last_read_stats().is_none());

    let per = corpus.tag_id("PER").unwrap();
    assert_eq!(
        restored.tag_context_id(per).unwrap(),
        corpus.tag_context_id(per).unwrap()
    );
    assert_eq!(
        restored.encode_line("Paris 2020").unwrap(),
        corpus.encode_line("Paris 2020").unwrap()
    );
}

#[test]
fn test_finalized_corpus_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Corpus>();

    let mut corpus = corpus();
    read(&mut corpus, SAMPLE).unwrap();
    corpus.finalize().unwrap();

    let corpus = &corpus;
    std::thread::scope(|s| {
        let handles: Vec<_> = ["John", "Paris", "UN"]
            .into_iter()
            .map(|line| s.spawn(move || corpus.encode_line(line).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().token_count(), 1);
        }
    });
}
