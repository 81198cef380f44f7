//! Charseq CLI
//!
//! Encodes a two-column BIO corpus, optionally split into train and test
//! sentences, and saves the finalized corpus as a JSON snapshot for later
//! inference-time encoding.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use charseq_core::{Corpus, CorpusConfig, Instance, MalformedLinePolicy, NumeralRule};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "charseq")]
#[command(about = "Encode BIO-tagged column corpora for character-level sequence models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a corpus, finalize it and write a snapshot
    Encode {
        /// Two-column `token tag` input file
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the finalized corpus snapshot
        #[arg(short, long, env = "CHARSEQ_SNAPSHOT")]
        snapshot: PathBuf,

        /// JSON-lines output for (training) instances
        #[arg(long)]
        instances: Option<PathBuf>,

        /// JSON-lines output for held-out instances
        #[arg(long, requires = "test_ratio")]
        test_instances: Option<PathBuf>,

        /// Fraction of sentences held out for testing
        #[arg(long)]
        test_ratio: Option<f64>,

        /// Seed for the train/test shuffle
        #[arg(long, env = "CHARSEQ_SEED", default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Encode raw lines (stdin, one sentence per line) against a snapshot
    Infer {
        /// Finalized corpus snapshot
        #[arg(short, long, env = "CHARSEQ_SNAPSHOT")]
        snapshot: PathBuf,

        /// Encode this line instead of reading stdin
        #[arg(short, long)]
        line: Option<String>,
    },
    /// Count sentences in a corpus file
    Count {
        /// Two-column `token tag` input file
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Corpus construction options
#[derive(clap::Args)]
struct CorpusArgs {
    /// Label of the non-entity tag
    #[arg(long, default_value = "O")]
    other_tag: String,

    /// Tag marking a token as untagged
    #[arg(long, default_value = "?")]
    latent_tag: String,

    /// Numeral detection for the context vocabulary
    #[arg(long, value_enum, default_value_t = NumeralArg::Digits)]
    numeral_rule: NumeralArg,

    /// Skip malformed lines instead of failing
    #[arg(long)]
    skip_malformed: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum NumeralArg {
    Digits,
    Locale,
}

impl CorpusArgs {
    fn config(&self) -> CorpusConfig {
        let rule = match self.numeral_rule {
            NumeralArg::Digits => NumeralRule::Digits,
            NumeralArg::Locale => NumeralRule::Locale,
        };
        let policy = if self.skip_malformed {
            MalformedLinePolicy::Skip
        } else {
            MalformedLinePolicy::Reject
        };
        CorpusConfig::new()
            .with_other_tag(self.other_tag.as_str())
            .with_latent_tag(self.latent_tag.as_str())
            .with_numeral_rule(rule)
            .with_malformed_lines(policy)
    }
}

/// Deterministic train/test partition of sentence indices.
fn split_indices(count: usize, test_ratio: f64, seed: u64) -> (BTreeSet<usize>, BTreeSet<usize>) {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..indices.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
    let n_test = ((count as f64) * test_ratio).round() as usize;
    let test = indices[..n_test].iter().copied().collect();
    let train = indices[n_test..].iter().copied().collect();
    (train, test)
}

fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    info!("Wrote {} instances to {:?}", items.len(), path);
    Ok(())
}

fn encode(
    input: &Path,
    snapshot: &Path,
    instances: Option<&Path>,
    test_instances: Option<&Path>,
    test_ratio: Option<f64>,
    seed: u64,
    config: CorpusConfig,
) -> Result<()> {
    let mut corpus = Corpus::new(config).context("Invalid corpus configuration")?;

    let (train, test): (Vec<Instance>, Vec<Instance>) = match test_ratio {
        Some(ratio) => {
            if !(0.0..1.0).contains(&ratio) {
                bail!("--test-ratio must be in [0, 1), got {}", ratio);
            }
            let count = Corpus::count_sentences(input)
                .with_context(|| format!("Failed to scan {:?}", input))?;
            let (train_idx, test_idx) = split_indices(count, ratio, seed);
            info!(
                "Splitting {} sentences: {} train, {} test (seed {})",
                count,
                train_idx.len(),
                test_idx.len(),
                seed
            );
            corpus
                .read_split(input, &train_idx, &test_idx)
                .with_context(|| format!("Failed to read {:?}", input))?
        }
        None => {
            let all = corpus
                .read(input)
                .with_context(|| format!("Failed to read {:?}", input))?;
            (all, Vec::new())
        }
    };

    corpus.finalize().context("Failed to finalize corpus")?;
    corpus
        .save_snapshot(snapshot)
        .with_context(|| format!("Failed to save snapshot {:?}", snapshot))?;

    if let Some(path) = instances {
        write_jsonl(path, &train)?;
    }
    if let Some(path) = test_instances {
        write_jsonl(path, &test)?;
    }

    info!(
        "Encoded {} train / {} test sentences: {} symbols, {} tags, {} context keys",
        train.len(),
        test.len(),
        corpus.symbol_count(),
        corpus.tag_count(),
        corpus.context_map().len()
    );
    Ok(())
}

fn infer(snapshot: &Path, line: Option<&str>) -> Result<()> {
    let corpus = Corpus::load_snapshot(snapshot)
        .with_context(|| format!("Failed to load snapshot {:?}", snapshot))?;
    if !corpus.is_finalized() {
        bail!("Snapshot {:?} was saved before finalization", snapshot);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut emit = |text: &str| -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let instance = corpus.encode_line(text)?;
        serde_json::to_writer(&mut out, &instance)?;
        writeln!(out)?;
        Ok(())
    };

    match line {
        Some(text) => emit(text)?,
        None => {
            for text in io::stdin().lock().lines() {
                emit(&text?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            snapshot,
            instances,
            test_instances,
            test_ratio,
            seed,
            corpus,
        } => encode(
            &input,
            &snapshot,
            instances.as_deref(),
            test_instances.as_deref(),
            test_ratio,
            seed,
            corpus.config(),
        ),
        Commands::Infer { snapshot, line } => infer(&snapshot, line.as_deref()),
        Commands::Count { input } => {
            let count = Corpus::count_sentences(&input)
                .with_context(|| format!("Failed to scan {:?}", input))?;
            println!("{}", count);
            Ok(())
        }
    }
}
