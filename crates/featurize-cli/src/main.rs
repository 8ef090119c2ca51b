mod records;

use std::{
    borrow::Cow,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use mimalloc::MiMalloc;
use rayon::prelude::*;
use records::Record;
use text_featurizer::{
    FeatureMode, FeatureVector, Featurizer, FeaturizerParams, FrequencyMeasure, HashSeed,
    MultiColumnStrategy, VectorNorm, Weighting,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Minimum number of records before a progress bar is drawn
const MIN_RECORDS_FOR_PROGRESS: usize = 1_000;

#[derive(Parser, Debug)]
#[command(name = "featurize")]
#[command(about = "Turn text records into word n-gram and char-gram feature vectors", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a featurizer on a corpus and save it as JSON
    Fit(FitArgs),
    /// Featurize records with a saved featurizer, one JSON line per record
    Transform(TransformArgs),
    /// Print the configuration and vocabulary of a saved featurizer
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone, Copy)]
struct InputFormat {
    /// Input is a JSON array of texts, nulls, or per-column arrays
    #[arg(long)]
    json: bool,

    /// Field separator for line input with several columns
    #[arg(long, default_value_t = '\t')]
    delimiter: char,
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Corpus to fit on (reads stdin if not provided)
    #[arg(short, long, value_name = "PATH")]
    corpus: Option<PathBuf>,

    /// Where to write the fitted featurizer
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// JSON file with the full parameter set; flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    format: InputFormat,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args, Debug)]
struct TransformArgs {
    /// Fitted featurizer written by `featurize fit`
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    /// Records to featurize (reads stdin if not provided)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    #[command(flatten)]
    format: InputFormat,

    /// Print every slot instead of only the nonzero ones
    #[arg(long)]
    dense: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Fitted featurizer written by `featurize fit`
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    /// Number of vocabulary entries to list
    #[arg(short, long, default_value_t = 20)]
    limit: usize,

    /// Print the summary as JSON, with the full vocabulary
    #[arg(long)]
    json: bool,
}

/// Parameter overrides. Unset options keep the config file or default value.
#[derive(Args, Debug, Default)]
struct ParamArgs {
    /// Input column names, comma-separated
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    columns: Option<Vec<String>>,

    /// Word n-gram lengths as MIN,MAX or N
    #[arg(long, value_parser = parse_range, value_name = "MIN,MAX")]
    ngram_range: Option<(usize, usize)>,

    /// Disable word n-grams
    #[arg(long, conflicts_with = "ngram_range")]
    no_word_ngrams: bool,

    /// Char-gram lengths as MIN,MAX or N
    #[arg(long, value_parser = parse_range, value_name = "MIN,MAX")]
    chargram_range: Option<(usize, usize)>,

    /// Disable char-grams
    #[arg(long, conflicts_with = "chargram_range")]
    no_chargrams: bool,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long)]
    max_vocabulary_size: Option<usize>,

    #[arg(long)]
    min_document_frequency: Option<usize>,

    /// Frequency used to rank grams when the vocabulary is capped
    #[arg(long, value_enum)]
    frequency_measure: Option<FrequencyArg>,

    #[arg(long)]
    hash_table_size: Option<usize>,

    #[arg(long, conflicts_with = "random_seed")]
    hash_seed: Option<u64>,

    /// Draw a fresh hash seed instead of a fixed one
    #[arg(long)]
    random_seed: bool,

    #[arg(long, value_enum)]
    weighting: Option<WeightingArg>,

    #[arg(long, value_enum)]
    norm: Option<NormArg>,

    #[arg(long)]
    case_sensitive: bool,

    /// Keep accents and other diacritics
    #[arg(long)]
    keep_diacritics: bool,

    /// Drop purely numeric tokens
    #[arg(long)]
    drop_numbers: bool,

    /// Remove the built-in English stop words
    #[arg(long)]
    remove_stop_words: bool,

    /// Remove the stop words listed in PATH, one per line
    #[arg(long, value_name = "PATH")]
    stop_words: Option<PathBuf>,

    /// Give each column its own feature space
    #[arg(long)]
    independent_columns: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    /// Learn a vocabulary from the corpus
    Dictionary,
    /// Hash grams into a fixed-size table
    Hashing,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FrequencyArg {
    Corpus,
    Document,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WeightingArg {
    Count,
    Binary,
    Tf,
    TfIdf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NormArg {
    None,
    L1,
    L2,
    Linf,
}

impl From<ModeArg> for FeatureMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Dictionary => Self::Dictionary,
            ModeArg::Hashing => Self::Hashing,
        }
    }
}

impl From<FrequencyArg> for FrequencyMeasure {
    fn from(measure: FrequencyArg) -> Self {
        match measure {
            FrequencyArg::Corpus => Self::Corpus,
            FrequencyArg::Document => Self::Document,
        }
    }
}

impl From<WeightingArg> for Weighting {
    fn from(weighting: WeightingArg) -> Self {
        match weighting {
            WeightingArg::Count => Self::Count,
            WeightingArg::Binary => Self::Binary,
            WeightingArg::Tf => Self::Tf,
            WeightingArg::TfIdf => Self::TfIdf,
        }
    }
}

impl From<NormArg> for VectorNorm {
    fn from(norm: NormArg) -> Self {
        match norm {
            NormArg::None => Self::None,
            NormArg::L1 => Self::L1,
            NormArg::L2 => Self::L2,
            NormArg::Linf => Self::LInf,
        }
    }
}

fn parse_range(value: &str) -> Result<(usize, usize), String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid length {part:?}: {err}"))
    };
    match value.split_once(',') {
        Some((min, max)) => Ok((parse(min)?, parse(max)?)),
        None => {
            let n = parse(value)?;
            Ok((n, n))
        }
    }
}

impl ParamArgs {
    fn apply(&self, mut params: FeaturizerParams) -> Result<FeaturizerParams> {
        if let Some(columns) = &self.columns {
            params = params.with_columns(columns);
        }
        if let Some((min_n, max_n)) = self.ngram_range {
            params = params.with_ngram_range(min_n, max_n);
        }
        if self.no_word_ngrams {
            params = params.without_word_ngrams();
        }
        if let Some((min_n, max_n)) = self.chargram_range {
            params = params.with_chargram_range(min_n, max_n);
        }
        if self.no_chargrams {
            params = params.without_chargrams();
        }
        if let Some(mode) = self.mode {
            params = params.with_mode(mode.into());
        }
        if let Some(size) = self.max_vocabulary_size {
            params = params.with_max_vocabulary_size(size);
        }
        if let Some(min_df) = self.min_document_frequency {
            params = params.with_min_document_frequency(min_df);
        }
        if let Some(measure) = self.frequency_measure {
            params = params.with_frequency_measure(measure.into());
        }
        if let Some(size) = self.hash_table_size {
            params = params.with_hash_table_size(size);
        }
        if let Some(seed) = self.hash_seed {
            params = params.with_hash_seed(HashSeed::Fixed(seed));
        }
        if self.random_seed {
            params = params.with_hash_seed(HashSeed::Random);
        }
        if let Some(weighting) = self.weighting {
            params = params.with_weighting(weighting.into());
        }
        if let Some(norm) = self.norm {
            params = params.with_normalization(norm.into());
        }
        if self.case_sensitive {
            params = params.with_case_sensitive(true);
        }
        if self.keep_diacritics {
            params = params.with_strip_diacritics(false);
        }
        if self.drop_numbers {
            params = params.with_keep_numbers(false);
        }
        if self.remove_stop_words {
            params = params.with_remove_stop_words(true);
        }
        if let Some(path) = &self.stop_words {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read stop words: {}", path.display()))?;
            params = params.with_stop_words(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|word| !word.is_empty()),
            );
        }
        if self.independent_columns {
            params = params.with_multi_column(MultiColumnStrategy::Independent);
        }
        Ok(params)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let show_progress = !cli.quiet;

    match &cli.command {
        Command::Fit(args) => {
            let featurizer = fit(args, show_progress)?;
            save_model(&featurizer, &args.output)?;
            info!(
                path = %args.output.display(),
                dimension = featurizer.dimension(),
                "Featurizer saved"
            );
        }
        Command::Transform(args) => {
            let featurizer = load_model(&args.model)?;
            let records = load_records(
                args.input.as_deref(),
                args.format,
                featurizer.params().columns().len(),
            )?;
            let vectors = transform(&featurizer, &records, show_progress)?;
            let mut out = BufWriter::new(std::io::stdout().lock());
            for vector in &vectors {
                let line = render_vector(&featurizer, vector, args.dense);
                writeln!(out, "{}", serde_json::to_string(&line)?)?;
            }
            out.flush()?;
        }
        Command::Inspect(args) => {
            let featurizer = load_model(&args.model)?;
            let mut out = BufWriter::new(std::io::stdout().lock());
            inspect(&featurizer, args, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

fn build_params(args: &FitArgs) -> Result<FeaturizerParams> {
    let base = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => FeaturizerParams::default(),
    };
    args.params.apply(base)
}

fn load_records(path: Option<&Path>, format: InputFormat, columns: usize) -> Result<Vec<Record>> {
    let contents = records::read_input(path)?;
    if format.json {
        records::parse_json(&contents)
    } else {
        records::parse_lines(&contents, format.delimiter, columns)
    }
}

fn fit(args: &FitArgs, show_progress: bool) -> Result<Featurizer> {
    let params = build_params(args)?;
    let mut featurizer = Featurizer::new(params).context("Invalid featurizer parameters")?;

    if featurizer.is_fit() {
        info!("Hashing feature space needs no corpus; skipping fit");
        return Ok(featurizer);
    }

    let records = load_records(
        args.corpus.as_deref(),
        args.format,
        featurizer.params().columns().len(),
    )?;
    let documents: Vec<_> = records.iter().map(Record::document).collect();

    let spinner = if show_progress && documents.len() >= MIN_RECORDS_FOR_PROGRESS {
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Fitting on {} records", documents.len()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    };
    let fitted = featurizer
        .fit(&documents)
        .context("Failed to fit featurizer");
    spinner.finish_and_clear();
    fitted?;

    info!(
        num_records = documents.len(),
        dimension = featurizer.dimension(),
        "Featurizer fit"
    );
    Ok(featurizer)
}

fn transform(
    featurizer: &Featurizer,
    records: &[Record],
    show_progress: bool,
) -> Result<Vec<FeatureVector>> {
    let pb = if show_progress && records.len() >= MIN_RECORDS_FOR_PROGRESS {
        progress_bar_setup(records.len(), "Featurizing records")?
    } else {
        ProgressBar::hidden()
    };
    let vectors = records
        .par_iter()
        .progress_with(pb.clone())
        .map(|record| featurizer.transform(&record.document()))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to featurize records")?;
    pb.finish_and_clear();
    Ok(vectors)
}

/// Sparse rendering keys slots by gram name when the slot has one.
fn render_vector(featurizer: &Featurizer, vector: &FeatureVector, dense: bool) -> serde_json::Value {
    if dense {
        return serde_json::json!({
            "values": vector.as_slice(),
            "dim": vector.len(),
        });
    }
    let nonzero: serde_json::Map<String, serde_json::Value> = vector
        .nonzero()
        .map(|(slot, value)| {
            let key = featurizer
                .slot_name(slot)
                .unwrap_or_else(|| slot.to_string());
            (key, value.into())
        })
        .collect();
    serde_json::json!({
        "nonzero": nonzero,
        "dim": vector.len(),
    })
}

fn save_model(featurizer: &Featurizer, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create model file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, featurizer)
        .with_context(|| format!("Failed to write model file: {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn load_model(path: &Path) -> Result<Featurizer> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open model file: {}", path.display()))?;
    let featurizer: Featurizer = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
    if !featurizer.is_fit() {
        bail!("model file {} holds an unfit featurizer", path.display());
    }
    Ok(featurizer)
}

fn inspect(featurizer: &Featurizer, args: &InspectArgs, out: &mut impl Write) -> Result<()> {
    let params = featurizer.params();
    let dimension = featurizer.dimension().unwrap_or(0);
    let names: Vec<(usize, String)> = (0..dimension)
        .filter_map(|slot| featurizer.slot_name(slot).map(|name| (slot, name)))
        .collect();

    if args.json {
        let summary = serde_json::json!({
            "params": params,
            "state": format!("{:?}", featurizer.state()),
            "dim": dimension,
            "vocabulary": names.iter().map(|(_, name)| name).collect::<Vec<_>>(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    writeln!(out, "mode:          {:?}", params.mode())?;
    writeln!(out, "state:         {:?}", featurizer.state())?;
    writeln!(out, "columns:       {}", params.columns().join(", "))?;
    writeln!(out, "multi-column:  {:?}", params.multi_column())?;
    writeln!(out, "word n-grams:  {}", describe_range(params.ngram_range()))?;
    writeln!(out, "char-grams:    {}", describe_range(params.chargram_range()))?;
    writeln!(out, "weighting:     {:?}", params.weighting())?;
    writeln!(out, "normalization: {:?}", params.normalization())?;
    writeln!(out, "dimension:     {dimension}")?;

    if names.is_empty() {
        return Ok(());
    }
    writeln!(out, "vocabulary ({} named slots):", names.len())?;
    for (slot, name) in names.iter().take(args.limit) {
        writeln!(out, "  {slot:>8}  {name}")?;
    }
    if names.len() > args.limit {
        writeln!(out, "  ... {} more", names.len() - args.limit)?;
    }
    Ok(())
}

fn describe_range(range: Option<(usize, usize)>) -> String {
    match range {
        Some((min_n, max_n)) => format!("{min_n}..={max_n}"),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_args(argv: &[&str]) -> FitArgs {
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        match cli.command {
            Command::Fit(args) => args,
            other => panic!("expected fit command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1,3"), Ok((1, 3)));
        assert_eq!(parse_range("4"), Ok((4, 4)));
        assert!(parse_range("a,2").is_err());
    }

    #[test]
    fn test_cli_rejects_conflicting_flags() {
        let result = Cli::try_parse_from([
            "featurize",
            "fit",
            "--output",
            "m.json",
            "--ngram-range",
            "1,2",
            "--no-word-ngrams",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_param_overrides() {
        let args = fit_args(&[
            "featurize",
            "fit",
            "--output",
            "m.json",
            "--ngram-range",
            "1,2",
            "--no-chargrams",
            "--mode",
            "hashing",
            "--hash-table-size",
            "64",
            "--weighting",
            "tf-idf",
            "--norm",
            "l2",
            "--columns",
            "title,body",
            "--independent-columns",
        ]);
        let params = build_params(&args).expect("params should build");
        assert_eq!(params.ngram_range(), Some((1, 2)));
        assert_eq!(params.chargram_range(), None);
        assert_eq!(params.mode(), FeatureMode::Hashing);
        assert_eq!(params.hash_table_size(), 64);
        assert_eq!(params.weighting(), Weighting::TfIdf);
        assert_eq!(params.normalization(), VectorNorm::L2);
        assert_eq!(params.columns(), ["title", "body"]);
        assert_eq!(params.multi_column(), MultiColumnStrategy::Independent);
    }

    #[test]
    fn test_config_file_with_override() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = dir.path().join("params.json");
        let base = FeaturizerParams::new()
            .with_ngram_range(1, 3)
            .with_max_vocabulary_size(7);
        std::fs::write(&config, serde_json::to_string(&base).expect("params should serialize"))
            .expect("config should be written");

        let config_arg = config.to_string_lossy().into_owned();
        let args = fit_args(&[
            "featurize",
            "fit",
            "--output",
            "m.json",
            "--config",
            &config_arg,
            "--max-vocabulary-size",
            "3",
        ]);
        let params = build_params(&args).expect("params should build");
        assert_eq!(params.ngram_range(), Some((1, 3)));
        assert_eq!(params.max_vocabulary_size(), 3);
    }

    #[test]
    fn test_fit_save_load_transform() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let corpus = dir.path().join("corpus.txt");
        let model = dir.path().join("model.json");
        std::fs::write(&corpus, "the cat sat\nthe dog sat\n").expect("corpus should be written");

        let corpus_arg = corpus.to_string_lossy().into_owned();
        let model_arg = model.to_string_lossy().into_owned();
        let args = fit_args(&[
            "featurize",
            "fit",
            "--corpus",
            &corpus_arg,
            "--output",
            &model_arg,
            "--ngram-range",
            "1,2",
            "--no-chargrams",
        ]);
        let featurizer = fit(&args, false).expect("fit should succeed");
        assert_eq!(featurizer.dimension(), Some(8));
        save_model(&featurizer, &model).expect("save should succeed");

        let loaded = load_model(&model).expect("load should succeed");
        let records = records::parse_lines("the cat\n", '\t', 1).expect("parse should succeed");
        let vectors = transform(&loaded, &records, false).expect("transform should succeed");
        let rendered = render_vector(&loaded, &vectors[0], false);
        assert_eq!(rendered["dim"], 8);
        assert_eq!(rendered["nonzero"]["the"], 1.0);
        assert_eq!(rendered["nonzero"]["cat"], 1.0);
        assert_eq!(rendered["nonzero"]["the_cat"], 1.0);
        assert_eq!(rendered["nonzero"].as_object().map(|m| m.len()), Some(3));

        let dense = render_vector(&loaded, &vectors[0], true);
        assert_eq!(dense["values"].as_array().map(Vec::len), Some(8));
    }

    #[test]
    fn test_hashing_fit_skips_corpus() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let model = dir.path().join("model.json");
        let model_arg = model.to_string_lossy().into_owned();
        let args = fit_args(&[
            "featurize",
            "fit",
            "--corpus",
            "/nonexistent/corpus.txt",
            "--output",
            &model_arg,
            "--mode",
            "hashing",
            "--hash-table-size",
            "32",
        ]);
        let featurizer = fit(&args, false).expect("hashing fit should not read the corpus");
        assert_eq!(featurizer.dimension(), Some(32));
    }

    #[test]
    fn test_transform_reports_column_mismatch() {
        let featurizer = Featurizer::new(
            FeaturizerParams::new()
                .with_columns(["title", "body"])
                .with_mode(FeatureMode::Hashing)
                .with_hash_table_size(16),
        )
        .expect("featurizer should build");
        let records = records::parse_json(r#"["only one field"]"#).expect("parse should succeed");
        assert!(transform(&featurizer, &records, false).is_err());
    }

    #[test]
    fn test_inspect_lists_vocabulary() {
        let mut featurizer = Featurizer::new(
            FeaturizerParams::new()
                .without_chargrams()
                .with_max_vocabulary_size(10),
        )
        .expect("featurizer should build");
        let records = records::parse_lines("b a\nb\n", '\t', 1).expect("parse should succeed");
        let documents: Vec<_> = records.iter().map(Record::document).collect();
        featurizer.fit(&documents).expect("fit should succeed");

        let args = InspectArgs {
            model: PathBuf::new(),
            limit: 1,
            json: false,
        };
        let mut out = Vec::new();
        inspect(&featurizer, &args, &mut out).expect("inspect should succeed");
        let text = String::from_utf8(out).expect("output should be utf-8");
        assert!(text.contains("dimension:     2"));
        assert!(text.contains("0  b"));
        assert!(text.contains("... 1 more"));
    }

    #[test]
    fn test_render_keeps_underscore_grams_apart() {
        let mut featurizer = Featurizer::new(
            FeaturizerParams::new()
                .with_ngram_range(1, 2)
                .without_chargrams(),
        )
        .expect("featurizer should build");
        let records = records::parse_lines("a_b a b\n", '\t', 1).expect("parse should succeed");
        let documents: Vec<_> = records.iter().map(Record::document).collect();
        featurizer.fit(&documents).expect("fit should succeed");

        let vectors = transform(&featurizer, &records, false).expect("transform should succeed");
        let rendered = render_vector(&featurizer, &vectors[0], false);
        assert_eq!(rendered["dim"], 5);
        assert_eq!(rendered["nonzero"].as_object().map(|m| m.len()), Some(5));
        assert_eq!(rendered["nonzero"][r"a\_b"], 1.0);
        assert_eq!(rendered["nonzero"]["a_b"], 1.0);
    }

    #[test]
    fn test_load_model_rejects_tampered_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let model = dir.path().join("model.json");
        let featurizer = Featurizer::new(
            FeaturizerParams::new()
                .with_mode(FeatureMode::Hashing)
                .with_hash_table_size(16),
        )
        .expect("featurizer should build");
        save_model(&featurizer, &model).expect("save should succeed");
        assert!(load_model(&model).is_ok());

        let json = std::fs::read_to_string(&model).expect("model should be readable");
        let tampered = json.replace(r#""table_size":16"#, r#""table_size":0"#);
        assert_ne!(tampered, json);
        std::fs::write(&model, tampered).expect("model should be written");
        let err = load_model(&model).unwrap_err();
        assert!(format!("{err:#}").contains("table size of zero"), "{err:#}");
    }
}
