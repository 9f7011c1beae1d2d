//! Command implementations

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clozify_core::{
    extract_clozes, parse_pages, read_csv, write_csv, write_csv_to, Table, DEFN_COL, WORD_COL,
};
use clozify_embedding::{
    EmbeddingAttacher, EmbeddingCache, EmbeddingClient, EmbeddingConfig, RateLimiter,
};
use clozify_join::{duplicate_word_senses, JoinColumns, Joiner, ManualReview, ReviewMerger};
use clozify_llm::{
    build_training_examples, generate_batch, write_jsonl_file, ChatConfig, ChatGenerator,
    ClozeGenerator, CompletionConfig, CompletionGenerator,
};
use tracing::{info, warn};

use crate::{
    cli::{
        ChatArgs, CompleteArgs, EmbedArgs, FinetuneDataArgs, FixArgs, MatchArgs, ParseArgs,
        SensesArgs,
    },
    config::ClozifyConfig,
};

const STDOUT: &str = "-";

pub fn parse(args: ParseArgs) -> Result<()> {
    let json = fs::read_to_string(&args.json_file)
        .with_context(|| format!("Failed to read {}", args.json_file.display()))?;
    let pages = parse_pages(&json)?;
    let clozes = extract_clozes(&pages)?;
    write_csv(&clozes, &args.output)?;
    info!("Wrote {} clozes to {}", clozes.len(), args.output.display());
    Ok(())
}

pub async fn embed(args: EmbedArgs, config: &ClozifyConfig) -> Result<()> {
    let client = EmbeddingClient::new(embedding_config(config));
    let limiter = Arc::new(RateLimiter::new(config.request_interval_ms, "openai-embeddings"));
    let mut attacher = EmbeddingAttacher::new(client).with_rate_limiter(limiter);

    match (&config.cache_path, args.no_cache) {
        (Some(path), false) => {
            let cache = EmbeddingCache::new(path)
                .with_context(|| format!("Failed to open embedding cache {}", path.display()))?;
            info!("Using embedding cache at {}", path.display());
            attacher = attacher.with_cache(cache);
        }
        _ => info!("Embedding cache disabled"),
    }

    fs::create_dir_all(&args.output)?;
    for csv_file in &args.csv_files {
        let table = read_csv(csv_file)?;
        let outcome = attacher
            .attach_embeddings(&table, args.column.as_deref())
            .await
            .with_context(|| format!("Failed to embed {}", csv_file.display()))?;

        for failure in &outcome.failures {
            warn!(
                "{}: row {} has no embedding ({})",
                csv_file.display(),
                failure.row,
                failure.reason
            );
        }

        let output = embeds_path(&args.output, csv_file);
        write_csv(&outcome.table, &output)?;
        info!(
            "Wrote {} rows to {} ({} without embedding)",
            outcome.table.len(),
            output.display(),
            outcome.failures.len()
        );
    }
    Ok(())
}

/// Client settings for the configured model; an explicit dimension wins
fn embedding_config(config: &ClozifyConfig) -> EmbeddingConfig {
    let mut embedding = EmbeddingConfig::for_model(config.embedding_model.as_str());
    embedding.api_key = config.api_key.clone();
    if config.embedding_dimension.is_some() {
        embedding.dimension = config.embedding_dimension;
    }
    embedding
}

fn embeds_path(output_dir: &Path, csv_file: &Path) -> PathBuf {
    let stem = csv_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    output_dir.join(format!("{stem}-embeds.csv"))
}

pub fn match_tables(args: MatchArgs) -> Result<()> {
    let clozes = read_csv(&args.cloze_csv)?;
    let vocab = read_csv(&args.vocab_csv)?;
    let joined = Joiner::new(&clozes, &vocab).join_by_similarity()?;
    write_csv(&joined, &args.output)?;
    info!("Wrote candidate join of {} rows to {}", joined.len(), args.output.display());
    Ok(())
}

pub fn fix(args: FixArgs) -> Result<()> {
    let candidate = read_csv(&args.candidate_join)?;
    let review = ManualReview::from_table(&read_csv(&args.manual_review)?)?;
    let vocab = read_csv(&args.vocab_csv)?;

    let columns = JoinColumns::default();
    let outcome =
        ReviewMerger::new(&vocab, &columns).apply(&candidate, &review, args.keep_intermediate)?;
    write_csv(&outcome.table, &args.output)?;
    info!(
        "Wrote corrected join of {} rows to {} ({} corrected, {} removed)",
        outcome.table.len(),
        args.output.display(),
        outcome.corrected,
        outcome.removed
    );
    Ok(())
}

pub fn senses(args: SensesArgs) -> Result<()> {
    let vocab = read_csv(&args.vocab_csv)?;
    let senses = duplicate_word_senses(&vocab, &JoinColumns::default())?;
    info!("{} vocabulary rows share their word", senses.len());
    if args.output == STDOUT {
        write_csv_to(&senses, io::stdout().lock())?;
    } else {
        write_csv(&senses, &args.output)?;
    }
    Ok(())
}

pub fn finetune_data(args: FinetuneDataArgs) -> Result<()> {
    let table = read_csv(&args.csv_file)?;
    let examples = build_training_examples(&table)?;
    write_jsonl_file(&examples, &args.training_data_output)?;
    Ok(())
}

pub async fn chat(args: ChatArgs, config: &ClozifyConfig) -> Result<()> {
    let inputs: Vec<(String, String)> = match (args.word, args.file) {
        (Some(word), _) => vec![(word, String::new())],
        (None, Some(file)) => fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| (line.to_string(), String::new()))
            .collect(),
        (None, None) => {
            bail!("No input provided. Please provide either an input word or a file path")
        }
    };

    let generator = ChatGenerator::new(ChatConfig {
        api_key: config.api_key.clone(),
        model: config.chat_model.clone(),
        ..ChatConfig::default()
    });
    run_generator(&generator, &inputs, &args.output).await
}

pub async fn complete(args: CompleteArgs, config: &ClozifyConfig) -> Result<()> {
    let inputs: Vec<(String, String)> = match (args.word, args.defn, args.file) {
        (Some(word), Some(defn), _) => vec![(word, defn)],
        (None, _, Some(file)) => word_definition_pairs(&read_csv(&file)?)?,
        _ => bail!(
            "No input provided. Please provide either an input word and defn or a file path"
        ),
    };

    let generator = CompletionGenerator::new(CompletionConfig {
        api_key: config.api_key.clone(),
        ..CompletionConfig::new(args.model_id)
    })?;
    run_generator(&generator, &inputs, &args.output).await
}

/// `(word, definition)` pairs of a vocabulary-shaped table
pub fn word_definition_pairs(table: &Table) -> Result<Vec<(String, String)>> {
    let words = table.require_column(WORD_COL)?;
    let definitions = table.require_column(DEFN_COL)?;
    Ok(words
        .iter()
        .zip(definitions)
        .filter_map(|(word, definition)| {
            let word = word.as_text()?.into_owned();
            let definition = definition.as_text().map(|d| d.into_owned()).unwrap_or_default();
            Some((word, definition))
        })
        .collect())
}

async fn run_generator<G: ClozeGenerator>(
    generator: &G,
    inputs: &[(String, String)],
    output: &str,
) -> Result<()> {
    let lines = generate_batch(generator, inputs).await?;
    write_output(&lines, output)?;
    info!("Wrote {} responses to {}", lines.len(), output);
    Ok(())
}

/// Write one generated line per input to a file or stdout
pub fn write_output(lines: &[String], output: &str) -> Result<()> {
    if output == STDOUT {
        write_lines(lines, io::stdout().lock())
    } else {
        let file = fs::File::create(output).with_context(|| format!("Failed to create {output}"))?;
        write_lines(lines, BufWriter::new(file))
    }
}

fn write_lines<W: Write>(lines: &[String], mut writer: W) -> Result<()> {
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}
