//! Command line structure

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Use LLMs to generate cloze sentences
#[derive(Parser, Debug)]
#[command(name = "clozify", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare training data for model fine-tuning
    #[command(subcommand)]
    Prep(PrepCommand),

    /// Write fine-tuning training data from a cleaned join
    FinetuneData(FinetuneDataArgs),

    /// Generate clozes using a chat model
    Chat(ChatArgs),

    /// Generate clozes using a fine-tuned completion model
    Complete(CompleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum PrepCommand {
    /// Extract clozes from scraped JSON data
    Parse(ParseArgs),

    /// Get embeddings for the word or cloze column of CSV files
    Embed(EmbedArgs),

    /// Join cloze and vocab data based on embedding similarities
    Match(MatchArgs),

    /// Update a candidate join based on manual review
    Fix(FixArgs),

    /// List vocabulary words that have more than one definition
    Senses(SensesArgs),
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Scraped collection pages
    #[arg(value_name = "JSON_FILE")]
    pub json_file: PathBuf,

    /// Output CSV file
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Vocabulary or cloze CSV files
    #[arg(value_name = "CSV_FILES", required = true)]
    pub csv_files: Vec<PathBuf>,

    /// Output directory; each input is written as `<stem>-embeds.csv`
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Column to embed instead of `word`/`cloze`
    #[arg(long, value_name = "COLUMN")]
    pub column: Option<String>,

    /// Skip the embedding cache even if one is configured
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    #[arg(value_name = "CLOZE_CSV")]
    pub cloze_csv: PathBuf,

    #[arg(value_name = "VOCAB_CSV")]
    pub vocab_csv: PathBuf,

    /// Output CSV file
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct FixArgs {
    #[arg(value_name = "CANDIDATE_JOIN")]
    pub candidate_join: PathBuf,

    #[arg(value_name = "MANUAL_REVIEW")]
    pub manual_review: PathBuf,

    #[arg(value_name = "VOCAB_CSV")]
    pub vocab_csv: PathBuf,

    /// Output CSV file
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,

    /// Keep embeddings and correction bookkeeping columns
    #[arg(long)]
    pub keep_intermediate: bool,
}

#[derive(Args, Debug)]
pub struct SensesArgs {
    #[arg(value_name = "VOCAB_CSV")]
    pub vocab_csv: PathBuf,

    /// Output CSV file, `-` for stdout
    #[arg(short, long, default_value = "-")]
    pub output: String,
}

#[derive(Args, Debug)]
pub struct FinetuneDataArgs {
    /// Cleaned join
    #[arg(value_name = "CSV_FILE")]
    pub csv_file: PathBuf,

    /// JSON Lines output
    #[arg(value_name = "TRAINING_DATA_OUTPUT")]
    pub training_data_output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Word to clozify
    pub word: Option<String>,

    /// Read one word per line from a file
    #[arg(short, long, value_name = "PATH", conflicts_with = "word")]
    pub file: Option<PathBuf>,

    /// Output location, `-` for stdout
    #[arg(short, long, default_value = "-")]
    pub output: String,
}

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Word to clozify
    pub word: Option<String>,

    /// Definition of the word
    #[arg(requires = "word")]
    pub defn: Option<String>,

    /// Input CSV file with `word` and `definition` columns
    #[arg(short, long, value_name = "PATH", conflicts_with = "word")]
    pub file: Option<PathBuf>,

    /// Fine-tuned completion model
    #[arg(short, long = "model-id")]
    pub model_id: String,

    /// Output location, `-` for stdout
    #[arg(short, long, default_value = "-")]
    pub output: String,
}
