//! clozify command line
//!
//! Builds fine-tuning data for cloze generation (scraped clozes joined to a
//! vocabulary list by embedding similarity, then corrected by hand) and
//! generates clozes with chat or fine-tuned completion models.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{
    cli::{Cli, Commands, PrepCommand},
    config::ClozifyConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Logs go to stderr so generated text can be piped from stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clozify=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClozifyConfig::from_env()?;
    debug!(
        "Models: embedding={}, chat={}",
        config.embedding_model, config.chat_model
    );

    match cli.command {
        Commands::Prep(command) => match command {
            PrepCommand::Parse(args) => commands::parse(args),
            PrepCommand::Embed(args) => commands::embed(args, &config).await,
            PrepCommand::Match(args) => commands::match_tables(args),
            PrepCommand::Fix(args) => commands::fix(args),
            PrepCommand::Senses(args) => commands::senses(args),
        },
        Commands::FinetuneData(args) => commands::finetune_data(args),
        Commands::Chat(args) => commands::chat(args, &config).await,
        Commands::Complete(args) => commands::complete(args, &config).await,
    }
}
