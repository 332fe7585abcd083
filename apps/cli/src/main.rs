//! specindex CLI — build and maintain an index of specification documents.
//!
//! Turns a raw list of document locators into a linked, enriched index,
//! either from scratch, from a checkpoint, or incrementally against a
//! previous build.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
