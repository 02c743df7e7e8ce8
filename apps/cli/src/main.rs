//! htmlpage-indexer CLI: manage HTML pages and feed them to the search index.
//!
//! Runs full indexing passes, single-page lookups for incremental updates,
//! and small page-management chores against the local libSQL database.

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
