//! Firmscope CLI: company profiles from web search and LLM extraction.
//!
//! Searches the web for a company, scrapes the top sources and its
//! leadership page, and asks a model to assemble a structured profile.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
