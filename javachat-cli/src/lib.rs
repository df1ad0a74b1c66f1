//! # javachat-cli
//!
//! The `javachat` developer command. `javachat prompt` indexes a JSON file of
//! documents into an in-memory store with the offline hashing embedder and
//! prints the prompt the chat service would send for one turn, along with the
//! retrieval quality note and citations. `javachat analyze` shows the version
//! hints derived from a query.

pub mod cli;
pub mod commands;

use std::io::Write;

pub use cli::{Cli, Command, PromptArgs};

/// Run a parsed command, writing its output to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Command::Prompt(args) => commands::run_prompt(&args, out).await,
        Command::Analyze { query } => commands::run_analyze(&query, out),
    }
}
