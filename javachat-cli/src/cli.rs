use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "javachat", version, about = "Inspect Java Chat retrieval and prompt assembly")]
pub struct Cli {
    /// Emit logs as JSON objects on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed an in-memory store and print the prompt for one chat turn.
    Prompt(PromptArgs),

    /// Show the version hints derived from a query.
    Analyze {
        /// The user query to analyse.
        query: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// JSON file with an array of documents to index.
    #[arg(long)]
    pub docs: PathBuf,

    /// The user's question.
    #[arg(short, long)]
    pub query: String,

    /// JSON file with earlier turns: `[{"role": "user", "text": "..."}]`.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// File replacing the core system prompt. `{jdk_version}` is substituted.
    #[arg(long)]
    pub system: Option<PathBuf>,

    /// Token budget for the assembled prompt.
    #[arg(short, long, default_value_t = 8192)]
    pub budget: usize,

    /// Candidates fetched per search.
    #[arg(long, default_value_t = 10)]
    pub top_k: usize,

    /// Documents kept for the prompt.
    #[arg(long, default_value_t = 5)]
    pub return_k: usize,

    /// JDK version named in the system prompt.
    #[arg(long, default_value = "25")]
    pub jdk_version: String,

    /// Dimensions of the offline hashing embedder.
    #[arg(long, default_value_t = 384)]
    pub dimensions: usize,

    /// Print the full result as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_prompt_arguments() {
        let cli = Cli::parse_from([
            "javachat",
            "--json-logs",
            "prompt",
            "--docs",
            "docs.json",
            "-q",
            "What's new in Java 25?",
            "--budget",
            "2048",
            "--top-k",
            "4",
        ]);
        assert!(cli.json_logs);
        match cli.command {
            Command::Prompt(args) => {
                assert_eq!(args.docs, PathBuf::from("docs.json"));
                assert_eq!(args.query, "What's new in Java 25?");
                assert_eq!(args.budget, 2048);
                assert_eq!(args.top_k, 4);
                assert_eq!(args.return_k, 5);
                assert!(args.history.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
