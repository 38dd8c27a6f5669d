//! CLI module for tldw.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tldw - YouTube video summaries steered by your own examples
///
/// Summarizes a video's transcript with an OpenAI chat model, showing it the
/// most similar hand-written summary from your example store first.
#[derive(Parser, Debug)]
#[command(name = "tldw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a YouTube video
    Summarize {
        /// YouTube URL or video ID
        url: String,

        /// Chat model (e.g. gpt-4o-mini, gpt-4)
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature between 0.0 and 1.0
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Number of few-shot examples to show the model
        #[arg(short)]
        k: Option<usize>,

        /// OpenAI API key (overrides environment and config)
        #[arg(long, env = "TLDW_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Example store to use instead of the configured one
        #[arg(long)]
        examples: Option<String>,

        /// Summarize without few-shot examples
        #[arg(long, conflicts_with_all = ["k", "examples"])]
        no_examples: bool,

        /// Write the summary to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Print the assembled prompt before the summary
        #[arg(long)]
        show_prompt: bool,
    },

    /// Add a video and your own summary of it to the example store
    AddExample {
        /// YouTube URL or video ID
        url: String,

        /// Read the summary from this file instead of opening an editor
        #[arg(short, long)]
        summary_file: Option<String>,

        /// Editor to write the summary in (defaults to $EDITOR, then nano)
        #[arg(short, long)]
        editor: Option<String>,

        /// Example store to append to instead of the configured one
        #[arg(long)]
        examples: Option<String>,
    },

    /// List the examples in the store
    Examples {
        /// Example store to read instead of the configured one
        #[arg(long)]
        examples: Option<String>,
    },

    /// Start the web interface
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8501")]
        port: u16,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (API key masked)
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::try_parse_from([
            "tldw",
            "summarize",
            "https://youtu.be/dQw4w9WgXcQ",
            "-m",
            "gpt-4",
            "-t",
            "0.5",
            "-k",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Summarize {
                url,
                model,
                temperature,
                k,
                no_examples,
                ..
            } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(model.as_deref(), Some("gpt-4"));
                assert_eq!(temperature, Some(0.5));
                assert_eq!(k, Some(2));
                assert!(!no_examples);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_examples_conflicts_with_k() {
        let result = Cli::try_parse_from(["tldw", "summarize", "dQw4w9WgXcQ", "-k", "2", "--no-examples"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_add_example() {
        let cli = Cli::try_parse_from(["tldw", "add-example", "dQw4w9WgXcQ", "--summary-file", "s.md"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::AddExample { summary_file: Some(ref f), .. } if f == "s.md"
        ));
    }
}
