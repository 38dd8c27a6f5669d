//! tldw CLI entry point.

use anyhow::Result;
use clap::Parser;
use tldw::cli::{commands, Cli, Commands};
use tldw::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // OPENAI_API_KEY / OPEN_AI_KEY may come from a local .env
    dotenvy::dotenv().ok();

    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tldw={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Summarize {
            url,
            model,
            temperature,
            k,
            api_key,
            examples,
            no_examples,
            output,
            show_prompt,
        } => {
            let options = commands::SummarizeOptions {
                model,
                temperature,
                k,
                api_key,
                examples,
                no_examples,
                output,
                show_prompt,
            };
            commands::run_summarize(&url, options, settings).await?;
        }

        Commands::AddExample {
            url,
            summary_file,
            editor,
            examples,
        } => {
            commands::run_add_example(&url, summary_file, editor, examples, settings).await?;
        }

        Commands::Examples { examples } => {
            commands::run_examples(examples, settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(config_path.as_deref(), &settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
