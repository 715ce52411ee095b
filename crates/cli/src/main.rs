mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // library crates log through `log`; the fmt subscriber picks those records up too
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Anonymize {
            input,
            output,
            ocr,
            verify,
            audit,
        } => commands::anonymize::handle(
            &cli.config,
            &input,
            &output,
            ocr,
            verify,
            audit.as_deref(),
        ),
        cli::Commands::Text { input, json } => commands::text::handle(&input, json),
        cli::Commands::Extract { input, output, ocr } => {
            commands::extract::handle(&input, output.as_deref(), ocr)
        }
        cli::Commands::Watch {
            input_dir,
            output_dir,
            interval_ms,
            ocr,
            verify,
            once,
        } => commands::watch::handle(commands::watch::WatchOptions {
            input_dir,
            output_dir,
            config: cli.config,
            interval: std::time::Duration::from_millis(interval_ms),
            ocr,
            verify,
            once,
        }),
    }
}
