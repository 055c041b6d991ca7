//! datalift - ingest Kaggle datasets and arXiv papers into object storage
//!
//! Runs named jobs from the config file or ad-hoc jobs from the command
//! line, and prints the name of every object it publishes.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "datalift")]
#[command(about = "Ingest Kaggle datasets and arXiv papers into object storage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./datalift.toml or ~/.config/datalift/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job defined in the config file
    Run(cmd::run::RunArgs),
    /// Ingest a Kaggle dataset without a job definition
    Ingest(cmd::run::IngestArgs),
    /// Ingest the latest papers of an arXiv category
    Arxiv(cmd::run::ArxivArgs),
    /// Download a published object
    Get(cmd::get::GetArgs),
    /// List jobs defined in the config file
    Jobs,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(datalift_core::ProgressContext::new());

    let multi = progress.is_tty().then(|| progress.multi());
    let verbosity = datalift_core::Verbosity::from_flags(cli.quiet, cli.debug);
    datalift_core::init_logging(verbosity, multi).context("Failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Ingest(args) => cmd::run::ingest(args, &config, &progress),
        Command::Arxiv(args) => cmd::run::arxiv(args, &config, &progress),
        Command::Get(args) => cmd::get::run(args, &config),
        Command::Jobs => cmd::jobs::run(&config),
        Command::Config => {
            show_config(&config);
            Ok(())
        }
    }
}

fn show_config(config: &Config) {
    use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

    fn or_env(value: &Option<String>, var: &str) -> String {
        match value {
            Some(v) => v.clone(),
            None => format!("${var}"),
        }
    }
    fn secret(value: &Option<String>, var: &str) -> String {
        match value {
            Some(_) => "configured".to_string(),
            None => format!("${var}"),
        }
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Config file", &config.origin()]);
    table.add_row(vec!["Workspace", &config.workspace.display().to_string()]);
    table.add_row(vec![
        "Default bucket",
        config.default_bucket.as_deref().unwrap_or("not set"),
    ]);
    table.add_row(vec!["Jobs", &config.jobs.len().to_string()]);

    let storage = &config.storage;
    match &storage.local_dir {
        Some(dir) => {
            table.add_row(vec!["Store", &format!("local: {}", dir.display())]);
        }
        None => {
            table.add_row(vec!["Store endpoint", &or_env(&storage.endpoint, "MINIO_ENDPOINT")]);
            table.add_row(vec!["Store access key", &or_env(&storage.access_key, "MINIO_ACCESS_KEY")]);
            table.add_row(vec!["Store secret key", &secret(&storage.secret_key, "MINIO_SECRET_KEY")]);
            table.add_row(vec!["Store region", &or_env(&storage.region, "MINIO_REGION")]);
            table.add_row(vec![
                "Store TLS",
                &storage
                    .secure
                    .map_or_else(|| "$MINIO_USE_SSL".to_string(), |s| s.to_string()),
            ]);
        }
    }

    table.add_row(vec!["Kaggle API URL", &config.kaggle.api_url]);
    table.add_row(vec!["Kaggle user", &or_env(&config.kaggle.username, "KAGGLE_USERNAME")]);
    table.add_row(vec!["Kaggle key", &secret(&config.kaggle.key, "KAGGLE_KEY")]);
    table.add_row(vec!["arXiv API URL", &config.arxiv.api_url]);
    table.add_row(vec![
        "arXiv paging",
        &format!(
            "{} results, {} per page, {}ms apart",
            config.arxiv.max_results, config.arxiv.batch_size, config.arxiv.request_delay_ms
        ),
    ]);
    table.add_row(vec![
        "HTTP timeouts",
        &format!(
            "connect {}s, read {}s",
            config.http.connect_timeout, config.http.read_timeout
        ),
    ]);

    eprintln!("\n{table}");
}
