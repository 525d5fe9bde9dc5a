use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use convopt::cli;
use convopt::samples::Label;

#[derive(Debug, Parser)]
#[command(name = "convopt")]
#[command(about = "Ad copy conversion optimizer: learn from labeled samples, score and rewrite new copy")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage labeled copy samples
    Samples {
        #[command(subcommand)]
        action: SamplesAction,
    },
    /// Manage the LLM API endpoint, key and model
    Api {
        #[command(subcommand)]
        action: ApiAction,
    },
    /// Extract conversion features from the stored samples
    Analyze {
        /// Also save the analysis as JSON to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Score a piece of copy and suggest an optimized version
    Optimize {
        /// The copy to optimize (`-` reads stdin)
        content: String,
        /// Use an analysis saved by `convopt analyze --output` instead of analyzing again
        #[arg(long, short)]
        analysis: Option<PathBuf>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Serve the web page
    Serve {
        /// Listen address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Show LLM activity statistics
    Stats {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage application settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum SamplesAction {
    /// Add a sample (`-` reads the copy from stdin)
    Add {
        content: String,
        /// Conversion tier: high or low
        #[arg(long, short)]
        label: Label,
    },
    /// List samples
    List {
        /// Only show one tier
        #[arg(long, short)]
        label: Option<Label>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Remove a sample by id
    Remove { id: String },
}

#[derive(Debug, Subcommand)]
enum ApiAction {
    /// Show the API configuration (key masked)
    Show,
    /// Update the API configuration
    Set {
        /// Chat-completions endpoint URL
        #[arg(long)]
        url: Option<String>,
        /// Bearer API key
        #[arg(long)]
        key: Option<String>,
        /// Model identifier
        #[arg(long)]
        model: Option<String>,
    },
    /// Send a tiny request to check the endpoint and key
    Test,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config to ~/.convopt/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a config value (dotted key, e.g. llm.max_tokens)
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Samples { action } => match action {
            SamplesAction::Add { content, label } => cli::run_samples_add(&content, label),
            SamplesAction::List { label, format } => {
                let fmt = cli::OutputFormat::from_str_opt(Some(&format));
                cli::run_samples_list(label, fmt)
            }
            SamplesAction::Remove { id } => cli::run_samples_remove(&id),
        },
        Commands::Api { action } => match action {
            ApiAction::Show => cli::run_api_show(),
            ApiAction::Set { url, key, model } => cli::run_api_set(url, key, model),
            ApiAction::Test => cli::run_api_test(),
        },
        Commands::Analyze { output, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_analyze(output.as_deref(), fmt)
        }
        Commands::Optimize {
            content,
            analysis,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_optimize(&content, analysis.as_deref(), fmt)
        }
        Commands::Serve { addr, no_open } => cli::run_serve(addr, no_open),
        Commands::Stats { format, days } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt, days)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
