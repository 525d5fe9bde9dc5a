//! CLI command implementations for convopt.
//!
//! Provides subcommand handlers for:
//! - `convopt samples add|list|remove`: manage labeled copy samples
//! - `convopt api show|set|test`: manage and check the API configuration
//! - `convopt analyze`: extract conversion features from the samples
//! - `convopt optimize "copy"`: score and rewrite a piece of copy
//! - `convopt serve`: run the embedded web page
//! - `convopt stats`: activity summary from the event log
//! - `convopt config show|init|set|reset`: settings management

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::EventLog;
use crate::analytics::reporter::{self, Stats};
use crate::config::{self, ConvoptConfig};
use crate::llm::{FeatureAnalysisResult, LlmClient, OptimizationResult, UreqTransport};
use crate::samples::{ContentSample, Label, SampleManager};
use crate::session::Session;
use crate::storage::{self, FileStore};
use crate::web::{self, AppState};

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn open_samples(cfg: &ConvoptConfig) -> Result<SampleManager<FileStore>> {
    let dir = cfg
        .data_dir()
        .context("could not determine data directory (set storage.data_dir)")?;
    Ok(SampleManager::open(FileStore::new(dir)))
}

fn event_log(cfg: &ConvoptConfig) -> EventLog {
    if cfg.logging.enabled {
        EventLog::default_location()
    } else {
        EventLog::disabled()
    }
}

fn client(samples: &SampleManager<FileStore>, cfg: &ConvoptConfig) -> LlmClient {
    let api = storage::load_api_config(samples.store());
    LlmClient::from_config(&api)
        .max_tokens(cfg.llm.max_tokens)
        .prompt_language(cfg.llm.prompt_language)
}

/// Read a text argument; `-` means stdin.
fn read_text_arg(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// convopt samples
// ---------------------------------------------------------------------------

/// Add a labeled sample.
pub fn run_samples_add(content: &str, label: Label) -> Result<()> {
    let cfg = config::load();
    let mut samples = open_samples(&cfg)?;
    let content = read_text_arg(content)?;

    let sample = samples.add(&content, label)?;
    println!(
        "{} Added {} sample {}",
        "✓".green().bold(),
        colorize_label(label),
        sample.id.dimmed()
    );

    let counts = samples.counts();
    println!(
        "  {} high, {} low",
        counts.high.to_string().green(),
        counts.low.to_string().red()
    );
    Ok(())
}

/// List samples, optionally filtered by label.
pub fn run_samples_list(label: Option<Label>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;

    let listed: Vec<ContentSample> = match label {
        Some(label) => samples.by_label(label),
        None => samples.samples().to_vec(),
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if listed.is_empty() {
        println!(
            "{}",
            "No samples yet. Add some with `convopt samples add <TEXT> --label high|low`.".yellow()
        );
        return Ok(());
    }

    let counts = samples.counts();
    println!("{}", "Copy Samples".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {} {}   {} {}",
        "High:".bold(),
        counts.high,
        "Low:".bold(),
        counts.low
    );
    println!();

    for sample in &listed {
        let added = sample
            .created_at_utc()
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        println!(
            "  [{}] {} {}",
            colorize_label(sample.label),
            sample.id.dimmed(),
            added.dimmed()
        );
        for line in sample.content.lines() {
            println!("      {line}");
        }
    }

    Ok(())
}

/// Remove a sample by id.
pub fn run_samples_remove(id: &str) -> Result<()> {
    let cfg = config::load();
    let mut samples = open_samples(&cfg)?;

    let removed = samples.remove(id)?;
    println!(
        "{} Removed {} sample {}",
        "✓".green().bold(),
        colorize_label(removed.label),
        removed.id.dimmed()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// convopt api
// ---------------------------------------------------------------------------

/// Show the stored API configuration with the key masked.
pub fn run_api_show() -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;
    let api = storage::load_api_config(samples.store());

    println!("{}", "API Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Endpoint:".bold(), api.endpoint_url);
    println!(
        "  {} {}",
        "API key: ".bold(),
        if api.has_api_key() {
            api.masked_api_key().normal()
        } else {
            "(not set)".yellow()
        }
    );
    println!("  {} {}", "Model:   ".bold(), api.model);
    println!(
        "  {} {}",
        "Data dir:".bold(),
        samples.store().dir().display()
    );
    Ok(())
}

/// Update any of the endpoint, key and model.
pub fn run_api_set(
    endpoint_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
) -> Result<()> {
    if endpoint_url.is_none() && api_key.is_none() && model.is_none() {
        anyhow::bail!("nothing to set (use --url, --key or --model)");
    }

    let cfg = config::load();
    let mut samples = open_samples(&cfg)?;
    let mut api = storage::load_api_config(samples.store());
    api.apply_updates(endpoint_url, api_key, model);
    storage::save_api_config(samples.store_mut(), &api);

    println!("{} API configuration saved", "✓".green().bold());
    run_api_show()
}

/// Send a tiny request to check the endpoint and key.
pub fn run_api_test() -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;
    let session = Session::new(event_log(&cfg));
    let client = client(&samples, &cfg);

    println!("Testing {} ...", client.model_name().bold());
    session.test_connection(&client)?;
    println!("{} Connection succeeded", "✓".green().bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// convopt analyze
// ---------------------------------------------------------------------------

/// Analyze the stored samples, optionally saving the result to a file.
pub fn run_analyze(output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;
    let mut session = Session::new(event_log(&cfg));
    let client = client(&samples, &cfg);

    let counts = samples.counts();
    eprintln!(
        "{}",
        format!(
            "Analyzing {} high / {} low samples with {} ...",
            counts.high,
            counts.low,
            client.model_name()
        )
        .dimmed()
    );
    let analysis = session.analyze(&client, samples.samples())?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(analysis)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write analysis to {}", path.display()))?;
        eprintln!(
            "{} Analysis saved to {}",
            "✓".green().bold(),
            path.display()
        );
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(analysis)?),
        OutputFormat::Table => print_analysis(analysis),
    }
    Ok(())
}

fn print_analysis(analysis: &FeatureAnalysisResult) {
    println!("{}", "Feature Analysis".bold().cyan());
    println!("{}", "=".repeat(60));
    print_list("High-converting features", &analysis.high_features);
    print_list("Low-converting features", &analysis.low_features);
    print_list("Key differences", &analysis.key_differences);
    print_list("Recommendations", &analysis.recommendations);
}

// ---------------------------------------------------------------------------
// convopt optimize
// ---------------------------------------------------------------------------

/// Score and rewrite `content`.
///
/// Uses the analysis saved at `analysis_path` when given; otherwise runs a
/// fresh analysis of the stored samples first.
pub fn run_optimize(
    content: &str,
    analysis_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;
    let mut session = Session::new(event_log(&cfg));
    let client = client(&samples, &cfg);
    let content = read_text_arg(content)?;

    match analysis_path {
        Some(path) => session.set_analysis(load_analysis(path)?),
        None => {
            eprintln!(
                "{}",
                "No --analysis file given; analyzing samples first ...".dimmed()
            );
            session.analyze(&client, samples.samples())?;
        }
    }

    let result = session.optimize(&client, &content)?;

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&result)?;
            value["rating"] = serde_json::Value::from(result.rating());
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => print_optimization(&result),
    }
    Ok(())
}

fn load_analysis(path: &Path) -> Result<FeatureAnalysisResult> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read analysis file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a saved feature analysis", path.display()))
}

fn print_optimization(result: &OptimizationResult) {
    println!("{}", "Copy Optimization".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {} {} / 100 ({})",
        "Score:".bold(),
        colorize_score(result.score),
        result.rating()
    );
    print_list("Strengths", &result.strengths);
    print_list("Weaknesses", &result.weaknesses);
    print_list("Suggestions", &result.suggestions);
    println!();
    println!("{}", "Optimized version".bold().cyan());
    for line in result.optimized_version.lines() {
        println!("  {line}");
    }
}

// ---------------------------------------------------------------------------
// convopt serve
// ---------------------------------------------------------------------------

/// Run the embedded web page until interrupted.
pub fn run_serve(addr: Option<String>, no_open: bool) -> Result<()> {
    let cfg = config::load();
    let samples = open_samples(&cfg)?;
    let addr = addr.unwrap_or_else(|| cfg.server.addr.clone());

    let mut state = AppState {
        samples,
        session: Session::new(event_log(&cfg)),
        transport: UreqTransport::default(),
        llm: cfg.llm.clone(),
    };
    web::serve(&addr, &mut state, cfg.server.open_browser && !no_open)
}

// ---------------------------------------------------------------------------
// convopt stats
// ---------------------------------------------------------------------------

/// Show per-operation activity statistics.
pub fn run_stats(format: OutputFormat, days: Option<u32>) -> Result<()> {
    let cfg = config::load();
    let log = event_log(&cfg);
    if !log.is_enabled() {
        println!(
            "{}",
            "Activity logging is disabled (logging.enabled = false).".yellow()
        );
        return Ok(());
    }

    let stats = reporter::build_stats(&log.read_since_days(days));
    if stats.total_calls == 0 {
        println!(
            "{}",
            "No activity yet. Run `convopt analyze` or `convopt serve` to see stats.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Table => print_stats_table(&stats),
    }
    Ok(())
}

fn print_stats_table(stats: &Stats) {
    println!("{}", "convopt Activity Report".bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Total LLM calls:".bold(), stats.total_calls);
    println!();
    println!(
        "  {:<16} {:>6} {:>9} {:>12} {:>9}",
        "Operation", "Count", "Success", "Avg latency", "Avg score"
    );
    println!("  {}", "-".repeat(56));

    for (i, op) in stats.operations.iter().enumerate() {
        let score = op
            .avg_score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let line = format!(
            "  {:<16} {:>6} {:>8.0}% {:>10.0}ms {:>9}",
            op.operation.to_string(),
            op.count,
            op.success_pct(),
            op.avg_latency_ms,
            score,
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }

        for (kind, n) in &op.failures_by_kind {
            println!("      {} {kind}: {n}", "✗".red());
        }
    }
}

// ---------------------------------------------------------------------------
// convopt config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective convopt Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.convopt/config.toml", global_exists);
    print_source(".convopt.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "CONVOPT_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.convopt/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn print_list(title: &str, items: &[String]) {
    println!();
    println!("{}", title.bold());
    if items.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for item in items {
        println!("  • {item}");
    }
}

fn colorize_label(label: Label) -> colored::ColoredString {
    match label {
        Label::High => "high".green(),
        Label::Low => "low".red(),
    }
}

/// Colorize a score by rubric band.
fn colorize_score(score: u8) -> colored::ColoredString {
    let s = score.to_string();
    match score {
        80..=100 => s.green().bold(),
        60..=79 => s.cyan().bold(),
        40..=59 => s.yellow().bold(),
        _ => s.red().bold(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_str_opt(Some("csv")),
            OutputFormat::Table
        );
    }

    #[test]
    fn text_argument_is_passed_through() {
        assert_eq!(read_text_arg("Buy now").unwrap(), "Buy now");
    }

    #[test]
    fn saved_analysis_loads_back() {
        let dir = std::env::temp_dir().join(format!("convopt-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("analysis.json");
        fs::write(
            &path,
            r#"{"highFeatures":["a"],"lowFeatures":["b"],"keyDifferences":["c"],"recommendations":["d"]}"#,
        )
        .unwrap();

        let analysis = load_analysis(&path).unwrap();
        assert_eq!(analysis.high_features, vec!["a"]);
        assert_eq!(analysis.recommendations, vec!["d"]);

        fs::write(&path, "{}").unwrap();
        assert!(load_analysis(&path).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
