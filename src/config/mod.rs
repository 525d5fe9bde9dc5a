/// Configuration system for convopt.
///
/// Provides a layered settings hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::ConvoptConfig::default()`]
/// 2. **User global config**: `~/.convopt/config.toml`
/// 3. **Project local config**: `.convopt.toml` in the current working directory
/// 4. **Environment variables**: `CONVOPT_*` overrides (highest precedence)
///
/// Layers merge key by key: a file only overrides the keys it sets, so a
/// project file that sets `[server] addr` leaves a global `[llm] max_tokens`
/// in place. A malformed file, or one whose values have the wrong type, is
/// skipped as a whole.
///
/// # Usage
///
/// ```rust,ignore
/// use convopt::config;
///
/// let cfg = config::load();
/// let store = convopt::storage::FileStore::new(cfg.data_dir().unwrap());
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::llm::PromptLanguage;

pub use schema::ConvoptConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved settings from the standard locations.
pub fn load() -> ConvoptConfig {
    load_from(global_config_path(), project_config_path())
}

/// Load settings from explicit file locations, then apply env overrides.
pub fn load_from(global: Option<PathBuf>, project: Option<PathBuf>) -> ConvoptConfig {
    let mut config = ConvoptConfig::default();

    for path in [global, project] {
        if let Some(layer) = load_toml_layer(path)
            && let Some(merged) = apply_layer(&config, layer)
        {
            config = merged;
        }
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists) as a raw table.
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is not valid TOML.
fn load_toml_layer(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

/// Overlay `layer` onto `base`, returning `None` if the result no longer
/// deserializes as settings.
fn apply_layer(base: &ConvoptConfig, layer: toml::Value) -> Option<ConvoptConfig> {
    let mut merged = toml::Value::try_from(base).ok()?;
    merge_values(&mut merged, layer);
    merged.try_into().ok()
}

/// Recursively merge `overlay` into `base`. Tables merge per key; any other
/// value replaces what was there.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.convopt/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".convopt").join("config.toml"))
}

/// Path to the project local config: `.convopt.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".convopt.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `CONVOPT_ADDR`: listen address for `convopt serve`
/// - `CONVOPT_DATA_DIR`: data directory
/// - `CONVOPT_MAX_TOKENS`: completion budget
/// - `CONVOPT_PROMPT_LANGUAGE`: prompt language (`zh`/`en`)
/// - `CONVOPT_LOGGING`: activity log on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut ConvoptConfig) {
    if let Ok(val) = std::env::var("CONVOPT_ADDR")
        && !val.is_empty()
    {
        config.server.addr = val;
    }
    if let Ok(val) = std::env::var("CONVOPT_DATA_DIR")
        && !val.is_empty()
    {
        config.storage.data_dir = val;
    }
    if let Ok(val) = std::env::var("CONVOPT_MAX_TOKENS")
        && let Ok(n) = val.parse::<u32>()
    {
        config.llm.max_tokens = n;
    }
    if let Ok(val) = std::env::var("CONVOPT_PROMPT_LANGUAGE")
        && let Ok(language) = val.parse::<PromptLanguage>()
    {
        config.llm.prompt_language = language;
    }
    if let Ok(val) = std::env::var("CONVOPT_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.convopt/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, ConvoptConfig::default_toml()).context("failed to write config file")?;
    Ok(())
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `llm.max_tokens`. The file is created from the
/// defaults if it does not exist yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let current = if path.exists() {
        fs::read_to_string(path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&ConvoptConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&current).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Refuse edits that would make the file unreadable as settings.
    let updated = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<ConvoptConfig>(&updated)
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("invalid config key '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];
    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(_) => anyhow::bail!("'{key}' cannot be set from the command line"),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("convopt-config-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("config.toml")
    }

    fn read_settings(path: &Path) -> ConvoptConfig {
        toml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn project_layer_overrides_global() {
        let global = temp_path("layer-global");
        let project = temp_path("layer-project");
        fs::create_dir_all(global.parent().unwrap()).unwrap();
        fs::create_dir_all(project.parent().unwrap()).unwrap();
        fs::write(&global, "[llm]\nmax_tokens = 2048\n").unwrap();
        fs::write(&project, "[server]\naddr = \"127.0.0.1:8000\"\n").unwrap();

        let only_global = load_from(Some(global.clone()), None);
        assert_eq!(only_global.llm.max_tokens, 2048);

        let both = load_from(Some(global.clone()), Some(project.clone()));
        assert_eq!(both.server.addr, "127.0.0.1:8000");
        assert_eq!(both.llm.max_tokens, 2048);
        assert!(both.server.open_browser);

        let _ = fs::remove_dir_all(global.parent().unwrap());
        let _ = fs::remove_dir_all(project.parent().unwrap());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[llm\nmax_tokens = ").unwrap();
        assert!(load_toml_layer(Some(path.clone())).is_none());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn mistyped_layer_is_skipped_without_losing_others() {
        let global = temp_path("typed-global");
        let project = temp_path("typed-project");
        fs::create_dir_all(global.parent().unwrap()).unwrap();
        fs::create_dir_all(project.parent().unwrap()).unwrap();
        fs::write(&global, "[llm]\nprompt_language = \"en\"\n").unwrap();
        fs::write(&project, "[llm]\nmax_tokens = \"lots\"\n").unwrap();

        let config = load_from(Some(global.clone()), Some(project.clone()));
        assert_eq!(config.llm.prompt_language, PromptLanguage::English);
        assert_eq!(config.llm.max_tokens, 1024);

        let _ = fs::remove_dir_all(global.parent().unwrap());
        let _ = fs::remove_dir_all(project.parent().unwrap());
    }

    #[test]
    fn merge_values_overlays_per_key() {
        let mut base: toml::Value =
            toml::from_str("[server]\naddr = \"a\"\nopen_browser = true\n[llm]\nmax_tokens = 1\n")
                .unwrap();
        let overlay: toml::Value =
            toml::from_str("[server]\nopen_browser = false\n[extra]\nkey = 1\n").unwrap();

        merge_values(&mut base, overlay);

        assert_eq!(base["server"]["addr"].as_str(), Some("a"));
        assert_eq!(base["server"]["open_browser"].as_bool(), Some(false));
        assert_eq!(base["llm"]["max_tokens"].as_integer(), Some(1));
        assert_eq!(base["extra"]["key"].as_integer(), Some(1));
    }

    #[test]
    fn set_toml_value_updates_typed_values() {
        let mut root: toml::Value = toml::from_str(
            r#"
[server]
addr = "127.0.0.1:9747"
open_browser = true

[llm]
max_tokens = 1024
"#,
        )
        .unwrap();

        set_toml_value(&mut root, "server.addr", "0.0.0.0:80").unwrap();
        set_toml_value(&mut root, "server.open_browser", "off").unwrap();
        set_toml_value(&mut root, "llm.max_tokens", "512").unwrap();

        assert_eq!(root["server"]["addr"].as_str(), Some("0.0.0.0:80"));
        assert_eq!(root["server"]["open_browser"].as_bool(), Some(false));
        assert_eq!(root["llm"]["max_tokens"].as_integer(), Some(512));
    }

    #[test]
    fn set_toml_value_rejects_bad_input() {
        let mut root: toml::Value = toml::from_str("[llm]\nmax_tokens = 1024\n").unwrap();
        assert!(set_toml_value(&mut root, "llm.max_tokens", "lots").is_err());
        assert!(set_toml_value(&mut root, "llm.unknown", "1").is_err());
        assert!(set_toml_value(&mut root, "nonexistent.key", "1").is_err());
        assert!(set_toml_value(&mut root, "llm.", "1").is_err());
    }

    #[test]
    fn set_config_value_creates_file_from_defaults() {
        let path = temp_path("set");
        set_config_value_at(&path, "llm.max_tokens", "4096").unwrap();

        let loaded = read_settings(&path);
        assert_eq!(loaded.llm.max_tokens, 4096);
        assert_eq!(loaded.server.addr, "127.0.0.1:9747");

        assert!(set_config_value_at(&path, "llm.max_tokens", "-1").is_err());

        set_config_value_at(&path, "llm.prompt_language", "en").unwrap();
        assert_eq!(read_settings(&path).llm.prompt_language, PromptLanguage::English);
        assert!(set_config_value_at(&path, "llm.prompt_language", "fr").is_err());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let path = temp_path("init");
        init_config_at(&path, false).unwrap();
        assert!(init_config_at(&path, false).is_err());
        init_config_at(&path, true).unwrap();
        assert_eq!(read_settings(&path), ConvoptConfig::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
