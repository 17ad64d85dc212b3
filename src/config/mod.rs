mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    tracing::debug!(path = %path.display(), trackers = config.trackers.len(), "Loaded config");
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./uploadcheck.toml",
        "./config.toml",
        "~/.config/uploadcheck/config.toml",
        "/etc/uploadcheck/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// API keys from the environment replace those in the file.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(key) = env_value(TMDB_API_KEY_ENV) {
        config.tmdb.api_key = Some(key);
    }
    for tracker in &mut config.trackers {
        if let Some(key) = env_value(&tracker.api_key_env()) {
            tracker.api_key = Some(key);
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.general.workers == 0 {
        anyhow::bail!("general.workers must be at least 1");
    }

    if config.general.required_language.trim().is_empty() {
        anyhow::bail!("general.required_language cannot be empty");
    }

    if config.scan.extensions.iter().all(|e| e.trim().is_empty()) {
        anyhow::bail!("scan.extensions must list at least one extension");
    }

    if let Some(pattern) = &config.scan.skip_dirs_pattern {
        regex::Regex::new(pattern)
            .with_context(|| format!("Invalid scan.skip_dirs_pattern: {}", pattern))?;
    }

    if !(0.0..=1.0).contains(&config.tmdb.min_title_score) {
        anyhow::bail!("tmdb.min_title_score must be between 0 and 1");
    }

    if config.year_check.required_score > 3 {
        anyhow::bail!("year_check.required_score cannot exceed 3");
    }

    let mut names = HashSet::new();
    for tracker in &config.trackers {
        if tracker.name.trim().is_empty() {
            anyhow::bail!("Tracker with url '{}' has no name", tracker.url);
        }
        if tracker.url.trim().is_empty() {
            anyhow::bail!("Tracker '{}' has no url", tracker.name);
        }
        if !names.insert(tracker.name.to_lowercase()) {
            anyhow::bail!("Tracker '{}' is configured more than once", tracker.name);
        }
        if tracker.requests_per_minute == 0 {
            anyhow::bail!("Tracker '{}' has requests_per_minute = 0", tracker.name);
        }
        if tracker.enabled && tracker.api_key().is_none() {
            tracing::warn!(
                "Tracker '{}' is enabled but has no API key; set {} to search it",
                tracker.name,
                tracker.api_key_env()
            );
        }
    }

    Ok(())
}
