//! CLI argument definitions for the Sojourn assistant.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.
//! Environment overrides are applied to the loaded config before these
//! resolvers run, so a config value passed in already reflects them.

use clap::Parser;
use std::path::PathBuf;

/// Sojourn: a grounded Q&A assistant for migrant workers in Singapore.
#[derive(Parser, Debug)]
#[command(name = "sojourn", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Number of passages to retrieve per question.
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Translate non-English questions to English before retrieval.
    #[arg(long = "translate-queries")]
    pub translate_queries: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SOJOURN_CONFIG env var > ~/.sojourn/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup("SOJOURN_CONFIG").filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the retrieval depth. Zero is never returned.
    pub fn resolve_top_k(&self, config_top_k: usize) -> usize {
        self.top_k.unwrap_or(config_top_k).max(1)
    }

    /// The flag can only switch translation on.
    pub fn resolve_translate_queries(&self, config_value: bool) -> bool {
        self.translate_queries || config_value
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".sojourn").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sojourn").join("config.toml");
    }
    PathBuf::from("config.toml")
}
