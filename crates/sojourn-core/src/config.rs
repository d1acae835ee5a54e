use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SojournError};

/// Top-level configuration for the Sojourn assistant.
///
/// Loaded from `~/.sojourn/config.toml` by default. Each section corresponds
/// to one collaborator of the answer engine or to the conversation layer.
/// Secrets never live here; see [`Credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SojournConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl SojournConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SojournConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SojournError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric or boolean values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LLAMACLOUD_INDEX_NAME") {
            self.retrieval.index_name = v;
        }
        if let Some(v) = lookup("LLAMACLOUD_PROJECT_NAME") {
            self.retrieval.project_name = v;
        }
        if let Some(v) = lookup("LLAMACLOUD_BASE_URL") {
            self.retrieval.base_url = v;
        }
        if let Some(v) = lookup("TOP_K") {
            match v.trim().parse::<usize>() {
                Ok(k) if k > 0 => self.retrieval.top_k = k,
                _ => warn!(value = %v, "Ignoring invalid TOP_K override"),
            }
        }
        if let Some(v) = lookup("SEA_LION_BASE") {
            self.completion.base_url = v;
        }
        if let Some(v) = lookup("SEA_LION_MODEL") {
            self.completion.model = v;
        }
        if let Some(v) = lookup("SOJOURN_TRANSLATE_QUERIES") {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.answer.translate_queries = true,
                "0" | "false" | "no" | "off" => self.answer.translate_queries = false,
                _ => warn!(value = %v, "Ignoring invalid SOJOURN_TRANSLATE_QUERIES override"),
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote passage index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Base URL of the index service.
    pub base_url: String,
    /// Name of the index (pipeline) to query.
    pub index_name: String,
    /// Project the index belongs to.
    pub project_name: String,
    /// Number of passages to retrieve per query.
    pub top_k: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloud.llamaindex.ai".to_string(),
            index_name: "COR2221".to_string(),
            project_name: "Default".to_string(),
            top_k: 4,
            timeout_secs: 30,
        }
    }
}

/// Text-generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL; requests go to `{base_url}/v1/chat/completions`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Generation budget per call.
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sea-lion.ai".to_string(),
            model: "aisingapore/Gemma-SEA-LION-v4-27B-IT".to_string(),
            timeout_secs: 30,
            max_tokens: 1024,
        }
    }
}

/// Answer engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Character budget for the combined context block.
    pub context_budget_chars: usize,
    /// Translate non-English queries to English before retrieval.
    pub translate_queries: bool,
    /// Temperature for the grounded attempt.
    pub grounded_temperature: f32,
    /// Temperature for the general-knowledge fallback.
    pub fallback_temperature: f32,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            context_budget_chars: 48_000,
            translate_queries: false,
            grounded_temperature: 0.0,
            fallback_temperature: 0.2,
        }
    }
}

/// Conversation layer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Secrets for the two external services, read from the environment only.
#[derive(Clone)]
pub struct Credentials {
    pub index_api_key: String,
    pub organization_id: String,
    pub completion_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("index_api_key", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("completion_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary key lookup.
    ///
    /// Blank values count as missing. The index key accepts two names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let index_api_key = get("LLAMACLOUD_API_KEY")
            .or_else(|| get("LLAMA_CLOUD_SERVICES_API_KEY"))
            .ok_or_else(|| SojournError::MissingCredential("LLAMACLOUD_API_KEY".to_string()))?;
        let organization_id = get("LLAMACLOUD_ORG_ID")
            .ok_or_else(|| SojournError::MissingCredential("LLAMACLOUD_ORG_ID".to_string()))?;
        let completion_api_key = get("SEA_LION_API_KEY")
            .ok_or_else(|| SojournError::MissingCredential("SEA_LION_API_KEY".to_string()))?;

        Ok(Self {
            index_api_key,
            organization_id,
            completion_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ---- Defaults ----

    #[test]
    fn test_config_default_values() {
        let config = SojournConfig::default();

        assert_eq!(config.general.log_level, "info");

        assert_eq!(config.retrieval.base_url, "https://api.cloud.llamaindex.ai");
        assert_eq!(config.retrieval.index_name, "COR2221");
        assert_eq!(config.retrieval.project_name, "Default");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.timeout_secs, 30);

        assert_eq!(config.completion.base_url, "https://api.sea-lion.ai");
        assert_eq!(
            config.completion.model,
            "aisingapore/Gemma-SEA-LION-v4-27B-IT"
        );
        assert_eq!(config.completion.timeout_secs, 30);
        assert_eq!(config.completion.max_tokens, 1024);

        assert_eq!(config.answer.context_budget_chars, 48_000);
        assert!(!config.answer.translate_queries);
        assert!(config.answer.grounded_temperature.abs() < f32::EPSILON);
        assert!((config.answer.fallback_temperature - 0.2).abs() < f32::EPSILON);

        assert_eq!(config.chat.max_message_length, 2000);
    }

    // ---- Loading ----

    #[test]
    fn test_config_load_partial_file() {
        let content = r#"
[retrieval]
index_name = "handbook"
top_k = 8

[answer]
translate_queries = true
"#;
        let file = create_temp_config(content);
        let config = SojournConfig::load(file.path()).unwrap();

        assert_eq!(config.retrieval.index_name, "handbook");
        assert_eq!(config.retrieval.top_k, 8);
        // Untouched fields keep their defaults
        assert_eq!(config.retrieval.project_name, "Default");
        assert!(config.answer.translate_queries);
        assert_eq!(config.completion.max_tokens, 1024);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = SojournConfig::load(file.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.answer.context_budget_chars, 48_000);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(SojournConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_config_load_or_default_missing_file() {
        let config = SojournConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.retrieval.index_name, "COR2221");
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SojournConfig::default();
        config.completion.model = "local-model".to_string();
        config.save(&path).unwrap();

        let reloaded = SojournConfig::load(&path).unwrap();
        assert_eq!(reloaded.completion.model, "local-model");
    }

    // ---- Environment overrides ----

    #[test]
    fn test_overrides_applied() {
        let mut config = SojournConfig::default();
        config.apply_overrides(lookup_from(&[
            ("LLAMACLOUD_INDEX_NAME", "guides"),
            ("LLAMACLOUD_PROJECT_NAME", "Migrants"),
            ("TOP_K", "6"),
            ("SEA_LION_BASE", "http://127.0.0.1:9000"),
            ("SEA_LION_MODEL", "tiny"),
            ("SOJOURN_TRANSLATE_QUERIES", "yes"),
        ]));

        assert_eq!(config.retrieval.index_name, "guides");
        assert_eq!(config.retrieval.project_name, "Migrants");
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.completion.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.completion.model, "tiny");
        assert!(config.answer.translate_queries);
    }

    #[test]
    fn test_invalid_top_k_override_ignored() {
        let mut config = SojournConfig::default();
        config.apply_overrides(lookup_from(&[("TOP_K", "lots")]));
        assert_eq!(config.retrieval.top_k, 4);

        config.apply_overrides(lookup_from(&[("TOP_K", "0")]));
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = SojournConfig::default();
        config.apply_overrides(|_| None);
        assert_eq!(config.retrieval.index_name, "COR2221");
        assert!(!config.answer.translate_queries);
    }

    // ---- Credentials ----

    #[test]
    fn test_credentials_complete() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("LLAMACLOUD_API_KEY", "llx-1"),
            ("LLAMACLOUD_ORG_ID", "org-1"),
            ("SEA_LION_API_KEY", "sk-1"),
        ]))
        .unwrap();
        assert_eq!(creds.index_api_key, "llx-1");
        assert_eq!(creds.organization_id, "org-1");
        assert_eq!(creds.completion_api_key, "sk-1");
    }

    #[test]
    fn test_credentials_alias_for_index_key() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("LLAMA_CLOUD_SERVICES_API_KEY", "llx-alias"),
            ("LLAMACLOUD_ORG_ID", "org-1"),
            ("SEA_LION_API_KEY", "sk-1"),
        ]))
        .unwrap();
        assert_eq!(creds.index_api_key, "llx-alias");
    }

    #[test]
    fn test_credentials_missing_completion_key() {
        let err = Credentials::from_lookup(lookup_from(&[
            ("LLAMACLOUD_API_KEY", "llx-1"),
            ("LLAMACLOUD_ORG_ID", "org-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SojournError::MissingCredential(ref k) if k == "SEA_LION_API_KEY"));
    }

    #[test]
    fn test_credentials_blank_value_is_missing() {
        let err = Credentials::from_lookup(lookup_from(&[
            ("LLAMACLOUD_API_KEY", "llx-1"),
            ("LLAMACLOUD_ORG_ID", "   "),
            ("SEA_LION_API_KEY", "sk-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SojournError::MissingCredential(ref k) if k == "LLAMACLOUD_ORG_ID"));
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials {
            index_api_key: "llx-secret".to_string(),
            organization_id: "org-1".to_string(),
            completion_api_key: "sk-secret".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("llx-secret"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("org-1"));
    }
}
