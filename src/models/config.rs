use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory (relative to the project root) holding config and state
pub const FACTORY_DIR: &str = "grant-factory";

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiConfig {
    /// Model used for the structured stage agents
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for the free-form Q&A exchange
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            chat_model: default_chat_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

impl GeminiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Factory configuration, loaded from grant-factory/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactoryConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// State directory, relative to the project root
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(FACTORY_DIR).join("state")
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            state_dir: default_state_dir(),
        }
    }
}

impl FactoryConfig {
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(FACTORY_DIR).join("config.toml")
    }

    /// Load config from grant-factory/config.toml, falling back to defaults
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let config_path = Self::config_path(project_root);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: FactoryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to grant-factory/config.toml
    pub fn save(&self, project_root: &Path) -> anyhow::Result<()> {
        let config_path = Self::config_path(project_root);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Absolute state directory for a project root
    pub fn state_path(&self, project_root: &Path) -> PathBuf {
        if self.state_dir.is_absolute() {
            self.state_dir.clone()
        } else {
            project_root.join(&self.state_dir)
        }
    }
}
