use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoxaConfig {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
}

impl DoxaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: DoxaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("DOXA_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint), "anthropic" or "mock"
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Archived generations older than this are removed after each save
    pub archive_retention_days: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            archive_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prompt language ("ja" or "en"). Persona content stays in its own language.
    pub language: String,
    /// Default directory scanned by the batch driver
    pub materials_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: "ja".to_string(),
            materials_dir: PathBuf::from("persona_materials"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
