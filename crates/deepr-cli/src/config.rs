use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use deepr_core::{find_model, ModelEntry, DEFAULT_MODEL};

/// Hard ceiling for `research.max_iterations` and `--max-iterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub reader: ReaderConfig,
    pub http: HttpConfig,
    pub research: ResearchConfig,
}

/// Chat-completion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used when no catalog entry is selected
    pub default_model: String,
    /// Sent as the X-Title header
    pub app_title: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: deepr_providers::openrouter::DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.id.to_string(),
            app_title: "deepr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub engine: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: deepr_web::serpapi::DEFAULT_ENDPOINT.to_string(),
            engine: deepr_web::serpapi::DEFAULT_ENGINE.to_string(),
        }
    }
}

/// How page text is obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderBackend {
    /// Remote reader endpoint that returns extracted text
    #[default]
    Jina,
    /// Plain GET with local HTML-to-text extraction
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub backend: ReaderBackend,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            backend: ReaderBackend::Jina,
            api_key: None,
            base_url: deepr_web::jina::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub max_iterations: u32,
    /// Catalog display name or identifier
    pub model: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: None,
        }
    }
}

impl Config {
    /// Load configuration from every layer.
    ///
    /// Priority (highest to lowest):
    /// 1. `DEEPR_`-prefixed variables (`DEEPR_SEARCH__ENGINE=bing`)
    /// 2. `OPENROUTER_API_KEY`, `SERPAPI_API_KEY`, `JINA_API_KEY`
    /// 3. `explicit` path, or `~/.config/deepr/config.toml` when present
    /// 4. Built-in defaults
    ///
    /// Command-line flags are applied by the caller on top of the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Self::defaults();

        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        let figment = figment
            .merge(vendor_env())
            .merge(Env::prefixed("DEEPR_").split("__"));

        Self::extract(figment)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("deepr"))
    }

    pub fn validate(&self) -> Result<()> {
        let iterations = self.research.max_iterations;
        if !(1..=MAX_ITERATIONS_LIMIT).contains(&iterations) {
            anyhow::bail!(
                "research.max_iterations must be between 1 and {} (got {})",
                MAX_ITERATIONS_LIMIT,
                iterations
            );
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }
        if let Some(name) = &self.research.model {
            resolve_model(name)?;
        }
        Ok(())
    }

    /// The completion key, required before a research run starts.
    pub fn llm_api_key(&self) -> Result<&str> {
        non_empty(&self.llm.api_key).ok_or_else(|| {
            anyhow::anyhow!("No LLM API key configured. Set OPENROUTER_API_KEY or llm.api_key")
        })
    }

    /// The search key, required before a research run starts.
    pub fn search_api_key(&self) -> Result<&str> {
        non_empty(&self.search.api_key).ok_or_else(|| {
            anyhow::anyhow!("No search API key configured. Set SERPAPI_API_KEY or search.api_key")
        })
    }

    pub fn reader_api_key(&self) -> Option<&str> {
        non_empty(&self.reader.api_key)
    }
}

/// Look up a catalog entry by display name or identifier.
pub fn resolve_model(name: &str) -> Result<ModelEntry> {
    find_model(name).ok_or_else(|| {
        anyhow::Error::new(deepr_core::Error::ModelNotFound(name.to_string()))
            .context("Run `deepr models` to list the supported models")
    })
}

/// Mask an API key for display, keeping the last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// The conventional per-vendor key variables, mapped onto their config keys.
fn vendor_env() -> Env {
    Env::raw()
        .only(&["OPENROUTER_API_KEY", "SERPAPI_API_KEY", "JINA_API_KEY"])
        .map(|key| {
            let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                "OPENROUTER_API_KEY" => "llm.api_key",
                "SERPAPI_API_KEY" => "search.api_key",
                "JINA_API_KEY" => "reader.api_key",
                _ => "ignored",
            };
            mapped.into()
        })
}
