//! Configuração do carrossel carregada a partir de `carrossel.toml`.
//!
//! Valores ausentes no arquivo usam defaults. As variáveis de ambiente
//! `OPENAI_API_KEY`, `LLM_MODEL`, `LLM_BASE_URL`, `QUEUE_URL` e
//! `CARROSSEL_STORE` têm precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::copy::CopySettings;

pub const CONFIG_FILE: &str = "carrossel.toml";

/// Keys that mean "not configured" even though they are non-empty.
const PLACEHOLDER_KEYS: &[&str] = &["sk-your-key"];

#[derive(Debug, Clone, Deserialize)]
pub struct CarrosselConfig {
    /// Chave da API de geração de texto. Vazia desliga a geração por IA.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint alternativo compatível com chat completions.
    #[serde(default)]
    pub llm_base_url: Option<String>,

    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Base URL do serviço de fila. Sem ela `approve` e `generate` falham.
    #[serde(default)]
    pub queue_url: Option<String>,

    #[serde(default = "default_queue_timeout_secs")]
    pub queue_timeout_secs: u64,

    /// Arquivo SQLite do store de registros.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_queue_timeout_secs() -> u64 {
    5
}

fn default_store_path() -> PathBuf {
    PathBuf::from("carrossel.db")
}

impl Default for CarrosselConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            llm_base_url: None,
            llm_timeout_secs: default_llm_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            queue_url: None,
            queue_timeout_secs: default_queue_timeout_secs(),
            store_path: default_store_path(),
        }
    }
}

impl CarrosselConfig {
    /// Carrega `carrossel.toml` do diretório atual e aplica o ambiente.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Lê `path`, ou devolve os defaults se o arquivo não existir.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Sobrescreve campos com as variáveis não vazias devolvidas por `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.api_key = key;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.model = model;
        }
        if let Some(url) = var("LLM_BASE_URL") {
            self.llm_base_url = Some(url);
        }
        if let Some(url) = var("QUEUE_URL") {
            self.queue_url = Some(url);
        }
        if let Some(path) = var("CARROSSEL_STORE") {
            self.store_path = PathBuf::from(path);
        }
    }

    /// Whether a usable API key is configured.
    pub fn text_generation_enabled(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key)
    }

    pub fn copy_settings(&self) -> CopySettings {
        CopySettings {
            timeout: Duration::from_secs(self.llm_timeout_secs),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }
}
