//! Configuration for the embedding provider, store location and ranking defaults.
//!
//! Every field has a default so the store works with zero configuration. Values
//! are layered: defaults, then an optional TOML file, then environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lumen.toml";

const ENV_MODEL: &str = "RAG_MODEL";
const ENV_DEVICE: &str = "RAG_DEVICE";
const ENV_STORE_DIR: &str = "RAG_STORE_DIR";
const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
const ENV_OLLAMA_PORT: &str = "OLLAMA_PORT";
const ENV_CHUNK_SIZE: &str = "RAG_CHUNK_SIZE";
const ENV_CHUNK_OVERLAP: &str = "RAG_CHUNK_OVERLAP";
const ENV_TOP_K: &str = "RAG_TOP_K";
const ENV_MIN_SCORE: &str = "RAG_MIN_SCORE";
const ENV_MMR_LAMBDA: &str = "RAG_MMR_LAMBDA";

/// Compute device the embedding model should run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Force CPU inference
    #[default]
    Cpu,
    /// Let the provider place the model on a GPU
    Gpu,
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" => Ok(Self::Gpu),
            other => Err(Error::Config(format!("unknown device: {other}"))),
        }
    }
}

impl Display for Device {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Cpu => formatter.write_str("cpu"),
            Self::Gpu => formatter.write_str("gpu"),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding model identifier
    pub model: String,
    /// Compute device selector
    pub device: Device,
    /// Ollama server host
    pub ollama_host: String,
    /// Ollama server port
    pub ollama_port: u16,
    /// Directory holding the persisted store
    pub store_dir: PathBuf,
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Default number of results
    pub top_k: usize,
    /// Default minimum similarity for a result to be returned
    pub min_score: f32,
    /// Relevance weight for Maximal Marginal Relevance re-ranking
    pub mmr_lambda: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm".to_owned(),
            device: Device::Cpu,
            ollama_host: "http://localhost".to_owned(),
            ollama_port: 11434,
            store_dir: PathBuf::from("rag_store"),
            chunk_size: 700,
            chunk_overlap: 120,
            top_k: 3,
            min_score: 0.25,
            mmr_lambda: 0.7,
        }
    }
}

impl RagConfig {
    /// Parse a TOML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    /// Returns an error if an environment variable holds an unparseable value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load the layered configuration.
    ///
    /// Reads `path` when given, otherwise [`DEFAULT_CONFIG_FILE`] if it exists,
    /// then applies environment overrides and validates the result.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable, a value is unparseable, or
    /// validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    ///
    /// # Errors
    /// Returns an error if a present value cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(device) = lookup(ENV_DEVICE) {
            self.device = device.parse()?;
        }
        if let Some(dir) = lookup(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(ENV_OLLAMA_HOST) {
            self.ollama_host = host;
        }
        override_parsed(&lookup, ENV_OLLAMA_PORT, &mut self.ollama_port)?;
        override_parsed(&lookup, ENV_CHUNK_SIZE, &mut self.chunk_size)?;
        override_parsed(&lookup, ENV_CHUNK_OVERLAP, &mut self.chunk_overlap)?;
        override_parsed(&lookup, ENV_TOP_K, &mut self.top_k)?;
        override_parsed(&lookup, ENV_MIN_SCORE, &mut self.min_score)?;
        override_parsed(&lookup, ENV_MMR_LAMBDA, &mut self.mmr_lambda)?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns a `Config` error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_owned()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_owned()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(Error::Config(format!(
                "mmr_lambda must be within [0, 1], got {}",
                self.mmr_lambda
            )));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}")))?;
    }
    Ok(())
}
