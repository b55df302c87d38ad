//! Configuration types for the chat and completion front-ends.

use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Which model to load and where to run it.
    pub model: ModelConfig,
    /// Sampling parameters sent with every generation request.
    pub sampling: SamplingConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Where generation should run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Probe for acceleration and fall back to the portable mode.
    #[default]
    Auto,
    /// Require the accelerated backend compiled into this build.
    Accelerated,
    /// Always run on the CPU.
    Portable,
}

/// Model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// HuggingFace repo ID containing the GGUF file.
    pub model_id: String,
    /// GGUF filename within the model repo.
    pub gguf_file: String,
    /// HuggingFace repo ID for the tokenizer.
    /// Leave empty to use the tokenizer bundled with the GGUF repo.
    pub tokenizer_id: String,
    /// Requested weight precision. Quantized GGUF files carry their own
    /// precision, so this is forwarded to the provider as a hint.
    pub dtype: String,
    /// Device preference.
    pub device: DevicePreference,
    /// Context window size for the KV cache on accelerated devices (tokens).
    pub context_size_tokens: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            // Small instruct model so the first run finishes in reasonable time on CPU.
            model_id: "Qwen/Qwen2.5-0.5B-Instruct-GGUF".to_owned(),
            gguf_file: "qwen2.5-0.5b-instruct-q4_k_m.gguf".to_owned(),
            tokenizer_id: "Qwen/Qwen2.5-0.5B-Instruct".to_owned(),
            dtype: "fp32".to_owned(),
            device: DevicePreference::default(),
            context_size_tokens: 4096,
        }
    }
}

/// Sampling parameters.
///
/// Fixed for the lifetime of a session; a config file may override the
/// defaults at startup only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Maximum tokens generated per request.
    pub max_new_tokens: usize,
    /// Sample from the distribution instead of greedy decoding.
    pub do_sample: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// Top-k cutoff (0 = disabled).
    pub top_k: usize,
    /// Penalty applied to tokens that already appeared.
    pub repetition_penalty: f32,
    /// Size of n-grams that may not repeat (0 = disabled).
    pub no_repeat_ngram_size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 80,
            do_sample: true,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 0,
            repetition_penalty: 1.1,
            no_repeat_ngram_size: 4,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Directory for daily rolling log files (None = stderr only).
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "babybot=info,hf_hub=warn,mistralrs=warn,mistralrs_core=warn".to_owned(),
            log_dir: None,
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| BotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` when given, else from the default path if it exists,
    /// else return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Self::default_config_path();
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path: `babybot/config.toml` under the
    /// platform config directory (`~/.config` on Linux, `~/Library/Application
    /// Support` on macOS), falling back to `~/.config/babybot/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = dirs::config_dir() {
            config.join("babybot").join("config.toml")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("babybot").join("config.toml")
        } else {
            PathBuf::from("/tmp/babybot-config/config.toml")
        }
    }
}
