//! Contract between the controllers and an external inference provider.
//!
//! Tokenization, model execution and sampling all happen behind these traits.
//! The controllers only see a [`Capability`] they can call with text and
//! options, optionally with a [`TokenSink`] that receives fragments as they
//! are produced.

use crate::config::SamplingConfig;
use crate::device::Device;
use crate::error::Result;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use std::sync::Arc;

/// Kind of pipeline requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Causal text generation.
    TextGeneration,
}

impl TaskKind {
    /// Task name as providers spell it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextGeneration => "text-generation",
        }
    }
}

/// Options passed to [`InferenceProvider::load`].
pub struct LoadOptions {
    /// Execution device.
    pub device: Device,
    /// Requested weight precision (e.g. `"fp32"`).
    pub dtype: String,
    /// Receives progress events until the load resolves.
    pub progress: ProgressCallback,
}

/// Per-request generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Maximum tokens generated.
    pub max_new_tokens: usize,
    /// Sample instead of greedy decoding.
    pub do_sample: bool,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus threshold.
    pub top_p: f64,
    /// Top-k cutoff (0 = disabled).
    pub top_k: usize,
    /// Repetition penalty.
    pub repetition_penalty: f32,
    /// No-repeat n-gram size (0 = disabled).
    pub no_repeat_ngram_size: usize,
    /// Prefix the prompt to non-streamed results.
    ///
    /// Off by default: chat-templated backends answer the prompt rather than
    /// continue it, so the prefix would not read as one text.
    pub return_full_text: bool,
}

impl From<&SamplingConfig> for GenerationOptions {
    fn from(s: &SamplingConfig) -> Self {
        Self {
            max_new_tokens: s.max_new_tokens,
            do_sample: s.do_sample,
            temperature: s.temperature,
            top_p: s.top_p,
            top_k: s.top_k,
            repetition_penalty: s.repetition_penalty,
            no_repeat_ngram_size: s.no_repeat_ngram_size,
            return_full_text: false,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from(&SamplingConfig::default())
    }
}

/// One non-streamed result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Generated text.
    pub generated_text: String,
}

/// Receives token fragments during a streamed generation.
pub trait TokenSink: Send {
    /// Called once per fragment, in production order.
    fn on_token(&mut self, fragment: &str);

    /// Whether the provider should suppress echoing the prompt.
    fn skip_prompt(&self) -> bool {
        true
    }
}

/// A loaded text-generation model.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Repo or path of the tokenizer this capability is bound to.
    fn tokenizer_id(&self) -> &str;

    /// Generate from `text`.
    ///
    /// With a sink, fragments are delivered to it as they are produced and
    /// the call resolves when the stream ends. Results are returned either way.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BotError::Generation`] if inference fails.
    async fn generate(
        &self,
        text: &str,
        options: &GenerationOptions,
        streamer: Option<&mut dyn TokenSink>,
    ) -> Result<Vec<GenerationOutput>>;
}

/// Factory for capabilities.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Resolve and load `model_id` for `task`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BotError::Load`] on download, decode or device failure.
    async fn load(
        &self,
        task: TaskKind,
        model_id: &str,
        options: LoadOptions,
    ) -> Result<Arc<dyn Capability>>;
}
