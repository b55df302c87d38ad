//! Local text generation via `mistralrs`.
//!
//! [`LocalProvider`] resolves GGUF weights and tokenizer files through the
//! hf-hub cache (so downloads report progress), then builds a mistralrs model
//! on the requested device. [`LocalCapability`] maps generation options onto
//! mistralrs sampler settings and streams content deltas into a token sink.

use crate::capability::{
    Capability, GenerationOptions, GenerationOutput, InferenceProvider, LoadOptions, TaskKind,
    TokenSink,
};
use crate::config::ModelConfig;
use crate::device::Device;
use crate::error::{BotError, Result};
use crate::progress::{HubProgress, ProgressCallback, ProgressEvent};
use async_trait::async_trait;
use mistralrs::{
    GgufModelBuilder, MemoryGpuConfig, Model, PagedAttentionMetaBuilder, RequestBuilder,
    Response, TextMessageRole, TextMessages,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tokenizer files fetched from a separate tokenizer repo.
const TOKENIZER_FILES: &[&str] = &["tokenizer.json", "tokenizer_config.json"];

/// Minimum KV cache size for accelerated devices.
const MIN_CONTEXT_SIZE_TOKENS: usize = 1024;

/// Incrementally strips `<think>...</think>` blocks across streaming chunks.
///
/// Needed for reasoning models such as Qwen3 or DeepSeek-R1 distills, which
/// ignore `enable_thinking(false)` in some GGUF chat templates. Plain instruct
/// models pass through untouched.
#[derive(Debug, Default)]
struct ThinkTagStripper {
    in_think_block: bool,
    carry: String,
}

impl ThinkTagStripper {
    const OPEN: &'static str = "<think>";
    const CLOSE: &'static str = "</think>";

    /// Feed one fragment and return newly-visible text (outside think blocks).
    fn push(&mut self, fragment: &str) -> String {
        if fragment.is_empty() {
            return String::new();
        }
        self.carry.push_str(fragment);

        let mut visible = String::new();
        loop {
            if self.in_think_block {
                if let Some(end) = self.carry.find(Self::CLOSE) {
                    self.carry.drain(..end + Self::CLOSE.len());
                    self.in_think_block = false;
                    continue;
                }
                // Keep only the suffix that could still start `</think>`.
                let keep = Self::CLOSE.len().saturating_sub(1);
                if self.carry.len() > keep {
                    let drain = floor_char_boundary(&self.carry, self.carry.len() - keep);
                    self.carry.drain(..drain);
                }
                break;
            }

            if let Some(start) = self.carry.find(Self::OPEN) {
                visible.push_str(&self.carry[..start]);
                self.carry.drain(..start + Self::OPEN.len());
                self.in_think_block = true;
                continue;
            }

            // Hold back a suffix that could be the start of a tag.
            let keep = match self.carry.rfind('<') {
                Some(pos) if Self::OPEN.starts_with(&self.carry[pos..]) => self.carry.len() - pos,
                _ => 0,
            };
            let emit = self.carry.len() - keep;
            visible.push_str(&self.carry[..emit]);
            self.carry.drain(..emit);
            break;
        }

        visible
    }

    /// Flush any remaining visible tail.
    fn finish(&mut self) -> String {
        if self.in_think_block {
            self.carry.clear();
            return String::new();
        }
        std::mem::take(&mut self.carry)
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Build one non-streamed result record from an assistant reply.
///
/// The reply is a separate chat turn, not a continuation, so a requested
/// prompt prefix is set apart on its own line.
fn assemble_output(prompt: &str, content: &str, return_full_text: bool) -> GenerationOutput {
    let mut stripper = ThinkTagStripper::default();
    let mut reply = stripper.push(content);
    reply.push_str(&stripper.finish());
    let generated_text = if return_full_text {
        format!("{prompt}\n{reply}")
    } else {
        reply
    };
    GenerationOutput { generated_text }
}

/// Sampler settings derived from [`GenerationOptions`].
#[derive(Debug, Clone, PartialEq)]
struct SamplerPlan {
    max_len: usize,
    /// `None` selects deterministic (greedy) decoding.
    sampling: Option<Sampling>,
    frequency_penalty: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
struct Sampling {
    temperature: f64,
    top_p: f64,
    top_k: Option<usize>,
}

impl SamplerPlan {
    fn from_options(options: &GenerationOptions) -> Self {
        let sampling = options.do_sample.then(|| Sampling {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: (options.top_k > 0).then_some(options.top_k),
        });
        // mistralrs has no multiplicative repetition penalty; the frequency
        // penalty is the closest knob and 1.0 means "off" in both.
        let frequency_penalty =
            (options.repetition_penalty > 1.0).then(|| options.repetition_penalty - 1.0);
        Self {
            max_len: options.max_new_tokens,
            sampling,
            frequency_penalty,
        }
    }

    fn apply(&self, messages: TextMessages) -> RequestBuilder {
        let mut request = RequestBuilder::from(messages).set_sampler_max_len(self.max_len);
        match &self.sampling {
            Some(s) => {
                request = request
                    .set_sampler_temperature(s.temperature)
                    .set_sampler_topp(s.top_p);
                if let Some(k) = s.top_k {
                    request = request.set_sampler_topk(k);
                }
            }
            None => request = request.set_deterministic_sampler(),
        }
        if let Some(penalty) = self.frequency_penalty {
            request = request.set_sampler_frequency_penalty(penalty);
        }
        request
    }
}

/// Provider that runs GGUF models in-process.
pub struct LocalProvider {
    config: ModelConfig,
}

impl LocalProvider {
    /// Provider for the files named in `config`.
    ///
    /// The `model_id` passed to [`InferenceProvider::load`] selects the GGUF
    /// repo; the GGUF filename and tokenizer repo come from `config`.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

/// Download (or find cached) every file the model needs.
///
/// Returns the local path of the GGUF file.
fn resolve_files(
    model_id: &str,
    config: &ModelConfig,
    progress: &ProgressCallback,
) -> Result<PathBuf> {
    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| BotError::Load(format!("failed to create HF API: {e}")))?;
    let cache = hf_hub::Cache::default();

    let fetch = |repo_id: &str, filename: &str| -> Result<PathBuf> {
        if let Some(path) = cache.model(repo_id.to_owned()).get(filename) {
            debug!("{repo_id}/{filename} cached");
            progress(ProgressEvent::new("done", Some(1.0)).with_file(filename));
            return Ok(path);
        }
        info!("downloading {repo_id}/{filename}");
        api.model(repo_id.to_owned())
            .download_with_progress(filename, HubProgress::new(progress))
            .map_err(|e| BotError::Load(format!("failed to download {filename}: {e}")))
    };

    let gguf = fetch(model_id, &config.gguf_file)?;
    if !config.tokenizer_id.is_empty() {
        for filename in TOKENIZER_FILES {
            fetch(&config.tokenizer_id, filename)?;
        }
    }
    Ok(gguf)
}

async fn build_model(
    model_id: &str,
    config: &ModelConfig,
    device: Device,
) -> Result<Model> {
    let mut builder =
        GgufModelBuilder::new(model_id, vec![config.gguf_file.as_str()]).with_logging();
    if !config.tokenizer_id.is_empty() {
        builder = builder.with_tok_model_id(&config.tokenizer_id);
    }

    match device {
        Device::Portable => builder = builder.with_force_cpu(),
        Device::Accelerated => {
            let context_size = config.context_size_tokens.max(MIN_CONTEXT_SIZE_TOKENS);
            debug!("paged attention context_size_tokens={context_size}");
            builder = builder
                .with_paged_attn(|| {
                    PagedAttentionMetaBuilder::default()
                        .with_gpu_memory(MemoryGpuConfig::ContextSize(context_size))
                        .build()
                })
                .map_err(|e| BotError::Load(format!("paged attention config failed: {e}")))?;
        }
    }

    builder
        .build()
        .await
        .map_err(|e| BotError::Load(format!("model build failed: {e}")))
}

#[async_trait]
impl InferenceProvider for LocalProvider {
    async fn load(
        &self,
        task: TaskKind,
        model_id: &str,
        options: LoadOptions,
    ) -> Result<Arc<dyn Capability>> {
        info!(
            "local {} provider: {model_id} / {} on {} ({})",
            task.as_str(),
            self.config.gguf_file,
            options.device,
            options.dtype
        );
        if options.dtype != "fp32" {
            debug!("dtype {} ignored for quantized GGUF weights", options.dtype);
        }

        let repo = model_id.to_owned();
        let config = self.config.clone();
        let progress = options.progress;
        let (progress, resolved) = tokio::task::spawn_blocking(move || {
            let resolved = resolve_files(&repo, &config, &progress);
            (progress, resolved)
        })
        .await
        .map_err(|e| BotError::Load(format!("download task failed: {e}")))?;
        let gguf_path = resolved?;
        debug!("gguf resolved to {}", gguf_path.display());

        progress(ProgressEvent::new("loading", None).with_file(&self.config.gguf_file));
        let start = Instant::now();
        let model = build_model(model_id, &self.config, options.device).await?;
        info!("model built in {:.1}s", start.elapsed().as_secs_f64());
        progress(ProgressEvent::new("ready", Some(1.0)));

        let tokenizer_id = if self.config.tokenizer_id.is_empty() {
            model_id.to_owned()
        } else {
            self.config.tokenizer_id.clone()
        };
        Ok(Arc::new(LocalCapability {
            model: Arc::new(model),
            tokenizer_id,
        }))
    }
}

/// A loaded mistralrs model.
pub struct LocalCapability {
    model: Arc<Model>,
    tokenizer_id: String,
}

impl LocalCapability {
    async fn stream(
        &self,
        request: RequestBuilder,
        sink: &mut dyn TokenSink,
    ) -> Result<String> {
        let mut stream = self
            .model
            .stream_chat_request(request)
            .await
            .map_err(|e| BotError::Generation(format!("stream request failed: {e}")))?;

        let mut stripper = ThinkTagStripper::default();
        let mut generated = String::new();
        let mut emit = |text: &str, generated: &mut String| {
            if !text.is_empty() {
                sink.on_token(text);
                generated.push_str(text);
            }
        };

        while let Some(response) = stream.next().await {
            match response {
                Response::Chunk(chunk) => {
                    if let Some(choice) = chunk.choices.first() {
                        let content = choice.delta.content.as_deref().unwrap_or_default();
                        emit(&stripper.push(content), &mut generated);
                    }
                }
                Response::Done(done) => {
                    if let Some(choice) = done.choices.first() {
                        let content = choice.message.content.as_deref().unwrap_or_default();
                        // Done repeats the full text on some pipelines; only
                        // take it when nothing streamed.
                        if generated.is_empty() {
                            emit(&stripper.push(content), &mut generated);
                        }
                    }
                    break;
                }
                Response::ModelError(msg, _) => {
                    return Err(BotError::Generation(format!("model error: {msg}")));
                }
                Response::InternalError(e) => {
                    return Err(BotError::Generation(format!("internal error: {e}")));
                }
                Response::ValidationError(e) => {
                    return Err(BotError::Generation(format!("validation error: {e}")));
                }
                _ => {}
            }
        }
        emit(&stripper.finish(), &mut generated);
        Ok(generated)
    }
}

#[async_trait]
impl Capability for LocalCapability {
    fn tokenizer_id(&self) -> &str {
        &self.tokenizer_id
    }

    async fn generate(
        &self,
        text: &str,
        options: &GenerationOptions,
        streamer: Option<&mut dyn TokenSink>,
    ) -> Result<Vec<GenerationOutput>> {
        if options.no_repeat_ngram_size > 0 {
            debug!(
                "no_repeat_ngram_size={} not supported by the local backend",
                options.no_repeat_ngram_size
            );
        }
        let messages = TextMessages::new()
            .enable_thinking(false)
            .add_message(TextMessageRole::User, text);
        let request = SamplerPlan::from_options(options).apply(messages);
        let start = Instant::now();

        let outputs = match streamer {
            Some(sink) => {
                if !sink.skip_prompt() {
                    sink.on_token(text);
                }
                let generated = self.stream(request, sink).await?;
                vec![GenerationOutput {
                    generated_text: generated,
                }]
            }
            None => {
                let response = self
                    .model
                    .send_chat_request(request)
                    .await
                    .map_err(|e| BotError::Generation(format!("inference failed: {e}")))?;
                response
                    .choices
                    .iter()
                    .map(|choice| {
                        let content = choice.message.content.as_deref().unwrap_or_default();
                        assemble_output(text, content, options.return_full_text)
                    })
                    .collect()
            }
        };

        if outputs.is_empty() {
            warn!("model returned no choices");
        }
        debug!("generation took {:.1}s", start.elapsed().as_secs_f64());
        Ok(outputs)
    }
}
