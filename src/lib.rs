//! babybot: chat with, or complete prompts using, a small local language model.
//!
//! The crate wraps an external text-generation capability in a tiny session
//! lifecycle:
//!
//! ```text
//! Uninitialized -> Loading -> Ready <-> Busy
//!                         \-> Error
//! ```
//!
//! - **Model loading** ([`loader`]): picks a device, asks an
//!   [`InferenceProvider`] for a capability and reports progress to the
//!   [`StatusReporter`].
//! - **Chat** ([`chat`]): turns appended to a transcript, replies streamed in
//!   fragment by fragment.
//! - **Completion** ([`completion`]): one prompt, one rendered result.
//!
//! The bundled provider ([`llm::LocalProvider`]) runs GGUF models through
//! `mistralrs` after fetching them with `hf-hub`.

// Fail early with a clear message when the metal feature is enabled but the
// Metal Toolchain is not installed.
#[cfg(missing_metal_toolchain)]
compile_error!(
    "The `metal` feature requires Apple's Metal Toolchain. Install it with:\n\n    \
     xcodebuild -downloadComponent MetalToolchain"
);

pub mod capability;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod progress;
pub mod session;
pub mod status;
pub mod terminal;

pub use capability::{Capability, GenerationOptions, GenerationOutput, InferenceProvider, TokenSink};
pub use chat::{ChatController, Message, Role, SubmitOutcome};
pub use completion::CompletionController;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use loader::ModelLoader;
pub use progress::{ProgressCallback, ProgressEvent};
pub use session::{SessionContext, SessionState};
pub use status::StatusReporter;
