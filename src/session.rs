//! Session lifecycle: the single state flag governing control enablement.
//!
//! Transitions go through [`SessionState::apply`], which encodes the whole
//! table; anything not listed there is rejected with
//! [`BotError::InvalidTransition`].

use crate::capability::{Capability, GenerationOptions};
use crate::config::SamplingConfig;
use crate::error::{BotError, Result};
use crate::status::StatusReporter;
use std::sync::Arc;
use tracing::{debug, info};

/// Label shown right after loading begins.
pub const INITIALIZING_LABEL: &str = "initializing…";

/// Lifecycle of the one session per process.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing loaded yet.
    Uninitialized,
    /// Model load in progress.
    Loading {
        /// Completion in `[0, 100]`.
        percent: f64,
        /// Phase label.
        label: String,
    },
    /// Capability loaded, accepting input.
    Ready,
    /// A generation request is in flight.
    Busy,
    /// Load failed; the session stays unusable.
    Error {
        /// Diagnostic detail (logged, not shown).
        message: String,
    },
}

/// Inputs to the lifecycle state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Loading starts.
    BeginLoad,
    /// Provider reported progress.
    Progress {
        /// Completion in `[0, 100]`.
        percent: f64,
        /// Phase label.
        label: String,
    },
    /// Provider resolved.
    LoadSucceeded,
    /// Provider rejected.
    LoadFailed {
        /// Error detail.
        message: String,
    },
    /// A generation request is about to be issued.
    BeginGeneration,
    /// The in-flight request settled (success or failure).
    EndGeneration,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::BeginLoad => "begin_load",
            Self::Progress { .. } => "progress",
            Self::LoadSucceeded => "load_succeeded",
            Self::LoadFailed { .. } => "load_failed",
            Self::BeginGeneration => "begin_generation",
            Self::EndGeneration => "end_generation",
        }
    }
}

impl SessionState {
    /// Compute the state that follows `event`.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::InvalidTransition`] when `event` is not allowed in
    /// the current state.
    pub fn apply(&self, event: SessionEvent) -> Result<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Uninitialized, E::BeginLoad) => Ok(S::Loading {
                percent: 0.0,
                label: INITIALIZING_LABEL.to_owned(),
            }),
            (S::Loading { .. }, E::Progress { percent, label }) => {
                Ok(S::Loading { percent, label })
            }
            (S::Loading { .. }, E::LoadSucceeded) => Ok(S::Ready),
            (S::Loading { .. }, E::LoadFailed { message }) => Ok(S::Error { message }),
            (S::Ready, E::BeginGeneration) => Ok(S::Busy),
            (S::Busy, E::EndGeneration) => Ok(S::Ready),
            (state, event) => Err(BotError::InvalidTransition {
                state: state.clone(),
                event: event.name(),
            }),
        }
    }

    /// Whether input may be submitted.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Everything one session shares between loader and controller.
///
/// Built once at startup and passed explicitly; there is no global state.
pub struct SessionContext {
    state: SessionState,
    capability: Option<Arc<dyn Capability>>,
    status: StatusReporter,
    options: GenerationOptions,
}

impl SessionContext {
    /// Create an uninitialized session.
    pub fn new(status: StatusReporter, sampling: &SamplingConfig) -> Self {
        Self {
            state: SessionState::Uninitialized,
            capability: None,
            status,
            options: GenerationOptions::from(sampling),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Advance the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::InvalidTransition`] and leaves the state unchanged
    /// if `event` is not allowed.
    pub fn apply(&mut self, event: SessionEvent) -> Result<()> {
        let next = self.state.apply(event)?;
        match &next {
            SessionState::Loading { .. } => debug!("session: {:?} -> {next:?}", self.state),
            _ => info!("session: {:?} -> {next:?}", self.state),
        }
        self.state = next;
        Ok(())
    }

    /// Whether the session accepts input.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready() && self.capability.is_some()
    }

    /// The loaded capability, if any.
    pub fn capability(&self) -> Option<Arc<dyn Capability>> {
        self.capability.as_ref().map(Arc::clone)
    }

    pub(crate) fn set_capability(&mut self, capability: Arc<dyn Capability>) {
        self.capability = Some(capability);
    }

    /// Loading indicator.
    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Mutable loading indicator.
    pub fn status_mut(&mut self) -> &mut StatusReporter {
        &mut self.status
    }

    /// Options sent with every request.
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }
}
