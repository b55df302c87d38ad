//! Model loading with progress reporting.
//!
//! The provider may report progress from any thread; events are funnelled
//! through an unbounded channel and applied to the session on the task that
//! awaits the load, so the session and the status view are only touched from
//! one place.

use crate::capability::{Capability, InferenceProvider, LoadOptions, TaskKind};
use crate::device::{self, Device};
use crate::error::Result;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::session::{INITIALIZING_LABEL, SessionContext, SessionEvent};
use crate::status::clamp_percent;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Label shown when the load fails. Detail goes to the log only.
pub const LOAD_ERROR_LABEL: &str = "error — see console";

/// Label shown once the capability is usable.
pub const READY_LABEL: &str = "ready";

/// Loads a text-generation capability into a [`SessionContext`].
pub struct ModelLoader {
    provider: Arc<dyn InferenceProvider>,
    device: Device,
    dtype: String,
}

impl ModelLoader {
    /// Loader for `provider` on the probed device with `fp32` weights.
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider,
            device: device::probe(),
            dtype: "fp32".to_owned(),
        }
    }

    /// Override the probed device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Override the requested precision.
    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    /// Device the next load will request.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Load `model_id`, reporting progress to the session's status view.
    ///
    /// On success the session is `Ready` and holds the capability. On failure
    /// the session is in `Error`, the status shows [`LOAD_ERROR_LABEL`] and the
    /// error is returned. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BotError::InvalidTransition`] if the session was
    /// already loaded or loading, or the provider's error.
    pub async fn load(
        &self,
        session: &mut SessionContext,
        model_id: &str,
    ) -> Result<Arc<dyn Capability>> {
        session.apply(SessionEvent::BeginLoad)?;
        session.status_mut().report(INITIALIZING_LABEL, None);
        info!(
            "loading {model_id} (device={}, dtype={})",
            self.device, self.dtype
        );
        let start = Instant::now();

        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let progress: ProgressCallback = Box::new(move |event| {
            // The receiver only goes away once loading has finished.
            let _ = tx.send(event);
        });
        let options = LoadOptions {
            device: self.device,
            dtype: self.dtype.clone(),
            progress,
        };

        let pending = self
            .provider
            .load(TaskKind::TextGeneration, model_id, options);
        tokio::pin!(pending);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => apply_progress(session, &event)?,
                result = &mut pending => break result,
            }
        };
        // Events sent right before the provider resolved.
        while let Ok(event) = rx.try_recv() {
            apply_progress(session, &event)?;
        }

        match result {
            Ok(capability) => {
                session.set_capability(Arc::clone(&capability));
                session.apply(SessionEvent::LoadSucceeded)?;
                session.status_mut().report(READY_LABEL, Some(100.0));
                session.status_mut().hide();
                info!(
                    "{model_id} ready in {:.1}s",
                    start.elapsed().as_secs_f64()
                );
                Ok(capability)
            }
            Err(e) => {
                error!("failed to load {model_id}: {e}");
                session.apply(SessionEvent::LoadFailed {
                    message: e.to_string(),
                })?;
                session.status_mut().report(LOAD_ERROR_LABEL, None);
                Err(e)
            }
        }
    }
}

fn apply_progress(session: &mut SessionContext, event: &ProgressEvent) -> Result<()> {
    let label = event.label();
    let percent = event.percent();
    debug!(
        "progress: {label} {} {percent:?}",
        event.file.as_deref().unwrap_or("")
    );
    session.status_mut().report(label, percent);
    session.apply(SessionEvent::Progress {
        percent: clamp_percent(percent),
        label: label.to_owned(),
    })
}
