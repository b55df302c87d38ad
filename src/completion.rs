//! Single-shot completion: one prompt in, one rendered result out.

use crate::chat::{RejectReason, SubmitOutcome};
use crate::control::Control;
use crate::error::Result;
use crate::loader::ModelLoader;
use crate::session::{SessionContext, SessionEvent, SessionState};
use tracing::{debug, error, info, warn};

/// Output shown while a request runs.
pub const COMPLETION_PLACEHOLDER: &str = "Generating...";

/// Output shown when generation fails.
pub const COMPLETION_ERROR_MESSAGE: &str = "Error generating text. See console for details.";

/// Rendering hooks for the completion page.
pub trait CompletionView: Send {
    /// The output region now shows `text`.
    fn output_changed(&mut self, _text: &str) {}
    /// The generate control changed enablement.
    fn control_changed(&mut self, _enabled: bool) {}
}

/// Drives single-shot completions.
pub struct CompletionController {
    session: SessionContext,
    output: String,
    control: Control,
    view: Box<dyn CompletionView>,
}

impl CompletionController {
    /// Controller for `session`; the generate control starts disabled.
    pub fn new(session: SessionContext, view: Box<dyn CompletionView>) -> Self {
        Self {
            session,
            output: String::new(),
            control: Control::disabled(),
            view,
        }
    }

    /// Load the model and enable the generate control.
    ///
    /// # Errors
    ///
    /// Returns the load error; the control then stays disabled.
    pub async fn initialize(&mut self, loader: &ModelLoader, model_id: &str) -> Result<()> {
        loader.load(&mut self.session, model_id).await?;
        self.set_control(true);
        Ok(())
    }

    /// Generate a completion for `prompt`.
    ///
    /// The control is re-enabled as the final step whatever the outcome,
    /// including rejections that never disabled it.
    pub async fn submit(&mut self, prompt: &str) -> SubmitOutcome {
        let outcome = self.run(prompt).await;
        self.set_control(true);
        outcome
    }

    async fn run(&mut self, prompt: &str) -> SubmitOutcome {
        if prompt.trim().is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if !self.session.is_ready() {
            debug!("completion ignored in {:?}", self.session.state());
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        }
        let Some(capability) = self.session.capability() else {
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        };
        if let Err(e) = self.session.apply(SessionEvent::BeginGeneration) {
            debug!("completion ignored: {e}");
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        }

        info!("completion: {} chars", prompt.len());
        self.set_control(false);
        self.set_output(COMPLETION_PLACEHOLDER);

        let options = self.session.options().clone();
        let outcome = match capability.generate(prompt, &options, None).await {
            Ok(results) => match results.into_iter().next() {
                Some(first) => {
                    self.set_output(&first.generated_text);
                    SubmitOutcome::Completed
                }
                None => {
                    error!("completion returned no results");
                    self.set_output(COMPLETION_ERROR_MESSAGE);
                    SubmitOutcome::Failed
                }
            },
            Err(e) => {
                error!("completion failed: {e}");
                self.set_output(COMPLETION_ERROR_MESSAGE);
                SubmitOutcome::Failed
            }
        };

        if let Err(e) = self.session.apply(SessionEvent::EndGeneration) {
            warn!("session out of sync after completion: {e}");
        }
        outcome
    }

    /// Current output region text.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The generate control.
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Session lifecycle state.
    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    /// The underlying session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn set_output(&mut self, text: &str) {
        text.clone_into(&mut self.output);
        self.view.output_changed(&self.output);
    }

    fn set_control(&mut self, enabled: bool) {
        if enabled {
            self.control.enable();
        } else {
            self.control.disable();
        }
        self.view.control_changed(enabled);
    }
}
