//! Chat session: a transcript of turns with streamed bot replies.

use crate::capability::TokenSink;
use crate::control::Control;
use crate::error::Result;
use crate::loader::ModelLoader;
use crate::session::{SessionContext, SessionEvent, SessionState};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Text that replaces a bot reply when generation fails.
pub const CHAT_ERROR_MESSAGE: &str = "Oops! Baby bot had a hiccup 👶";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person typing.
    User,
    /// The model.
    Bot,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Text so far.
    pub text: String,
}

impl Message {
    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// A bot message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

/// Progress of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for input.
    Idle,
    /// A reply is streaming in.
    AwaitingResponse,
    /// The last turn failed; input is accepted again.
    ErrorDisplayed,
}

/// Why a submission did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Input was empty after trimming.
    EmptyInput,
    /// The session is not ready or a request is already running.
    NotReady,
}

/// Result of one call to `submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened.
    Rejected(RejectReason),
    /// The request finished and its output was rendered.
    Completed,
    /// The request failed; the fixed diagnostic text was rendered.
    Failed,
}

/// Rendering hooks for the chat transcript.
///
/// All methods default to no-ops so a view only implements what it draws.
pub trait ChatView: Send {
    /// A message was added at `index`.
    fn message_appended(&mut self, _index: usize, _message: &Message) {}
    /// `fragment` was appended to the message at `index`.
    fn message_extended(&mut self, _index: usize, _fragment: &str) {}
    /// The message at `index` was replaced wholesale.
    fn message_replaced(&mut self, _index: usize, _message: &Message) {}
    /// Bring the newest content into view.
    fn scroll_to_latest(&mut self) {}
    /// The input field was cleared.
    fn input_cleared(&mut self) {}
    /// The send control changed enablement.
    fn control_changed(&mut self, _enabled: bool) {}
}

/// Appends streamed fragments to the in-progress bot message.
struct TranscriptSink<'a> {
    index: usize,
    message: &'a mut Message,
    view: &'a mut dyn ChatView,
}

impl TokenSink for TranscriptSink<'_> {
    fn on_token(&mut self, fragment: &str) {
        self.message.text.push_str(fragment);
        self.view.message_extended(self.index, fragment);
        self.view.scroll_to_latest();
    }
}

/// Drives one chat session.
pub struct ChatController {
    session: SessionContext,
    transcript: Vec<Message>,
    control: Control,
    turn: TurnState,
    view: Box<dyn ChatView>,
}

impl ChatController {
    /// Controller for `session`; the send control starts disabled.
    pub fn new(session: SessionContext, view: Box<dyn ChatView>) -> Self {
        Self {
            session,
            transcript: Vec::new(),
            control: Control::disabled(),
            turn: TurnState::Idle,
            view,
        }
    }

    /// Load the model and enable the send control.
    ///
    /// # Errors
    ///
    /// Returns the load error; the control then stays disabled.
    pub async fn initialize(&mut self, loader: &ModelLoader, model_id: &str) -> Result<()> {
        loader.load(&mut self.session, model_id).await?;
        self.set_control(true);
        Ok(())
    }

    /// Submit one user turn.
    ///
    /// Empty input, a session that is not ready and a disabled control all
    /// make this a no-op. Otherwise the reply streams into a new bot message;
    /// a failure replaces it with [`CHAT_ERROR_MESSAGE`] and the session stays
    /// usable.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if !self.session.is_ready() || self.control.is_disabled() {
            debug!("chat submit ignored in {:?}", self.session.state());
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        }
        let Some(capability) = self.session.capability() else {
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        };
        if let Err(e) = self.session.apply(SessionEvent::BeginGeneration) {
            debug!("chat submit ignored: {e}");
            return SubmitOutcome::Rejected(RejectReason::NotReady);
        }

        let turn_id = Uuid::new_v4();
        info!(%turn_id, "chat turn: {} chars", text.len());
        self.turn = TurnState::AwaitingResponse;

        self.push(Message::user(text));
        self.view.input_cleared();
        self.set_control(false);
        let bot_index = self.push(Message::bot(""));
        self.view.scroll_to_latest();

        let options = self.session.options().clone();
        let result = {
            let mut sink = TranscriptSink {
                index: bot_index,
                message: &mut self.transcript[bot_index],
                view: self.view.as_mut(),
            };
            let sink: &mut dyn TokenSink = &mut sink;
            capability.generate(text, &options, Some(sink)).await
        };

        let outcome = match result {
            Ok(_) => {
                debug!(
                    %turn_id,
                    "chat turn finished: {} chars",
                    self.transcript[bot_index].text.len()
                );
                self.turn = TurnState::Idle;
                SubmitOutcome::Completed
            }
            Err(e) => {
                error!(%turn_id, "chat generation failed: {e}");
                let message = &mut self.transcript[bot_index];
                message.text = CHAT_ERROR_MESSAGE.to_owned();
                self.view.message_replaced(bot_index, message);
                self.turn = TurnState::ErrorDisplayed;
                SubmitOutcome::Failed
            }
        };

        if let Err(e) = self.session.apply(SessionEvent::EndGeneration) {
            warn!("session out of sync after chat turn: {e}");
        }
        self.set_control(true);
        outcome
    }

    /// Messages in insertion order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// The send control.
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Progress of the current turn.
    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    /// Session lifecycle state.
    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    /// The underlying session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn push(&mut self, message: Message) -> usize {
        let index = self.transcript.len();
        self.view.message_appended(index, &message);
        self.transcript.push(message);
        index
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
