//! Chat controller behaviour against a mocked capability.

use crate::helpers::{
    Behavior, MockCapability, MockProvider, StatusRecorder, ViewEvent, loader_for, new_session,
    ready_chat,
};
use babybot::chat::{
    CHAT_ERROR_MESSAGE, ChatController, Message, RejectReason, Role, SubmitOutcome, TurnState,
};
use babybot::session::SessionState;
use std::sync::Arc;

#[tokio::test]
async fn streamed_fragments_build_the_bot_message() {
    let (mut chat, capability, _view) = ready_chat(Behavior::Stream(vec!["Hi", "!"])).await;

    let outcome = chat.submit("hello there").await;

    assert_eq!(outcome, SubmitOutcome::Completed);
    assert_eq!(
        chat.transcript(),
        &[Message::user("hello there"), Message::bot("Hi!")]
    );
    assert!(!chat.control().is_disabled());
    assert!(chat.session_state().is_ready());
    assert_eq!(chat.turn_state(), TurnState::Idle);

    let calls = capability.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].streamed);
    assert_eq!(calls[0].skip_prompt, Some(true));
    assert_eq!(calls[0].text, "hello there");
}

#[tokio::test]
async fn user_message_precedes_any_bot_content() {
    let (mut chat, _capability, view) = ready_chat(Behavior::Stream(vec!["a", "b", "c"])).await;

    chat.submit("  question  ").await;

    let events = view.events();
    assert_eq!(
        events[0],
        ViewEvent::Appended(0, Role::User, "question".to_owned())
    );
    assert_eq!(events[1], ViewEvent::InputCleared);
    assert_eq!(events[2], ViewEvent::Control(false));
    assert_eq!(events[3], ViewEvent::Appended(1, Role::Bot, String::new()));

    let fragments: Vec<&ViewEvent> = events
        .iter()
        .filter(|e| matches!(e, ViewEvent::Extended(..)))
        .collect();
    assert_eq!(
        fragments,
        vec![
            &ViewEvent::Extended(1, "a".to_owned()),
            &ViewEvent::Extended(1, "b".to_owned()),
            &ViewEvent::Extended(1, "c".to_owned()),
        ]
    );
    // Every fragment keeps the newest content in view.
    let scrolls = events
        .iter()
        .filter(|e| matches!(e, ViewEvent::Scrolled))
        .count();
    assert_eq!(scrolls, 4);
    assert_eq!(events.last(), Some(&ViewEvent::Control(true)));
}

#[tokio::test]
async fn failure_replaces_bot_message_and_reenables() {
    let (mut chat, _capability, view) = ready_chat(Behavior::Fail).await;

    let outcome = chat.submit("hello").await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(chat.transcript()[1], Message::bot(CHAT_ERROR_MESSAGE));
    assert!(!chat.control().is_disabled());
    assert!(chat.session_state().is_ready());
    assert_eq!(chat.turn_state(), TurnState::ErrorDisplayed);
    assert!(
        view.events()
            .contains(&ViewEvent::Replaced(1, CHAT_ERROR_MESSAGE.to_owned()))
    );
}

#[tokio::test]
async fn partial_stream_is_discarded_on_failure() {
    let (mut chat, _capability, _view) =
        ready_chat(Behavior::StreamThenFail(vec!["half an ans"])).await;

    chat.submit("hello").await;

    assert_eq!(chat.transcript()[1].text, CHAT_ERROR_MESSAGE);
}

#[tokio::test]
async fn session_stays_usable_after_failure() {
    let (mut chat, capability, _view) = ready_chat(Behavior::StreamThenFail(vec!["x"])).await;

    chat.submit("first").await;
    let outcome = chat.submit("second").await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(capability.calls().len(), 2);
    assert_eq!(chat.transcript().len(), 4);
    assert_eq!(chat.transcript()[2], Message::user("second"));
}

#[tokio::test]
async fn empty_input_changes_nothing() {
    let (mut chat, capability, view) = ready_chat(Behavior::Stream(vec!["unused"])).await;

    for input in ["", "   ", "\t\n"] {
        assert_eq!(
            chat.submit(input).await,
            SubmitOutcome::Rejected(RejectReason::EmptyInput)
        );
    }

    assert!(chat.transcript().is_empty());
    assert!(capability.calls().is_empty());
    assert!(view.events().is_empty());
    assert_eq!(chat.control().disable_calls(), 0);
}

#[tokio::test]
async fn submit_before_load_is_a_noop() {
    let view = crate::helpers::ViewRecorder::default();
    let mut chat = ChatController::new(
        new_session(&StatusRecorder::default()),
        Box::new(view.clone()),
    );

    let outcome = chat.submit("hello").await;

    assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NotReady));
    assert!(chat.transcript().is_empty());
    assert!(chat.control().is_disabled());
    assert_eq!(chat.session_state(), &SessionState::Uninitialized);
    assert!(view.events().is_empty());
}

#[tokio::test]
async fn submit_after_failed_load_is_a_noop() {
    let provider = MockProvider::failing(Vec::new());
    let mut chat = ChatController::new(
        new_session(&StatusRecorder::default()),
        Box::new(crate::helpers::ViewRecorder::default()),
    );

    assert!(chat.initialize(&loader_for(&provider), "mock/model").await.is_err());
    let outcome = chat.submit("hello").await;

    assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::NotReady));
    assert!(chat.transcript().is_empty());
    assert!(chat.control().is_disabled());
    assert!(matches!(chat.session_state(), SessionState::Error { .. }));
}

#[tokio::test]
async fn every_turn_sends_the_fixed_sampling_options() {
    let (mut chat, capability, _view) = ready_chat(Behavior::Stream(vec!["ok"])).await;

    chat.submit("one").await;
    chat.submit("two").await;

    let calls = capability.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].options, calls[1].options);
    assert_eq!(calls[0].options.max_new_tokens, 80);
    assert_eq!(calls[0].options.top_k, 0);
    assert_eq!(calls[0].options.no_repeat_ngram_size, 4);
}

#[tokio::test]
async fn control_toggles_once_per_turn() {
    let (mut chat, _capability, _view) = ready_chat(Behavior::Stream(vec!["ok"])).await;
    let enables_after_load = chat.control().enable_calls();

    chat.submit("one").await;
    chat.submit("   ").await;
    chat.submit("two").await;

    assert_eq!(chat.control().disable_calls(), 2);
    assert_eq!(chat.control().enable_calls(), enables_after_load + 2);
    assert!(!chat.control().is_disabled());
}

#[tokio::test]
async fn capability_is_shared_not_reloaded() {
    let capability = MockCapability::new(Behavior::Stream(vec!["ok"]));
    let provider = MockProvider::ready(Arc::clone(&capability), Vec::new());
    let mut chat = ChatController::new(
        new_session(&StatusRecorder::default()),
        Box::new(crate::helpers::ViewRecorder::default()),
    );
    chat.initialize(&loader_for(&provider), "mock/model")
        .await
        .unwrap();

    chat.submit("one").await;
    chat.submit("two").await;

    assert_eq!(provider.loads(), 1);
    let shared = chat.session().capability().unwrap();
    assert_eq!(shared.tokenizer_id(), "mock/tokenizer");
}
