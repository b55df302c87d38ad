//! Model loading: progress reporting and lifecycle transitions.

use crate::helpers::{
    Behavior, MockCapability, MockProvider, StatusRecorder, loader_for, new_session, progress,
};
use babybot::BotError;
use babybot::device::Device;
use babybot::loader::{LOAD_ERROR_LABEL, READY_LABEL};
use babybot::progress::DEFAULT_PROGRESS_LABEL;
use babybot::session::{INITIALIZING_LABEL, SessionState};
use std::sync::Arc;

#[tokio::test]
async fn progress_events_reach_the_status_view_clamped() {
    let capability = MockCapability::new(Behavior::Stream(vec![]));
    let provider = MockProvider::ready(
        Arc::clone(&capability),
        vec![
            progress("initiate", None),
            progress("download", Some(0.5)),
            progress("download", Some(1.7)),
            progress("", Some(-0.2)),
        ],
    );
    let status = StatusRecorder::default();
    let mut session = new_session(&status);

    loader_for(&provider)
        .load(&mut session, "mock/model")
        .await
        .unwrap();

    let renders: Vec<(String, f64)> = status
        .renders()
        .into_iter()
        .map(|s| (s.label, s.bar_percent))
        .collect();
    assert_eq!(
        renders,
        vec![
            (INITIALIZING_LABEL.to_owned(), 0.0),
            ("initiate".to_owned(), 0.0),
            ("download".to_owned(), 50.0),
            ("download".to_owned(), 100.0),
            (DEFAULT_PROGRESS_LABEL.to_owned(), 0.0),
            (READY_LABEL.to_owned(), 100.0),
        ]
    );
    assert!(status.is_hidden());
    assert!(session.is_ready());
    assert!(session.capability().is_some());
}

#[tokio::test]
async fn load_failure_leaves_session_in_error() {
    let provider = MockProvider::failing(vec![progress("download", Some(0.3))]);
    let status = StatusRecorder::default();
    let mut session = new_session(&status);

    let result = loader_for(&provider).load(&mut session, "mock/model").await;

    assert!(matches!(result, Err(BotError::Load(_))));
    assert!(matches!(session.state(), SessionState::Error { .. }));
    assert!(session.capability().is_none());
    let last = status.renders().pop().unwrap();
    assert_eq!(last.label, LOAD_ERROR_LABEL);
    assert!((last.bar_percent - 0.0).abs() < f64::EPSILON);
    assert!(!status.is_hidden());
}

#[tokio::test]
async fn load_happens_at_most_once() {
    let capability = MockCapability::new(Behavior::Stream(vec![]));
    let provider = MockProvider::ready(capability, Vec::new());
    let mut session = new_session(&StatusRecorder::default());
    let loader = loader_for(&provider);

    loader.load(&mut session, "mock/model").await.unwrap();
    let second = loader.load(&mut session, "mock/model").await;

    assert!(matches!(second, Err(BotError::InvalidTransition { .. })));
    assert_eq!(provider.loads(), 1);
    assert!(session.is_ready());
}

#[tokio::test]
async fn no_retry_after_failure() {
    let provider = MockProvider::failing(Vec::new());
    let mut session = new_session(&StatusRecorder::default());
    let loader = loader_for(&provider);

    assert!(loader.load(&mut session, "mock/model").await.is_err());
    assert!(loader.load(&mut session, "mock/model").await.is_err());
    assert_eq!(provider.loads(), 1);
}

#[tokio::test]
async fn requested_device_is_forwarded() {
    let capability = MockCapability::new(Behavior::Stream(vec![]));
    let provider = MockProvider::ready(capability, Vec::new());
    let mut session = new_session(&StatusRecorder::default());

    loader_for(&provider)
        .with_device(Device::Accelerated)
        .load(&mut session, "mock/model")
        .await
        .unwrap();

    assert_eq!(provider.last_device(), Some(Device::Accelerated));
}

#[tokio::test]
async fn progress_from_another_thread_is_applied() {
    use async_trait::async_trait;
    use babybot::capability::{Capability, InferenceProvider, LoadOptions, TaskKind};

    struct ThreadedProvider(Arc<MockCapability>);

    #[async_trait]
    impl InferenceProvider for ThreadedProvider {
        async fn load(
            &self,
            _task: TaskKind,
            _model_id: &str,
            options: LoadOptions,
        ) -> babybot::Result<Arc<dyn Capability>> {
            let progress = options.progress;
            tokio::task::spawn_blocking(move || {
                for step in 1..=4 {
                    progress(babybot::ProgressEvent::new("download", Some(step as f64 / 4.0)));
                }
            })
            .await
            .map_err(|e| BotError::Load(e.to_string()))?;
            Ok(Arc::clone(&self.0) as Arc<dyn Capability>)
        }
    }

    let provider = Arc::new(ThreadedProvider(MockCapability::new(Behavior::Stream(
        vec![],
    ))));
    let status = StatusRecorder::default();
    let mut session = new_session(&status);

    babybot::ModelLoader::new(provider)
        .load(&mut session, "mock/model")
        .await
        .unwrap();

    let downloads: Vec<f64> = status
        .renders()
        .into_iter()
        .filter(|s| s.label == "download")
        .map(|s| s.bar_percent)
        .collect();
    assert_eq!(downloads, vec![25.0, 50.0, 75.0, 100.0]);
}
