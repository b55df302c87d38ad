//! Progress events emitted while a model is resolved and loaded.
//!
//! Providers report through a [`ProgressCallback`] so the loading logic stays
//! decoupled from how progress is presented (terminal bar, test recorder).

/// Label used when a provider sends an event without a status.
pub const DEFAULT_PROGRESS_LABEL: &str = "loading…";

/// One progress notification from an inference provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Phase name (e.g. `"download"`, `"loading"`, `"ready"`).
    pub status: String,
    /// File the event refers to, if any.
    pub file: Option<String>,
    /// Completion fraction in `[0, 1]`, if known.
    pub progress: Option<f64>,
}

impl ProgressEvent {
    /// Event for a phase with a known completion fraction.
    pub fn new(status: impl Into<String>, progress: Option<f64>) -> Self {
        Self {
            status: status.into(),
            file: None,
            progress,
        }
    }

    /// Attach the file the event refers to.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Human-readable label, falling back to [`DEFAULT_PROGRESS_LABEL`].
    pub fn label(&self) -> &str {
        if self.status.trim().is_empty() {
            DEFAULT_PROGRESS_LABEL
        } else {
            &self.status
        }
    }

    /// Completion as a percentage. Not clamped; the status reporter clamps.
    pub fn percent(&self) -> Option<f64> {
        self.progress.map(|p| 100.0 * p)
    }
}

/// Callback type for receiving progress events.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Adapts hf-hub's download progress hooks into [`ProgressEvent`]s.
///
/// Emits `"download"` events carrying the byte-derived fraction of the file
/// currently being fetched.
pub struct HubProgress<'a> {
    callback: &'a ProgressCallback,
    filename: String,
    total: usize,
    downloaded: usize,
    /// Last whole percent reported, so large files don't flood the callback.
    last_percent: Option<u64>,
    /// Whether anything was reported for the current file.
    reported: bool,
}

impl<'a> HubProgress<'a> {
    /// Create an adapter that forwards to `callback`.
    pub fn new(callback: &'a ProgressCallback) -> Self {
        Self {
            callback,
            filename: String::new(),
            total: 0,
            downloaded: 0,
            last_percent: None,
            reported: false,
        }
    }

    fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.downloaded as f64 / self.total as f64)
        }
    }

    fn emit(&mut self) {
        let fraction = self.fraction();
        let whole = fraction.map(|f| (f * 100.0) as u64);
        // Unknown sizes report once, then stay quiet until `finish`.
        if self.reported && whole == self.last_percent {
            return;
        }
        self.reported = true;
        self.last_percent = whole;
        (self.callback)(ProgressEvent::new("download", fraction).with_file(&self.filename));
    }
}

impl hf_hub::api::Progress for HubProgress<'_> {
    fn init(&mut self, size: usize, filename: &str) {
        self.filename = filename.to_owned();
        self.total = size;
        self.downloaded = 0;
        self.last_percent = None;
        self.reported = false;
        self.emit();
    }

    fn update(&mut self, size: usize) {
        self.downloaded = self.downloaded.saturating_add(size).min(self.total.max(1));
        self.emit();
    }

    fn finish(&mut self) {
        (self.callback)(ProgressEvent::new("done", Some(1.0)).with_file(&self.filename));
    }
}
