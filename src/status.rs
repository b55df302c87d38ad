//! Loading indicator: a label plus a progress bar.

use indicatif::{ProgressBar, ProgressStyle};

/// Clamp a percentage into `[0, 100]`.
///
/// `None` and NaN both render as 0, so "no progress information yet" looks
/// the same as "0%".
pub fn clamp_percent(percent: Option<f64>) -> f64 {
    match percent {
        Some(p) if !p.is_nan() => p.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

/// What the loading indicator currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Label text.
    pub label: String,
    /// Bar width in percent, always within `[0, 100]`.
    pub bar_percent: f64,
}

/// Rendering surface for the loading indicator.
pub trait StatusView: Send {
    /// Show `label` with a bar `bar_percent` wide.
    fn render(&mut self, snapshot: &StatusSnapshot);

    /// Remove the indicator once loading has finished.
    fn hide(&mut self) {}
}

/// Reports load status to a [`StatusView`].
pub struct StatusReporter {
    view: Box<dyn StatusView>,
    current: Option<StatusSnapshot>,
}

impl StatusReporter {
    /// Create a reporter rendering into `view`.
    pub fn new(view: Box<dyn StatusView>) -> Self {
        Self {
            view,
            current: None,
        }
    }

    /// Set the label and bar width.
    pub fn report(&mut self, label: &str, percent: Option<f64>) {
        let snapshot = StatusSnapshot {
            label: label.to_owned(),
            bar_percent: clamp_percent(percent),
        };
        self.view.render(&snapshot);
        self.current = Some(snapshot);
    }

    /// Hide the indicator.
    pub fn hide(&mut self) {
        self.view.hide();
    }

    /// The last reported state, if any.
    pub fn current(&self) -> Option<&StatusSnapshot> {
        self.current.as_ref()
    }
}

/// Terminal loading indicator backed by an `indicatif` bar.
pub struct TerminalStatus {
    bar: ProgressBar,
}

impl TerminalStatus {
    /// Create a bar drawn to stderr.
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template("  {msg:<24} [{bar:30}] {pos:>3}%") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl Default for TerminalStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusView for TerminalStatus {
    fn render(&mut self, snapshot: &StatusSnapshot) {
        self.bar.set_message(snapshot.label.clone());
        self.bar.set_position(snapshot.bar_percent.round() as u64);
    }

    fn hide(&mut self) {
        self.bar.finish_and_clear();
    }
}
