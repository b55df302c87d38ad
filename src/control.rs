//! Enablement of the control that triggers a request (send / generate).

/// A button-like control that can be disabled while a request runs.
///
/// Counts enable and disable calls so callers can check that every path
/// through a request restores the control exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Control {
    disabled: bool,
    disable_calls: usize,
    enable_calls: usize,
}

impl Control {
    /// A control that starts disabled, as before the model is loaded.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Whether the control currently rejects interaction.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Disable the control.
    pub fn disable(&mut self) {
        self.disabled = true;
        self.disable_calls += 1;
    }

    /// Enable the control.
    pub fn enable(&mut self) {
        self.disabled = false;
        self.enable_calls += 1;
    }

    /// Number of [`Control::disable`] calls so far.
    pub fn disable_calls(&self) -> usize {
        self.disable_calls
    }

    /// Number of [`Control::enable`] calls so far.
    pub fn enable_calls(&self) -> usize {
        self.enable_calls
    }
}
