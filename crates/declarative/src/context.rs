//! Apply context and observer traits
//!
//! These traits let callers watch reconciliation without the crate
//! depending on any particular UI.

use crate::types::Command;
use panoskit::CallContext;

/// Progress callback for command execution
///
/// Implement this trait to receive a notification around every device
/// mutation.
pub trait ProgressCallback: Send {
    /// Called before a command is sent to the device
    fn on_command_start(&mut self, kind: &str, command: &Command);

    /// Called after a command completes; `error` is set on failure
    fn on_command_complete(&mut self, kind: &str, command: &Command, error: Option<&str>);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_command_start(&mut self, _kind: &str, _command: &Command) {}
    fn on_command_complete(&mut self, _kind: &str, _command: &Command, _error: Option<&str>) {}
}

/// Progress callback that records every completed command
#[derive(Debug, Default)]
pub struct RecordProgress {
    pub completed: Vec<(String, Command)>,
    pub failed: Vec<(String, Command, String)>,
}

impl ProgressCallback for RecordProgress {
    fn on_command_start(&mut self, _kind: &str, _command: &Command) {}

    fn on_command_complete(&mut self, kind: &str, command: &Command, error: Option<&str>) {
        match error {
            None => self.completed.push((kind.to_string(), command.clone())),
            Some(e) => self
                .failed
                .push((kind.to_string(), command.clone(), e.to_string())),
        }
    }
}

/// Context passed to resource callbacks
pub struct ApplyContext<'a> {
    /// Cancellation and deadline for every device call
    pub call: CallContext,
    /// Decide commands without executing mutations
    pub dry_run: bool,
    /// Optional observer for executed commands
    pub progress: Option<&'a mut dyn ProgressCallback>,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(call: CallContext) -> Self {
        Self {
            call,
            dry_run: false,
            progress: None,
        }
    }

    /// Set dry-run mode
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_progress(mut self, progress: &'a mut dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn notify_start(&mut self, kind: &str, command: &Command) {
        if let Some(progress) = self.progress.as_deref_mut() {
            progress.on_command_start(kind, command);
        }
    }

    pub(crate) fn notify_complete(&mut self, kind: &str, command: &Command, error: Option<&str>) {
        if let Some(progress) = self.progress.as_deref_mut() {
            progress.on_command_complete(kind, command, error);
        }
    }
}

impl Default for ApplyContext<'_> {
    fn default() -> Self {
        Self::new(CallContext::new())
    }
}
