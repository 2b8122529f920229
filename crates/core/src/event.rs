use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one execution attempt, as seen by notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Success,
    Failure,
    Retry,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Success => "success",
            LifecycleEvent::Failure => "failure",
            LifecycleEvent::Retry => "retry",
        }
    }

    /// Capitalised label used in human-facing messages ("Success", "Failure", "Retry").
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleEvent::Success => "Success",
            LifecycleEvent::Failure => "Failure",
            LifecycleEvent::Retry => "Retry",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
