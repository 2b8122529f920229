use serde::Serialize;

/// What one scheduling pass did with one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TaskOutcome {
    Disabled,
    NotDue,
    QuotaExhausted,
    /// Another evaluation holds the lock.
    LockHeld,
    Succeeded,
    /// The command failed; retry handling has already run.
    Failed(String),
    /// Handed to the background executor; the outcome is handled there.
    Submitted,
    /// A store or internal fault; logged and contained.
    Errored(String),
}

impl TaskOutcome {
    /// Whether the command was started in this pass.
    pub fn ran(&self) -> bool {
        matches!(
            self,
            TaskOutcome::Succeeded | TaskOutcome::Failed(_) | TaskOutcome::Submitted
        )
    }
}

/// Result of one [`TriggerEngine::evaluate`](crate::TriggerEngine::evaluate) call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// `false` when the global switch is off; no task was looked at.
    pub active: bool,
    /// One entry per valid configured task, in configuration order.
    pub outcomes: Vec<(String, TaskOutcome)>,
}

impl PassReport {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, outcome)| outcome)
    }

    /// Number of tasks whose command was started.
    pub fn executed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.ran()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lookup_and_counts() {
        let report = PassReport {
            active: true,
            outcomes: vec![
                ("a".into(), TaskOutcome::Succeeded),
                ("b".into(), TaskOutcome::NotDue),
                ("c".into(), TaskOutcome::Failed("boom".into())),
                ("d".into(), TaskOutcome::Submitted),
            ],
        };
        assert_eq!(report.outcome("b"), Some(&TaskOutcome::NotDue));
        assert_eq!(report.outcome("zzz"), None);
        assert_eq!(report.executed(), 3);
    }

    #[test]
    fn serializes_with_tag() {
        let json = serde_json::to_value(TaskOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["detail"], "boom");
    }
}
