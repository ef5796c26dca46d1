use std::fmt;

use serde::{Deserialize, Serialize};

use crate::step::{StepResult, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    Success,
    Partial,
    Failed,
}

impl RunOutcome {
    /// - algún crítico `FAILED` (o ningún resultado) → `Failed`
    /// - algún no crítico `FAILED` → `Partial`
    /// - resto (`OK`/`RETRIED`/`SKIPPED`) → `Success`
    pub fn aggregate(results: &[StepResult]) -> Self {
        if results.is_empty() {
            return RunOutcome::Failed;
        }
        let failed = |critical: bool| results.iter().any(|r| r.status == StepStatus::Failed && r.critical == critical);
        if failed(true) {
            RunOutcome::Failed
        } else if failed(false) {
            RunOutcome::Partial
        } else {
            RunOutcome::Success
        }
    }

    /// Código de salida del binario para este outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failed => 1,
            RunOutcome::Partial => 3,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOutcome::Success => "SUCCESS",
            RunOutcome::Partial => "PARTIAL",
            RunOutcome::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepError;
    use crate::step::SkipReason;
    use chrono::Utc;

    #[test]
    fn aggregation_table() {
        let now = Utc::now();
        let ok = |name: &str, critical| StepResult::ok(name, critical, 1, None, now, now);
        let failed = |name: &str, critical| StepResult::failed(name, critical, 3, StepError::Transient("x".into()), now, now);
        let skipped = StepResult::skipped("submit", true, SkipReason::AlreadySubmitted { period: "p".into() }, now);

        assert_eq!(RunOutcome::aggregate(&[]), RunOutcome::Failed);
        assert_eq!(RunOutcome::aggregate(&[ok("extract", true), skipped.clone()]), RunOutcome::Success);
        assert_eq!(RunOutcome::aggregate(&[ok("extract", true), skipped, failed("publish", false)]), RunOutcome::Partial);
        assert_eq!(RunOutcome::aggregate(&[failed("extract", true), failed("publish", false)]), RunOutcome::Failed);
    }
}
