//! Final run summary (§4.9, §7): counts, per-stage durations, success rate,
//! and failure breakdown, returned by `PipelineController::run` and also
//! logged via `tracing::info!`.

use std::time::Duration;

use crate::failures::FailureBreakdown;

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub code: String,
    pub total_sections: u64,
    pub completed_sections: u64,
    pub remaining_after_reconciliation: u64,
    pub completion_rate: f64,
    pub stage1_duration: Duration,
    pub stage2_duration: Duration,
    pub stage3_duration: Duration,
    pub reconciliation_duration: Duration,
    pub total_duration: Duration,
    pub failure_breakdown: FailureBreakdown,
    pub interrupted: bool,
}

impl PipelineReport {
    /// Exit code policy (§5, §6): 130 if interrupted, 0 if completion rate
    /// ≥ 99%, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.completion_rate >= 0.99 {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report(completion_rate: f64, interrupted: bool) -> PipelineReport {
        PipelineReport {
            code: "WIC".into(),
            total_sections: 100,
            completed_sections: (completion_rate * 100.0) as u64,
            remaining_after_reconciliation: 0,
            completion_rate,
            stage1_duration: Duration::ZERO,
            stage2_duration: Duration::ZERO,
            stage3_duration: Duration::ZERO,
            reconciliation_duration: Duration::ZERO,
            total_duration: Duration::ZERO,
            failure_breakdown: FailureBreakdown {
                by_type: BTreeMap::new(),
                by_stage: BTreeMap::new(),
                total: 0,
                generated_at: chrono::Utc::now(),
            },
            interrupted,
        }
    }

    #[test]
    fn exit_code_policy() {
        assert_eq!(report(1.0, false).exit_code(), 0);
        assert_eq!(report(0.99, false).exit_code(), 0);
        assert_eq!(report(0.98, false).exit_code(), 1);
        assert_eq!(report(1.0, true).exit_code(), 130);
    }
}
