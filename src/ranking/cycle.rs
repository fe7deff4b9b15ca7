use crate::ranking::types::CycleStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleInput {
    /// Every stored comparison of the participant, skipped and tied included.
    pub total_comparisons: u64,
    pub completed_cycles: u32,
    pub cycle_length: u32,
    /// 0 means unlimited.
    pub max_cycles: u32,
    pub offer_escape_route: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleEvaluation {
    pub status: CycleStatus,
    /// Count the participant should have once this evaluation is applied.
    pub completed_cycles: u32,
}

impl CycleEvaluation {
    /// Whether the evaluation raises the stored count.
    pub fn advances(&self, stored: u32) -> bool {
        self.completed_cycles > stored
    }
}

pub fn evaluate(input: CycleInput) -> CycleEvaluation {
    let completed = input.completed_cycles;
    let limited = input.max_cycles > 0;

    if limited && completed >= input.max_cycles {
        return CycleEvaluation {
            status: CycleStatus::HardStop,
            completed_cycles: completed,
        };
    }

    let cycle_length = u64::from(input.cycle_length.max(1));
    let total = input.total_comparisons;
    let at_boundary = total > 0
        && total % cycle_length == 0
        && total > u64::from(completed) * cycle_length;

    if !at_boundary {
        return CycleEvaluation {
            status: CycleStatus::Continue,
            completed_cycles: completed,
        };
    }

    let next = completed.saturating_add(1);
    if limited && next >= input.max_cycles {
        CycleEvaluation {
            status: CycleStatus::HardStop,
            completed_cycles: next,
        }
    } else if input.offer_escape_route {
        CycleEvaluation {
            status: CycleStatus::CycleBoundary,
            completed_cycles: completed,
        }
    } else {
        CycleEvaluation {
            status: CycleStatus::Continue,
            completed_cycles: next,
        }
    }
}

/// Applies the participant's choice to keep going from a pending boundary.
/// Any other status is returned unchanged.
pub fn continue_after_boundary(evaluation: CycleEvaluation) -> CycleEvaluation {
    match evaluation.status {
        CycleStatus::CycleBoundary => CycleEvaluation {
            status: CycleStatus::Continue,
            completed_cycles: evaluation.completed_cycles.saturating_add(1),
        },
        _ => evaluation,
    }
}
