//! Scheduling mode selection.

/// How the targets of a session are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// One target at a time, in order.
    Sequential,
    /// Bounded worker pool; no ordering across targets.
    Parallel { workers: usize },
}

impl ScheduleMode {
    pub fn is_parallel(self) -> bool {
        matches!(self, ScheduleMode::Parallel { .. })
    }
}

/// Parallel only when enabled, with more than one target and more than one
/// worker. The pool never exceeds the target count.
pub fn choose_mode(parallel_enabled: bool, target_count: usize, max_workers: usize) -> ScheduleMode {
    if parallel_enabled && target_count > 1 && max_workers > 1 {
        ScheduleMode::Parallel {
            workers: max_workers.min(target_count),
        }
    } else {
        ScheduleMode::Sequential
    }
}
