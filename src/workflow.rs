//! Pure task workflow rules shared by every operation that touches
//! progress, status, or priority.

use crate::types::{Priority, TaskStatus};

pub const PROGRESS_MIN: u8 = 0;
pub const PROGRESS_MAX: u8 = 100;

/// Clamp a requested progress value to 0..=100.
pub fn clamp_progress(requested: i64) -> u8 {
    requested.clamp(PROGRESS_MIN as i64, PROGRESS_MAX as i64) as u8
}

/// Status implied by a progress value.
///
/// 100 completes the task, 0 sends it back to TO_DO, anything in between
/// leaves the current status alone.
pub fn derive_status_from_progress(progress: u8, current: TaskStatus) -> TaskStatus {
    match progress {
        p if p >= PROGRESS_MAX => TaskStatus::Completed,
        PROGRESS_MIN => TaskStatus::ToDo,
        _ => current,
    }
}

/// Priorities a task may move to: the current one and anything above it.
pub fn priority_options(current: Priority) -> Vec<Priority> {
    Priority::ALL
        .iter()
        .copied()
        .filter(|p| *p >= current)
        .collect()
}

pub fn is_priority_escalation(current: Priority, requested: Priority) -> bool {
    requested >= current
}

/// Audit note attached to every status change.
pub fn status_change_comment(status: TaskStatus) -> String {
    format!("Status changed to {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_progress() {
        for (input, expected) in [(-20, 0), (0, 0), (55, 55), (100, 100), (250, 100)] {
            assert_eq!(clamp_progress(input), expected, "input {}", input);
        }
    }

    #[test]
    fn test_full_progress_completes() {
        for status in TaskStatus::ALL {
            assert_eq!(
                derive_status_from_progress(100, status),
                TaskStatus::Completed
            );
        }
    }

    #[test]
    fn test_zero_progress_resets_to_todo() {
        assert_eq!(
            derive_status_from_progress(0, TaskStatus::UnderReview),
            TaskStatus::ToDo
        );
    }

    #[test]
    fn test_partial_progress_keeps_status() {
        for status in TaskStatus::ALL {
            assert_eq!(derive_status_from_progress(40, status), status);
        }
    }

    #[test]
    fn test_priority_options_never_downgrade() {
        assert_eq!(priority_options(Priority::Low), Priority::ALL.to_vec());
        assert_eq!(
            priority_options(Priority::High),
            vec![Priority::High, Priority::Urgent]
        );
        assert_eq!(priority_options(Priority::Urgent), vec![Priority::Urgent]);
        assert!(!is_priority_escalation(Priority::High, Priority::Medium));
    }

    #[test]
    fn test_status_change_comment() {
        assert_eq!(
            status_change_comment(TaskStatus::UnderReview),
            "Status changed to UNDER_REVIEW"
        );
    }
}
