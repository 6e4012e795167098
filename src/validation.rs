//! Client-side form validation. Nothing that fails here reaches the network.

use crate::api::CreateTaskRequest;
use crate::error::{FormErrors, WorkflowError, WorkflowResult};
use crate::types::{DepartmentId, Priority, StagedFile, TaskId, TaskStatus, UserId, parse_date};
use chrono::NaiveDate;

pub const MSG_TITLE_REQUIRED: &str = "Title is required";
pub const MSG_DESCRIPTION_REQUIRED: &str = "Description is required";
pub const MSG_START_REQUIRED: &str = "Start date is required";
pub const MSG_DUE_REQUIRED: &str = "Due date is required";
pub const MSG_INVALID_DATE: &str = "Enter a valid date (YYYY-MM-DD)";
pub const MSG_DUE_BEFORE_START: &str = "Due date cannot be before start date";

/// Everything the task creation form collects.
#[derive(Debug, Clone, Default)]
pub struct NewTaskForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub start_date: String,
    pub due_date: String,
    pub assignee: Option<UserId>,
    /// Multi-assignee creation, used by users who can see all tasks.
    pub assignees: Vec<UserId>,
    pub department: Option<DepartmentId>,
    pub parent_task: Option<TaskId>,
    pub is_urgent: bool,
    pub requires_approval: bool,
    pub files: Vec<StagedFile>,
}

impl NewTaskForm {
    /// Validate and produce the creation payload plus the files to send with it.
    pub fn into_request(self) -> WorkflowResult<(CreateTaskRequest, Vec<StagedFile>)> {
        let mut errors = FormErrors::new();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.insert("title".into(), MSG_TITLE_REQUIRED.into());
        }
        let description = self.description.trim().to_string();
        if description.is_empty() {
            errors.insert("description".into(), MSG_DESCRIPTION_REQUIRED.into());
        }

        let start = required_date(&self.start_date, "start_date", MSG_START_REQUIRED, &mut errors);
        let due = required_date(&self.due_date, "due_date", MSG_DUE_REQUIRED, &mut errors);
        if let (Some(start), Some(due)) = (start, due) {
            check_date_order(Some(start), Some(due), &mut errors);
        }

        if !errors.is_empty() {
            return Err(WorkflowError::validation(errors));
        }
        let (Some(start_date), Some(due_date)) = (start, due) else {
            return Err(WorkflowError::internal("dates missing after validation"));
        };

        let request = CreateTaskRequest {
            title,
            description,
            priority: self.priority,
            status: self.status,
            start_date,
            due_date,
            progress_percentage: 0,
            is_urgent: self.is_urgent.to_string(),
            requires_approval: self.requires_approval.to_string(),
            assignee: self.assignee,
            assignees: self.assignees,
            department: self.department,
            parent_task: self.parent_task,
        };
        Ok((request, self.files))
    }
}

fn required_date(
    raw: &str,
    field: &str,
    missing: &str,
    errors: &mut FormErrors,
) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        errors.insert(field.into(), missing.into());
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.insert(field.into(), MSG_INVALID_DATE.into());
    }
    parsed
}

/// Record a due-date error when due precedes start. Either side may be absent.
pub fn check_date_order(start: Option<NaiveDate>, due: Option<NaiveDate>, errors: &mut FormErrors) {
    if let (Some(start), Some(due)) = (start, due) {
        if due < start {
            errors.insert("due_date".into(), MSG_DUE_BEFORE_START.into());
        }
    }
}

/// Parse an optional date typed into the edit form. Blank means "unchanged".
pub fn optional_date(raw: &str, field: &str, errors: &mut FormErrors) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.insert(field.into(), MSG_INVALID_DATE.into());
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn form() -> NewTaskForm {
        NewTaskForm {
            title: "Audit Q1".into(),
            description: "Prepare audit".into(),
            priority: Priority::High,
            status: TaskStatus::ToDo,
            start_date: "2024-01-01".into(),
            due_date: "2024-01-10".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_form_builds_defaults() {
        let (req, files) = form().into_request().unwrap();
        assert!(files.is_empty());
        assert_eq!(req.progress_percentage, 0);
        assert_eq!(req.is_urgent, "false");
        assert_eq!(req.requires_approval, "false");
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_due_before_start_is_rejected() {
        let mut f = form();
        f.start_date = "2024-02-10".into();
        f.due_date = "2024-02-01".into();
        let err = f.into_request().unwrap_err();
        assert!(err.is(ErrorCode::ValidationFailed));
        assert_eq!(err.fields.get("due_date").unwrap(), MSG_DUE_BEFORE_START);
    }

    #[test]
    fn test_same_day_is_allowed() {
        let mut f = form();
        f.due_date = f.start_date.clone();
        assert!(f.into_request().is_ok());
    }

    #[test]
    fn test_required_fields_are_reported_together() {
        let err = NewTaskForm::default().into_request().unwrap_err();
        for field in ["title", "description", "start_date", "due_date"] {
            assert!(err.fields.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn test_garbage_date() {
        let mut f = form();
        f.due_date = "next tuesday".into();
        let err = f.into_request().unwrap_err();
        assert_eq!(err.fields.get("due_date").unwrap(), MSG_INVALID_DATE);
    }
}
