//! Capability resolution for a user looking at a task.
//!
//! Pure derivation: nothing here touches the network, so it is recomputed
//! whenever the task or session changes.

use crate::session::Session;
use crate::types::{Comment, Priority, Task};
use crate::workflow::priority_options;
use serde::Serialize;

/// Feature codes whose permission entry governs tasks.
pub const DEFAULT_FEATURE_CODES: &[&str] = &["task", "task_management"];

/// Per-field edit flags for the task detail view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldPermissions {
    pub can_edit_assignee: bool,
    pub can_edit_department: bool,
    pub can_edit_due_date: bool,
    pub can_edit_description: bool,
    pub can_edit_progress: bool,
    pub can_edit_attachments: bool,
    pub is_assignee: bool,
    pub can_view_all: bool,
}

/// Everything the current user may do to one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_edit_task: bool,
    pub can_delete_task: bool,
    pub can_view_all: bool,
    /// Status moves belong to the assignee alone.
    pub can_change_status: bool,
    /// Priority escalation belongs to the assignee alone.
    pub can_change_priority: bool,
    pub field_permissions: FieldPermissions,
}

impl Capabilities {
    /// Priorities this user may pick for `task`. Empty when priority is locked.
    pub fn priority_options(&self, task: &Task) -> Vec<Priority> {
        if self.can_change_priority {
            priority_options(task.priority)
        } else {
            Vec::new()
        }
    }
}

/// Resolves capabilities against a configurable set of feature codes.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    feature_codes: Vec<String>,
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_CODES.iter().map(|s| s.to_string()))
    }
}

impl PermissionResolver {
    pub fn new(feature_codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            feature_codes: feature_codes.into_iter().collect(),
        }
    }

    /// Capability set for `session` on `task`. Missing inputs yield all-false.
    pub fn resolve(&self, session: Option<&Session>, task: Option<&Task>) -> Capabilities {
        let (Some(session), Some(task)) = (session, task) else {
            return Capabilities::default();
        };
        let Some(permission) = session.permission_for(&self.feature_codes) else {
            return Capabilities::default();
        };

        let can_edit_task = permission.can_edit;
        let can_view_all = permission.can_view_all;
        let is_assignee = match (session.user_id(), task.assignee) {
            (Some(user), Some(assignee)) => user == assignee,
            _ => false,
        };
        let field_edit = can_edit_task && (can_view_all || is_assignee);

        Capabilities {
            can_edit_task,
            can_delete_task: permission.can_delete,
            can_view_all,
            can_change_status: is_assignee,
            can_change_priority: is_assignee,
            field_permissions: FieldPermissions {
                can_edit_assignee: field_edit,
                can_edit_department: field_edit,
                can_edit_due_date: field_edit,
                can_edit_description: field_edit,
                can_edit_progress: field_edit,
                can_edit_attachments: field_edit,
                is_assignee,
                can_view_all,
            },
        }
    }

    /// Whether the user may list every task, not only their own.
    pub fn can_view_all(&self, session: &Session) -> bool {
        session
            .permission_for(&self.feature_codes)
            .is_some_and(|p| p.can_view_all)
    }
}

/// Edit/delete controls on a comment are shown only to its author.
pub fn can_modify_comment(session: &Session, comment: &Comment) -> bool {
    match (session.user_id(), comment.author) {
        (Some(user), Some(author)) => user == author,
        _ => false,
    }
}
