//! The signed-in user and their role permissions.
//!
//! Session documents arrive in more than one shape: the user id may sit at
//! `user.id` or at the top level, and the role may be attached to either
//! level. All of that is resolved here, once, so the rest of the crate only
//! sees a flat [`Session`].

use crate::error::{WorkflowError, WorkflowResult};
use crate::types::UserId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One entry of a role's permission table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub feature_code: String,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_view_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<RolePermission>,
}

/// Normalized user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `None` when the session document carried no usable id.
    pub id: Option<UserId>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Read-only session context passed to the resolver and the façade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub role: Option<Role>,
}

impl Session {
    pub fn new(user: User, role: Option<Role>) -> Self {
        Self { user, role }
    }

    /// Build a session from a raw session document.
    pub fn from_value(raw: &Value) -> Self {
        let nested = raw.get("user").filter(|u| u.is_object());
        let user_obj = nested.unwrap_or(raw);

        let id = nested
            .and_then(|u| u.get("id"))
            .and_then(parse_id)
            .or_else(|| raw.get("id").and_then(parse_id))
            .or_else(|| raw.get("user_id").and_then(parse_id));

        let full_name = string_field(user_obj, "full_name").or_else(|| {
            let first = string_field(user_obj, "first_name").unwrap_or_default();
            let last = string_field(user_obj, "last_name").unwrap_or_default();
            let joined = format!("{} {}", first, last).trim().to_string();
            (!joined.is_empty()).then_some(joined)
        });

        let user = User {
            id,
            username: string_field(user_obj, "username"),
            full_name,
            email: string_field(user_obj, "email"),
        };

        let role = raw
            .get("role")
            .or_else(|| nested.and_then(|u| u.get("role")))
            .filter(|r| r.is_object())
            .map(parse_role);

        Self { user, role }
    }

    /// Load and normalize a session document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading session file {}", path.display()))?;
        let raw: Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing session file {}", path.display()))?;
        Ok(Self::from_value(&raw))
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.id
    }

    /// The current user id, or `UserIdentityMissing` naming the operation.
    pub fn require_user_id(&self, operation: &str) -> WorkflowResult<UserId> {
        self.user
            .id
            .ok_or_else(|| WorkflowError::user_identity_missing(operation))
    }

    /// First permission entry whose feature code is one of `feature_codes`.
    pub fn permission_for(&self, feature_codes: &[String]) -> Option<&RolePermission> {
        let role = self.role.as_ref()?;
        feature_codes.iter().find_map(|code| {
            role.permissions
                .iter()
                .find(|p| p.feature_code.eq_ignore_ascii_case(code))
        })
    }
}

fn parse_id(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_role(raw: &Value) -> Role {
    let permissions = raw
        .get("permissions")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_permission).collect())
        .unwrap_or_default();
    Role {
        name: string_field(raw, "name").unwrap_or_default(),
        permissions,
    }
}

/// Feature code may be `feature_code`, a `feature` string, or `feature.code`.
fn parse_permission(raw: &Value) -> Option<RolePermission> {
    let feature_code = string_field(raw, "feature_code")
        .or_else(|| string_field(raw, "feature"))
        .or_else(|| raw.get("feature").and_then(|f| string_field(f, "code")))?;
    let flag = |key: &str| raw.get(key).and_then(Value::as_bool).unwrap_or(false);
    Some(RolePermission {
        feature_code,
        can_view: flag("can_view"),
        can_create: flag("can_create"),
        can_edit: flag("can_edit"),
        can_delete: flag("can_delete"),
        can_view_all: flag("can_view_all"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_nested_user_shape() {
        let session = Session::from_value(&json!({
            "user": {"id": 42, "username": "hr.admin", "first_name": "Grace", "last_name": "Hopper"},
            "role": {
                "name": "HR Manager",
                "permissions": [
                    {"feature": {"code": "task_management"}, "can_edit": true, "can_view_all": true}
                ]
            }
        }));

        assert_eq!(session.user_id(), Some(42));
        assert_eq!(session.user.full_name.as_deref(), Some("Grace Hopper"));
        let perm = session
            .permission_for(&["task".into(), "task_management".into()])
            .unwrap();
        assert!(perm.can_edit);
        assert!(perm.can_view_all);
        assert!(!perm.can_delete);
    }

    #[test]
    fn test_flat_user_shape_with_string_id() {
        let session = Session::from_value(&json!({
            "id": "17",
            "username": "clerk",
            "role": {"name": "Staff", "permissions": [{"feature_code": "task", "can_view": true}]}
        }));
        assert_eq!(session.user_id(), Some(17));
        assert!(session.permission_for(&["task".into()]).is_some());
    }

    #[test]
    fn test_role_nested_under_user() {
        let session = Session::from_value(&json!({
            "user": {"id": 3, "role": {"name": "Staff", "permissions": [{"feature_code": "task"}]}}
        }));
        assert_eq!(session.role.unwrap().permissions.len(), 1);
    }

    #[test]
    fn test_missing_id_is_reported() {
        let session = Session::from_value(&json!({"user": {"username": "ghost"}}));
        assert_eq!(session.user_id(), None);
        let err = session.require_user_id("add comment").unwrap_err();
        assert!(err.is(ErrorCode::UserIdentityMissing));
    }

    #[test]
    fn test_permission_entries_without_code_are_skipped() {
        let session = Session::from_value(&json!({
            "id": 1,
            "role": {"name": "x", "permissions": [{"can_edit": true}, {"feature_code": "payroll"}]}
        }));
        assert!(session.permission_for(&["task".into()]).is_none());
        assert_eq!(session.role.unwrap().permissions.len(), 1);
    }
}
