//! Core types for the task workflow.
//!
//! These mirror the Task API's resources. Optional and server-computed fields
//! default when absent so partial payloads (list rows, nested projections)
//! still decode.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

pub type TaskId = i64;
pub type UserId = i64;
pub type DepartmentId = i64;
pub type CommentId = i64;
pub type AttachmentId = i64;

/// Task priority. Variants are declared lowest first so the derived `Ord`
/// gives LOW < MEDIUM < HIGH < URGENT.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Parse a priority name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            "URGENT" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status. No transition graph is imposed between these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    UnderReview,
    Completed,
    Cancelled,
    OnHold,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::UnderReview,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
        TaskStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "TO_DO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::UnderReview => "UNDER_REVIEW",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::OnHold => "ON_HOLD",
        }
    }

    /// Parse a status name. Accepts `in_progress`, `IN-PROGRESS`, `todo`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "TO_DO" | "TODO" => Some(TaskStatus::ToDo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "UNDER_REVIEW" => Some(TaskStatus::UnderReview),
            "COMPLETED" => Some(TaskStatus::Completed),
            "CANCELLED" => Some(TaskStatus::Cancelled),
            "ON_HOLD" => Some(TaskStatus::OnHold),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as returned by the Task API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, with = "date_format")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "date_format")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub progress_percentage: u8,

    // Relations
    #[serde(default)]
    pub assignee: Option<UserId>,
    #[serde(default)]
    pub assignees: Vec<UserId>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub parent_task: Option<TaskId>,
    #[serde(default)]
    pub created_by: Option<UserId>,

    // Server-computed
    #[serde(default)]
    pub is_overdue: bool,
    #[serde(default)]
    pub attachments_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A comment on a task. Only its author may edit or delete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub task: Option<TaskId>,
    #[serde(default, rename = "user", alias = "author")]
    pub author: Option<UserId>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An uploaded file attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    #[serde(default)]
    pub task: Option<TaskId>,
    /// URL of the stored blob.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default, alias = "size")]
    pub file_size: u64,
    #[serde(default)]
    pub uploaded_by: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An employee, as listed for the assignee picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// The user id tasks refer to in `assignee`.
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.full_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        let joined = format!("{} {}", self.first_name, self.last_name);
        let joined = joined.trim();
        if joined.is_empty() {
            format!("User #{}", self.id)
        } else {
            joined.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Anything with a server-assigned integer id.
pub trait Keyed {
    fn key(&self) -> i64;
}

impl Keyed for Task {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Comment {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Attachment {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Employee {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Department {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Employee and department lists used by pickers and name fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub employees: Vec<Employee>,
    pub departments: Vec<Department>,
    pub employees_loaded: bool,
    pub departments_loaded: bool,
}

impl ReferenceData {
    pub fn has_employee(&self, id: UserId) -> bool {
        self.employees.iter().any(|e| e.id == id)
    }

    pub fn has_department(&self, id: DepartmentId) -> bool {
        self.departments.iter().any(|d| d.id == id)
    }

    pub fn employee_name(&self, id: UserId) -> Option<String> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .map(Employee::display_name)
    }

    pub fn department_name(&self, id: DepartmentId) -> Option<&str> {
        self.departments
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
    }
}

/// A file picked for upload but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl StagedFile {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            content,
        }
    }

    /// Read a file from disk and stage it under its own file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, content))
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a calendar date from either `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
        .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

/// Render a date the way a date input holds it (`YYYY-MM-DD`, or empty).
pub fn date_input_value(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Serde adapter for optional calendar dates that tolerates timestamps and blanks.
pub mod date_format {
    use super::parse_date;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_date))
    }
}
