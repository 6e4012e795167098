//! The Task API contract.
//!
//! The remote store owns persistence, validation and authorization. This
//! module only describes what the workflow consumes from it: the
//! [`TaskApi`] trait and its request payloads. [`http::HttpTaskApi`] is the
//! REST implementation.

pub mod http;

use crate::error::WorkflowResult;
use crate::types::{
    Attachment, AttachmentId, Comment, CommentId, Department, DepartmentId, Employee, Page,
    Priority, StagedFile, Task, TaskId, TaskStatus, UserId, date_format,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use http::HttpTaskApi;

/// Remote task store.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `GET /tasks`
    async fn list_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>>;
    /// `GET /tasks/my`
    async fn my_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>>;
    /// `GET /tasks/{id}`
    async fn get_task(&self, task_id: TaskId) -> WorkflowResult<Task>;
    /// `POST /tasks`, multipart when `files` is non-empty.
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        files: &[StagedFile],
    ) -> WorkflowResult<Task>;
    /// `PUT /tasks/{id}`
    async fn update_task(&self, task_id: TaskId, update: &TaskUpdate) -> WorkflowResult<Task>;
    /// `PATCH /tasks/{id}/status`
    async fn update_status(&self, task_id: TaskId, update: &StatusUpdate)
    -> WorkflowResult<Task>;
    /// `DELETE /tasks/{id}`
    async fn delete_task(&self, task_id: TaskId) -> WorkflowResult<()>;
    /// `POST /tasks/{id}/assign_task`
    async fn assign_task(&self, task_id: TaskId, request: &AssignRequest)
    -> WorkflowResult<Task>;

    async fn list_comments(&self, task_id: TaskId) -> WorkflowResult<Vec<Comment>>;
    async fn add_comment(&self, task_id: TaskId, body: &CommentBody) -> WorkflowResult<Comment>;
    async fn update_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
        body: &CommentBody,
    ) -> WorkflowResult<Comment>;
    async fn delete_comment(&self, task_id: TaskId, comment_id: CommentId) -> WorkflowResult<()>;

    async fn list_attachments(&self, task_id: TaskId) -> WorkflowResult<Vec<Attachment>>;
    /// Multipart upload of one file.
    async fn upload_attachment(
        &self,
        task_id: TaskId,
        file: &StagedFile,
    ) -> WorkflowResult<Attachment>;
    async fn delete_attachment(
        &self,
        task_id: TaskId,
        attachment_id: AttachmentId,
    ) -> WorkflowResult<()>;

    /// Externally owned reference lists.
    async fn list_employees(&self, page: u32) -> WorkflowResult<Page<Employee>>;
    async fn list_departments(&self, page: u32) -> WorkflowResult<Page<Department>>;
}

/// Filters and paging for task lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<UserId>,
    pub department: Option<DepartmentId>,
    pub page: u32,
    pub page_size: u32,
}

impl TaskQuery {
    /// Same filters, another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query-string pairs; empty filters are left out.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref search) = self.search {
            if !search.trim().is_empty() {
                pairs.push(("search", search.trim().to_string()));
            }
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(assignee) = self.assignee {
            pairs.push(("assignee", assignee.to_string()));
        }
        if let Some(department) = self.department {
            pairs.push(("department", department.to_string()));
        }
        pairs.push(("page", self.page.max(1).to_string()));
        if self.page_size > 0 {
            pairs.push(("page_size", self.page_size.to_string()));
        }
        pairs
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub progress_percentage: u8,
    /// The endpoint takes these flags as strings.
    pub is_urgent: String,
    pub requires_approval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task: Option<TaskId>,
}

impl CreateTaskRequest {
    /// Flattened text fields for a multipart body. `assignees` repeats.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("priority", self.priority.as_str().to_string()),
            ("status", self.status.as_str().to_string()),
            ("start_date", self.start_date.format("%Y-%m-%d").to_string()),
            ("due_date", self.due_date.format("%Y-%m-%d").to_string()),
            ("progress_percentage", self.progress_percentage.to_string()),
            ("is_urgent", self.is_urgent.clone()),
            ("requires_approval", self.requires_approval.clone()),
        ];
        if let Some(assignee) = self.assignee {
            fields.push(("assignee", assignee.to_string()));
        }
        for id in &self.assignees {
            fields.push(("assignees", id.to_string()));
        }
        if let Some(department) = self.department {
            fields.push(("department", department.to_string()));
        }
        if let Some(parent) = self.parent_task {
            fields.push(("parent_task", parent.to_string()));
        }
        fields
    }
}

/// Body of `PUT /tasks/{id}`.
///
/// `title` and `description` are plain strings, never optional: the endpoint
/// nulls them when omitted, so every update re-sends the last known values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(with = "date_format")]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "date_format")]
    pub due_date: Option<NaiveDate>,
    pub progress_percentage: u8,
    pub assignee: Option<UserId>,
    pub department: Option<DepartmentId>,
    pub parent_task: Option<TaskId>,
}

impl TaskUpdate {
    /// Update that changes nothing: every field copied from `task`.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status: task.status,
            start_date: task.start_date,
            due_date: task.due_date,
            progress_percentage: task.progress_percentage.min(100),
            assignee: task.assignee,
            department: task.department,
            parent_task: task.parent_task,
        }
    }
}

/// Body of `PATCH /tasks/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub progress_percentage: u8,
    pub comment: String,
}

/// Body of `POST /tasks/{id}/assign_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRequest {
    pub assignee: UserId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentBody {
    pub content: String,
}
