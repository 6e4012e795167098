//! In-memory Task API shared by the integration tests.
//!
//! Every call is recorded so tests can assert exactly what went over the
//! wire, including that nothing did. Individual endpoints can be scripted to
//! fail, uploads can fail per file name, and `get_task` can be held until a
//! test releases it.

#![allow(dead_code)]

use async_trait::async_trait;
use hr_task_desk::api::{
    AssignRequest, CommentBody, CreateTaskRequest, StatusUpdate, TaskApi, TaskQuery, TaskUpdate,
};
use hr_task_desk::error::{WorkflowError, WorkflowResult};
use hr_task_desk::facade::TaskOperations;
use hr_task_desk::permissions::PermissionResolver;
use hr_task_desk::session::Session;
use hr_task_desk::types::{
    Attachment, AttachmentId, Comment, CommentId, Department, Employee, Page, StagedFile, Task,
    TaskId,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListTasks(TaskQuery),
    MyTasks(TaskQuery),
    GetTask(TaskId),
    CreateTask(CreateTaskRequest, Vec<String>),
    UpdateTask(TaskId, TaskUpdate),
    UpdateStatus(TaskId, StatusUpdate),
    DeleteTask(TaskId),
    AssignTask(TaskId, AssignRequest),
    ListComments(TaskId),
    AddComment(TaskId, CommentBody),
    UpdateComment(TaskId, CommentId, CommentBody),
    DeleteComment(TaskId, CommentId),
    ListAttachments(TaskId),
    UploadAttachment(TaskId, String),
    DeleteAttachment(TaskId, AttachmentId),
    ListEmployees(u32),
    ListDepartments(u32),
}

impl Call {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::ListTasks(_)
                | Call::MyTasks(_)
                | Call::GetTask(_)
                | Call::ListComments(_)
                | Call::ListAttachments(_)
                | Call::ListEmployees(_)
                | Call::ListDepartments(_)
        )
    }
}

#[derive(Default)]
struct MockState {
    tasks: BTreeMap<TaskId, Task>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    employees: Vec<Employee>,
    departments: Vec<Department>,
    task_pages: HashMap<u32, Page<Task>>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    failing_uploads: HashSet<String>,
    next_id: i64,
}

#[derive(Default)]
pub struct MockTaskApi {
    state: Mutex<MockState>,
    get_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockTaskApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..Default::default()
            }),
            get_gate: Mutex::new(None),
        })
    }

    pub fn insert_task(&self, task: Task) {
        self.state.lock().unwrap().tasks.insert(task.id, task);
    }

    pub fn stored_task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().unwrap().tasks.get(&id).cloned()
    }

    pub fn insert_comment(&self, comment: Comment) {
        self.state.lock().unwrap().comments.push(comment);
    }

    pub fn insert_attachment(&self, attachment: Attachment) {
        self.state.lock().unwrap().attachments.push(attachment);
    }

    pub fn insert_employee(&self, employee: Employee) {
        self.state.lock().unwrap().employees.push(employee);
    }

    pub fn insert_department(&self, department: Department) {
        self.state.lock().unwrap().departments.push(department);
    }

    /// Serve `page` for `GET /tasks?page=n` (and `/tasks/my`).
    pub fn script_task_page(&self, number: u32, page: Page<Task>) {
        self.state.lock().unwrap().task_pages.insert(number, page);
    }

    /// Make every later call to `endpoint` fail with a transport error.
    pub fn fail(&self, endpoint: &'static str) {
        self.state.lock().unwrap().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.state.lock().unwrap().failing.remove(endpoint);
    }

    pub fn fail_upload(&self, file_name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(file_name.to_string());
    }

    /// Hold `get_task` until the returned handle is notified.
    pub fn gate_get_task(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.get_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, endpoint: &'static str, call: Call) -> WorkflowResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(endpoint) {
            return Err(WorkflowError::transport(format!("{} unavailable", endpoint)));
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.next_id
    }

    fn page_of(&self, query: &TaskQuery, mine: Option<i64>) -> Page<Task> {
        let state = self.state.lock().unwrap();
        if let Some(page) = state.task_pages.get(&query.page.max(1)) {
            return page.clone();
        }
        let results: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| mine.is_none() || t.assignee == mine)
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        Page {
            count: results.len() as u64,
            results,
            next: None,
        }
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn list_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>> {
        self.record("list_tasks", Call::ListTasks(query.clone()))?;
        Ok(self.page_of(query, None))
    }

    async fn my_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>> {
        self.record("my_tasks", Call::MyTasks(query.clone()))?;
        Ok(self.page_of(query, Some(ME)))
    }

    async fn get_task(&self, task_id: TaskId) -> WorkflowResult<Task> {
        self.record("get_task", Call::GetTask(task_id))?;
        let gate = self.get_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.stored_task(task_id)
            .ok_or_else(|| WorkflowError::task_not_found(task_id))
    }

    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        files: &[StagedFile],
    ) -> WorkflowResult<Task> {
        let names = files.iter().map(|f| f.file_name.clone()).collect();
        self.record("create_task", Call::CreateTask(request.clone(), names))?;
        let task = task_from(json!({
            "id": self.next_id(),
            "title": request.title,
            "description": request.description,
            "priority": request.priority,
            "status": request.status,
            "start_date": request.start_date,
            "due_date": request.due_date,
            "progress_percentage": 0,
            "assignee": request.assignee,
            "department": request.department,
            "parent_task": request.parent_task,
        }));
        self.insert_task(task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: TaskId, update: &TaskUpdate) -> WorkflowResult<Task> {
        self.record("update_task", Call::UpdateTask(task_id, update.clone()))?;
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| WorkflowError::task_not_found(task_id))?;
        task.title = update.title.clone();
        task.description = update.description.clone();
        task.priority = update.priority;
        task.status = update.status;
        task.start_date = update.start_date;
        task.due_date = update.due_date;
        task.progress_percentage = update.progress_percentage;
        task.assignee = update.assignee;
        task.department = update.department;
        task.parent_task = update.parent_task;
        Ok(task.clone())
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        update: &StatusUpdate,
    ) -> WorkflowResult<Task> {
        self.record("update_status", Call::UpdateStatus(task_id, update.clone()))?;
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| WorkflowError::task_not_found(task_id))?;
        task.status = update.status;
        task.progress_percentage = update.progress_percentage;
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: TaskId) -> WorkflowResult<()> {
        self.record("delete_task", Call::DeleteTask(task_id))?;
        self.state.lock().unwrap().tasks.remove(&task_id);
        Ok(())
    }

    async fn assign_task(
        &self,
        task_id: TaskId,
        request: &AssignRequest,
    ) -> WorkflowResult<Task> {
        self.record("assign_task", Call::AssignTask(task_id, request.clone()))?;
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| WorkflowError::task_not_found(task_id))?;
        task.assignee = Some(request.assignee);
        Ok(task.clone())
    }

    async fn list_comments(&self, task_id: TaskId) -> WorkflowResult<Vec<Comment>> {
        self.record("list_comments", Call::ListComments(task_id))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .comments
            .iter()
            .filter(|c| c.task == Some(task_id))
            .cloned()
            .collect())
    }

    async fn add_comment(&self, task_id: TaskId, body: &CommentBody) -> WorkflowResult<Comment> {
        self.record("add_comment", Call::AddComment(task_id, body.clone()))?;
        let comment = Comment {
            id: self.next_id(),
            task: Some(task_id),
            author: Some(ME),
            user_name: Some("Me".into()),
            content: body.content.clone(),
            created_at: None,
            updated_at: None,
        };
        self.insert_comment(comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
        body: &CommentBody,
    ) -> WorkflowResult<Comment> {
        self.record(
            "update_comment",
            Call::UpdateComment(task_id, comment_id, body.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let comment = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| WorkflowError::comment_not_found(comment_id))?;
        comment.content = body.content.clone();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, task_id: TaskId, comment_id: CommentId) -> WorkflowResult<()> {
        self.record("delete_comment", Call::DeleteComment(task_id, comment_id))?;
        self.state
            .lock()
            .unwrap()
            .comments
            .retain(|c| c.id != comment_id);
        Ok(())
    }

    async fn list_attachments(&self, task_id: TaskId) -> WorkflowResult<Vec<Attachment>> {
        self.record("list_attachments", Call::ListAttachments(task_id))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .attachments
            .iter()
            .filter(|a| a.task == Some(task_id))
            .cloned()
            .collect())
    }

    async fn upload_attachment(
        &self,
        task_id: TaskId,
        file: &StagedFile,
    ) -> WorkflowResult<Attachment> {
        self.record(
            "upload_attachment",
            Call::UploadAttachment(task_id, file.file_name.clone()),
        )?;
        if self
            .state
            .lock()
            .unwrap()
            .failing_uploads
            .contains(&file.file_name)
        {
            return Err(WorkflowError::transport("connection reset"));
        }
        let attachment = Attachment {
            id: self.next_id(),
            task: Some(task_id),
            file: format!("/media/{}", file.file_name),
            original_filename: file.file_name.clone(),
            file_size: file.size() as u64,
            uploaded_by: Some(ME),
            created_at: None,
        };
        self.insert_attachment(attachment.clone());
        Ok(attachment)
    }

    async fn delete_attachment(
        &self,
        task_id: TaskId,
        attachment_id: AttachmentId,
    ) -> WorkflowResult<()> {
        self.record(
            "delete_attachment",
            Call::DeleteAttachment(task_id, attachment_id),
        )?;
        self.state
            .lock()
            .unwrap()
            .attachments
            .retain(|a| a.id != attachment_id);
        Ok(())
    }

    async fn list_employees(&self, page: u32) -> WorkflowResult<Page<Employee>> {
        self.record("list_employees", Call::ListEmployees(page))?;
        let employees = self.state.lock().unwrap().employees.clone();
        Ok(Page {
            count: employees.len() as u64,
            results: employees,
            next: None,
        })
    }

    async fn list_departments(&self, page: u32) -> WorkflowResult<Page<Department>> {
        self.record("list_departments", Call::ListDepartments(page))?;
        let departments = self.state.lock().unwrap().departments.clone();
        Ok(Page {
            count: departments.len() as u64,
            results: departments,
            next: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// The signed-in user's id.
pub const ME: i64 = 7;
/// Somebody else.
pub const OTHER: i64 = 9;

pub fn task_from(value: Value) -> Task {
    serde_json::from_value(value).expect("task fixture should deserialize")
}

/// A half-done task in department 2, due in March.
pub fn task(id: TaskId, assignee: Option<i64>) -> Task {
    task_from(json!({
        "id": id,
        "title": format!("Task {}", id),
        "description": "Collect signed contracts",
        "priority": "MEDIUM",
        "status": "IN_PROGRESS",
        "start_date": "2025-03-01",
        "due_date": "2025-03-20",
        "progress_percentage": 50,
        "assignee": assignee,
        "department": 2,
    }))
}

pub fn comment(id: CommentId, task_id: TaskId, author: i64, content: &str) -> Comment {
    Comment {
        id,
        task: Some(task_id),
        author: Some(author),
        user_name: None,
        content: content.to_string(),
        created_at: None,
        updated_at: None,
    }
}

pub fn attachment(id: AttachmentId, task_id: TaskId, name: &str) -> Attachment {
    Attachment {
        id,
        task: Some(task_id),
        file: format!("/media/{}", name),
        original_filename: name.to_string(),
        file_size: 10,
        uploaded_by: Some(ME),
        created_at: None,
    }
}

/// Session for user `ME` with the given task permission flags.
pub fn session_with(can_edit: bool, can_delete: bool, can_view_all: bool) -> Session {
    Session::from_value(&json!({
        "user": {"id": ME, "username": "me", "first_name": "Mia", "last_name": "Reyes"},
        "role": {
            "name": "Staff",
            "permissions": [{
                "feature_code": "task",
                "can_view": true,
                "can_create": true,
                "can_edit": can_edit,
                "can_delete": can_delete,
                "can_view_all": can_view_all,
            }]
        }
    }))
}

/// Editor without view-all: field edits need to be the assignee.
pub fn editor() -> Session {
    session_with(true, true, false)
}

/// Session document without any usable user id.
pub fn anonymous() -> Session {
    Session::from_value(&json!({
        "user": {"username": "ghost"},
        "role": {"name": "Staff", "permissions": [{"feature_code": "task", "can_edit": true, "can_create": true}]}
    }))
}

pub fn operations(api: &Arc<MockTaskApi>, session: Session) -> TaskOperations {
    let api: Arc<dyn TaskApi> = Arc::clone(api) as Arc<dyn TaskApi>;
    TaskOperations::new(api, Arc::new(session), PermissionResolver::default())
}
