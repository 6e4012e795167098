//! Task operations: the one path every task mutation takes.
//!
//! Each operation checks identity and capabilities locally, makes one remote
//! call (plus sequential uploads for save-all), patches the affected cache
//! entry, and then refetches that task. Refetch failures are logged and never
//! turn a successful mutation into an error.
//!
//! Several operations may be in flight at once; nothing here orders them.
//! Responses that arrive after their detail view was closed still update the
//! task cache but no longer touch the view's draft, comments or attachments.

use crate::api::{AssignRequest, CommentBody, StatusUpdate, TaskApi, TaskQuery, TaskUpdate};
use crate::cache::{Accumulator, TaskCache, ViewTicket, ViewTracker};
use crate::draft::{DraftState, FieldUpdate};
use crate::error::{FormErrors, WorkflowError, WorkflowResult};
use crate::permissions::{Capabilities, PermissionResolver, can_modify_comment};
use crate::session::Session;
use crate::types::{
    Attachment, AttachmentId, Comment, CommentId, Department, Employee, Page, Priority, ReferenceData, StagedFile, Task,
    TaskId, TaskStatus, UserId,
};
use crate::validation::{NewTaskForm, check_date_order, optional_date};
use crate::workflow::{
    clamp_progress, derive_status_from_progress, is_priority_escalation, status_change_comment,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything. For non-interactive callers that already asked.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Result of a successful save-all.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub task: Task,
    pub uploaded: Vec<Attachment>,
}

/// A comment being edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEdit {
    pub comment_id: CommentId,
    pub content: String,
}

/// Which list endpoint the accumulated task list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListSource {
    All,
    Mine,
}

#[derive(Default)]
struct WorkflowState {
    cache: TaskCache,
    views: ViewTracker,
    draft: DraftState,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    comment_edit: Option<CommentEdit>,
    refs: ReferenceData,
    query: TaskQuery,
    source: Option<ListSource>,
}

impl WorkflowState {
    fn is_open(&self, task_id: TaskId, ticket: ViewTicket) -> bool {
        self.views.is_current(ticket) && ticket.task_id() == Some(task_id)
    }

    /// Store a fresh task and mirror it into the open view's draft.
    fn apply_task(&mut self, task: Task, ticket: ViewTicket) {
        if self.is_open(task.id, ticket) {
            self.draft.sync(&task, &self.refs);
        }
        self.cache.patch(task);
    }
}

/// Façade over the Task API for one signed-in user.
pub struct TaskOperations {
    api: Arc<dyn TaskApi>,
    session: Arc<Session>,
    resolver: PermissionResolver,
    page_size: u32,
    state: Mutex<WorkflowState>,
}

impl TaskOperations {
    pub fn new(api: Arc<dyn TaskApi>, session: Arc<Session>, resolver: PermissionResolver) -> Self {
        Self {
            api,
            session,
            resolver,
            page_size: 20,
            state: Mutex::new(WorkflowState::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// Capabilities for a cached task; all-false when it is not loaded.
    pub fn capabilities(&self, task_id: TaskId) -> Capabilities {
        let state = self.state();
        self.resolver
            .resolve(Some(self.session.as_ref()), state.cache.get(task_id))
    }

    pub fn task(&self, task_id: TaskId) -> Option<Task> {
        self.state().cache.get(task_id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().cache.list().to_vec()
    }

    pub fn has_more_tasks(&self) -> bool {
        self.state().cache.has_more()
    }

    pub fn total_tasks(&self) -> u64 {
        self.state().cache.total()
    }

    pub fn open_task_id(&self) -> Option<TaskId> {
        self.state().views.open_task()
    }

    pub fn draft(&self) -> DraftState {
        self.state().draft.clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.state().comments.clone()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.state().attachments.clone()
    }

    pub fn references(&self) -> ReferenceData {
        self.state().refs.clone()
    }

    pub fn comment_edit(&self) -> Option<CommentEdit> {
        self.state().comment_edit.clone()
    }

    /// Whether edit/delete controls should be offered for `comment`.
    pub fn can_modify_comment(&self, comment: &Comment) -> bool {
        can_modify_comment(&self.session, comment)
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Load the first page for `query`, replacing the accumulated list.
    ///
    /// Users without `can_view_all` are served from `/tasks/my`.
    pub async fn load_tasks(&self, query: TaskQuery) -> WorkflowResult<Vec<Task>> {
        let source = if self.resolver.can_view_all(&self.session) {
            ListSource::All
        } else {
            ListSource::Mine
        };
        self.load_list(source, query).await
    }

    /// Load the first page of tasks assigned to the current user.
    pub async fn load_my_tasks(&self, query: TaskQuery) -> WorkflowResult<Vec<Task>> {
        self.load_list(ListSource::Mine, query).await
    }

    async fn load_list(&self, source: ListSource, query: TaskQuery) -> WorkflowResult<Vec<Task>> {
        let query = TaskQuery {
            page: 1,
            page_size: if query.page_size == 0 {
                self.page_size
            } else {
                query.page_size
            },
            ..query
        };
        let page = self.fetch_page(source, &query).await?;

        let mut state = self.state();
        state.cache.reset_list();
        state.cache.merge_page(1, page);
        state.query = query;
        state.source = Some(source);
        Ok(state.cache.list().to_vec())
    }

    /// Load the next page of the current list. Returns how many new tasks arrived.
    pub async fn load_more_tasks(&self) -> WorkflowResult<usize> {
        let (source, query) = {
            let state = self.state();
            let Some(source) = state.source else {
                return Err(WorkflowError::invalid_state("no task list loaded"));
            };
            let Some(next) = state.cache.next_page() else {
                return Ok(0);
            };
            (source, state.query.with_page(next))
        };
        let page = self.fetch_page(source, &query).await?;

        let mut state = self.state();
        if state.source != Some(source) || state.query.with_page(query.page) != query {
            debug!("dropping page for a superseded task query");
            return Ok(0);
        }
        Ok(state.cache.merge_page(query.page, page))
    }

    async fn fetch_page(
        &self,
        source: ListSource,
        query: &TaskQuery,
    ) -> WorkflowResult<Page<Task>> {
        debug!(?source, page = query.page, "fetching task page");
        match source {
            ListSource::All => self.api.list_tasks(query).await,
            ListSource::Mine => self.api.my_tasks(query).await,
        }
    }

    /// Load every employee and department page, then reconcile the draft.
    pub async fn load_references(&self) -> WorkflowResult<()> {
        let mut employees: Accumulator<Employee> = Accumulator::new();
        while let Some(page_no) = employees.next_page() {
            let page = self.api.list_employees(page_no).await?;
            if employees.merge_page(page_no, page) == 0 && employees.has_more() {
                break;
            }
        }
        let mut departments: Accumulator<Department> = Accumulator::new();
        while let Some(page_no) = departments.next_page() {
            let page = self.api.list_departments(page_no).await?;
            if departments.merge_page(page_no, page) == 0 && departments.has_more() {
                break;
            }
        }

        let mut state = self.state();
        state.refs = ReferenceData {
            employees: employees.items().to_vec(),
            departments: departments.items().to_vec(),
            employees_loaded: true,
            departments_loaded: true,
        };
        let refs = state.refs.clone();
        state.draft.reconcile_references(&refs);
        debug!(
            employees = refs.employees.len(),
            departments = refs.departments.len(),
            "reference lists loaded"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Detail view
    // ------------------------------------------------------------------

    /// Open the detail view: task, comments and attachments.
    pub async fn open_task(&self, task_id: TaskId) -> WorkflowResult<Task> {
        let ticket = {
            let mut state = self.state();
            state.comment_edit = None;
            state.views.open(task_id)
        };

        let (task, comments, attachments) = tokio::try_join!(
            self.api.get_task(task_id),
            self.api.list_comments(task_id),
            self.api.list_attachments(task_id),
        )?;

        let mut state = self.state();
        if !state.views.is_current(ticket) {
            debug!(task_id, "detail view closed before load finished");
            state.cache.patch(task.clone());
            return Ok(task);
        }
        state.draft = DraftState::from_task(&task, &state.refs);
        state.comments = comments;
        state.attachments = attachments;
        state.cache.patch(task.clone());
        Ok(task)
    }

    /// Close the detail view. Responses still in flight for it are ignored.
    pub fn close_task(&self) {
        let mut state = self.state();
        state.views.close();
        state.draft = DraftState::default();
        state.comments.clear();
        state.attachments.clear();
        state.comment_edit = None;
    }

    // ------------------------------------------------------------------
    // Draft editing
    // ------------------------------------------------------------------

    /// Enter edit mode on the open task.
    pub fn begin_edit(&self, task_id: TaskId) -> WorkflowResult<()> {
        let mut state = self.state();
        let ticket = state.views.ticket();
        if !state.is_open(task_id, ticket) {
            return Err(WorkflowError::invalid_state(format!(
                "task {} is not open",
                task_id
            )));
        }
        let caps = self
            .resolver
            .resolve(Some(self.session.as_ref()), state.cache.get(task_id));
        if !caps.can_edit_task {
            return Err(WorkflowError::permission_denied("edit this task"));
        }
        state.draft.begin_edit();
        Ok(())
    }

    /// Leave edit mode, discarding the draft and staged files.
    pub fn cancel_edit(&self) {
        let mut state = self.state();
        let Some(task_id) = state.views.open_task() else {
            return;
        };
        if let Some(task) = state.cache.get(task_id).cloned() {
            let refs = state.refs.clone();
            state.draft.cancel_edit(&task, &refs);
        }
    }

    /// Set one draft field. No validation happens until save.
    pub fn update_form_data(&self, update: FieldUpdate) {
        self.state().draft.update(update);
    }

    /// Stage files for upload on the next save. Nothing is sent yet.
    pub fn handle_file_change(&self, files: Vec<StagedFile>) {
        self.state().draft.stage_files(files);
    }

    /// Unstage a file by position.
    pub fn remove_file(&self, index: usize) -> Option<StagedFile> {
        self.state().draft.remove_staged(index)
    }

    // ------------------------------------------------------------------
    // Task mutations
    // ------------------------------------------------------------------

    /// Move a task to `new_status`, keeping its progress and leaving an audit note.
    pub async fn handle_status_change(
        &self,
        task_id: TaskId,
        new_status: TaskStatus,
    ) -> WorkflowResult<Task> {
        self.session.require_user_id("change task status")?;
        let (task, ticket) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.can_change_status {
            return Err(WorkflowError::permission_denied(
                "change the status of a task not assigned to you",
            ));
        }

        let update = StatusUpdate {
            status: new_status,
            progress_percentage: task.progress_percentage.min(100),
            comment: status_change_comment(new_status),
        };
        let updated = self.api.update_status(task_id, &update).await?;
        info!(task_id, status = %new_status, "task status changed");

        self.state().apply_task(updated.clone(), ticket);
        self.refresh_task(task_id, ticket).await;
        Ok(updated)
    }

    /// Escalate priority. Downgrades are refused.
    pub async fn handle_priority_change(
        &self,
        task_id: TaskId,
        new_priority: Priority,
    ) -> WorkflowResult<Task> {
        self.session.require_user_id("change task priority")?;
        let (task, ticket) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.can_change_priority {
            return Err(WorkflowError::permission_denied(
                "change the priority of a task not assigned to you",
            ));
        }
        if !is_priority_escalation(task.priority, new_priority) {
            return Err(WorkflowError::invalid_transition(format!(
                "Priority can only be raised: {} -> {} is a downgrade",
                task.priority, new_priority
            ))
            .with_field("priority"));
        }

        let update = TaskUpdate {
            priority: new_priority,
            ..TaskUpdate::from_task(&task)
        };
        let updated = self.api.update_task(task_id, &update).await?;
        info!(task_id, priority = %new_priority, "task priority changed");

        self.state().apply_task(updated.clone(), ticket);
        self.refresh_task(task_id, ticket).await;
        Ok(updated)
    }

    /// Set progress (clamped to 0..=100) and the status it implies, in one update.
    pub async fn handle_progress_update(
        &self,
        task_id: TaskId,
        new_progress: i64,
    ) -> WorkflowResult<Task> {
        let (task, ticket) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.field_permissions.can_edit_progress {
            return Err(WorkflowError::permission_denied("update progress on this task"));
        }

        let progress = clamp_progress(new_progress);
        let update = TaskUpdate {
            progress_percentage: progress,
            status: derive_status_from_progress(progress, task.status),
            ..TaskUpdate::from_task(&task)
        };
        let updated = self.api.update_task(task_id, &update).await?;
        info!(task_id, progress, status = %update.status, "task progress updated");

        self.state().apply_task(updated.clone(), ticket);
        self.refresh_task(task_id, ticket).await;
        Ok(updated)
    }

    /// Save every draft field in one update, then upload staged files one by one.
    ///
    /// Blank draft fields fall back to the task's values, and a task with no
    /// assignee at all is assigned to the current user. Upload failures do not
    /// undo the field update; they are reported together as `PartialUpload`
    /// and the failed files stay staged.
    pub async fn handle_save_all(&self, task_id: TaskId) -> WorkflowResult<SaveOutcome> {
        let (task, draft, ticket) = {
            let state = self.state();
            let ticket = state.views.ticket();
            if !state.is_open(task_id, ticket) || !state.draft.is_editing() {
                return Err(WorkflowError::invalid_state(format!(
                    "task {} is not being edited",
                    task_id
                )));
            }
            let Some(task) = state.cache.get(task_id).cloned() else {
                return Err(WorkflowError::task_not_found(task_id));
            };
            (task, state.draft.clone(), ticket)
        };

        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        let update = self.merge_draft(&task, &draft, &caps)?;

        let updated = self.api.update_task(task_id, &update).await?;
        info!(task_id, "task saved");

        let staged = {
            let mut state = self.state();
            state.cache.patch(updated.clone());
            if state.is_open(task_id, ticket) {
                state.draft.take_staged()
            } else {
                Vec::new()
            }
        };

        let total = staged.len();
        let mut uploaded = Vec::new();
        let mut failed_files = Vec::new();
        for file in staged {
            match self.api.upload_attachment(task_id, &file).await {
                Ok(attachment) => {
                    debug!(task_id, file = %file.file_name, "attachment uploaded");
                    uploaded.push(attachment);
                }
                Err(e) => {
                    warn!(task_id, file = %file.file_name, error = %e, "attachment upload failed");
                    failed_files.push(file);
                }
            }
        }

        {
            let mut state = self.state();
            if state.is_open(task_id, ticket) {
                let refs = state.refs.clone();
                state.draft.finish_edit(&updated, &refs);
                state.attachments.extend(uploaded.iter().cloned());
                state.draft.restage(failed_files.clone());
            }
        }
        self.refresh_task(task_id, ticket).await;

        if !failed_files.is_empty() {
            let names: Vec<String> = failed_files.iter().map(|f| f.file_name.clone()).collect();
            return Err(WorkflowError::partial_upload(&names, total));
        }
        Ok(SaveOutcome {
            task: updated,
            uploaded,
        })
    }

    /// Build the full update from the draft, enforcing per-field permissions
    /// on fields the draft actually changed. Defaulting an unassigned task to
    /// the current user is not an edit.
    fn merge_draft(
        &self,
        task: &Task,
        draft: &DraftState,
        caps: &Capabilities,
    ) -> WorkflowResult<TaskUpdate> {
        if !caps.can_edit_task {
            return Err(WorkflowError::permission_denied("edit this task"));
        }
        let fields = &caps.field_permissions;

        let mut errors = FormErrors::new();
        let due_date = optional_date(&draft.due_date_value, "due_date", &mut errors)
            .or(task.due_date);
        check_date_order(task.start_date, due_date, &mut errors);
        if !errors.is_empty() {
            return Err(WorkflowError::validation(errors));
        }

        let title = draft_or(&draft.title_value, &task.title);
        let description = draft_or(&draft.description_value, &task.description);
        let assignee = draft
            .assignee_value
            .or(task.assignee)
            .or(self.session.user_id());
        let department = draft.department_value.or(task.department);
        let progress = draft.progress_value.min(100);
        let status = if progress != task.progress_percentage {
            derive_status_from_progress(progress, task.status)
        } else {
            task.status
        };

        let denied = [
            ("description", description != task.description, fields.can_edit_description),
            ("due_date", due_date != task.due_date, fields.can_edit_due_date),
            (
                "assignee",
                draft.assignee_value.is_some() && draft.assignee_value != task.assignee,
                fields.can_edit_assignee,
            ),
            ("department", department != task.department, fields.can_edit_department),
            ("progress", progress != task.progress_percentage, fields.can_edit_progress),
            (
                "attachments",
                !draft.staged_files().is_empty(),
                fields.can_edit_attachments,
            ),
        ]
        .into_iter()
        .find(|(_, changed, allowed)| *changed && !*allowed);
        if let Some((field, _, _)) = denied {
            return Err(
                WorkflowError::permission_denied(&format!("change the {} of this task", field))
                    .with_field(field),
            );
        }

        Ok(TaskUpdate {
            title,
            description,
            due_date,
            assignee,
            department,
            progress_percentage: progress,
            status,
            ..TaskUpdate::from_task(task)
        })
    }

    /// Delete a task. Closing any open view of it is up to the caller.
    pub async fn handle_delete_task(&self, task_id: TaskId) -> WorkflowResult<()> {
        let (task, _) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.can_delete_task {
            return Err(WorkflowError::permission_denied("delete this task"));
        }
        self.api.delete_task(task_id).await?;
        info!(task_id, "task deleted");
        self.state().cache.remove(task_id);
        Ok(())
    }

    /// Reassign a task with a reason.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        assignee: UserId,
        reason: &str,
    ) -> WorkflowResult<Task> {
        self.session.require_user_id("assign task")?;
        let (task, ticket) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.field_permissions.can_edit_assignee {
            return Err(WorkflowError::permission_denied("reassign this task"));
        }
        let request = AssignRequest {
            assignee,
            reason: reason.trim().to_string(),
        };
        let updated = self.api.assign_task(task_id, &request).await?;
        info!(task_id, assignee, "task reassigned");

        self.state().apply_task(updated.clone(), ticket);
        self.refresh_task(task_id, ticket).await;
        Ok(updated)
    }

    /// Validate and create a task. Nothing is sent if validation fails.
    pub async fn create_task(&self, form: NewTaskForm) -> WorkflowResult<Task> {
        let (request, files) = form.into_request()?;
        self.session.require_user_id("create task")?;

        let task = self.api.create_task(&request, &files).await?;
        info!(task_id = task.id, files = files.len(), "task created");
        self.state().cache.insert_new(task.clone());
        Ok(task)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    pub async fn handle_add_comment(&self, task_id: TaskId, content: &str) -> WorkflowResult<Comment> {
        self.session.require_user_id("add comment")?;
        let content = comment_content(content)?;
        let ticket = self.state().views.ticket();

        let comment = self
            .api
            .add_comment(task_id, &CommentBody { content })
            .await?;
        info!(task_id, comment_id = comment.id, "comment added");

        {
            let mut state = self.state();
            if state.is_open(task_id, ticket) {
                state.comments.push(comment.clone());
            }
        }
        self.refresh_task(task_id, ticket).await;
        Ok(comment)
    }

    /// Start editing one of the current user's comments on the open task.
    pub fn begin_comment_edit(&self, comment_id: CommentId) -> WorkflowResult<CommentEdit> {
        self.session.require_user_id("edit comment")?;
        let mut state = self.state();
        let comment = state
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned()
            .ok_or_else(|| WorkflowError::comment_not_found(comment_id))?;
        if !can_modify_comment(&self.session, &comment) {
            return Err(WorkflowError::permission_denied("edit another user's comment"));
        }
        let edit = CommentEdit {
            comment_id,
            content: comment.content,
        };
        state.comment_edit = Some(edit.clone());
        Ok(edit)
    }

    pub fn update_comment_draft(&self, content: impl Into<String>) {
        if let Some(edit) = self.state().comment_edit.as_mut() {
            edit.content = content.into();
        }
    }

    pub fn cancel_comment_edit(&self) {
        self.state().comment_edit = None;
    }

    /// Submit the comment being edited.
    pub async fn handle_save_comment(&self, task_id: TaskId) -> WorkflowResult<Comment> {
        let Some(edit) = self.state().comment_edit.clone() else {
            return Err(WorkflowError::invalid_state("no comment is being edited"));
        };
        let saved = self
            .handle_edit_comment(task_id, edit.comment_id, &edit.content)
            .await?;
        let mut state = self.state();
        if state
            .comment_edit
            .as_ref()
            .is_some_and(|e| e.comment_id == edit.comment_id)
        {
            state.comment_edit = None;
        }
        Ok(saved)
    }

    /// Replace a comment's content. Only its author may do this.
    pub async fn handle_edit_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
        content: &str,
    ) -> WorkflowResult<Comment> {
        self.session.require_user_id("edit comment")?;
        let content = comment_content(content)?;
        let (comment, ticket) = self.ensure_comment(task_id, comment_id).await?;
        if !can_modify_comment(&self.session, &comment) {
            return Err(WorkflowError::permission_denied("edit another user's comment"));
        }

        let saved = self
            .api
            .update_comment(task_id, comment_id, &CommentBody { content })
            .await?;
        info!(task_id, comment_id, "comment edited");

        let mut state = self.state();
        if state.is_open(task_id, ticket)
            && let Some(slot) = state.comments.iter_mut().find(|c| c.id == comment_id)
        {
            *slot = saved.clone();
        }
        Ok(saved)
    }

    /// Delete a comment. Only its author may do this.
    pub async fn handle_delete_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
    ) -> WorkflowResult<()> {
        self.session.require_user_id("delete comment")?;
        let (comment, ticket) = self.ensure_comment(task_id, comment_id).await?;
        if !can_modify_comment(&self.session, &comment) {
            return Err(WorkflowError::permission_denied(
                "delete another user's comment",
            ));
        }

        self.api.delete_comment(task_id, comment_id).await?;
        info!(task_id, comment_id, "comment deleted");

        {
            let mut state = self.state();
            if state.is_open(task_id, ticket) {
                state.comments.retain(|c| c.id != comment_id);
                if state
                    .comment_edit
                    .as_ref()
                    .is_some_and(|e| e.comment_id == comment_id)
                {
                    state.comment_edit = None;
                }
            }
        }
        self.refresh_task(task_id, ticket).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Delete an uploaded attachment immediately, after confirmation.
    pub async fn remove_attachment(
        &self,
        task_id: TaskId,
        attachment_id: AttachmentId,
        confirm: &dyn Confirm,
    ) -> WorkflowResult<()> {
        let (task, ticket) = self.ensure_task(task_id).await?;
        let caps = self.resolver.resolve(Some(self.session.as_ref()), Some(&task));
        if !caps.field_permissions.can_edit_attachments {
            return Err(WorkflowError::permission_denied(
                "remove attachments from this task",
            ));
        }

        let label = {
            let state = self.state();
            let known = state
                .attachments
                .iter()
                .find(|a| a.id == attachment_id)
                .map(|a| a.original_filename.clone());
            match known {
                Some(name) => name,
                // The open view lists every attachment of its task.
                None if state.is_open(task_id, ticket) => {
                    return Err(WorkflowError::attachment_not_found(attachment_id));
                }
                None => format!("#{}", attachment_id),
            }
        };
        if !confirm.confirm(&format!("Remove attachment {}?", label)) {
            return Err(WorkflowError::cancelled("Attachment removal"));
        }

        self.api.delete_attachment(task_id, attachment_id).await?;
        info!(task_id, attachment_id, "attachment removed");

        {
            let mut state = self.state();
            if state.is_open(task_id, ticket) {
                state.attachments.retain(|a| a.id != attachment_id);
            }
        }
        self.refresh_task(task_id, ticket).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Cached task, or fetched and cached. Also returns the view ticket
    /// current at the start of the operation.
    async fn ensure_task(&self, task_id: TaskId) -> WorkflowResult<(Task, ViewTicket)> {
        let (cached, ticket) = {
            let state = self.state();
            (state.cache.get(task_id).cloned(), state.views.ticket())
        };
        if let Some(task) = cached {
            return Ok((task, ticket));
        }
        let task = self.api.get_task(task_id).await?;
        self.state().cache.patch(task.clone());
        Ok((task, ticket))
    }

    async fn ensure_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
    ) -> WorkflowResult<(Comment, ViewTicket)> {
        let (cached, ticket) = {
            let state = self.state();
            let ticket = state.views.ticket();
            let cached = if state.is_open(task_id, ticket) {
                state.comments.iter().find(|c| c.id == comment_id).cloned()
            } else {
                None
            };
            (cached, ticket)
        };
        if let Some(comment) = cached {
            return Ok((comment, ticket));
        }
        let comment = self
            .api
            .list_comments(task_id)
            .await?
            .into_iter()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| WorkflowError::comment_not_found(comment_id))?;
        Ok((comment, ticket))
    }

    /// Refetch one task after a mutation. Failures are logged, not returned.
    async fn refresh_task(&self, task_id: TaskId, ticket: ViewTicket) {
        match self.api.get_task(task_id).await {
            Ok(task) => self.state().apply_task(task, ticket),
            Err(e) => warn!(task_id, error = %e, "task refresh after mutation failed"),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Draft text as typed, or `fallback` when the draft is blank.
fn draft_or(draft: &str, fallback: &str) -> String {
    if draft.trim().is_empty() {
        fallback.to_string()
    } else {
        draft.to_string()
    }
}

fn comment_content(content: &str) -> WorkflowResult<String> {
    non_blank(content)
        .ok_or_else(|| WorkflowError::invalid_value("content", "Comment cannot be empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_comment_content_is_trimmed() {
        assert_eq!(comment_content("  ok \n").unwrap(), "ok");
        let err = comment_content(" \t ").unwrap_err();
        assert!(err.is(ErrorCode::ValidationFailed));
        assert_eq!(err.field.as_deref(), Some("content"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(""), None);
        assert_eq!(non_blank(" x "), Some("x".to_string()));
    }

    #[test]
    fn test_draft_or_keeps_text_as_typed() {
        assert_eq!(draft_or("  \n", "kept"), "kept");
        assert_eq!(draft_or("Line one\n", "kept"), "Line one\n");
    }
}
