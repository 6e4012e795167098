//! Draft buffer for in-place task editing.
//!
//! The draft mirrors the authoritative task until edit mode is entered. While
//! editing, refreshes of the authoritative task leave it alone.

use crate::types::{
    DepartmentId, ReferenceData, StagedFile, Task, UserId, date_input_value,
};
use crate::workflow::clamp_progress;
use serde::Serialize;

/// A single setter call on the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    /// `YYYY-MM-DD` as typed; validated on save.
    DueDate(String),
    Assignee(Option<UserId>),
    Department(Option<DepartmentId>),
    Progress(i64),
}

/// Draft copy of a task's editable fields plus files staged for upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftState {
    pub title_value: String,
    pub description_value: String,
    pub due_date_value: String,
    pub assignee_value: Option<UserId>,
    pub department_value: Option<DepartmentId>,
    pub progress_value: u8,
    editing: bool,
    /// Referenced by the task but not yet present in the loaded picker lists.
    pending_assignee: Option<UserId>,
    pending_department: Option<DepartmentId>,
    #[serde(skip)]
    staged_files: Vec<StagedFile>,
}

impl DraftState {
    pub fn from_task(task: &Task, refs: &ReferenceData) -> Self {
        let mut draft = Self::default();
        draft.overwrite_from(task, refs);
        draft
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Enter edit mode. From here on refreshes do not touch the draft.
    pub fn begin_edit(&mut self) {
        self.editing = true;
    }

    /// Leave edit mode, discard edits and staged files, mirror `task` again.
    pub fn cancel_edit(&mut self, task: &Task, refs: &ReferenceData) {
        self.editing = false;
        self.staged_files.clear();
        self.overwrite_from(task, refs);
    }

    /// Leave edit mode after a save; staged files are handled by the caller.
    pub fn finish_edit(&mut self, task: &Task, refs: &ReferenceData) {
        self.editing = false;
        self.overwrite_from(task, refs);
    }

    /// Pure setter, no validation.
    pub fn update(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Title(v) => self.title_value = v,
            FieldUpdate::Description(v) => self.description_value = v,
            FieldUpdate::DueDate(v) => self.due_date_value = v,
            FieldUpdate::Assignee(v) => {
                self.pending_assignee = None;
                self.assignee_value = v;
            }
            FieldUpdate::Department(v) => {
                self.pending_department = None;
                self.department_value = v;
            }
            FieldUpdate::Progress(v) => self.progress_value = clamp_progress(v),
        }
    }

    /// Mirror a refreshed authoritative task. Returns false, changing nothing,
    /// while in edit mode.
    pub fn sync(&mut self, task: &Task, refs: &ReferenceData) -> bool {
        if self.editing {
            return false;
        }
        self.overwrite_from(task, refs);
        true
    }

    /// Fill assignee/department values whose referents have since loaded.
    pub fn reconcile_references(&mut self, refs: &ReferenceData) {
        if let Some(id) = self.pending_assignee {
            if refs.has_employee(id) {
                if self.assignee_value.is_none() {
                    self.assignee_value = Some(id);
                }
                self.pending_assignee = None;
            }
        }
        if let Some(id) = self.pending_department {
            if refs.has_department(id) {
                if self.department_value.is_none() {
                    self.department_value = Some(id);
                }
                self.pending_department = None;
            }
        }
    }

    fn overwrite_from(&mut self, task: &Task, refs: &ReferenceData) {
        self.title_value = task.title.clone();
        self.description_value = task.description.clone();
        self.due_date_value = date_input_value(task.due_date);
        self.progress_value = task.progress_percentage.min(100);

        self.assignee_value = None;
        self.pending_assignee = None;
        if let Some(id) = task.assignee {
            if refs.has_employee(id) {
                self.assignee_value = Some(id);
            } else {
                self.pending_assignee = Some(id);
            }
        }

        self.department_value = None;
        self.pending_department = None;
        if let Some(id) = task.department {
            if refs.has_department(id) {
                self.department_value = Some(id);
            } else {
                self.pending_department = Some(id);
            }
        }
    }

    // Staged uploads

    pub fn staged_files(&self) -> &[StagedFile] {
        &self.staged_files
    }

    pub fn stage_files(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        self.staged_files.extend(files);
    }

    pub fn remove_staged(&mut self, index: usize) -> Option<StagedFile> {
        (index < self.staged_files.len()).then(|| self.staged_files.remove(index))
    }

    pub fn take_staged(&mut self) -> Vec<StagedFile> {
        std::mem::take(&mut self.staged_files)
    }

    /// Put back files that failed to upload so they can be retried.
    pub fn restage(&mut self, files: Vec<StagedFile>) {
        self.staged_files.extend(files);
    }
}
