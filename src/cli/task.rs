//! Task subcommand arguments.

use super::{parse_priority, parse_status};
use crate::api::TaskQuery;
use crate::draft::FieldUpdate;
use crate::types::{Priority, StagedFile, TaskStatus};
use crate::validation::NewTaskForm;
use clap::Args;
use std::path::PathBuf;

/// Arguments for `list` and `mine`
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Free-text search over title and description
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,

    /// Assignee user id
    #[arg(long)]
    pub assignee: Option<i64>,

    /// Department id
    #[arg(long)]
    pub department: Option<i64>,

    /// Page size (default from config)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Load every page
    #[arg(long, conflicts_with = "pages")]
    pub all: bool,
}

impl ListArgs {
    pub fn to_query(&self) -> TaskQuery {
        TaskQuery {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            status: self.status,
            priority: self.priority,
            assignee: self.assignee,
            department: self.department,
            page: 1,
            page_size: self.page_size.unwrap_or(0),
        }
    }

    /// Pages to load after the first; `None` means all of them.
    pub fn extra_pages(&self) -> Option<u32> {
        if self.all {
            None
        } else {
            Some(self.pages.saturating_sub(1))
        }
    }
}

/// Arguments for `create`
#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: String,

    #[arg(long, value_parser = parse_priority, default_value = "MEDIUM")]
    pub priority: Priority,

    #[arg(long, value_parser = parse_status, default_value = "TO_DO")]
    pub status: TaskStatus,

    /// Primary assignee user id
    #[arg(long)]
    pub assignee: Option<i64>,

    /// Additional assignee user ids
    #[arg(long = "also-assign", value_delimiter = ',')]
    pub assignees: Vec<i64>,

    #[arg(long)]
    pub department: Option<i64>,

    /// Parent task id
    #[arg(long)]
    pub parent: Option<i64>,

    /// Files to upload with the task
    #[arg(long = "attach", value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl CreateArgs {
    pub fn into_form(self) -> std::io::Result<NewTaskForm> {
        let files = read_files(&self.files)?;
        Ok(NewTaskForm {
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            start_date: self.start,
            due_date: self.due,
            assignee: self.assignee,
            assignees: self.assignees,
            department: self.department,
            parent_task: self.parent,
            is_urgent: false,
            requires_approval: false,
            files,
        })
    }
}

/// Arguments for `edit`
#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Assignee user id
    #[arg(long)]
    pub assignee: Option<i64>,

    /// Department id
    #[arg(long)]
    pub department: Option<i64>,

    /// Progress; values outside 0-100 are clamped
    #[arg(long, allow_negative_numbers = true)]
    pub progress: Option<i64>,

    /// Files to upload on save
    #[arg(long = "attach", value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl EditArgs {
    /// Draft updates for every flag given.
    pub fn updates(&self) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();
        if let Some(ref title) = self.title {
            updates.push(FieldUpdate::Title(title.clone()));
        }
        if let Some(ref description) = self.description {
            updates.push(FieldUpdate::Description(description.clone()));
        }
        if let Some(ref due) = self.due {
            updates.push(FieldUpdate::DueDate(due.clone()));
        }
        if let Some(assignee) = self.assignee {
            updates.push(FieldUpdate::Assignee(Some(assignee)));
        }
        if let Some(department) = self.department {
            updates.push(FieldUpdate::Department(Some(department)));
        }
        if let Some(progress) = self.progress {
            updates.push(FieldUpdate::Progress(progress));
        }
        updates
    }
}

pub fn read_files(paths: &[PathBuf]) -> std::io::Result<Vec<StagedFile>> {
    paths.iter().map(|p| StagedFile::from_path(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_updates_only_given_flags() {
        let args = EditArgs {
            id: 3,
            title: Some("New".into()),
            description: None,
            due: None,
            assignee: None,
            department: Some(2),
            progress: Some(140),
            files: Vec::new(),
        };
        assert_eq!(
            args.updates(),
            vec![
                FieldUpdate::Title("New".into()),
                FieldUpdate::Department(Some(2)),
                FieldUpdate::Progress(140),
            ]
        );
    }

    #[test]
    fn test_list_query_drops_blank_search() {
        let args = ListArgs {
            search: Some("  ".into()),
            status: Some(TaskStatus::OnHold),
            priority: None,
            assignee: None,
            department: None,
            page_size: None,
            pages: 3,
            all: false,
        };
        let query = args.to_query();
        assert!(query.search.is_none());
        assert_eq!(query.page, 1);
        assert_eq!(args.extra_pages(), Some(2));
    }
}
