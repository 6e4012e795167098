//! Output formatting for markdown and JSON.

use crate::permissions::Capabilities;
use crate::session::Session;
use crate::types::{Attachment, Comment, Priority, ReferenceData, Task, TaskStatus};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

/// Assignee label: reference list, then the server-provided name, then "Unassigned".
pub fn assignee_label(task: &Task, refs: &ReferenceData) -> String {
    task.assignee
        .and_then(|id| refs.employee_name(id))
        .or_else(|| task.assignee_name.clone().filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| "Unassigned".to_string())
}

/// Department label, with the same fallback order as [`assignee_label`].
pub fn department_label(task: &Task, refs: &ReferenceData) -> String {
    task.department
        .and_then(|id| refs.department_name(id).map(str::to_string))
        .or_else(|| task.department_name.clone().filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| "No department".to_string())
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task, refs: &ReferenceData) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", format_status_name(task.status)));
    md.push_str(&format!("- **priority**: {}\n", task.priority.as_str()));
    md.push_str(&format!("- **progress**: {}%\n", task.progress_percentage));
    md.push_str(&format!("- **assignee**: {}\n", assignee_label(task, refs)));
    md.push_str(&format!("- **department**: {}\n", department_label(task, refs)));

    if let Some(start) = task.start_date {
        md.push_str(&format!("- **start**: {}\n", start));
    }
    if let Some(due) = task.due_date {
        let overdue = if task.is_overdue { " (overdue)" } else { "" };
        md.push_str(&format!("- **due**: {}{}\n", due, overdue));
    }
    if let Some(parent) = task.parent_task {
        md.push_str(&format!("- **parent**: `{}`\n", parent));
    }

    if !task.description.is_empty() {
        md.push_str("\n### Description\n");
        md.push_str(&task.description);
        md.push('\n');
    }

    md
}

/// Format a list of tasks as markdown, grouped by status in workflow order.
pub fn format_tasks_markdown(tasks: &[Task], refs: &ReferenceData, total: u64) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({} of {})\n\n", tasks.len(), total));

    for status in TaskStatus::ALL {
        let in_status: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if in_status.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", format_status_name(status)));
        for task in in_status {
            md.push_str(&format_task_short(task, refs));
        }
        md.push('\n');
    }

    md
}

/// Capitalize each word of a status code: `UNDER_REVIEW` becomes "Under Review".
fn format_status_name(status: TaskStatus) -> String {
    status
        .as_str()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a task in short form for lists.
fn format_task_short(task: &Task, refs: &ReferenceData) -> String {
    let priority_marker = match task.priority {
        Priority::Urgent => "!!! ",
        Priority::High => "! ",
        Priority::Medium | Priority::Low => "",
    };

    let due = task
        .due_date
        .map(|d| {
            if task.is_overdue {
                format!(" due {} (overdue)", d)
            } else {
                format!(" due {}", d)
            }
        })
        .unwrap_or_default();

    format!(
        "- {}{} `{}` @{} {}%{}\n",
        priority_marker,
        task.title,
        task.id,
        assignee_label(task, refs),
        task.progress_percentage,
        due,
    )
}

/// Format a task's comments. Comments the current user wrote are marked.
pub fn format_comments_markdown(comments: &[Comment], session: &Session) -> String {
    let mut md = String::new();

    md.push_str(&format!("### Comments ({})\n\n", comments.len()));
    for comment in comments {
        let author = comment
            .user_name
            .clone()
            .or_else(|| comment.author.map(|id| format!("User #{}", id)))
            .unwrap_or_else(|| "Unknown".to_string());
        let mine = match (comment.author, session.user_id()) {
            (Some(author), Some(me)) if author == me => " (you)",
            _ => "",
        };
        let when = comment
            .created_at
            .map(|t| format!(" {}", t.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        md.push_str(&format!(
            "- `{}` **{}**{}{}: {}\n",
            comment.id, author, mine, when, comment.content
        ));
    }

    md
}

/// Format a task's attachments.
pub fn format_attachments_markdown(attachments: &[Attachment]) -> String {
    let mut md = String::new();

    md.push_str(&format!("### Attachments ({})\n\n", attachments.len()));
    for attachment in attachments {
        md.push_str(&format!(
            "- `{}` {} ({})\n",
            attachment.id,
            attachment.original_filename,
            format_size(attachment.file_size)
        ));
    }

    md
}

/// Format the capabilities resolved for the current user on one task.
pub fn format_capabilities_markdown(caps: &Capabilities) -> String {
    let flag = |b: bool| if b { "yes" } else { "no" };
    let fields = &caps.field_permissions;
    let mut md = String::new();

    md.push_str("### Permissions\n\n");
    md.push_str(&format!("- **assignee**: {}\n", flag(fields.is_assignee)));
    md.push_str(&format!("- **edit**: {}\n", flag(caps.can_edit_task)));
    md.push_str(&format!("- **delete**: {}\n", flag(caps.can_delete_task)));
    md.push_str(&format!("- **change status**: {}\n", flag(caps.can_change_status)));
    md.push_str(&format!("- **change priority**: {}\n", flag(caps.can_change_priority)));
    md.push_str(&format!("- **update progress**: {}\n", flag(fields.can_edit_progress)));
    md.push_str(&format!("- **manage files**: {}\n", flag(fields.can_edit_attachments)));

    md
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Employee;
    use serde_json::json;

    fn task() -> Task {
        serde_json::from_value(json!({
            "id": 7,
            "title": "Onboard new hire",
            "priority": "HIGH",
            "status": "UNDER_REVIEW",
            "progress_percentage": 40,
            "assignee": 3,
            "assignee_name": "Server Name",
            "due_date": "2025-03-01"
        }))
        .unwrap()
    }

    #[test]
    fn test_assignee_label_fallbacks() {
        let mut refs = ReferenceData::default();
        let mut t = task();
        assert_eq!(assignee_label(&t, &refs), "Server Name");

        refs.employees.push(Employee {
            id: 3,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            full_name: None,
            email: None,
        });
        assert_eq!(assignee_label(&t, &refs), "Ada Lovelace");

        t.assignee = None;
        t.assignee_name = None;
        assert_eq!(assignee_label(&t, &refs), "Unassigned");
    }

    #[test]
    fn test_status_name() {
        assert_eq!(format_status_name(TaskStatus::UnderReview), "Under Review");
        assert_eq!(format_status_name(TaskStatus::ToDo), "To Do");
    }

    #[test]
    fn test_tasks_grouped_by_status() {
        let md = format_tasks_markdown(&[task()], &ReferenceData::default(), 12);
        assert!(md.starts_with("# Tasks (1 of 12)"));
        assert!(md.contains("## Under Review"));
        assert!(md.contains("- ! Onboard new hire `7` @Server Name 40% due 2025-03-01"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
