//! hr-task-desk
//!
//! Command-line task desk over the HR dashboard's Task API: list, inspect
//! and update tasks, comments and attachments as the signed-in user.

use anyhow::{Context, Result};
use clap::Parser;
use hr_task_desk::api::HttpTaskApi;
use hr_task_desk::cli::comment::CommentCommand;
use hr_task_desk::cli::task::{ListArgs, read_files};
use hr_task_desk::cli::{Cli, Command};
use hr_task_desk::config::{ConfigLoader, ConfigPaths, ENV_CONFIG_PATH};
use hr_task_desk::error::WorkflowError;
use hr_task_desk::facade::{Confirm, TaskOperations};
use hr_task_desk::format::{
    OutputFormat, format_attachments_markdown, format_capabilities_markdown,
    format_comments_markdown, format_task_markdown, format_tasks_markdown,
};
use hr_task_desk::logging::{LogTarget, init_logging};
use hr_task_desk::permissions::PermissionResolver;
use hr_task_desk::session::Session;
use hr_task_desk::types::Task;
use serde::Serialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks on stderr and reads the answer from stdin.
struct PromptConfirm {
    assume_yes: bool,
}

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", prompt);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    // --config takes the place of HR_TASK_DESK_CONFIG_PATH
    let explicit_config = cli.config.as_ref().map(|p| p.to_string_lossy().to_string());
    let mut loader = ConfigLoader::load_with(ConfigPaths::discover(), |key| {
        if key == ENV_CONFIG_PATH && explicit_config.is_some() {
            return explicit_config.clone();
        }
        std::env::var(key).ok()
    })?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "loaded configuration");
    }

    let config = loader.config_mut();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(session) = &cli.session {
        config.session.path = session.clone();
    }
    let config = loader.into_config();

    let session = Session::load(&config.session.path)?;
    if session.user_id().is_none() {
        warn!("session document has no user id; mutations will be refused");
    }
    let api = HttpTaskApi::new(&config.api)?;
    let resolver = PermissionResolver::new(config.permissions.feature_codes.clone());
    let ops = TaskOperations::new(Arc::new(api), Arc::new(session), resolver)
        .with_page_size(config.api.page_size);
    let confirm = PromptConfirm {
        assume_yes: cli.yes,
    };

    if let Err(e) = run(&ops, cli.command, cli.format, &confirm).await {
        report_error(&e, cli.format);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    ops: &TaskOperations,
    command: Command,
    format: OutputFormat,
    confirm: &dyn Confirm,
) -> Result<()> {
    match command {
        Command::List(args) => {
            let query = args.to_query();
            ops.load_tasks(query).await?;
            load_extra_pages(ops, &args).await?;
            print_tasks(ops, format)
        }
        Command::Mine(args) => {
            let query = args.to_query();
            ops.load_my_tasks(query).await?;
            load_extra_pages(ops, &args).await?;
            print_tasks(ops, format)
        }
        Command::Show { id } => {
            load_references(ops).await;
            let task = ops.open_task(id).await?;
            let comments = ops.comments();
            let attachments = ops.attachments();
            let caps = ops.capabilities(id);
            emit(
                format,
                &json!({
                    "task": task,
                    "comments": comments,
                    "attachments": attachments,
                    "capabilities": caps,
                    "priority_options": caps.priority_options(&task),
                }),
                || {
                    let refs = ops.references();
                    let mut md = format_task_markdown(&task, &refs);
                    md.push('\n');
                    md.push_str(&format_comments_markdown(&comments, ops.session()));
                    md.push('\n');
                    md.push_str(&format_attachments_markdown(&attachments));
                    md.push('\n');
                    md.push_str(&format_capabilities_markdown(&caps));
                    md
                },
            )
        }
        Command::Create(args) => {
            let form = args.into_form().context("reading attachment")?;
            let task = ops.create_task(form).await?;
            print_task(ops, format, &task)
        }
        Command::Status { id, status } => {
            let task = ops.handle_status_change(id, status).await?;
            print_task(ops, format, &task)
        }
        Command::Priority { id, priority } => {
            let task = ops.handle_priority_change(id, priority).await?;
            print_task(ops, format, &task)
        }
        Command::Progress { id, value } => {
            let task = ops.handle_progress_update(id, value).await?;
            print_task(ops, format, &task)
        }
        Command::Edit(args) => {
            let files = read_files(&args.files).context("reading attachment")?;
            load_references(ops).await;
            ops.open_task(args.id).await?;
            ops.begin_edit(args.id)?;
            for update in args.updates() {
                ops.update_form_data(update);
            }
            ops.handle_file_change(files);
            let outcome = ops.handle_save_all(args.id).await?;
            emit(format, &outcome, || {
                let mut md = format_task_markdown(&outcome.task, &ops.references());
                if !outcome.uploaded.is_empty() {
                    md.push('\n');
                    md.push_str(&format_attachments_markdown(&outcome.uploaded));
                }
                md
            })
        }
        Command::Assign {
            id,
            assignee,
            reason,
        } => {
            let task = ops.assign_task(id, assignee, &reason).await?;
            print_task(ops, format, &task)
        }
        Command::Delete { id } => {
            if !confirm.confirm(&format!("Delete task #{}?", id)) {
                return Err(WorkflowError::cancelled("Task deletion").into());
            }
            ops.handle_delete_task(id).await?;
            emit(format, &json!({"deleted": id}), || {
                format!("Deleted task `{}`\n", id)
            })
        }
        Command::Comment(CommentCommand::Add { task, content }) => {
            let comment = ops.handle_add_comment(task, &content).await?;
            emit(format, &comment, || {
                format_comments_markdown(std::slice::from_ref(&comment), ops.session())
            })
        }
        Command::Comment(CommentCommand::Edit {
            task,
            comment,
            content,
        }) => {
            ops.open_task(task).await?;
            ops.begin_comment_edit(comment)?;
            ops.update_comment_draft(content);
            let saved = ops.handle_save_comment(task).await?;
            emit(format, &saved, || {
                format_comments_markdown(std::slice::from_ref(&saved), ops.session())
            })
        }
        Command::Comment(CommentCommand::Delete { task, comment }) => {
            if !confirm.confirm(&format!("Delete comment #{}?", comment)) {
                return Err(WorkflowError::cancelled("Comment deletion").into());
            }
            ops.handle_delete_comment(task, comment).await?;
            emit(format, &json!({"deleted": comment}), || {
                format!("Deleted comment `{}`\n", comment)
            })
        }
        Command::Attach { id, files } => {
            let files = read_files(&files).context("reading attachment")?;
            ops.open_task(id).await?;
            ops.begin_edit(id)?;
            ops.handle_file_change(files);
            let outcome = ops.handle_save_all(id).await?;
            emit(format, &outcome.uploaded, || {
                format_attachments_markdown(&outcome.uploaded)
            })
        }
        Command::Detach { id, attachment } => {
            ops.open_task(id).await?;
            ops.remove_attachment(id, attachment, confirm).await?;
            emit(format, &json!({"removed": attachment}), || {
                format!("Removed attachment `{}`\n", attachment)
            })
        }
        Command::Whoami => {
            let session = ops.session();
            emit(format, session, || {
                let mut md = String::new();
                let name = session
                    .user
                    .full_name
                    .clone()
                    .or_else(|| session.user.username.clone())
                    .unwrap_or_else(|| "(unknown)".to_string());
                md.push_str(&format!("## {}\n", name));
                match session.user_id() {
                    Some(id) => md.push_str(&format!("- **id**: `{}`\n", id)),
                    None => md.push_str("- **id**: missing\n"),
                }
                if let Some(ref role) = session.role {
                    md.push_str(&format!("- **role**: {}\n", role.name));
                    for p in &role.permissions {
                        md.push_str(&format!(
                            "  - `{}` view={} create={} edit={} delete={} view_all={}\n",
                            p.feature_code,
                            p.can_view,
                            p.can_create,
                            p.can_edit,
                            p.can_delete,
                            p.can_view_all
                        ));
                    }
                }
                md
            })
        }
    }
}

async fn load_extra_pages(ops: &TaskOperations, args: &ListArgs) -> Result<()> {
    let mut remaining = args.extra_pages();
    while ops.has_more_tasks() && remaining != Some(0) {
        if ops.load_more_tasks().await? == 0 && !ops.has_more_tasks() {
            break;
        }
        remaining = remaining.map(|n| n - 1);
    }
    Ok(())
}

/// Reference lists only improve display names; failing to load them is not fatal.
async fn load_references(ops: &TaskOperations) {
    if let Err(e) = ops.load_references().await {
        warn!(error = %e, "could not load employees and departments");
    }
}

fn print_tasks(ops: &TaskOperations, format: OutputFormat) -> Result<()> {
    let tasks = ops.tasks();
    emit(format, &tasks, || {
        format_tasks_markdown(&tasks, &ops.references(), ops.total_tasks())
    })
}

fn print_task(ops: &TaskOperations, format: OutputFormat, task: &Task) -> Result<()> {
    emit(format, task, || format_task_markdown(task, &ops.references()))
}

fn emit<T, F>(format: OutputFormat, value: &T, markdown: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Markdown => print!("{}", markdown()),
    }
    Ok(())
}

fn report_error(err: &anyhow::Error, format: OutputFormat) {
    let Some(workflow) = err.downcast_ref::<WorkflowError>() else {
        eprintln!("Error: {:#}", err);
        return;
    };
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(workflow) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("Error: {}", workflow),
        },
        OutputFormat::Markdown => {
            eprintln!("Error: {}", workflow);
            for (field, message) in workflow.fields.iter().skip(1) {
                eprintln!("  {}: {}", field, message);
            }
            if let Some(ref details) = workflow.details {
                eprintln!("  {}", details);
            }
        }
    }
}
