//! CLI command definitions for hr-task-desk
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod comment;
pub mod task;

use crate::format::OutputFormat;
use crate::types::{Priority, TaskStatus};
use clap::{Parser, Subcommand};
use comment::CommentCommand;
use std::path::PathBuf;
use task::{CreateArgs, EditArgs, ListArgs};

/// Task desk for the HR dashboard's Task API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Task API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Path to the session document (overrides config)
    #[arg(short, long, global = true)]
    pub session: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks (only your own unless your role can view all)
    List(ListArgs),

    /// List tasks assigned to you
    Mine(ListArgs),

    /// Show a task with its comments, attachments and your permissions
    Show {
        /// Task id
        id: i64,
    },

    /// Create a task
    Create(CreateArgs),

    /// Change a task's status (assignee only)
    Status {
        id: i64,
        /// TO_DO, IN_PROGRESS, UNDER_REVIEW, COMPLETED, CANCELLED or ON_HOLD
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },

    /// Raise a task's priority (assignee only; downgrades are refused)
    Priority {
        id: i64,
        /// LOW, MEDIUM, HIGH or URGENT
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },

    /// Set progress; values outside 0-100 are clamped
    Progress {
        id: i64,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Edit fields and upload files in one save
    Edit(EditArgs),

    /// Reassign a task
    Assign {
        id: i64,
        /// Employee user id
        assignee: i64,
        /// Reason recorded with the assignment
        #[arg(short, long, default_value = "")]
        reason: String,
    },

    /// Delete a task
    Delete {
        id: i64,
    },

    /// Add, edit or delete comments
    #[command(subcommand)]
    Comment(CommentCommand),

    /// Upload files to a task
    Attach {
        id: i64,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove an uploaded attachment
    Detach {
        id: i64,
        /// Attachment id
        attachment: i64,
    },

    /// Show the signed-in user and role permissions
    Whoami,
}

pub fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| format!("unknown status '{}'", s))
}

pub fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_progress_accepts_negative() {
        let cli = Cli::parse_from(["hr-task-desk", "progress", "4", "-20"]);
        match cli.command {
            Command::Progress { id, value } => {
                assert_eq!(id, 4);
                assert_eq!(value, -20);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_status_forms() {
        let cli = Cli::parse_from(["hr-task-desk", "--format", "json", "status", "1", "in-progress"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Status {
                status: TaskStatus::InProgress,
                ..
            }
        ));
    }
}
