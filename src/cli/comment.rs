//! Comment subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    /// Add a comment to a task
    Add {
        /// Task id
        task: i64,
        content: String,
    },

    /// Replace the content of one of your comments
    Edit {
        /// Task id
        task: i64,
        /// Comment id
        comment: i64,
        content: String,
    },

    /// Delete one of your comments
    Delete {
        /// Task id
        task: i64,
        /// Comment id
        comment: i64,
    },
}
