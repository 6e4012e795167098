//! Tiered configuration.
//!
//! Sources, lowest priority first:
//! 1. **Defaults** - `Config::default()`
//! 2. **Project** - `$CWD/hr-task-desk/config.yaml`
//! 3. **User** - `~/.hr-task-desk/config.yaml`
//! 4. **Environment** - see below
//!
//! YAML tiers are deep-merged field by field.
//!
//! ## Environment Variables
//! - `HR_TASK_DESK_CONFIG_PATH` - Explicit config file (skips the file tiers)
//! - `HR_TASK_DESK_API_URL` - Task API base URL
//! - `HR_TASK_DESK_TOKEN` - Bearer token
//! - `HR_TASK_DESK_SESSION` - Session document path
//! - `HR_TASK_DESK_PAGE_SIZE` - List page size
//! - `HR_TASK_DESK_PROJECT_DIR` / `HR_TASK_DESK_USER_DIR` - Tier directories

mod loader;
mod merge;
mod types;

pub use loader::{
    ConfigLoader, ConfigPaths, ConfigTier, ENV_API_URL, ENV_CONFIG_PATH, ENV_PAGE_SIZE, ENV_SESSION,
    ENV_TOKEN,
};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
