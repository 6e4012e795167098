//! HR Task Desk Library
//!
//! Task workflow client for the HR dashboard's Task API: permission
//! resolution, draft editing, validation, and the task operations façade.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod facade;
pub mod format;
pub mod logging;
pub mod permissions;
pub mod session;
pub mod types;
pub mod validation;
pub mod workflow;
