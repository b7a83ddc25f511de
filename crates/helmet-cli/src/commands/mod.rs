//! CLI commands

pub mod create;
pub mod lint;
pub mod show;
pub mod template;
