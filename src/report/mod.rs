//! Presentation of snapshots and run reports.
//!
//! Everything here is a pure consumer of [`crate::models::Snapshot`] and
//! [`crate::models::RunReport`].

pub mod console;
pub mod generator;

pub use console::render_console;
pub use generator::{generate_json_report, generate_markdown_report, recommendations};
