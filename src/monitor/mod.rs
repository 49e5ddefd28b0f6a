//! Monitoring modules.
//!
//! This module provides the refresh loop that repeatedly samples a target
//! and keeps the derived statistics and trend history.

pub mod refresh_loop;

pub use refresh_loop::{MonitorConfig, RefreshLoop};
