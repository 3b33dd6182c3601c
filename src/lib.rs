//! Todo Board Library
//!
//! Ordering and reconciliation engine for a multi-column task board backed by
//! a per-item REST collection, plus the config, session and output helpers the
//! CLI is built from.

pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod grouping;
pub mod logging;
pub mod reconcile;
pub mod remote;
pub mod reorder;
pub mod session;
pub mod store;
pub mod types;
