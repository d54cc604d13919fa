//! SendPace Storage - Database access layer
//!
//! This crate provides the SQLite pool, row models and repositories for
//! campaigns, scheduled messages, contact analytics, templates and report
//! configuration.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
