//! SendPace API - REST API server
//!
//! This crate exposes the dispatch queue, scheduled batches, campaign
//! history and engagement analytics over HTTP.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{cors_layer, create_router};
pub use state::AppState;
