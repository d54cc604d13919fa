//! API request handlers

pub mod analytics;
pub mod campaigns;
pub mod dispatch;
pub mod health;
pub mod schedules;

pub use health::*;
