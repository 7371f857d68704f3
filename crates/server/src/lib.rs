//! HTTP API server for podium.
//!
//! This crate provides the admin and read surfaces:
//! - Conference management
//! - Snapshot reconciliation (dry run and commit)
//! - Token management
//! - The cached legacy schedule projection

pub mod auth;
pub mod bootstrap;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use cache::ScheduleCache;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
