//! Transactional reconciliation of staged conference content.
//!
//! [`plan`] diffs a [`ConferenceSnapshot`](podium_core::ConferenceSnapshot)
//! against the stored [`ContentState`](crate::models::ContentState) without
//! touching the database. [`apply_plan`] writes a plan through
//! [`perform_diff`] one resource kind at a time, in dependency order, threading
//! the id lookups of each step into the next.

mod error;
mod executor;
mod lookup;
mod orchestrator;
mod plan;
mod state;
mod table;

pub use error::ReconcileError;
pub use executor::{Applied, MAX_BATCH_ROWS, Phases, perform_diff};
pub use lookup::{Lookup, LookupContext};
pub use orchestrator::{apply_plan, reconcile_in_transaction};
pub use plan::{ReconcileOptions, ReconcilePlan, plan};
pub use state::load_content_state;
pub use table::{RowValues, SqlValue, Table};
