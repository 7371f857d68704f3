//! Core domain types and shared logic for the podium conference API.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Staged conference content and resource kinds
//! - Three-way diffing of staged collections against persisted rows
//! - Change summaries for dry runs and commits
//! - Token scopes and authorization
//! - Configuration

pub mod config;
pub mod diff;
pub mod error;
pub mod resources;
pub mod summary;
pub mod token;

pub use diff::{
    CompositeKey, DiffOptions, Differential, ExistingRelation, Identified, KeyPart, Modification,
    RefIndex, Staged, StagedRelation, Tracked, diff_relationship, diff_resource,
    find_duplicate_id,
};
pub use error::{Error, Result};
pub use resources::{ConferenceSnapshot, Localised, ResourceKind};
pub use summary::{DiffCounts, DiffSummary};
pub use token::{Token, TokenId, TokenScope};
