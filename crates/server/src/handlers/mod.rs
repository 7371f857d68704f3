//! HTTP request handlers.

pub mod admin;
pub mod common;
pub mod content;
pub mod legacy;

pub use admin::*;
pub use content::{get_content, put_content, put_schedule, put_taxonomies};
pub use legacy::get_schedule;
