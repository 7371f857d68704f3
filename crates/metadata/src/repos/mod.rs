//! Repository traits for metadata operations.

pub mod conferences;
pub mod content;
pub mod tokens;

pub use conferences::ConferenceRepo;
pub use content::ContentRepo;
pub use tokens::TokenRepo;
