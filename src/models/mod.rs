//! Data models for the Drop journaling application.
//!
//! Field names serialize in camelCase to match the web client.

mod analysis;
mod entry;
mod question;
mod user;

pub use analysis::*;
pub use entry::*;
pub use question::*;
pub use user::*;
