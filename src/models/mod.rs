//! Domain models for fieldreport.
//!
//! # Core Concepts
//!
//! ## Ephemeral state
//!
//! - [`SessionSnapshot`]: the single in-progress report for a user,
//!   created by `start` and consumed by `finalize` or `cancel`.
//! - [`Item`]: one numbered observation within a session.
//! - [`Photo`]: uploaded bytes attached to at most one item.
//!
//! ## Permanent entities
//!
//! - [`ReportSummary`]: the persisted record of a finalized session,
//!   stored next to the generated document.
//! - [`Contact`]: user-scoped address-book entry referenced by the
//!   attendee and distribution sets.
//! - [`User`]: an account with profile fields rendered into documents.
//! - [`ReportTemplate`]: the fixed table of document layouts.

mod contact;
mod report;
mod session;
mod template;
mod user;

pub use contact::*;
pub use report::*;
pub use session::*;
pub use template::*;
pub use user::*;
