//! Client-side building blocks for the fieldreport API: a blocking
//! HTTP client, an app-level session cache that stays in sync with
//! the server, and the local autocomplete history store.

mod app;
mod client;
mod error;
mod history;
mod types;
mod validate;

pub use app::ReportApp;
pub use client::ReportClient;
pub use error::{ApiError, ApiErrorKind, ClientError};
pub use history::{HistoryKey, HistoryStore};
pub use types::*;
pub use validate::is_valid_email;
