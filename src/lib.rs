//! fieldreport: a backend for building inspection and site-visit
//! reports from a phone.
//!
//! A user opens one report session at a time, adds numbered items and
//! photos to it, and finalizes it into a generated document (DOCX or
//! PDF). Finalized reports land in a per-user store that supports
//! re-opening, foldering and tagging.

pub mod api;
pub mod auth;
pub mod db;
pub mod docgen;
pub mod error;
pub mod models;
pub mod storage;
