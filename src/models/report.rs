use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The persisted, closed form of a finalized session.
///
/// Summaries are append-only apart from the `organize` operation
/// (folder and tags) and deletion. The full session snapshot and the
/// generated document live alongside in the user's report directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub location: String,
    pub template_key: String,
    pub title: String,
    pub title_he: String,
    pub folder: String,
    pub tags: Vec<String>,
    pub project_name: Option<String>,
}

/// Input for the organize operation on a finalized report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeInput {
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
