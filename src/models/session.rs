use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single in-progress report for a user.
///
/// A session is ephemeral: it exists only between `start` and
/// `finalize`/`cancel`. Finalizing turns it into a persisted
/// [`ReportSummary`](super::ReportSummary) plus a generated document;
/// cancelling discards it with no recovery. At most one session can be
/// open per user at a time, and starting another while one is open is
/// rejected until the caller cancels or continues the existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub location: String,
    pub template_key: String,
    pub title: String,
    pub title_he: String,
    pub project_name: Option<String>,
    pub attendees: Vec<Uuid>,
    pub distribution_list: Vec<Uuid>,
    /// Items in creation order; numbers are server-assigned and stable.
    pub items: Vec<Item>,
    pub photos: Vec<Photo>,
}

impl SessionSnapshot {
    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Photos attached to the given item, in upload order.
    pub fn photos_for_item(&self, item_id: Uuid) -> Vec<&Photo> {
        self.photos
            .iter()
            .filter(|p| p.item_id == Some(item_id))
            .collect()
    }
}

/// One numbered observation entry within a report.
///
/// An item may have empty description and notes only when created as a
/// placeholder pending a photo attachment (`allow_empty`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// Display number, assigned by the server in creation order.
    /// Numbers are never reassigned when earlier items are deleted.
    pub number: i64,
    pub description: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded photo, attached to zero or one item.
///
/// Photos are immutable once uploaded. Deleting the owning item only
/// detaches them (`item_id` becomes `None`); the bytes stay on disk
/// until the session is finalized or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    /// Storage path on the server; not meaningful to clients, which
    /// fetch bytes through `GET /reports/photo/{id}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Input for starting a report session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartReportInput {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub template_key: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Input for adding an item to the open session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemInput {
    pub description: String,
    #[serde(default)]
    pub notes: String,
    /// Permit an empty item (the photo-placeholder pattern).
    #[serde(default)]
    pub allow_empty: bool,
}

/// Input for updating an item. Both fields are replaced wholesale;
/// there is no partial-field update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemInput {
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

/// Response for a successful item add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: Uuid,
    pub number: i64,
}

/// Input for replacing the attendee and distribution contact sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetContactsInput {
    #[serde(default)]
    pub attendees: Vec<Uuid>,
    #[serde(default)]
    pub distribution_list: Vec<Uuid>,
}
