use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-scoped address-book entry.
///
/// Contacts are independent of any session; attendee and distribution
/// sets reference them by id. Generated documents render the resolved
/// names and emails verbatim, which is why clients gate the email
/// field before adding (see the client crate's validator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub role_title: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role_title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
