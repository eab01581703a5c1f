//! Wire types for the fieldreport API. Timestamps stay as RFC 3339
//! strings; the client never does date math on them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub verified: bool,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role_title: Option<String>,
    #[serde(default)]
    pub phone_contact: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub role_title: Option<String>,
    pub phone_contact: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportTemplate {
    pub key: String,
    pub title: String,
    pub title_he: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: Uuid,
    pub created_at: String,
    pub location: String,
    pub template_key: String,
    pub title: String,
    pub title_he: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Uuid>,
    #[serde(default)]
    pub distribution_list: Vec<Uuid>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl SessionSnapshot {
    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn photos_for_item(&self, item_id: Uuid) -> Vec<&Photo> {
        self.photos
            .iter()
            .filter(|p| p.item_id == Some(item_id))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub number: i64,
    pub description: String,
    pub notes: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    #[serde(default)]
    pub item_id: Option<Uuid>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemCreated {
    pub item_id: Uuid,
    pub number: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role_title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub created_at: String,
    pub location: String,
    pub template_key: String,
    pub title: String,
    pub title_he: String,
    pub folder: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}
