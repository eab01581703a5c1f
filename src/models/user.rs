use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account. The phone number is the login identifier; the email is
/// used for the verification-code fallback and must pass the shape
/// check in [`crate::auth::is_valid_email`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
    pub verification_code_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub full_name: Option<String>,
    pub role_title: Option<String>,
    pub phone_contact: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCodeRequest {
    pub phone: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCodeVerify {
    pub phone: String,
    pub code: String,
}

/// Profile fields rendered into document headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    pub verified: bool,
    pub full_name: Option<String>,
    pub role_title: Option<String>,
    pub phone_contact: Option<String>,
    pub company_name: Option<String>,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            phone: u.phone.clone(),
            email: u.email.clone(),
            verified: u.verified,
            full_name: u.full_name.clone(),
            role_title: u.role_title.clone(),
            phone_contact: u.phone_contact.clone(),
            company_name: u.company_name.clone(),
        }
    }
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub full_name: Option<String>,
    pub role_title: Option<String>,
    pub phone_contact: Option<String>,
    pub company_name: Option<String>,
}
