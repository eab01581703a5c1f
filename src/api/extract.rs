use axum::{extract::FromRequestParts, http::request::Parts};

use super::AppState;
use crate::error::Error;
use crate::models::User;

/// The authenticated user, resolved from the bearer token.
///
/// Every route outside `/auth/register`, `/auth/login` and the email
/// verification pair requires this extractor; a missing or unknown
/// token rejects with the `unauthorized` error kind.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or(Error::Unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(Error::Unauthorized("Invalid Authorization header format"))?;

        state
            .db
            .user_for_token(token)?
            .map(CurrentUser)
            .ok_or(Error::Unauthorized("Invalid or expired token"))
    }
}
