use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::api::{AppState, CurrentUser};
use crate::auth;
use crate::docgen::{self, ReportDocument};
use crate::error::{Error, Result};
use crate::models::*;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const PDF_MIME: &str = "application/pdf";

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> Error {
    Error::validation(format!("Invalid multipart body: {e}"))
}

// ============================================================
// Auth
// ============================================================

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let phone = input.phone.trim();
    if phone.is_empty() {
        return Err(Error::validation("Phone number is required"));
    }
    if input.password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    if let Some(email) = input.email.as_deref() {
        if !auth::is_valid_email(email) {
            return Err(Error::validation("Invalid email address"));
        }
    }

    let hash = auth::hash_password(&input.password);
    let user = state
        .db
        .create_user(phone, &hash, input.email.as_deref())?;

    let token = auth::new_token();
    state.db.insert_token(&token, user.id)?;
    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<TokenResponse>> {
    let phone = input.phone.trim();
    if state.login_guard.is_locked(phone) {
        return Err(Error::RateLimited);
    }

    let user = match state.db.get_user_by_phone(phone)? {
        Some(user) if auth::verify_password(&input.password, &user.password_hash) => user,
        _ => {
            state.login_guard.record_failure(phone);
            return Err(Error::Unauthorized("Invalid phone or password"));
        }
    };
    if !user.verified {
        return Err(Error::Unauthorized("Email not verified"));
    }

    state.login_guard.clear(phone);
    let token = auth::new_token();
    state.db.insert_token(&token, user.id)?;

    Ok(Json(TokenResponse {
        access_token: token,
    }))
}

pub async fn request_email_code(
    State(state): State<AppState>,
    Json(input): Json<EmailCodeRequest>,
) -> Result<Json<serde_json::Value>> {
    let phone = input.phone.trim();
    if !auth::is_valid_email(&input.email) {
        return Err(Error::validation("Invalid email address"));
    }

    let user = match state.db.get_user_by_phone(phone)? {
        Some(user) => {
            if user.verified {
                return Err(Error::validation("User already verified"));
            }
            if !auth::verify_password(&input.password, &user.password_hash) {
                return Err(Error::Unauthorized("Invalid phone or password"));
            }
            user
        }
        None => {
            let hash = auth::hash_password(&input.password);
            state.db.create_user(phone, &hash, Some(&input.email))?
        }
    };

    let code = auth::new_verification_code();
    let expires = Utc::now() + chrono::Duration::minutes(auth::CODE_TTL_MINUTES);
    state.db.store_verification(
        user.id,
        &input.email,
        &auth::hash_password(&input.password),
        &auth::hash_code(&code),
        expires,
    )?;

    // No SMTP relay is wired up; the code lands in the server log so
    // an operator can pass it along during setup.
    tracing::info!("Verification code for {}: {}", input.email, code);

    Ok(Json(serde_json::json!({ "status": "code_sent" })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(input): Json<EmailCodeVerify>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .db
        .get_user_by_phone(input.phone.trim())?
        .ok_or(Error::Unauthorized("Invalid phone or code"))?;

    let stored = user
        .verification_code_hash
        .as_deref()
        .ok_or(Error::Unauthorized("Invalid phone or code"))?;
    if let Some(expires) = user.verification_expires_at {
        if Utc::now() > expires {
            return Err(Error::validation("Code expired"));
        }
    }
    if !auth::verify_code(input.code.trim(), stored) {
        return Err(Error::Unauthorized("Invalid phone or code"));
    }

    state.db.mark_verified(user.id)?;
    let token = auth::new_token();
    state.db.insert_token(&token, user.id)?;
    tracing::info!("Verified user {}", user.id);

    Ok(Json(TokenResponse {
        access_token: token,
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<Profile> {
    Json(Profile::from(&user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<Profile>> {
    let updated = state.db.update_profile(user.id, input)?;
    Ok(Json(Profile::from(&updated)))
}

// ============================================================
// Session lifecycle
// ============================================================

pub async fn list_templates(CurrentUser(_user): CurrentUser) -> Json<&'static [ReportTemplate]> {
    Json(TEMPLATES)
}

pub async fn list_locations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<String>>> {
    Ok(Json(state.db.get_locations(user.id)?))
}

pub async fn start_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<StartReportInput>,
) -> Result<(StatusCode, Json<SessionSnapshot>)> {
    let template = get_template(input.template_key.as_deref().unwrap_or(""));
    let location = input.location.as_deref().unwrap_or("");
    let project = input
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let snapshot = state.db.start_session(user.id, location, template, project)?;
    if !snapshot.location.is_empty() {
        state.db.add_location(user.id, &snapshot.location)?;
    }
    tracing::info!("Started {} session for user {}", template.key, user.id);

    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn cancel_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    let snapshot = state.db.take_session(user.id)?;
    state.storage.discard_photos(user.id, &snapshot.photos);
    tracing::info!("Cancelled session for user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_active_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SessionSnapshot>> {
    Ok(Json(state.db.get_session(user.id)?))
}

// ============================================================
// Items and photos
// ============================================================

pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddItemInput>,
) -> Result<(StatusCode, Json<ItemCreated>)> {
    let description = input.description.trim();
    let notes = input.notes.trim();
    if description.is_empty() && notes.is_empty() && !input.allow_empty {
        return Err(Error::validation("Description or notes required"));
    }

    let item = state.db.add_item(user.id, description, notes)?;
    Ok((
        StatusCode::CREATED,
        Json(ItemCreated {
            item_id: item.id,
            number: item.number,
        }),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> Result<StatusCode> {
    let description = input.description.trim();
    let notes = input.notes.trim();
    if description.is_empty() && notes.is_empty() {
        return Err(Error::validation("Description or notes required"));
    }

    state.db.update_item(user.id, id, description, notes)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.db.delete_item(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Photo>)> {
    let snapshot = state.db.get_session(user.id)?;

    let mut item_id: Option<Uuid> = None;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("item_id") => {
                let text = field.text().await.map_err(bad_multipart)?;
                let text = text.trim();
                if !text.is_empty() {
                    item_id = Some(
                        text.parse()
                            .map_err(|_| Error::validation("Invalid item id"))?,
                    );
                }
            }
            Some("file") => {
                let file_name = field.file_name().map(String::from);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                upload = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| Error::validation("Missing file field"))?;
    if bytes.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }

    // An id for an item that no longer exists is dropped, not
    // rejected: the upload already happened on the device and losing
    // the photo over a stale reference is worse than detaching it.
    if let Some(id) = item_id {
        if snapshot.item(id).is_none() {
            tracing::warn!("Photo references unknown item {}; detaching", id);
            item_id = None;
        }
    }

    let path = state.storage.save_photo(user.id, file_name.as_deref(), &bytes)?;
    let photo = state
        .db
        .add_photo(user.id, item_id, &path.to_string_lossy())?;

    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn get_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let photo = state.db.get_photo(user.id, id)?;
    let path = photo.file_path.as_deref().ok_or(Error::NotFound("Photo file"))?;
    let bytes = std::fs::read(path).map_err(|_| Error::NotFound("Photo file"))?;

    let mime = match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    };

    Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response())
}

pub async fn set_session_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SetContactsInput>,
) -> Result<StatusCode> {
    state
        .db
        .set_session_contacts(user.id, &input.attendees, &input.distribution_list)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Finalize
// ============================================================

/// Pull an optional `logo` upload out of the finalize body. The
/// request is always multipart; a plain finalize just has no fields.
async fn read_logo(mut multipart: Multipart) -> Result<Option<Vec<u8>>> {
    let mut logo = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(String::from);
        if name.as_deref() == Some("logo") {
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            if !bytes.is_empty() {
                logo = Some(bytes.to_vec());
            }
        }
    }
    Ok(logo)
}

enum DocFormat {
    Docx,
    Pdf,
}

async fn finalize(
    state: AppState,
    user: User,
    multipart: Multipart,
    format: DocFormat,
) -> Result<Response> {
    let logo = read_logo(multipart).await?;

    // Generate before consuming the session so a failed render leaves
    // the session intact and retryable.
    let mut snapshot = state.db.get_session(user.id)?;
    let attendees = state.db.contacts_by_ids(user.id, &snapshot.attendees)?;
    let distribution = state.db.contacts_by_ids(user.id, &snapshot.distribution_list)?;
    let profile = Profile::from(&user);

    let document = ReportDocument {
        snapshot: &snapshot,
        attendees: &attendees,
        distribution: &distribution,
        author: Some(&profile),
        logo: logo.as_deref(),
    };
    let (bytes, file_name, mime) = match format {
        DocFormat::Docx => (
            docgen::generate_docx(&document)?,
            docgen::docx_file_name(&snapshot),
            DOCX_MIME,
        ),
        DocFormat::Pdf => (
            docgen::generate_pdf(&document)?,
            docgen::pdf_file_name(&snapshot),
            PDF_MIME,
        ),
    };

    state.db.take_session(user.id)?;
    let report_id = Uuid::new_v4();
    let doc_path = state.storage.archive_report(
        user.id,
        report_id,
        &file_name,
        &bytes,
        &mut snapshot.photos,
    )?;
    state
        .db
        .save_report(user.id, report_id, &snapshot, &doc_path.to_string_lossy())?;
    tracing::info!(
        "Finalized report {} for user {} ({} items, {} photos)",
        report_id,
        user.id,
        snapshot.items.len(),
        snapshot.photos.len()
    );

    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn finalize_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response> {
    finalize(state, user, multipart, DocFormat::Docx).await
}

pub async fn finalize_report_pdf(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response> {
    finalize(state, user, multipart, DocFormat::Pdf).await
}

// ============================================================
// Report store
// ============================================================

pub async fn list_recent_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ReportSummary>>> {
    Ok(Json(state.db.list_reports(user.id)?))
}

/// Re-open a finalized report as the active session. Fails with a
/// conflict while another session is open.
pub async fn open_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let snapshot = state
        .db
        .get_report_snapshot(user.id, id)?
        .ok_or(Error::NotFound("Report"))?;
    state.db.seed_session(&snapshot)?;
    tracing::info!("Re-opened report {} for user {}", id, user.id);
    Ok(Json(snapshot))
}

pub async fn organize_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<OrganizeInput>,
) -> Result<Json<ReportSummary>> {
    let folder = input.folder.trim();
    let tags: Vec<String> = input
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(Json(state.db.organize_report(user.id, id, folder, &tags)?))
}

pub async fn delete_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.db.delete_report(user.id, id)? {
        return Err(Error::NotFound("Report"));
    }
    state.storage.delete_report_dir(user.id, id)?;
    tracing::info!("Deleted report {} for user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Contacts
// ============================================================

pub async fn list_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(state.db.list_contacts(user.id)?))
}

pub async fn add_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateContactInput>,
) -> Result<(StatusCode, Json<Contact>)> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Contact name is required"));
    }
    let contact = state.db.create_contact(user.id, input)?;
    Ok((StatusCode::CREATED, Json(contact)))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
