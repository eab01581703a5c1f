mod extract;
mod handlers;
mod middleware;

pub use extract::CurrentUser;
pub use middleware::{LoginGuard, RateLimiter};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::error::{Error, ErrorBody, ErrorKind};
use crate::storage::Storage;

/// Shared request state: the database, the file store and the abuse
/// guards. Passed explicitly everywhere; there are no process globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Storage,
    pub rate_limiter: RateLimiter,
    pub login_guard: LoginGuard,
}

impl AppState {
    pub fn new(db: Database, storage: Storage) -> Self {
        Self {
            db,
            storage,
            rate_limiter: RateLimiter::auth_default(),
            login_guard: LoginGuard::default(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NoActiveSession | ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ActiveSessionExists => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details are logged server-side only; the client
        // sees a generic message with the structured kind.
        let message = if let Error::Internal(e) = &self {
            tracing::error!("Internal error: {:#}", e);
            "Internal server error".to_string()
        } else {
            tracing::warn!("Request failed: {}", self);
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                kind: self.kind(),
                message,
            }),
        )
            .into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    // Credential exchange goes through the rate limiter; everything
    // else is gated by the bearer-token extractor instead.
    let auth = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/request_email_code", post(handlers::request_email_code))
        .route("/auth/verify_email", post(handlers::verify_email))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .merge(auth)
        .route("/auth/me", get(handlers::me))
        .route("/auth/profile", put(handlers::update_profile))
        // Session lifecycle
        .route("/reports/templates", get(handlers::list_templates))
        .route("/reports/locations", get(handlers::list_locations))
        .route("/reports/start", post(handlers::start_report))
        .route("/reports/cancel", post(handlers::cancel_report))
        .route("/reports/session", get(handlers::get_active_session))
        // Items and photos
        .route("/reports/item", post(handlers::add_item))
        .route(
            "/reports/item/{id}",
            put(handlers::update_item).delete(handlers::delete_item),
        )
        .route("/reports/photo", post(handlers::add_photo))
        .route("/reports/photo/{id}", get(handlers::get_photo))
        .route("/reports/contacts", post(handlers::set_session_contacts))
        // Finalize
        .route("/reports/finalize", post(handlers::finalize_report))
        .route("/reports/finalize_pdf", post(handlers::finalize_report_pdf))
        // Closed-report management
        .route("/reports/recent", get(handlers::list_recent_reports))
        .route("/reports/{id}/open", post(handlers::open_report))
        .route("/reports/{id}/organize", post(handlers::organize_report))
        .route("/reports/{id}", delete(handlers::delete_report))
        // Address book
        .route("/contacts", get(handlers::list_contacts).post(handlers::add_contact))
        // Health
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
