use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use uuid::Uuid;

use fieldreport::api::{create_router, AppState};
use fieldreport::auth;
use fieldreport::db::Database;
use fieldreport::models::*;
use fieldreport::storage::Storage;

struct TestCtx {
    server: TestServer,
    db: Database,
    _tmp: tempfile::TempDir,
}

fn setup() -> TestCtx {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let storage = Storage::new(tmp.path());
    let app = create_router(AppState::new(db.clone(), storage));
    TestCtx {
        server: TestServer::new(app).expect("Failed to create test server"),
        db,
        _tmp: tmp,
    }
}

async fn register(server: &TestServer, phone: &str) -> String {
    server
        .post("/auth/register")
        .json(&RegisterInput {
            phone: phone.to_string(),
            password: "secret1".to_string(),
            email: None,
        })
        .await
        .json::<TokenResponse>()
        .access_token
}

async fn start_session(server: &TestServer, token: &str, location: &str) -> SessionSnapshot {
    let response = server
        .post("/reports/start")
        .authorization_bearer(token)
        .json(&StartReportInput {
            location: Some(location.to_string()),
            template_key: None,
            project_name: None,
        })
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn add_item(server: &TestServer, token: &str, description: &str) -> ItemCreated {
    let response = server
        .post("/reports/item")
        .authorization_bearer(token)
        .json(&AddItemInput {
            description: description.to_string(),
            notes: String::new(),
            allow_empty: false,
        })
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn snapshot(server: &TestServer, token: &str) -> SessionSnapshot {
    server
        .get("/reports/session")
        .authorization_bearer(token)
        .await
        .json()
}

// Hand-assembled multipart bodies; the boundary only needs to not
// occur in the payload.
const BOUNDARY: &str = "fieldreport-test-boundary";

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

fn push_part(
    body: &mut Vec<u8>,
    name: &str,
    file_name: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match file_name {
        Some(f) => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n")
                .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
        ),
    }
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
}

fn close_multipart(body: &mut Vec<u8>) {
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
}

fn photo_body(item_id: Option<Uuid>, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(id) = item_id {
        push_part(&mut body, "item_id", None, None, id.to_string().as_bytes());
    }
    push_part(&mut body, "file", Some("site.jpg"), Some("image/jpeg"), bytes);
    close_multipart(&mut body);
    body
}

fn empty_multipart() -> Vec<u8> {
    let mut body = Vec::new();
    close_multipart(&mut body);
    body
}

mod auth_flow {
    use super::*;

    #[tokio::test]
    async fn register_returns_a_usable_token() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .get("/auth/me")
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let profile: Profile = response.json();
        assert_eq!(profile.phone, "0501234567");
        assert!(!profile.verified);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let ctx = setup();
        let response = ctx
            .server
            .post("/auth/register")
            .json(&RegisterInput {
                phone: "0501234567".to_string(),
                password: "secret1".to_string(),
                email: Some("not-an-email".to_string()),
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .post("/auth/register")
            .json(&RegisterInput {
                phone: "0501234567".to_string(),
                password: "other".to_string(),
                email: None,
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_requires_a_verified_email() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .post("/auth/login")
            .json(&LoginInput {
                phone: "0501234567".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let user = ctx.db.get_user_by_phone("0501234567").unwrap().unwrap();
        ctx.db.mark_verified(user.id).unwrap();

        let response = ctx
            .server
            .post("/auth/login")
            .json(&LoginInput {
                phone: "0501234567".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        response.assert_status_ok();
        assert!(!response.json::<TokenResponse>().access_token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;
        let user = ctx.db.get_user_by_phone("0501234567").unwrap().unwrap();
        ctx.db.mark_verified(user.id).unwrap();

        let response = ctx
            .server
            .post("/auth/login")
            .json(&LoginInput {
                phone: "0501234567".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn repeated_login_failures_lock_the_account() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;
        let user = ctx.db.get_user_by_phone("0501234567").unwrap().unwrap();
        ctx.db.mark_verified(user.id).unwrap();

        for _ in 0..5 {
            ctx.server
                .post("/auth/login")
                .json(&LoginInput {
                    phone: "0501234567".to_string(),
                    password: "wrong".to_string(),
                })
                .await
                .assert_status(StatusCode::UNAUTHORIZED);
        }

        // Locked out even with the right password now.
        let response = ctx
            .server
            .post("/auth/login")
            .json(&LoginInput {
                phone: "0501234567".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "rate_limited");
    }

    #[tokio::test]
    async fn email_code_verifies_the_account() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;
        let user = ctx.db.get_user_by_phone("0501234567").unwrap().unwrap();

        // Plant a known code; the HTTP route only logs the real one.
        ctx.db
            .store_verification(
                user.id,
                "user@example.com",
                &auth::hash_password("secret1"),
                &auth::hash_code("123456"),
                Utc::now() + chrono::Duration::minutes(10),
            )
            .unwrap();

        let response = ctx
            .server
            .post("/auth/verify_email")
            .json(&EmailCodeVerify {
                phone: "0501234567".to_string(),
                code: "999999".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = ctx
            .server
            .post("/auth/verify_email")
            .json(&EmailCodeVerify {
                phone: "0501234567".to_string(),
                code: "123456".to_string(),
            })
            .await;
        response.assert_status_ok();
        let token = response.json::<TokenResponse>().access_token;

        let profile: Profile = ctx
            .server
            .get("/auth/me")
            .authorization_bearer(&token)
            .await
            .json();
        assert!(profile.verified);
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let ctx = setup();
        register(&ctx.server, "0501234567").await;
        let user = ctx.db.get_user_by_phone("0501234567").unwrap().unwrap();
        ctx.db
            .store_verification(
                user.id,
                "user@example.com",
                &auth::hash_password("secret1"),
                &auth::hash_code("123456"),
                Utc::now() - chrono::Duration::minutes(1),
            )
            .unwrap();

        let response = ctx
            .server
            .post("/auth/verify_email")
            .json(&EmailCodeVerify {
                phone: "0501234567".to_string(),
                code: "123456".to_string(),
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_update_is_partial() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let profile: Profile = ctx
            .server
            .put("/auth/profile")
            .authorization_bearer(&token)
            .json(&UpdateProfileInput {
                full_name: Some("Dana Levi".to_string()),
                role_title: Some("Site Engineer".to_string()),
                phone_contact: None,
                company_name: None,
            })
            .await
            .json();
        assert_eq!(profile.full_name.as_deref(), Some("Dana Levi"));

        let profile: Profile = ctx
            .server
            .put("/auth/profile")
            .authorization_bearer(&token)
            .json(&UpdateProfileInput {
                full_name: None,
                role_title: None,
                phone_contact: None,
                company_name: Some("ACME".to_string()),
            })
            .await
            .json();
        assert_eq!(profile.full_name.as_deref(), Some("Dana Levi"));
        assert_eq!(profile.company_name.as_deref(), Some("ACME"));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let ctx = setup();
        let response = ctx.server.get("/reports/session").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_routes_are_rate_limited_per_ip() {
        let ctx = setup();
        let mut limited = false;
        for _ in 0..40 {
            let response = ctx
                .server
                .post("/auth/request_email_code")
                .json(&EmailCodeRequest {
                    phone: "0501234567".to_string(),
                    email: "bad".to_string(),
                    password: "x".to_string(),
                })
                .await;
            if response.status_code() == StatusCode::TOO_MANY_REQUESTS {
                limited = true;
                break;
            }
            response.assert_status(StatusCode::BAD_REQUEST);
        }
        assert!(limited, "Expected the rate limiter to engage");
    }
}

mod session_lifecycle {
    use super::*;

    #[tokio::test]
    async fn start_creates_a_session_with_the_template() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        let session = start_session(&ctx.server, &token, "Herzl 12, Tel Aviv").await;

        assert_eq!(session.template_key, "INSPECTION_REPORT");
        assert_eq!(session.location, "Herzl 12, Tel Aviv");
        assert!(session.items.is_empty());
    }

    #[tokio::test]
    async fn starting_while_open_conflicts() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let response = ctx
            .server
            .post("/reports/start")
            .authorization_bearer(&token)
            .json(&StartReportInput {
                location: Some("Site B".to_string()),
                template_key: None,
                project_name: None,
            })
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "active_session_exists");
    }

    #[tokio::test]
    async fn cancel_discards_and_allows_a_new_start() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        ctx.server
            .post("/reports/cancel")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = ctx
            .server
            .get("/reports/session")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "no_active_session");
        assert_eq!(body["message"], "No active report");

        start_session(&ctx.server, &token, "Site B").await;
    }

    #[tokio::test]
    async fn sessions_are_scoped_per_user() {
        let ctx = setup();
        let alice = register(&ctx.server, "0501111111").await;
        let bob = register(&ctx.server, "0502222222").await;
        start_session(&ctx.server, &alice, "Site A").await;

        // Bob has no session, and can open his own.
        ctx.server
            .get("/reports/session")
            .authorization_bearer(&bob)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        start_session(&ctx.server, &bob, "Site B").await;

        assert_eq!(snapshot(&ctx.server, &alice).await.location, "Site A");
        assert_eq!(snapshot(&ctx.server, &bob).await.location, "Site B");
    }

    #[tokio::test]
    async fn templates_fall_back_on_unknown_keys() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let templates: serde_json::Value = ctx
            .server
            .get("/reports/templates")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(templates.as_array().unwrap().len(), 4);

        let response = ctx
            .server
            .post("/reports/start")
            .authorization_bearer(&token)
            .json(&StartReportInput {
                location: None,
                template_key: Some("NO_SUCH_TEMPLATE".to_string()),
                project_name: None,
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        let session: SessionSnapshot = response.json();
        assert_eq!(session.template_key, "INSPECTION_REPORT");
    }

    #[tokio::test]
    async fn recent_locations_come_back_newest_first() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        for loc in ["Site A", "Site B", "Site C"] {
            start_session(&ctx.server, &token, loc).await;
            ctx.server
                .post("/reports/cancel")
                .authorization_bearer(&token)
                .await
                .assert_status(StatusCode::NO_CONTENT);
        }

        let locations: Vec<String> = ctx
            .server
            .get("/reports/locations")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(locations, vec!["Site C", "Site B", "Site A"]);
    }
}

mod items {
    use super::*;

    #[tokio::test]
    async fn numbers_are_sequential_and_survive_deletes() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let first = add_item(&ctx.server, &token, "Crack in wall").await;
        let second = add_item(&ctx.server, &token, "Missing railing").await;
        let third = add_item(&ctx.server, &token, "Wet insulation").await;
        assert_eq!((first.number, second.number, third.number), (1, 2, 3));

        ctx.server
            .delete(&format!("/reports/item/{}", second.item_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        // Survivors keep their numbers; the next item gets a fresh one.
        let fourth = add_item(&ctx.server, &token, "Exposed rebar").await;
        assert_eq!(fourth.number, 4);

        let session = snapshot(&ctx.server, &token).await;
        let numbers: Vec<i64> = session.items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn empty_items_need_explicit_permission() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let response = ctx
            .server
            .post("/reports/item")
            .authorization_bearer(&token)
            .json(&AddItemInput {
                description: "   ".to_string(),
                notes: String::new(),
                allow_empty: false,
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = ctx
            .server
            .post("/reports/item")
            .authorization_bearer(&token)
            .json(&AddItemInput {
                description: String::new(),
                notes: String::new(),
                allow_empty: true,
            })
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn update_replaces_both_fields() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        let created = add_item(&ctx.server, &token, "Initial").await;

        ctx.server
            .put(&format!("/reports/item/{}", created.item_id))
            .authorization_bearer(&token)
            .json(&UpdateItemInput {
                description: "Updated".to_string(),
                notes: "With notes".to_string(),
            })
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let session = snapshot(&ctx.server, &token).await;
        let item = session.item(created.item_id).unwrap();
        assert_eq!(item.description, "Updated");
        assert_eq!(item.notes, "With notes");
        assert_eq!(item.number, created.number);
    }

    #[tokio::test]
    async fn item_operations_without_a_session_fail() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .post("/reports/item")
            .authorization_bearer(&token)
            .json(&AddItemInput {
                description: "Orphan".to_string(),
                notes: String::new(),
                allow_empty: false,
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "no_active_session");
    }

    #[tokio::test]
    async fn updating_an_unknown_item_is_not_found() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let response = ctx
            .server
            .put(&format!("/reports/item/{}", Uuid::new_v4()))
            .authorization_bearer(&token)
            .json(&UpdateItemInput {
                description: "Ghost".to_string(),
                notes: String::new(),
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "not_found");
    }
}

mod photos {
    use super::*;

    #[tokio::test]
    async fn upload_attaches_to_an_item() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        let item = add_item(&ctx.server, &token, "Crack").await;

        let response = ctx
            .server
            .post("/reports/photo")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(photo_body(Some(item.item_id), b"jpegbytes")))
            .await;
        response.assert_status(StatusCode::CREATED);
        let photo: Photo = response.json();
        assert_eq!(photo.item_id, Some(item.item_id));

        let session = snapshot(&ctx.server, &token).await;
        assert_eq!(session.photos_for_item(item.item_id).len(), 1);
    }

    #[tokio::test]
    async fn unknown_item_reference_is_detached_not_rejected() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let response = ctx
            .server
            .post("/reports/photo")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(photo_body(Some(Uuid::new_v4()), b"jpegbytes")))
            .await;
        response.assert_status(StatusCode::CREATED);
        let photo: Photo = response.json();
        assert_eq!(photo.item_id, None);
    }

    #[tokio::test]
    async fn deleting_an_item_detaches_its_photos() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        let item = add_item(&ctx.server, &token, "Crack").await;

        ctx.server
            .post("/reports/photo")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(photo_body(Some(item.item_id), b"jpegbytes")))
            .await
            .assert_status(StatusCode::CREATED);

        ctx.server
            .delete(&format!("/reports/item/{}", item.item_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let session = snapshot(&ctx.server, &token).await;
        assert_eq!(session.photos.len(), 1);
        assert_eq!(session.photos[0].item_id, None);
    }

    #[tokio::test]
    async fn photo_bytes_are_served_back() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let photo: Photo = ctx
            .server
            .post("/reports/photo")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(photo_body(None, b"jpegbytes")))
            .await
            .json();

        let response = ctx
            .server
            .get(&format!("/reports/photo/{}", photo.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"jpegbytes");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );
    }
}

mod finalize {
    use super::*;

    async fn finalize_docx(ctx: &TestCtx, token: &str) -> Bytes {
        let response = ctx
            .server
            .post("/reports/finalize")
            .authorization_bearer(token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(empty_multipart()))
            .await;
        response.assert_status_ok();
        response.as_bytes().clone()
    }

    #[tokio::test]
    async fn finalize_returns_a_docx_package() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        add_item(&ctx.server, &token, "Crack in wall").await;

        let bytes = finalize_docx(&ctx, &token).await;
        assert_eq!(&bytes[..2], b"PK");

        // The session is consumed.
        ctx.server
            .get("/reports/session")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn finalize_pdf_returns_a_pdf() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        add_item(&ctx.server, &token, "Crack in wall").await;

        let response = ctx
            .server
            .post("/reports/finalize_pdf")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(empty_multipart()))
            .await;
        response.assert_status_ok();
        assert!(response.as_bytes().starts_with(b"%PDF-"));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
    }

    #[tokio::test]
    async fn finalize_without_a_session_is_not_found() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .post("/reports/finalize")
            .authorization_bearer(&token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(empty_multipart()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["kind"], "no_active_session");
    }

    #[tokio::test]
    async fn finalized_report_lands_in_the_store() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;
        add_item(&ctx.server, &token, "Crack in wall").await;
        finalize_docx(&ctx, &token).await;

        let reports: Vec<ReportSummary> = ctx
            .server
            .get("/reports/recent")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].location, "Site A");
        assert!(reports[0].folder.is_empty());
    }
}

mod report_store {
    use super::*;

    async fn finalize_one(ctx: &TestCtx, token: &str, location: &str) -> ReportSummary {
        start_session(&ctx.server, token, location).await;
        add_item(&ctx.server, token, "Observation").await;
        ctx.server
            .post("/reports/finalize")
            .authorization_bearer(token)
            .content_type(&multipart_content_type())
            .bytes(Bytes::from(empty_multipart()))
            .await
            .assert_status_ok();
        ctx.server
            .get("/reports/recent")
            .authorization_bearer(token)
            .await
            .json::<Vec<ReportSummary>>()
            .remove(0)
    }

    #[tokio::test]
    async fn open_rehydrates_the_session() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        let report = finalize_one(&ctx, &token, "Site A").await;

        let response = ctx
            .server
            .post(&format!("/reports/{}/open", report.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let session: SessionSnapshot = response.json();
        assert_eq!(session.location, "Site A");
        assert_eq!(session.items.len(), 1);
        assert_eq!(session.items[0].number, 1);

        // Open conflicts while a session is already active.
        ctx.server
            .post(&format!("/reports/{}/open", report.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn organize_sets_folder_and_tags() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        let report = finalize_one(&ctx, &token, "Site A").await;

        let response = ctx
            .server
            .post(&format!("/reports/{}/organize", report.id))
            .authorization_bearer(&token)
            .json(&OrganizeInput {
                folder: "2026 / Q3".to_string(),
                tags: vec!["urgent".to_string(), "  ".to_string()],
            })
            .await;
        response.assert_status_ok();
        let updated: ReportSummary = response.json();
        assert_eq!(updated.folder, "2026 / Q3");
        assert_eq!(updated.tags, vec!["urgent"]);
    }

    #[tokio::test]
    async fn delete_removes_the_report() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        let report = finalize_one(&ctx, &token, "Site A").await;

        ctx.server
            .delete(&format!("/reports/{}", report.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let reports: Vec<ReportSummary> = ctx
            .server
            .get("/reports/recent")
            .authorization_bearer(&token)
            .await
            .json();
        assert!(reports.is_empty());

        ctx.server
            .delete(&format!("/reports/{}", report.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod contacts {
    use super::*;

    #[tokio::test]
    async fn contacts_are_added_and_listed() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;

        let response = ctx
            .server
            .post("/contacts")
            .authorization_bearer(&token)
            .json(&CreateContactInput {
                name: "Dana Levi".to_string(),
                email: "dana@example.com".to_string(),
                company: Some("ACME".to_string()),
                role_title: None,
                phone: None,
            })
            .await;
        response.assert_status(StatusCode::CREATED);

        let contacts: Vec<Contact> = ctx
            .server
            .get("/contacts")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Dana Levi");
    }

    #[tokio::test]
    async fn session_contact_sets_replace_wholesale() {
        let ctx = setup();
        let token = register(&ctx.server, "0501234567").await;
        start_session(&ctx.server, &token, "Site A").await;

        let contact: Contact = ctx
            .server
            .post("/contacts")
            .authorization_bearer(&token)
            .json(&CreateContactInput {
                name: "Dana Levi".to_string(),
                email: "dana@example.com".to_string(),
                company: None,
                role_title: None,
                phone: None,
            })
            .await
            .json();

        ctx.server
            .post("/reports/contacts")
            .authorization_bearer(&token)
            .json(&SetContactsInput {
                attendees: vec![contact.id],
                distribution_list: vec![contact.id],
            })
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let session = snapshot(&ctx.server, &token).await;
        assert_eq!(session.attendees, vec![contact.id]);
        assert_eq!(session.distribution_list, vec![contact.id]);

        ctx.server
            .post("/reports/contacts")
            .authorization_bearer(&token)
            .json(&SetContactsInput {
                attendees: vec![],
                distribution_list: vec![],
            })
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let session = snapshot(&ctx.server, &token).await;
        assert!(session.attendees.is_empty());
    }
}
