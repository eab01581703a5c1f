//! Blocking HTTP client for the fieldreport API.

use std::io::Read;

use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ClientError};
use crate::types::*;

/// One part of a multipart request body.
struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn multipart_body(boundary: &str, parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match part.file_name {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, f
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Turn a failed call into a structured [`ApiError`] when the server
/// sent one, a transport error otherwise.
fn check(
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, ClientError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(_, response)) => match response.into_json::<ApiError>() {
            Ok(body) => Err(ClientError::Api(body)),
            Err(e) => Err(ClientError::Io(e)),
        },
        Err(e) => Err(ClientError::Request(e)),
    }
}

fn read_bytes(response: ureq::Response) -> Result<Vec<u8>, ClientError> {
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// HTTP client for the fieldreport API. Holds the bearer token once
/// authenticated; all report routes require it.
#[derive(Clone)]
pub struct ReportClient {
    base_url: String,
    token: Option<String>,
}

impl ReportClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Create a client pointing to a local server on the default port.
    pub fn localhost() -> Self {
        Self::new("http://localhost:8000")
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let mut request = ureq::request(method, &format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn post_multipart(
        &self,
        path: &str,
        parts: &[Part<'_>],
    ) -> Result<ureq::Response, ClientError> {
        let boundary = format!("fieldreport-{:016x}", rand::random::<u64>());
        let body = multipart_body(&boundary, parts);
        check(
            self.request("POST", path)
                .set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={boundary}"),
                )
                .send_bytes(&body),
        )
    }

    // ============================================================
    // Auth
    // ============================================================

    /// Register a new account and keep the returned token.
    pub fn register(
        &mut self,
        phone: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), ClientError> {
        let response = check(self.request("POST", "/auth/register").send_json(json!({
            "phone": phone,
            "password": password,
            "email": email,
        })))?;
        let token: TokenResponse = response.into_json()?;
        self.token = Some(token.access_token);
        Ok(())
    }

    pub fn login(&mut self, phone: &str, password: &str) -> Result<(), ClientError> {
        let response = check(self.request("POST", "/auth/login").send_json(json!({
            "phone": phone,
            "password": password,
        })))?;
        let token: TokenResponse = response.into_json()?;
        self.token = Some(token.access_token);
        Ok(())
    }

    pub fn request_email_code(
        &self,
        phone: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        check(
            self.request("POST", "/auth/request_email_code")
                .send_json(json!({
                    "phone": phone,
                    "email": email,
                    "password": password,
                })),
        )?;
        Ok(())
    }

    /// Redeem a verification code; keeps the returned token.
    pub fn verify_email(&mut self, phone: &str, code: &str) -> Result<(), ClientError> {
        let response = check(self.request("POST", "/auth/verify_email").send_json(json!({
            "phone": phone,
            "code": code,
        })))?;
        let token: TokenResponse = response.into_json()?;
        self.token = Some(token.access_token);
        Ok(())
    }

    pub fn me(&self) -> Result<Profile, ClientError> {
        Ok(check(self.request("GET", "/auth/me").call())?.into_json()?)
    }

    pub fn update_profile(&self, update: &UpdateProfile) -> Result<Profile, ClientError> {
        Ok(check(self.request("PUT", "/auth/profile").send_json(update))?.into_json()?)
    }

    // ============================================================
    // Session lifecycle
    // ============================================================

    pub fn templates(&self) -> Result<Vec<ReportTemplate>, ClientError> {
        Ok(check(self.request("GET", "/reports/templates").call())?.into_json()?)
    }

    pub fn locations(&self) -> Result<Vec<String>, ClientError> {
        Ok(check(self.request("GET", "/reports/locations").call())?.into_json()?)
    }

    pub fn start_report(
        &self,
        location: &str,
        template_key: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<SessionSnapshot, ClientError> {
        let response = check(self.request("POST", "/reports/start").send_json(json!({
            "location": location,
            "template_key": template_key,
            "project_name": project_name,
        })))?;
        Ok(response.into_json()?)
    }

    pub fn cancel_report(&self) -> Result<(), ClientError> {
        check(self.request("POST", "/reports/cancel").call())?;
        Ok(())
    }

    pub fn active_session(&self) -> Result<SessionSnapshot, ClientError> {
        Ok(check(self.request("GET", "/reports/session").call())?.into_json()?)
    }

    // ============================================================
    // Items and photos
    // ============================================================

    pub fn add_item(
        &self,
        description: &str,
        notes: &str,
        allow_empty: bool,
    ) -> Result<ItemCreated, ClientError> {
        let response = check(self.request("POST", "/reports/item").send_json(json!({
            "description": description,
            "notes": notes,
            "allow_empty": allow_empty,
        })))?;
        Ok(response.into_json()?)
    }

    pub fn update_item(
        &self,
        item_id: Uuid,
        description: &str,
        notes: &str,
    ) -> Result<(), ClientError> {
        check(
            self.request("PUT", &format!("/reports/item/{item_id}"))
                .send_json(json!({
                    "description": description,
                    "notes": notes,
                })),
        )?;
        Ok(())
    }

    pub fn delete_item(&self, item_id: Uuid) -> Result<(), ClientError> {
        check(
            self.request("DELETE", &format!("/reports/item/{item_id}"))
                .call(),
        )?;
        Ok(())
    }

    pub fn upload_photo(
        &self,
        item_id: Option<Uuid>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Photo, ClientError> {
        let id_text = item_id.map(|id| id.to_string());
        let mut parts = Vec::new();
        if let Some(id) = &id_text {
            parts.push(Part {
                name: "item_id",
                file_name: None,
                content_type: None,
                data: id.as_bytes(),
            });
        }
        parts.push(Part {
            name: "file",
            file_name: Some(file_name),
            content_type: Some("application/octet-stream"),
            data: bytes,
        });
        Ok(self.post_multipart("/reports/photo", &parts)?.into_json()?)
    }

    pub fn photo_bytes(&self, photo_id: Uuid) -> Result<Vec<u8>, ClientError> {
        read_bytes(check(
            self.request("GET", &format!("/reports/photo/{photo_id}"))
                .call(),
        )?)
    }

    pub fn set_contacts(
        &self,
        attendees: &[Uuid],
        distribution_list: &[Uuid],
    ) -> Result<(), ClientError> {
        check(self.request("POST", "/reports/contacts").send_json(json!({
            "attendees": attendees,
            "distribution_list": distribution_list,
        })))?;
        Ok(())
    }

    // ============================================================
    // Finalize and report store
    // ============================================================

    /// Finalize the open session into a DOCX; returns the document
    /// bytes. The optional logo is rendered into the header.
    pub fn finalize(&self, logo: Option<(&str, &[u8])>) -> Result<Vec<u8>, ClientError> {
        self.finalize_at("/reports/finalize", logo)
    }

    pub fn finalize_pdf(&self, logo: Option<(&str, &[u8])>) -> Result<Vec<u8>, ClientError> {
        self.finalize_at("/reports/finalize_pdf", logo)
    }

    fn finalize_at(
        &self,
        path: &str,
        logo: Option<(&str, &[u8])>,
    ) -> Result<Vec<u8>, ClientError> {
        let mut parts = Vec::new();
        if let Some((file_name, bytes)) = logo {
            parts.push(Part {
                name: "logo",
                file_name: Some(file_name),
                content_type: Some("application/octet-stream"),
                data: bytes,
            });
        }
        read_bytes(self.post_multipart(path, &parts)?)
    }

    pub fn recent_reports(&self) -> Result<Vec<ReportSummary>, ClientError> {
        Ok(check(self.request("GET", "/reports/recent").call())?.into_json()?)
    }

    /// Re-open a finalized report as the active session.
    pub fn open_report(&self, report_id: Uuid) -> Result<SessionSnapshot, ClientError> {
        let response = check(
            self.request("POST", &format!("/reports/{report_id}/open"))
                .call(),
        )?;
        Ok(response.into_json()?)
    }

    pub fn organize_report(
        &self,
        report_id: Uuid,
        folder: &str,
        tags: &[String],
    ) -> Result<ReportSummary, ClientError> {
        let response = check(
            self.request("POST", &format!("/reports/{report_id}/organize"))
                .send_json(json!({
                    "folder": folder,
                    "tags": tags,
                })),
        )?;
        Ok(response.into_json()?)
    }

    pub fn delete_report(&self, report_id: Uuid) -> Result<(), ClientError> {
        check(
            self.request("DELETE", &format!("/reports/{report_id}"))
                .call(),
        )?;
        Ok(())
    }

    // ============================================================
    // Contacts
    // ============================================================

    pub fn contacts(&self) -> Result<Vec<Contact>, ClientError> {
        Ok(check(self.request("GET", "/contacts").call())?.into_json()?)
    }

    pub fn add_contact(
        &self,
        name: &str,
        email: &str,
        company: Option<&str>,
    ) -> Result<Contact, ClientError> {
        let response = check(self.request("POST", "/contacts").send_json(json!({
            "name": name,
            "email": email,
            "company": company,
        })))?;
        Ok(response.into_json()?)
    }
}
