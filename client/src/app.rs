//! App-level session state: one struct owning the HTTP client, the
//! cached snapshot of the open session, and the autocomplete history.
//!
//! The cache follows a single rule: after every write the snapshot is
//! re-fetched from the server, so what the UI renders is always what
//! the server holds. Nothing here mutates the cached snapshot locally.

use uuid::Uuid;

use crate::client::ReportClient;
use crate::error::{ApiErrorKind, ClientError};
use crate::history::{HistoryKey, HistoryStore};
use crate::types::{Contact, ItemCreated, Photo, ReportSummary, SessionSnapshot};
use crate::validate::is_valid_email;

pub struct ReportApp {
    client: ReportClient,
    history: HistoryStore,
    session: Option<SessionSnapshot>,
}

impl ReportApp {
    pub fn new(client: ReportClient, history: HistoryStore) -> Self {
        Self {
            client,
            history,
            session: None,
        }
    }

    /// The underlying HTTP client, e.g. for the auth flow.
    pub fn client_mut(&mut self) -> &mut ReportClient {
        &mut self.client
    }

    /// The cached snapshot of the open session, if any.
    pub fn session(&self) -> Option<&SessionSnapshot> {
        self.session.as_ref()
    }

    /// Autocomplete values for a history key, newest first.
    pub fn suggestions(&mut self, key: HistoryKey) -> Vec<String> {
        self.history.get(key)
    }

    // History writes are best-effort: a failed persist must never fail
    // the API call that triggered it.
    fn remember(&mut self, key: HistoryKey, value: &str) {
        if let Err(e) = self.history.add(key, value) {
            eprintln!("history write failed: {e}");
        }
    }

    /// Re-fetch the open session from the server. "No session" is a
    /// normal state here, not an error.
    pub fn resync(&mut self) -> Result<(), ClientError> {
        match self.client.active_session() {
            Ok(snapshot) => {
                self.session = Some(snapshot);
                Ok(())
            }
            Err(e) if e.api_kind() == Some(ApiErrorKind::NoActiveSession) => {
                self.session = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ============================================================
    // Session lifecycle
    // ============================================================

    pub fn start(
        &mut self,
        location: &str,
        template_key: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<&SessionSnapshot, ClientError> {
        let snapshot = self
            .client
            .start_report(location, template_key, project_name)?;

        self.remember(HistoryKey::Locations, location);
        if let Some(project) = project_name {
            self.remember(HistoryKey::Projects, project);
        }

        Ok(self.session.insert(snapshot))
    }

    /// Re-open a finalized report for further editing.
    pub fn open(&mut self, report_id: Uuid) -> Result<&SessionSnapshot, ClientError> {
        let snapshot = self.client.open_report(report_id)?;
        Ok(self.session.insert(snapshot))
    }

    pub fn cancel(&mut self) -> Result<(), ClientError> {
        self.client.cancel_report()?;
        self.session = None;
        Ok(())
    }

    // ============================================================
    // Items and photos
    // ============================================================

    pub fn add_item(&mut self, description: &str, notes: &str) -> Result<ItemCreated, ClientError> {
        let created = self.client.add_item(description, notes, false)?;
        self.resync()?;
        Ok(created)
    }

    pub fn update_item(
        &mut self,
        item_id: Uuid,
        description: &str,
        notes: &str,
    ) -> Result<(), ClientError> {
        self.client.update_item(item_id, description, notes)?;
        self.resync()
    }

    pub fn delete_item(&mut self, item_id: Uuid) -> Result<(), ClientError> {
        self.client.delete_item(item_id)?;
        self.resync()
    }

    /// Attach a photo. With no target item, an empty placeholder item
    /// is created first so the photo always lands under a numbered
    /// entry the user can caption afterwards.
    pub fn attach_photo(
        &mut self,
        item_id: Option<Uuid>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Photo, ClientError> {
        let target = match item_id {
            Some(id) => id,
            None => self.client.add_item("", "", true)?.item_id,
        };
        let photo = self.client.upload_photo(Some(target), file_name, bytes)?;
        self.resync()?;
        Ok(photo)
    }

    pub fn set_contacts(
        &mut self,
        attendees: &[Uuid],
        distribution_list: &[Uuid],
    ) -> Result<(), ClientError> {
        self.client.set_contacts(attendees, distribution_list)?;
        self.resync()
    }

    // ============================================================
    // Finalize and report store
    // ============================================================

    /// Finalize into a DOCX. An empty report (no items) needs
    /// `confirm_empty`, mirroring the confirmation dialog in the UI.
    pub fn finalize(
        &mut self,
        logo: Option<(&str, &[u8])>,
        confirm_empty: bool,
    ) -> Result<Vec<u8>, ClientError> {
        self.resync()?;
        let empty = self
            .session
            .as_ref()
            .map(|s| s.items.is_empty())
            .unwrap_or(true);
        if empty && !confirm_empty {
            return Err(ClientError::EmptyReport);
        }

        let bytes = self.client.finalize(logo)?;
        self.session = None;
        Ok(bytes)
    }

    pub fn organize(
        &mut self,
        report_id: Uuid,
        folder: &str,
        tags: &[String],
    ) -> Result<ReportSummary, ClientError> {
        let summary = self.client.organize_report(report_id, folder, tags)?;
        self.remember(HistoryKey::Folders, folder);
        Ok(summary)
    }

    // ============================================================
    // Contacts
    // ============================================================

    /// Add a contact, gating the email locally so a bad address is
    /// caught at the input field rather than by the server.
    pub fn add_contact(
        &mut self,
        name: &str,
        email: &str,
        company: Option<&str>,
    ) -> Result<Contact, ClientError> {
        if !is_valid_email(email) {
            return Err(ClientError::InvalidEmail);
        }
        let contact = self.client.add_contact(name, email, company)?;
        self.remember(HistoryKey::ContactName, name);
        self.remember(HistoryKey::ContactEmail, email);
        Ok(contact)
    }
}
