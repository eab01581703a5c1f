mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

/// Recency cap for the server-aggregated per-user location list.
const MAX_RECENT_LOCATIONS: usize = 5;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn).map_err(Error::Internal)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(
        &self,
        phone: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let exists: i32 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE phone = ?",
            [phone],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::validation("User already exists"));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (id, phone, email, password_hash, created_at, verified)
             VALUES (?, ?, ?, ?, ?, 0)",
            (id.to_string(), phone, email, password_hash, now.to_rfc3339()),
        )?;

        Ok(User {
            id,
            phone: phone.to_string(),
            email: email.map(String::from),
            password_hash: password_hash.to_string(),
            created_at: now,
            verified: false,
            verification_code_hash: None,
            verification_expires_at: None,
            full_name: None,
            role_title: None,
            phone_contact: None,
            company_name: None,
        })
    }

    pub fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        query_user(&conn, "WHERE phone = ?", &[&phone])
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = id.to_string();
        query_user(&conn, "WHERE id = ?", &[&id])
    }

    /// Record a pending email verification: the (re)hashed password,
    /// the target email, the hashed 6-digit code and its expiry.
    pub fn store_verification(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE users SET email = ?, password_hash = ?,
                 verification_code_hash = ?, verification_expires_at = ?
             WHERE id = ?",
            (
                email,
                password_hash,
                code_hash,
                expires_at.to_rfc3339(),
                user_id.to_string(),
            ),
        )?;
        Ok(())
    }

    pub fn mark_verified(&self, user_id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE users SET verified = 1,
                 verification_code_hash = NULL, verification_expires_at = NULL
             WHERE id = ?",
            [user_id.to_string()],
        )?;
        Ok(())
    }

    pub fn update_profile(&self, user_id: Uuid, input: UpdateProfileInput) -> Result<User> {
        let existing = self
            .get_user_by_id(user_id)?
            .ok_or(Error::NotFound("User"))?;

        let full_name = input.full_name.or(existing.full_name);
        let role_title = input.role_title.or(existing.role_title);
        let phone_contact = input.phone_contact.or(existing.phone_contact);
        let company_name = input.company_name.or(existing.company_name);

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE users SET full_name = ?, role_title = ?, phone_contact = ?, company_name = ?
             WHERE id = ?",
            (
                &full_name,
                &role_title,
                &phone_contact,
                &company_name,
                user_id.to_string(),
            ),
        )?;

        Ok(User {
            full_name,
            role_title,
            phone_contact,
            company_name,
            ..existing
        })
    }

    // ============================================================
    // Token operations
    // ============================================================

    pub fn insert_token(&self, token: &str, user_id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO tokens (token, user_id, created_at) VALUES (?, ?, ?)",
            (token, user_id.to_string(), Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    pub fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user_id: Option<String> = conn
            .query_row("SELECT user_id FROM tokens WHERE token = ?", [token], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match user_id {
            Some(id) => query_user(&conn, "WHERE id = ?", &[&id]),
            None => Ok(None),
        }
    }

    // ============================================================
    // Session operations
    // ============================================================

    pub fn has_session(&self, user_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn start_session(
        &self,
        user_id: Uuid,
        location: &str,
        template: &ReportTemplate,
        project_name: Option<&str>,
    ) -> Result<SessionSnapshot> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Err(Error::ActiveSessionExists);
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (user_id, created_at, location, template_key, title, title_he, project_name)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                user_id.to_string(),
                now.to_rfc3339(),
                location.trim(),
                template.key,
                template.title,
                template.title_he,
                project_name,
            ),
        )?;

        Ok(SessionSnapshot {
            user_id,
            created_at: now,
            location: location.trim().to_string(),
            template_key: template.key.to_string(),
            title: template.title.to_string(),
            title_he: template.title_he.to_string(),
            project_name: project_name.map(String::from),
            attendees: Vec::new(),
            distribution_list: Vec::new(),
            items: Vec::new(),
            photos: Vec::new(),
        })
    }

    /// Re-seed an active session from a stored report snapshot.
    /// Item numbers and photo attachments are preserved as saved.
    pub fn seed_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
            [snapshot.user_id.to_string()],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Err(Error::ActiveSessionExists);
        }

        conn.execute(
            "INSERT INTO sessions (user_id, created_at, location, template_key, title, title_he,
                 project_name, attendees, distribution_list)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                snapshot.user_id.to_string(),
                snapshot.created_at.to_rfc3339(),
                &snapshot.location,
                &snapshot.template_key,
                &snapshot.title,
                &snapshot.title_he,
                &snapshot.project_name,
                serde_json::to_string(&snapshot.attendees)?,
                serde_json::to_string(&snapshot.distribution_list)?,
            ),
        )?;

        for item in &snapshot.items {
            conn.execute(
                "INSERT INTO items (id, user_id, number, description, notes, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    item.id.to_string(),
                    snapshot.user_id.to_string(),
                    item.number,
                    &item.description,
                    &item.notes,
                    item.created_at.to_rfc3339(),
                ),
            )?;
        }
        for photo in &snapshot.photos {
            conn.execute(
                "INSERT INTO photos (id, user_id, item_id, file_path, uploaded_at)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    photo.id.to_string(),
                    snapshot.user_id.to_string(),
                    photo.item_id.map(|u| u.to_string()),
                    photo.file_path.as_deref().unwrap_or(""),
                    photo.uploaded_at.to_rfc3339(),
                ),
            )?;
        }
        Ok(())
    }

    pub fn get_session(&self, user_id: Uuid) -> Result<SessionSnapshot> {
        let conn = self.conn.lock().expect("database lock poisoned");
        load_session(&conn, user_id)?.ok_or(Error::NoActiveSession)
    }

    pub fn add_item(&self, user_id: Uuid, description: &str, notes: &str) -> Result<Item> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_session(&conn, user_id)?;

        // Numbers are never reused: max+1, not count+1, so a delete
        // followed by an add cannot produce a duplicate display number.
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM items WHERE user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO items (id, user_id, number, description, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                next,
                description,
                notes,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Item {
            id,
            number: next,
            description: description.to_string(),
            notes: notes.to_string(),
            created_at: now,
        })
    }

    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        description: &str,
        notes: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_session(&conn, user_id)?;
        let rows = conn.execute(
            "UPDATE items SET description = ?, notes = ? WHERE id = ? AND user_id = ?",
            (description, notes, item_id.to_string(), user_id.to_string()),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("Item"));
        }
        Ok(())
    }

    /// Delete an item. Photos referencing it are detached, not deleted.
    pub fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_session(&conn, user_id)?;
        conn.execute(
            "UPDATE photos SET item_id = NULL WHERE item_id = ? AND user_id = ?",
            (item_id.to_string(), user_id.to_string()),
        )?;
        let rows = conn.execute(
            "DELETE FROM items WHERE id = ? AND user_id = ?",
            (item_id.to_string(), user_id.to_string()),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("Item"));
        }
        Ok(())
    }

    pub fn add_photo(
        &self,
        user_id: Uuid,
        item_id: Option<Uuid>,
        file_path: &str,
    ) -> Result<Photo> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_session(&conn, user_id)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO photos (id, user_id, item_id, file_path, uploaded_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                item_id.map(|u| u.to_string()),
                file_path,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Photo {
            id,
            item_id,
            file_path: Some(file_path.to_string()),
            uploaded_at: now,
        })
    }

    pub fn get_photo(&self, user_id: Uuid, photo_id: Uuid) -> Result<Photo> {
        let conn = self.conn.lock().expect("database lock poisoned");
        require_session(&conn, user_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, item_id, file_path, uploaded_at FROM photos WHERE id = ? AND user_id = ?",
        )?;
        let mut rows = stmt.query((photo_id.to_string(), user_id.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(Photo {
                id: parse_uuid(row.get::<_, String>(0)?),
                item_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
                file_path: Some(row.get(2)?),
                uploaded_at: parse_datetime(row.get::<_, String>(3)?),
            })
        } else {
            Err(Error::NotFound("Photo"))
        }
    }

    /// Full replace of both contact sets on the open session.
    pub fn set_session_contacts(
        &self,
        user_id: Uuid,
        attendees: &[Uuid],
        distribution_list: &[Uuid],
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE sessions SET attendees = ?, distribution_list = ? WHERE user_id = ?",
            (
                serde_json::to_string(attendees)?,
                serde_json::to_string(distribution_list)?,
                user_id.to_string(),
            ),
        )?;
        if rows == 0 {
            return Err(Error::NoActiveSession);
        }
        Ok(())
    }

    /// Remove the open session and return its final snapshot.
    /// Terminal operation used by both finalize and cancel.
    pub fn take_session(&self, user_id: Uuid) -> Result<SessionSnapshot> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let snapshot = load_session(&conn, user_id)?.ok_or(Error::NoActiveSession)?;
        conn.execute(
            "DELETE FROM photos WHERE user_id = ?",
            [user_id.to_string()],
        )?;
        conn.execute("DELETE FROM items WHERE user_id = ?", [user_id.to_string()])?;
        conn.execute(
            "DELETE FROM sessions WHERE user_id = ?",
            [user_id.to_string()],
        )?;
        Ok(snapshot)
    }

    // ============================================================
    // Contact operations
    // ============================================================

    pub fn list_contacts(&self, user_id: Uuid) -> Result<Vec<Contact>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, email, company, role_title, phone, created_at
             FROM contacts WHERE user_id = ? ORDER BY created_at",
        )?;
        let contacts = stmt
            .query_map([user_id.to_string()], map_contact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    pub fn create_contact(&self, user_id: Uuid, input: CreateContactInput) -> Result<Contact> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_string();
        conn.execute(
            "INSERT INTO contacts (id, user_id, name, email, company, role_title, phone, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                &name,
                &email,
                &input.company,
                &input.role_title,
                &input.phone,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Contact {
            id,
            name,
            email,
            company: input.company,
            role_title: input.role_title,
            phone: input.phone,
            created_at: now,
        })
    }

    /// Resolve contact ids to records, skipping ids that no longer
    /// exist. Order follows the input ids, not the address book.
    pub fn contacts_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Contact>> {
        let all = self.list_contacts(user_id)?;
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|c| c.id == *id).cloned())
            .collect())
    }

    // ============================================================
    // Finalized report operations
    // ============================================================

    pub fn save_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        snapshot: &SessionSnapshot,
        doc_path: &str,
    ) -> Result<ReportSummary> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reports (id, user_id, created_at, location, template_key, title, title_he,
                 folder, tags, project_name, doc_path, snapshot)
             VALUES (?, ?, ?, ?, ?, ?, ?, '', '[]', ?, ?, ?)",
            (
                report_id.to_string(),
                user_id.to_string(),
                now.to_rfc3339(),
                &snapshot.location,
                &snapshot.template_key,
                &snapshot.title,
                &snapshot.title_he,
                &snapshot.project_name,
                doc_path,
                serde_json::to_string(snapshot)?,
            ),
        )?;

        Ok(ReportSummary {
            id: report_id,
            created_at: now,
            location: snapshot.location.clone(),
            template_key: snapshot.template_key.clone(),
            title: snapshot.title.clone(),
            title_he: snapshot.title_he.clone(),
            folder: String::new(),
            tags: Vec::new(),
            project_name: snapshot.project_name.clone(),
        })
    }

    pub fn list_reports(&self, user_id: Uuid) -> Result<Vec<ReportSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, created_at, location, template_key, title, title_he, folder, tags, project_name
             FROM reports WHERE user_id = ? ORDER BY created_at DESC",
        )?;
        let reports = stmt
            .query_map([user_id.to_string()], map_report_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    pub fn get_report_snapshot(
        &self,
        user_id: Uuid,
        report_id: Uuid,
    ) -> Result<Option<SessionSnapshot>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM reports WHERE id = ? AND user_id = ?",
                (report_id.to_string(), user_id.to_string()),
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn organize_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        folder: &str,
        tags: &[String],
    ) -> Result<ReportSummary> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE reports SET folder = ?, tags = ? WHERE id = ? AND user_id = ?",
            (
                folder,
                serde_json::to_string(tags)?,
                report_id.to_string(),
                user_id.to_string(),
            ),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("Report"));
        }

        let mut stmt = conn.prepare(
            "SELECT id, created_at, location, template_key, title, title_he, folder, tags, project_name
             FROM reports WHERE id = ?",
        )?;
        let summary = stmt.query_row([report_id.to_string()], map_report_summary)?;
        Ok(summary)
    }

    pub fn delete_report(&self, user_id: Uuid, report_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM reports WHERE id = ? AND user_id = ?",
            (report_id.to_string(), user_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Recent locations (server-aggregated autocomplete)
    // ============================================================

    pub fn add_location(&self, user_id: Uuid, location: &str) -> Result<()> {
        let location = sanitize_location(location);
        if location.is_empty() {
            return Ok(());
        }
        let mut locations = self.get_locations(user_id)?;
        locations.retain(|l| l.to_lowercase() != location.to_lowercase());
        locations.insert(0, location);
        locations.truncate(MAX_RECENT_LOCATIONS);

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO recent_locations (user_id, locations) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET locations = excluded.locations",
            (user_id.to_string(), serde_json::to_string(&locations)?),
        )?;
        Ok(())
    }

    pub fn get_locations(&self, user_id: Uuid) -> Result<Vec<String>> {
        let raw: Option<String> = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.query_row(
                "SELECT locations FROM recent_locations WHERE user_id = ?",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?
        };
        let Some(json) = raw else {
            return Ok(Vec::new());
        };
        let stored: Vec<String> = serde_json::from_str(&json).unwrap_or_default();

        // Self-healing read: lists written before the sanitize rules
        // existed get cleaned up and persisted on the way out.
        let sanitized: Vec<String> = stored
            .iter()
            .map(|l| sanitize_location(l))
            .filter(|l| !l.is_empty())
            .collect();
        if sanitized != stored {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "UPDATE recent_locations SET locations = ? WHERE user_id = ?",
                (serde_json::to_string(&sanitized)?, user_id.to_string()),
            )?;
        }
        Ok(sanitized)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row mapping helpers
// ============================================================

fn require_session(conn: &Connection, user_id: Uuid) -> Result<()> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
        [user_id.to_string()],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(Error::NoActiveSession);
    }
    Ok(())
}

fn load_session(conn: &Connection, user_id: Uuid) -> Result<Option<SessionSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT created_at, location, template_key, title, title_he, project_name,
                attendees, distribution_list
         FROM sessions WHERE user_id = ?",
    )?;
    let mut rows = stmt.query([user_id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let attendees: Vec<Uuid> =
        serde_json::from_str(&row.get::<_, String>(6)?).unwrap_or_default();
    let distribution_list: Vec<Uuid> =
        serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default();
    let mut snapshot = SessionSnapshot {
        user_id,
        created_at: parse_datetime(row.get::<_, String>(0)?),
        location: row.get(1)?,
        template_key: row.get(2)?,
        title: row.get(3)?,
        title_he: row.get(4)?,
        project_name: row.get(5)?,
        attendees,
        distribution_list,
        items: Vec::new(),
        photos: Vec::new(),
    };
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare(
        "SELECT id, number, description, notes, created_at
         FROM items WHERE user_id = ? ORDER BY number",
    )?;
    snapshot.items = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(Item {
                id: parse_uuid(row.get::<_, String>(0)?),
                number: row.get(1)?,
                description: row.get(2)?,
                notes: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, item_id, file_path, uploaded_at
         FROM photos WHERE user_id = ? ORDER BY uploaded_at",
    )?;
    snapshot.photos = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(Photo {
                id: parse_uuid(row.get::<_, String>(0)?),
                item_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
                file_path: Some(row.get(2)?),
                uploaded_at: parse_datetime(row.get::<_, String>(3)?),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(snapshot))
}

fn query_user(conn: &Connection, filter: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<User>> {
    let sql = format!(
        "SELECT id, phone, email, password_hash, created_at, verified,
                verification_code_hash, verification_expires_at,
                full_name, role_title, phone_contact, company_name
         FROM users {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params)?;
    if let Some(row) = rows.next()? {
        Ok(Some(User {
            id: parse_uuid(row.get::<_, String>(0)?),
            phone: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: parse_datetime(row.get::<_, String>(4)?),
            verified: row.get::<_, i32>(5)? != 0,
            verification_code_hash: row.get(6)?,
            verification_expires_at: row.get::<_, Option<String>>(7)?.map(parse_datetime),
            full_name: row.get(8)?,
            role_title: row.get(9)?,
            phone_contact: row.get(10)?,
            company_name: row.get(11)?,
        }))
    } else {
        Ok(None)
    }
}

fn map_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        company: row.get(3)?,
        role_title: row.get(4)?,
        phone: row.get(5)?,
        created_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn map_report_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportSummary> {
    let tags: Vec<String> = serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default();
    Ok(ReportSummary {
        id: parse_uuid(row.get::<_, String>(0)?),
        created_at: parse_datetime(row.get::<_, String>(1)?),
        location: row.get(2)?,
        template_key: row.get(3)?,
        title: row.get(4)?,
        title_he: row.get(5)?,
        folder: row.get(6)?,
        tags,
        project_name: row.get(8)?,
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Strip the replacement character, bidi marks and other control
/// characters that platform text rendering can smuggle into field
/// values, then trim. Poisoned values would otherwise stick in the
/// autocomplete list as unrenderable entries.
pub fn sanitize_location(value: &str) -> String {
    const BIDI_MARKS: &[char] = &[
        '\u{200E}', '\u{200F}', '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}',
        '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
    ];
    value
        .chars()
        .filter(|c| *c != '\u{FFFD}')
        .filter(|c| !BIDI_MARKS.contains(c))
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
