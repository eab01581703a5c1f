//! Local autocomplete history, persisted as a small JSON file per
//! user. Each key holds the most recent values, newest first.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Most entries a key retains; older values fall off the end.
const MAX_ENTRIES: usize = 5;

/// The histories the app keeps. A closed set so a typo cannot create
/// an orphaned bucket in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKey {
    Locations,
    Projects,
    Folders,
    ContactName,
    ContactEmail,
}

impl HistoryKey {
    fn as_str(self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Projects => "projects",
            Self::Folders => "folders",
            Self::ContactName => "contact_names",
            Self::ContactEmail => "contact_emails",
        }
    }
}

/// Normalize a history value: trim, collapse runs of whitespace, and
/// strip control and bidi-mark characters. Idempotent.
pub fn normalize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() && !is_stripped_mark(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_stripped_mark(c: char) -> bool {
    matches!(
        c,
        '\u{fffd}'
            | '\u{200e}'
            | '\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2066}'..='\u{2069}'
    )
}

/// Autocomplete history for one user, backed by a JSON file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    data: HashMap<String, Vec<String>>,
}

impl HistoryStore {
    /// Open the history file at `path`, starting fresh if it is
    /// missing or unreadable. A corrupt file is discarded rather than
    /// wedging the app.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, data }
    }

    /// Open the history scoped to one user under `dir`. Histories are
    /// per user so shared devices do not leak suggestions.
    pub fn open_user_scoped(dir: impl AsRef<Path>, user_id: Uuid) -> Self {
        Self::open(dir.as_ref().join(format!("history_{user_id}.json")))
    }

    /// The per-user history in the platform data directory.
    pub fn default_for_user(user_id: Uuid) -> io::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "fieldreport")
            .ok_or_else(|| io::Error::other("Could not determine data directory"))?;
        std::fs::create_dir_all(dirs.data_dir())?;
        Ok(Self::open_user_scoped(dirs.data_dir(), user_id))
    }

    /// Record a value under a key: normalized, case-insensitively
    /// deduplicated, newest first, capped.
    pub fn add(&mut self, key: HistoryKey, value: &str) -> io::Result<()> {
        let value = normalize(value);
        if value.is_empty() {
            return Ok(());
        }
        let entries = self.data.entry(key.as_str().to_string()).or_default();
        entries.retain(|e| !e.eq_ignore_ascii_case(&value));
        entries.insert(0, value);
        entries.truncate(MAX_ENTRIES);
        self.persist()
    }

    /// Values for a key, newest first. Entries that predate the
    /// current normalization rules are cleaned up on read and the
    /// repaired list is written back.
    pub fn get(&mut self, key: HistoryKey) -> Vec<String> {
        let Some(entries) = self.data.get(key.as_str()) else {
            return Vec::new();
        };

        let mut repaired: Vec<String> = Vec::new();
        for entry in entries {
            let value = normalize(entry);
            if value.is_empty() {
                continue;
            }
            if !repaired.iter().any(|e| e.eq_ignore_ascii_case(&value)) {
                repaired.push(value);
            }
        }
        repaired.truncate(MAX_ENTRIES);

        if &repaired != entries {
            self.data.insert(key.as_str().to_string(), repaired.clone());
            let _ = self.persist();
        }
        repaired
    }

    fn persist(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| io::Error::other(e))?;
        std::fs::write(&self.path, json)
    }
}
