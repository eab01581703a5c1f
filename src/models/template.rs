use serde::Serialize;

/// A report template: a document layout key plus its localized titles.
///
/// The table is fixed at compile time. Unknown keys fall back to the
/// first entry rather than failing, so stale clients keep working.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub title_he: &'static str,
}

pub const TEMPLATES: &[ReportTemplate] = &[
    ReportTemplate {
        key: "INSPECTION_REPORT",
        title: "Inspection Report",
        title_he: "דוח פיקוח",
    },
    ReportTemplate {
        key: "VISIT_SUMMARY",
        title: "Visit Summary",
        title_he: "סיכום ביקור",
    },
    ReportTemplate {
        key: "HOME_ORGANIZER_REPORT",
        title: "Home Organizer Report",
        title_he: "דוח סידור בית",
    },
    ReportTemplate {
        key: "QUOTE",
        title: "Quote",
        title_he: "הצעת מחיר",
    },
];

pub fn get_template(key: &str) -> &'static ReportTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.key == key)
        .unwrap_or(&TEMPLATES[0])
}
