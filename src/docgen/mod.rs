//! Assembly of the finalized document from a session snapshot.
//!
//! The primary artifact is a real OOXML package (`docx.rs`) written
//! with the `zip` crate; `pdf.rs` produces a plain-text PDF fallback
//! for the `finalize_pdf` route.

mod docx;
mod pdf;

pub use docx::generate_docx;
pub use pdf::generate_pdf;

use crate::models::{Contact, Profile, SessionSnapshot};

/// Everything document generation needs, resolved by the handler:
/// the final snapshot, contact ids resolved to records, the author's
/// profile for the header, and an optional logo upload.
#[derive(Debug)]
pub struct ReportDocument<'a> {
    pub snapshot: &'a SessionSnapshot,
    pub attendees: &'a [Contact],
    pub distribution: &'a [Contact],
    pub author: Option<&'a Profile>,
    pub logo: Option<&'a [u8]>,
}

pub fn docx_file_name(snapshot: &SessionSnapshot) -> String {
    format!("report_{}.docx", snapshot.created_at.format("%Y%m%d_%H%M%S"))
}

pub fn pdf_file_name(snapshot: &SessionSnapshot) -> String {
    format!("report_{}.pdf", snapshot.created_at.format("%Y%m%d_%H%M%S"))
}

fn contact_line(contact: &Contact) -> String {
    let mut line = contact.name.clone();
    if let Some(company) = contact.company.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(" – ");
        line.push_str(company);
    }
    if !contact.email.is_empty() {
        line.push_str(" <");
        line.push_str(&contact.email);
        line.push('>');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn contact(name: &str, email: &str, company: Option<&str>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            company: company.map(String::from),
            role_title: None,
            phone: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn contact_line_includes_company_and_email() {
        let c = contact("Dana Levi", "dana@acme.co", Some("Acme"));
        assert_eq!(contact_line(&c), "Dana Levi – Acme <dana@acme.co>");
    }

    #[test]
    fn contact_line_without_extras() {
        let c = contact("Dana Levi", "", None);
        assert_eq!(contact_line(&c), "Dana Levi");
    }
}
