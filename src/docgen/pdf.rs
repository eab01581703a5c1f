//! Minimal PDF writer for the `finalize_pdf` route.
//!
//! Emits a PDF 1.4 file with Helvetica text and a correct xref table.
//! Characters outside the standard encoding are replaced; the DOCX is
//! the primary artifact and keeps the original text.

use anyhow::Result;

use super::{contact_line, ReportDocument};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const LEADING: f32 = 14.0;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2.0 * MARGIN) / LEADING) as usize;

pub fn generate_pdf(doc: &ReportDocument<'_>) -> Result<Vec<u8>> {
    let lines = layout_lines(doc);
    let pages: Vec<&[String]> = lines.chunks(LINES_PER_PAGE.max(1)).collect();
    let pages = if pages.is_empty() {
        vec![&[] as &[String]]
    } else {
        pages
    };
    Ok(assemble(&pages))
}

fn layout_lines(doc: &ReportDocument<'_>) -> Vec<String> {
    let snapshot = doc.snapshot;
    let mut lines = Vec::new();
    lines.push(snapshot.title.clone());
    lines.push(String::new());
    lines.push(format!("Location: {}", snapshot.location));
    lines.push(format!(
        "Date: {}",
        snapshot.created_at.format("%Y-%m-%d")
    ));
    if let Some(project) = snapshot.project_name.as_deref().filter(|p| !p.is_empty()) {
        lines.push(format!("Project: {project}"));
    }
    if !doc.attendees.is_empty() {
        lines.push(String::new());
        lines.push("Attendees:".to_string());
        for contact in doc.attendees {
            lines.push(format!("  {}", contact_line(contact)));
        }
    }
    if !snapshot.items.is_empty() {
        lines.push(String::new());
        lines.push("Findings:".to_string());
    }
    for item in &snapshot.items {
        lines.push(format!("{}. {}", item.number, item.description));
        if !item.notes.is_empty() {
            lines.push(format!("   {}", item.notes));
        }
        let photo_count = snapshot.photos_for_item(item.id).len();
        if photo_count > 0 {
            lines.push(format!("   [{photo_count} photo(s) attached]"));
        }
    }
    if !doc.distribution.is_empty() {
        lines.push(String::new());
        lines.push("Distribution:".to_string());
        for contact in doc.distribution {
            lines.push(format!("  {}", contact_line(contact)));
        }
    }
    lines
}

/// Object layout: 1 catalog, 2 pages, 3 font, then (page, content)
/// pairs. Offsets are tracked while writing so the xref is exact.
fn assemble(pages: &[&[String]]) -> Vec<u8> {
    let total_objects = 3 + pages.len() * 2;
    let mut bodies: Vec<Vec<u8>> = Vec::with_capacity(total_objects);

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + i * 2))
        .collect();
    bodies.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    bodies.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .into_bytes(),
    );
    bodies.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());

    for (i, page_lines) in pages.iter().enumerate() {
        let content_id = 5 + i * 2;
        bodies.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        );

        let mut stream = String::new();
        stream.push_str(&format!(
            "BT /F1 11 Tf {MARGIN} {} Td {LEADING} TL\n",
            PAGE_HEIGHT - MARGIN
        ));
        for line in page_lines.iter() {
            stream.push_str(&format!("({}) Tj T*\n", escape_pdf(line)));
        }
        stream.push_str("ET");
        bodies.push(
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream).into_bytes(),
        );
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", bodies.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            bodies.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn escape_pdf(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionSnapshot;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            location: "Site (A)".to_string(),
            template_key: "INSPECTION_REPORT".to_string(),
            title: "Inspection Report".to_string(),
            title_he: String::new(),
            project_name: None,
            attendees: Vec::new(),
            distribution_list: Vec::new(),
            items: Vec::new(),
            photos: Vec::new(),
        }
    }

    #[test]
    fn pdf_has_magic_and_trailer() {
        let snapshot = snapshot();
        let doc = ReportDocument {
            snapshot: &snapshot,
            attendees: &[],
            distribution: &[],
            author: None,
            logo: None,
        };
        let bytes = generate_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn parentheses_are_escaped_in_text() {
        let snapshot = snapshot();
        let doc = ReportDocument {
            snapshot: &snapshot,
            attendees: &[],
            distribution: &[],
            author: None,
            logo: None,
        };
        let bytes = generate_pdf(&doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Site \\(A\\)"));
    }
}
