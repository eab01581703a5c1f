//! DOCX writer. A `.docx` file is a zip archive of XML parts; we emit
//! the minimal package WordPad/Word/LibreOffice all accept:
//! content types, the package relationships, the document part and its
//! relationships, plus one media part per embedded photo.

use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::{contact_line, ReportDocument};

/// EMU per pixel-ish default: images are placed at a fixed 4.5in x
/// 3.375in frame (914400 EMU per inch) rather than decoded for size.
const IMG_CX: i64 = 4_114_800;
const IMG_CY: i64 = 3_086_100;

struct MediaPart {
    name: String,
    rel_id: String,
    content_type: &'static str,
    bytes: Vec<u8>,
}

pub fn generate_docx(doc: &ReportDocument<'_>) -> Result<Vec<u8>> {
    let mut media: Vec<MediaPart> = Vec::new();
    let body = build_body(doc, &mut media)?;

    let cursor = Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(cursor);
    let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(&media).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(PACKAGE_RELS.as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml(&body).as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(document_rels(&media).as_bytes())?;

    for part in &media {
        zip.start_file(format!("word/{}", part.name), options)?;
        zip.write_all(&part.bytes)?;
    }

    let cursor = zip.finish().context("Failed to finish docx archive")?;
    Ok(cursor.into_inner())
}

fn build_body(doc: &ReportDocument<'_>, media: &mut Vec<MediaPart>) -> Result<String> {
    let snapshot = doc.snapshot;
    let mut body = String::new();

    if let Some(logo) = doc.logo {
        // Uploads carry no reliable extension; go by the magic bytes.
        let ext = if logo.starts_with(b"\x89PNG") { "png" } else { "jpg" };
        if let Some(part) = add_media(media, logo, ext) {
            body.push_str(&image_paragraph(&part));
        }
    }

    body.push_str(&heading(&snapshot.title, 32));
    if !snapshot.title_he.is_empty() && snapshot.title_he != snapshot.title {
        body.push_str(&heading(&snapshot.title_he, 28));
    }

    body.push_str(&labeled_line("Location", &snapshot.location));
    body.push_str(&labeled_line(
        "Date",
        &snapshot.created_at.format("%Y-%m-%d").to_string(),
    ));
    if let Some(project) = snapshot.project_name.as_deref().filter(|p| !p.is_empty()) {
        body.push_str(&labeled_line("Project", project));
    }
    if let Some(author) = doc.author {
        if let Some(name) = author.full_name.as_deref().filter(|n| !n.is_empty()) {
            let mut byline = name.to_string();
            if let Some(role) = author.role_title.as_deref().filter(|r| !r.is_empty()) {
                byline.push_str(", ");
                byline.push_str(role);
            }
            if let Some(company) = author.company_name.as_deref().filter(|c| !c.is_empty()) {
                byline.push_str(", ");
                byline.push_str(company);
            }
            body.push_str(&labeled_line("Prepared by", &byline));
        }
    }

    if !doc.attendees.is_empty() {
        body.push_str(&heading("Attendees", 24));
        for contact in doc.attendees {
            body.push_str(&plain_paragraph(&contact_line(contact)));
        }
    }

    if !snapshot.items.is_empty() {
        body.push_str(&heading("Findings", 24));
    }
    for item in &snapshot.items {
        let head = if item.description.is_empty() {
            format!("{}.", item.number)
        } else {
            format!("{}. {}", item.number, item.description)
        };
        body.push_str(&bold_paragraph(&head));
        if !item.notes.is_empty() {
            body.push_str(&plain_paragraph(&item.notes));
        }
        for photo in snapshot.photos_for_item(item.id) {
            let Some(path) = photo.file_path.as_deref() else {
                continue;
            };
            match std::fs::read(path) {
                Ok(bytes) => {
                    let ext = Path::new(path)
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("jpg");
                    if let Some(part) = add_media(media, &bytes, ext) {
                        body.push_str(&image_paragraph(&part));
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable photo {}: {}", path, e);
                }
            }
        }
    }

    // Photos left unattached (their item was deleted) still go in.
    let unattached: Vec<_> = snapshot
        .photos
        .iter()
        .filter(|p| p.item_id.is_none())
        .collect();
    if !unattached.is_empty() {
        body.push_str(&heading("Additional photos", 24));
        for photo in unattached {
            let Some(path) = photo.file_path.as_deref() else {
                continue;
            };
            if let Ok(bytes) = std::fs::read(path) {
                let ext = Path::new(path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("jpg");
                if let Some(part) = add_media(media, &bytes, ext) {
                    body.push_str(&image_paragraph(&part));
                }
            }
        }
    }

    if !doc.distribution.is_empty() {
        body.push_str(&heading("Distribution", 24));
        for contact in doc.distribution {
            body.push_str(&plain_paragraph(&contact_line(contact)));
        }
    }

    Ok(body)
}

fn add_media<'a>(media: &'a mut Vec<MediaPart>, bytes: &[u8], ext: &str) -> Option<&'a MediaPart> {
    let (ext, content_type) = match ext.to_ascii_lowercase().as_str() {
        "png" => ("png", "image/png"),
        "jpg" | "jpeg" => ("jpeg", "image/jpeg"),
        other => {
            tracing::warn!("Unsupported image extension for embedding: {}", other);
            return None;
        }
    };
    let index = media.len() + 1;
    media.push(MediaPart {
        name: format!("media/image{}.{}", index, ext),
        rel_id: format!("rIdImg{}", index),
        content_type,
        bytes: bytes.to_vec(),
    });
    media.last()
}

fn heading(text: &str, half_points: u32) -> String {
    format!(
        "<w:p><w:pPr><w:spacing w:after=\"120\"/></w:pPr>\
         <w:r><w:rPr><w:b/><w:sz w:val=\"{half_points}\"/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape_xml(text)
    )
}

fn labeled_line(label: &str, value: &str) -> String {
    format!(
        "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">{}: </w:t></w:r>\
         <w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape_xml(label),
        escape_xml(value)
    )
}

fn plain_paragraph(text: &str) -> String {
    format!(
        "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape_xml(text)
    )
}

fn bold_paragraph(text: &str) -> String {
    format!(
        "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape_xml(text)
    )
}

fn image_paragraph(part: &MediaPart) -> String {
    format!(
        "<w:p><w:r><w:drawing>\
         <wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{id}\" name=\"{name}\"/>\
         <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
         <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rel}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline>\
         </w:drawing></w:r></w:p>",
        cx = IMG_CX,
        cy = IMG_CY,
        id = part.rel_id.trim_start_matches("rIdImg"),
        name = part.name,
        rel = part.rel_id,
    )
}

fn document_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document \
         xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\">\
         <w:body>{body}<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/></w:sectPr></w:body>\
         </w:document>"
    )
}

fn content_types(media: &[MediaPart]) -> String {
    let mut defaults = String::from(
        "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    );
    if media.iter().any(|m| m.content_type == "image/png") {
        defaults.push_str("<Default Extension=\"png\" ContentType=\"image/png\"/>");
    }
    if media.iter().any(|m| m.content_type == "image/jpeg") {
        defaults.push_str("<Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>");
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         {defaults}\
         <Override PartName=\"/word/document.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
         </Types>"
    )
}

const PACKAGE_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" \
Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
Target=\"word/document.xml\"/>\
</Relationships>";

fn document_rels(media: &[MediaPart]) -> String {
    let mut rels = String::new();
    for part in media {
        rels.push_str(&format!(
            "<Relationship Id=\"{}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" \
             Target=\"{}\"/>",
            part.rel_id, part.name
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{rels}</Relationships>"
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
