//! Multi-format document loading (plain text, PDF, DOCX).
//!
//! Given a file path, returns the document's plain text. Plain text is
//! read leniently (invalid UTF-8 bytes are replaced, never fatal). PDF
//! text comes from `pdf-extract`; DOCX text is pulled from the `w:t`
//! runs inside `word/document.xml`, grouped into paragraphs. Unsupported
//! extensions produce empty text and are reported as skipped, never as
//! errors — a parse failure on a supported format is an error the caller
//! is expected to recover from per file.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Decompressed size cap for `word/document.xml` (zip-bomb protection).
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Load a document's plain text, dispatching on its lowercase extension.
///
/// Returns `Ok("")` for unsupported file types (after printing a skip
/// notice). Returns an error only when a supported format fails to parse.
pub fn load_document(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => load_text(path),
        "pdf" => load_pdf(path),
        "docx" => load_docx(path),
        _ => {
            println!(
                "Skipping unsupported file type: {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string())
            );
            Ok(String::new())
        }
    }
}

/// Read a text file, replacing invalid UTF-8 bytes rather than failing.
fn load_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read text file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn load_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read pdf file: {}", path.display()))?;
    pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| anyhow!("PDF extraction failed for {}: {}", path.display(), e))
}

/// Extract DOCX paragraph text in document order, skipping empty paragraphs.
fn load_docx(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read docx file: {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| anyhow!("DOCX open failed for {}: {}", path.display(), e))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| anyhow!("DOCX missing word/document.xml ({}): {}", path.display(), e))?;
        entry
            .take(MAX_DOCX_XML_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| anyhow!("DOCX read failed for {}: {}", path.display(), e))?;
        if doc_xml.len() as u64 >= MAX_DOCX_XML_BYTES {
            return Err(anyhow!(
                "word/document.xml exceeds size limit in {}",
                path.display()
            ));
        }
    }

    extract_paragraphs(&doc_xml)
}

/// Walk the document XML collecting `w:t` text runs, one paragraph per
/// `w:p` element. Empty paragraphs contribute nothing.
fn extract_paragraphs(xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(anyhow!("DOCX XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unsupported_extension_yields_empty_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("archive.tar.gz");
        std::fs::write(&path, b"binary junk").unwrap();
        assert_eq!(load_document(&path).unwrap(), "");
    }

    #[test]
    fn test_text_file_read_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "plain text body").unwrap();
        assert_eq!(load_document(&path).unwrap(), "plain text body");
    }

    #[test]
    fn test_invalid_utf8_replaced_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xe9 au lait").unwrap();
        let text = load_document(&path).unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_extension_case_insensitive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("README.TXT");
        std::fs::write(&path, "upper case extension").unwrap();
        assert_eq!(load_document(&path).unwrap(), "upper case extension");
    }

    #[test]
    fn test_corrupt_pdf_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        assert!(load_document(&path).is_err());
    }

    #[test]
    fn test_corrupt_docx_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(load_document(&path).is_err());
    }

    #[test]
    fn test_docx_paragraph_extraction() {
        let xml = br#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
                <w:p></w:p>
                <w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("doc.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(xml).unwrap();
        writer.finish().unwrap();

        let text = load_document(&path).unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.");
    }
}
