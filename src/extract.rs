//! Multi-format text and image extraction.
//!
//! [`Extractor::extract`] turns an uploaded file into an [`Extraction`]:
//! plain UTF-8 text plus the images embedded in the file, each as an
//! inline data URI with a short piece of context text.
//!
//! Dispatch is on the file extension only:
//!
//! | Extension | Text | Images |
//! |-----------|------|--------|
//! | `pdf` | PDF text layer | none (not supported) |
//! | `docx` | paragraphs of `word/document.xml` | `word/media/*` |
//! | `pptx`, `ppt` | slide text runs | `ppt/media/*` |
//! | `xlsx`, `xls` | every sheet, tab separated | none |
//! | `html`, `htm` | visible text | every `<img>` (see [`crate::html`]) |
//! | `txt`, `md` | file contents | none |
//!
//! Unknown extensions yield an empty extraction. A parse failure never
//! propagates: it degrades to a placeholder text naming the file, so one
//! bad file cannot abort an upload batch. A parser that panics or runs
//! past [`EXTRACTION_TIMEOUT`] degrades the same way. Only an unreadable
//! file is an error.

use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use calamine::Reader as _;

use crate::html;
use crate::images::{mime_for_path, to_data_uri};

/// Extensions accepted for upload, lower case.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "ppt", "pptx", "docx", "txt", "md", "xlsx", "xls", "html", "htm",
];

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_ZIP_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Longest a blocking parser may run before the file gets a placeholder.
pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Parse failure inside one format handler. [`extract_bytes`] turns these
/// into placeholder text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("spreadsheet extraction failed: {0}")]
    Spreadsheet(String),
}

/// An image pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// `data:<mime>;base64,<data>`
    pub payload: String,
    /// Nearby text used alongside the AI description for retrieval.
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

/// Lower-cased extension of `name` without the dot, or `""`.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// File extractor. Holds the HTTP client used to fetch remote HTML images.
#[derive(Clone)]
pub struct Extractor {
    http: reqwest::Client,
    fetch_remote_images: bool,
}

impl Extractor {
    pub fn new(http: reqwest::Client, fetch_remote_images: bool) -> Self {
        Self {
            http,
            fetch_remote_images,
        }
    }

    /// Extract text and images from the file at `path`.
    ///
    /// `name` is the uploader's filename; its extension picks the format and
    /// it is what placeholder texts refer to.
    pub async fn extract(&self, path: &Path, name: &str) -> Result<Extraction> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read uploaded file: {}", path.display()))?;
        let ext = extension_of(name);

        if ext == "html" || ext == "htm" {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            return Ok(html::extract_html(
                &bytes,
                base_dir,
                &self.http,
                self.fetch_remote_images,
            )
            .await);
        }

        let owned_name = name.to_string();
        Ok(run_guarded(name, EXTRACTION_TIMEOUT, move || {
            extract_bytes(&bytes, &ext, &owned_name)
        })
        .await)
    }
}

/// Run a blocking parser on the blocking pool. A panic or a run longer
/// than `limit` yields the placeholder extraction for `name`.
///
/// A timed-out parser keeps its blocking thread until it returns.
async fn run_guarded<F>(name: &str, limit: Duration, parse: F) -> Extraction
where
    F: FnOnce() -> Extraction + Send + 'static,
{
    let placeholder = || Extraction {
        text: format!("[Error parsing file: {}]", name),
        images: Vec::new(),
    };
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(parse)).await {
        Ok(Ok(extraction)) => extraction,
        Ok(Err(e)) => {
            tracing::error!(file = %name, error = %e, "extraction panicked, using placeholder");
            placeholder()
        }
        Err(_) => {
            tracing::error!(file = %name, timeout_secs = limit.as_secs(), "extraction timed out, using placeholder");
            placeholder()
        }
    }
}

/// Synchronous extraction for every format except HTML.
pub fn extract_bytes(bytes: &[u8], ext: &str, name: &str) -> Extraction {
    match ext {
        "pdf" => Extraction {
            text: degrade(extract_pdf_text(bytes), name),
            images: extract_pdf_images(bytes),
        },
        "docx" => Extraction {
            text: degrade(extract_docx_text(bytes), name),
            images: extract_media(bytes, "word/media/", "Image from DOCX document"),
        },
        "pptx" | "ppt" => Extraction {
            text: match extract_pptx_text(bytes) {
                Ok(text) if text.trim().is_empty() => {
                    format!("[No text content found in PowerPoint: {}]", name)
                }
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "PowerPoint extraction failed");
                    format!("[Error extracting text from PowerPoint: {}]", name)
                }
            },
            images: extract_media(bytes, "ppt/media/", "Slide image from PowerPoint"),
        },
        "xlsx" | "xls" => Extraction {
            text: degrade(extract_spreadsheet_text(bytes), name),
            images: Vec::new(),
        },
        "txt" | "md" => Extraction {
            text: String::from_utf8_lossy(bytes).into_owned(),
            images: Vec::new(),
        },
        other => {
            tracing::debug!(file = %name, extension = %other, "no extractor for extension");
            Extraction::default()
        }
    }
}

fn degrade(result: Result<String, ExtractError>, name: &str) -> String {
    result.unwrap_or_else(|e| {
        tracing::warn!(file = %name, error = %e, "extraction failed, using placeholder");
        format!("[Error parsing file: {}]", name)
    })
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// PDF image extraction is not supported: always empty.
pub fn extract_pdf_images(_bytes: &[u8]) -> Vec<ExtractedImage> {
    Vec::new()
}

fn open_zip(bytes: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes + 1)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 > max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Every file under `prefix` in the archive, as data URIs.
///
/// An unreadable archive or entry just contributes no images.
fn extract_media(bytes: &[u8], prefix: &str, context_label: &str) -> Vec<ExtractedImage> {
    let mut archive = match open_zip(bytes) {
        Ok(a) => a,
        Err(_) => return Vec::new(),
    };
    let names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && !n.ends_with('/'))
        .map(|s| s.to_string())
        .collect();

    let mut images = Vec::new();
    for name in names {
        match read_zip_entry_bounded(&mut archive, &name, MAX_ZIP_ENTRY_BYTES) {
            Ok(data) => {
                let basename = name.rsplit('/').next().unwrap_or(&name);
                images.push(ExtractedImage {
                    payload: to_data_uri(mime_for_path(&name), &data),
                    context: format!("{}: {}", context_label, basename),
                });
            }
            Err(e) => tracing::warn!(entry = %name, error = %e, "skipping media entry"),
        }
    }
    images
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_ZIP_ENTRY_BYTES)?;
    let paragraphs = collect_paragraphs(&xml, b"p")?;
    Ok(paragraphs.join("\n\n"))
}

fn extract_pptx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut slides = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_ZIP_ENTRY_BYTES)?;
        let paragraphs = collect_paragraphs(&xml, b"p")?;
        if !paragraphs.is_empty() {
            slides.push(paragraphs.join("\n"));
        }
    }
    Ok(slides.join("\n\n"))
}

/// Non-empty paragraphs of an OOXML part.
///
/// Text comes from `<t>` runs (`w:t` in Word, `a:t` in slides); a
/// paragraph ends at the closing element whose local name is
/// `paragraph_tag`. Word tabs and breaks become `\t` and `\n`.
fn collect_paragraphs(xml: &[u8], paragraph_tag: &[u8]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                if local.as_ref() == b"t" {
                    in_text = false;
                } else if local.as_ref() == paragraph_tag {
                    let para = std::mem::take(&mut current);
                    if !para.trim().is_empty() {
                        paragraphs.push(para);
                    }
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

fn extract_spreadsheet_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(sheet = %sheet_name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };
        let rows: Vec<String> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(cell_text)
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .filter(|line| !line.trim().is_empty())
            .collect();
        if !rows.is_empty() {
            sheets.push(rows.join("\n"));
        }
    }
    Ok(sheets.join("\n\n"))
}

fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.to_string(),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, data) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    const DOCX_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Refund policy</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Refunds take </w:t></w:r><w:r><w:t>30 days &amp; more.</w:t></w:r></w:p>
    <w:p></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn docx_paragraphs_and_png_media() {
        let bytes = build_zip(&[
            ("word/document.xml", DOCX_XML.as_bytes()),
            ("word/media/image1.png", PNG_BYTES),
        ]);
        let out = extract_bytes(&bytes, "docx", "guide.docx");
        assert_eq!(out.text, "Refund policy\n\nRefunds take 30 days & more.");
        assert_eq!(out.images.len(), 1);
        assert!(out.images[0].payload.starts_with("data:image/png;base64,"));
        assert_eq!(
            out.images[0].context,
            "Image from DOCX document: image1.png"
        );
    }

    #[test]
    fn pptx_slides_in_numeric_order_with_media() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
                text
            )
        };
        let s1 = slide("First slide");
        let s2 = slide("Second slide");
        let s10 = slide("Tenth slide");
        let bytes = build_zip(&[
            ("ppt/slides/slide10.xml", s10.as_bytes()),
            ("ppt/slides/slide2.xml", s2.as_bytes()),
            ("ppt/slides/slide1.xml", s1.as_bytes()),
            ("ppt/media/image3.jpeg", PNG_BYTES),
        ]);
        let out = extract_bytes(&bytes, "pptx", "deck.pptx");
        assert_eq!(out.text, "First slide\n\nSecond slide\n\nTenth slide");
        assert_eq!(out.images.len(), 1);
        assert!(out.images[0].payload.starts_with("data:image/jpeg;base64,"));
        assert_eq!(
            out.images[0].context,
            "Slide image from PowerPoint: image3.jpeg"
        );
    }

    #[test]
    fn malformed_pptx_degrades_to_placeholder() {
        let out = extract_bytes(b"definitely not a zip", "pptx", "broken.pptx");
        assert_eq!(
            out.text,
            "[Error extracting text from PowerPoint: broken.pptx]"
        );
        assert!(out.images.is_empty());
    }

    #[test]
    fn pptx_without_text_gets_placeholder() {
        let bytes = build_zip(&[("ppt/media/image1.png", PNG_BYTES)]);
        let out = extract_bytes(&bytes, "pptx", "pictures.pptx");
        assert_eq!(out.text, "[No text content found in PowerPoint: pictures.pptx]");
        assert_eq!(out.images.len(), 1);
    }

    #[test]
    fn malformed_docx_degrades_to_placeholder() {
        let out = extract_bytes(b"not a zip", "docx", "bad.docx");
        assert_eq!(out.text, "[Error parsing file: bad.docx]");
        assert!(out.images.is_empty());
    }

    #[test]
    fn invalid_pdf_degrades_and_never_yields_images() {
        let out = extract_bytes(b"not a pdf", "pdf", "manual.pdf");
        assert_eq!(out.text, "[Error parsing file: manual.pdf]");
        assert!(out.images.is_empty());
        assert!(extract_pdf_images(b"%PDF-1.4").is_empty());
    }

    #[test]
    fn plain_text_and_markdown() {
        let out = extract_bytes("# Title\nbody".as_bytes(), "md", "readme.md");
        assert_eq!(out.text, "# Title\nbody");
        let out = extract_bytes(&[b'o', b'k', 0xFF], "txt", "notes.txt");
        assert!(out.text.starts_with("ok"));
    }

    #[test]
    fn unsupported_extension_is_empty() {
        let out = extract_bytes(b"binary", "exe", "setup.exe");
        assert_eq!(out, Extraction::default());
    }

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    fn two_sheet_workbook() -> Vec<u8> {
        let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;
        let root_rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Plans" sheetId="1" r:id="rId1"/>
    <sheet name="Notes" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#
        );
        let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;
        let shared = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="{MAIN_NS}" count="5" uniqueCount="5">
  <si><t>Plan</t></si><si><t>Days</t></si><si><t>Refund</t></si><si><t>Fee</t></si><si><t>Ask support first</t></si>
</sst>"#
        );
        // Row 3 is left out, so the range holds one empty row.
        let sheet1 = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="{MAIN_NS}"><sheetData>
  <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
  <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>30</v></c></row>
  <row r="4"><c r="A4" t="s"><v>3</v></c><c r="B4"><v>12.5</v></c></row>
</sheetData></worksheet>"#
        );
        let sheet2 = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="{MAIN_NS}"><sheetData>
  <row r="1"><c r="A1" t="s"><v>4</v></c></row>
</sheetData></worksheet>"#
        );

        build_zip(&[
            ("[Content_Types].xml", content_types.as_bytes()),
            ("_rels/.rels", root_rels.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
            ("xl/sharedStrings.xml", shared.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet1.as_bytes()),
            ("xl/worksheets/sheet2.xml", sheet2.as_bytes()),
        ])
    }

    #[test]
    fn spreadsheet_rows_are_tab_separated_and_sheets_blank_line_joined() {
        let out = extract_bytes(&two_sheet_workbook(), "xlsx", "plans.xlsx");
        assert_eq!(
            out.text,
            "Plan\tDays\nRefund\t30\nFee\t12.5\n\nAsk support first"
        );
        assert!(out.images.is_empty());
    }

    #[tokio::test]
    async fn panicking_parser_degrades_to_placeholder() {
        let out = run_guarded("broken.pdf", Duration::from_secs(5), || {
            panic!("parser bug")
        })
        .await;
        assert_eq!(out.text, "[Error parsing file: broken.pdf]");
        assert!(out.images.is_empty());
    }

    #[tokio::test]
    async fn slow_parser_degrades_to_placeholder() {
        let out = run_guarded("slow.pdf", Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_millis(500));
            Extraction {
                text: "late".into(),
                images: Vec::new(),
            }
        })
        .await;
        assert_eq!(out.text, "[Error parsing file: slow.pdf]");
    }

    #[tokio::test]
    async fn guarded_parser_result_passes_through() {
        let out = run_guarded("ok.txt", Duration::from_secs(5), || Extraction {
            text: "fine".into(),
            images: Vec::new(),
        })
        .await;
        assert_eq!(out.text, "fine");
    }

    #[test]
    fn invalid_spreadsheet_degrades() {
        let out = extract_bytes(b"nope", "xlsx", "sheet.xlsx");
        assert_eq!(out.text, "[Error parsing file: sheet.xlsx]");
    }

    #[test]
    fn oversized_zip_entry_is_rejected() {
        let bytes = build_zip(&[("word/document.xml", &[b'a'; 64][..])]);
        let mut archive = open_zip(&bytes).unwrap();
        let err = read_zip_entry_bounded(&mut archive, "word/document.xml", 16).unwrap_err();
        assert!(err.to_string().contains("exceeds size limit"));
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(extension_of("Guide.PDF"), "pdf");
        assert_eq!(extension_of("noext"), "");
        assert!(is_supported_extension("htm"));
        assert!(!is_supported_extension("exe"));
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let extractor = Extractor::new(reqwest::Client::new(), false);
        let result = extractor
            .extract(Path::new("/nonexistent/dir/file.txt"), "file.txt")
            .await;
        assert!(result.is_err());
    }
}
