//! PDF file parser implementation.

use lopdf::{Dictionary, Document, Object};
use slidecheck_core::{DocumentProperties, Error, Result, SlideRecord, SlideTextNormalizer};
use std::io::Read;

/// Parser for PDF files.
pub struct PdfParser {
    normalizer: SlideTextNormalizer,
}

impl PdfParser {
    /// Create a new PDF parser.
    pub fn new() -> Self {
        Self {
            normalizer: SlideTextNormalizer::new(),
        }
    }

    /// Parse a PDF into one slide record per page.
    ///
    /// A page whose text cannot be extracted yields an empty record rather
    /// than failing the whole document.
    pub fn parse<R: Read>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let document = load_document(reader)?;
        let pages = document.get_pages();

        let mut slides = Vec::with_capacity(pages.len());
        for (position, page_number) in pages.keys().enumerate() {
            let text = match document.extract_text(&[*page_number]) {
                Ok(text) => self.normalizer.normalize(&text),
                Err(e) => {
                    log::warn!("Could not extract text from page {}: {}", page_number, e);
                    String::new()
                }
            };
            slides.push(SlideRecord::new(position as u32 + 1, text));
        }

        log::debug!("PDF: {} pages", slides.len());
        Ok(slides)
    }

    /// Read page count plus title and author from the Info dictionary.
    pub fn read_properties<R: Read>(&self, reader: R) -> Result<DocumentProperties> {
        let document = load_document(reader)?;
        let info = info_dictionary(&document);

        Ok(DocumentProperties {
            slide_count: document.get_pages().len(),
            title: info.and_then(|dict| info_string(dict, b"Title")),
            author: info.and_then(|dict| info_string(dict, b"Author")),
        })
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

fn load_document<R: Read>(mut reader: R) -> Result<Document> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    Document::load_mem(&data)
        .map_err(|e| Error::PdfParseError(format!("Failed to load PDF: {}", e)))
}

/// The trailer's Info dictionary, whether stored inline or by reference.
fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    let object = match info.as_reference() {
        Ok(id) => document.get_object(id).ok()?,
        Err(_) => info,
    };
    object.as_dict().ok()
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    let Ok(Object::String(bytes, _)) = info.get(key) else {
        return None;
    };
    let value = decode_pdf_string(bytes);
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, else UTF-8,
/// else Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
