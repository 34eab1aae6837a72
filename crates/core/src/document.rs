//! Document-side types: slide records, metadata, and the reader capability.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The format of a source slide deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
    /// PDF, one slide per page.
    Pdf,
}

impl DocumentFormat {
    /// Detect format from file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect format from a path's extension, failing for anything outside
    /// `.ppt`, `.pptx` and `.pdf`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "'{}' (expected .ppt, .pptx or .pdf)",
                path.display()
            ))
        })
    }

    /// Detect format from file magic bytes.
    ///
    /// PPTX is reported for any ZIP container; callers decide whether the
    /// archive is really a presentation.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PDF header
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }

    /// Extension including the leading dot, as reported in metadata.
    pub fn dotted_extension(&self) -> &'static str {
        match self {
            Self::Pptx => ".pptx",
            Self::Ppt => ".ppt",
            Self::Pdf => ".pdf",
        }
    }
}

/// A raster image attached to a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage {
    /// MIME type of the payload, e.g. `image/png`.
    pub mime_type: String,
    /// Raw encoded image bytes.
    pub data: Vec<u8>,
}

impl SlideImage {
    /// Create a new image payload.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Guess the MIME type of an embedded media file from its name.
    pub fn mime_for_name(name: &str) -> Option<&'static str> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext.to_lowercase().as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }
}

/// One unit of document content: a slide or a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideRecord {
    /// 1-based slide number.
    pub index: u32,
    /// Normalized slide text.
    pub text: String,
    /// Optional raster image for vision-capable checking.
    pub image: Option<SlideImage>,
}

impl SlideRecord {
    /// Create a text-only slide record.
    pub fn new(index: u32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            image: None,
        }
    }

    /// Attach an image payload.
    pub fn with_image(mut self, image: SlideImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Coarse metadata describing a checked document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name without directory.
    pub file_name: String,
    /// Size on disk in bytes.
    pub file_size: u64,
    /// Lowercase extension with leading dot (`.pptx`, `.ppt`, `.pdf`).
    pub file_type: String,
    /// Number of slides or pages, when the backend could count them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl DocumentMetadata {
    /// Display name used by exports when the file name is empty.
    pub fn display_name(&self) -> &str {
        if self.file_name.is_empty() {
            "Unknown"
        } else {
            &self.file_name
        }
    }
}

/// Properties a backend reads from a document without touching slide content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProperties {
    pub slide_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Capability that turns a file into ordered slide records.
pub trait DocumentReader {
    /// Parse a document into slide records in ascending slide order.
    fn parse(&self, path: &Path) -> Result<Vec<SlideRecord>>;

    /// Read file-level metadata without verifying anything.
    fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PPTX"), Some(DocumentFormat::Pptx));
        assert_eq!(DocumentFormat::from_extension("ppt"), Some(DocumentFormat::Ppt));
        assert_eq!(DocumentFormat::from_extension("pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("key"), None);
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let err = DocumentFormat::from_path(Path::new("lecture.docx")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let err = DocumentFormat::from_path(Path::new("no_extension")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_from_magic() {
        assert_eq!(
            DocumentFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0, 0]),
            Some(DocumentFormat::Pptx)
        );
        assert_eq!(DocumentFormat::from_magic(b"%PDF-1.7"), Some(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(DocumentFormat::Ppt)
        );
        assert_eq!(DocumentFormat::from_magic(b"abc"), None);
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(SlideImage::mime_for_name("image1.PNG"), Some("image/png"));
        assert_eq!(SlideImage::mime_for_name("photo.jpeg"), Some("image/jpeg"));
        assert_eq!(SlideImage::mime_for_name("chart.emf"), None);
        assert_eq!(SlideImage::mime_for_name("noext"), None);
    }
}
