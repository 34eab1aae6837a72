//! File-backed [`DocumentReader`] that dispatches to the format backends.

use slidecheck_core::{
    DocumentFormat, DocumentMetadata, DocumentProperties, DocumentReader, Error, Result,
    SlideRecord,
};
use slidecheck_pdf::PdfParser;
use slidecheck_ppt::PptParser;
use slidecheck_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reads `.pptx`, `.ppt` and `.pdf` files from disk.
pub struct FileDocumentReader {
    pptx: PptxParser,
    ppt: PptParser,
    pdf: PdfParser,
}

impl FileDocumentReader {
    pub fn new() -> Self {
        Self {
            pptx: PptxParser::new(),
            ppt: PptParser::new(),
            pdf: PdfParser::new(),
        }
    }

    /// Attach embedded pictures to PPTX slide records.
    pub fn with_images(mut self, include: bool) -> Self {
        self.pptx = self.pptx.with_images(include);
        self
    }

    /// Resolve the format from the extension and reject files whose content
    /// says otherwise.
    pub fn detect_format(&self, path: &Path) -> Result<DocumentFormat> {
        let format = DocumentFormat::from_path(path)?;

        let mut header = [0u8; 8];
        let mut file = open(path)?;
        let read = file.read(&mut header)?;

        if let Some(actual) = DocumentFormat::from_magic(&header[..read]) {
            if actual != format {
                return Err(Error::CorruptedFile(format!(
                    "{} has a {} extension but {} content",
                    path.display(),
                    format.dotted_extension(),
                    actual.dotted_extension()
                )));
            }
        }

        Ok(format)
    }

    fn read_properties(&self, path: &Path, format: DocumentFormat) -> Result<DocumentProperties> {
        let reader = BufReader::new(open(path)?);
        match format {
            DocumentFormat::Pptx => self.pptx.read_properties(reader),
            DocumentFormat::Ppt => self.ppt.read_properties(reader),
            DocumentFormat::Pdf => self.pdf.read_properties(reader),
        }
    }
}

impl Default for FileDocumentReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReader for FileDocumentReader {
    fn parse(&self, path: &Path) -> Result<Vec<SlideRecord>> {
        let format = self.detect_format(path)?;
        log::debug!("Parsing {} as {:?}", path.display(), format);

        let reader = BufReader::new(open(path)?);
        match format {
            DocumentFormat::Pptx => self.pptx.parse(reader),
            DocumentFormat::Ppt => self.ppt.parse(reader),
            DocumentFormat::Pdf => self.pdf.parse(reader),
        }
    }

    /// File name, size and type always; count, title and author when the
    /// backend can read them.
    fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata> {
        let format = self.detect_format(path)?;
        let file_size = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut metadata = DocumentMetadata {
            file_name,
            file_size,
            file_type: format.dotted_extension().to_string(),
            slide_count: None,
            title: None,
            author: None,
        };

        match self.read_properties(path, format) {
            Ok(props) => {
                metadata.slide_count = Some(props.slide_count);
                metadata.title = props.title;
                metadata.author = props.author;
            }
            Err(e) => log::warn!("Could not read properties of {}: {}", path.display(), e),
        }

        Ok(metadata)
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
