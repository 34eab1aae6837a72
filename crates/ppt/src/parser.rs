//! PPT file parser implementation.
//!
//! Walks the record tree of the `PowerPoint Document` stream inside the
//! OLE/CFB container. Slide text is taken from the slide list (one
//! `SlidePersistAtom` per slide, followed by that slide's text atoms). Files
//! whose slide list carries no text fall back to the text boxes stored in each
//! `Slide` container. Master and notes text is ignored.

use cfb::CompoundFile;
use slidecheck_core::{DocumentProperties, Error, Result, SlideRecord, SlideTextNormalizer};
use std::io::{Read, Seek};

const POWERPOINT_STREAM: &str = "/PowerPoint Document";

/// Minimum size of a usable PowerPoint Document stream (bytes).
const MIN_STREAM_SIZE: usize = 512;

/// Malformed record count above which the stream is treated as corrupt.
const MAX_MALFORMED_RECORDS: usize = 10;

/// Record type constants for the PPT binary format.
mod record_types {
    pub const RT_DOCUMENT: u16 = 0x03E8;
    pub const RT_SLIDE: u16 = 0x03EE;
    pub const RT_NOTES: u16 = 0x03F0;
    pub const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const RT_MAIN_MASTER: u16 = 0x03F8;
    pub const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;
    pub const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
}

/// Slide list instance holding the presentation slides (1 = masters, 2 = notes).
const SLIDE_LIST_INSTANCE_SLIDES: u16 = 0;

/// Placeholder text PowerPoint stores in layouts and masters.
const TEMPLATE_PATTERNS: [&str; 7] = [
    "click to edit",
    "edit master",
    "master title",
    "master text",
    "second level",
    "third level",
    "fourth level",
];

/// Text types from RT_TextHeaderAtom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextType {
    Title,
    Body,
    Notes,
    NotUsed,
    Other,
    CenterTitle,
}

impl TextType {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => TextType::Title,
            2 => TextType::Notes,
            3 => TextType::NotUsed,
            6 => TextType::CenterTitle,
            1 | 5 | 7 | 8 => TextType::Body,
            _ => TextType::Other,
        }
    }

    fn is_title(&self) -> bool {
        matches!(self, TextType::Title | TextType::CenterTitle)
    }

    /// Whether this text type belongs on the slide itself.
    fn is_slide_content(&self) -> bool {
        !matches!(self, TextType::Notes | TextType::NotUsed)
    }
}

/// Text collected for one slide.
#[derive(Debug, Default)]
struct SlideSlot {
    titles: Vec<String>,
    body: Vec<String>,
}

impl SlideSlot {
    fn push(&mut self, text: String, text_type: TextType) {
        if text_type.is_title() {
            self.titles.push(text);
        } else {
            self.body.push(text);
        }
    }

    fn has_text(&self) -> bool {
        !self.titles.is_empty() || !self.body.is_empty()
    }

    /// Titles first, then body text, each in stream order.
    fn into_fragments(self) -> Vec<String> {
        self.titles.into_iter().chain(self.body).collect()
    }
}

/// Where the walker currently is in the record tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Other,
    SlideList,
    Slide,
    Ignored,
}

#[derive(Debug, Default)]
struct WalkState {
    list_slots: Vec<SlideSlot>,
    drawing_slots: Vec<SlideSlot>,
    text_type: Option<TextType>,
    has_document: bool,
    malformed_records: usize,
}

/// Parser for legacy PPT (OLE/CFB) files.
pub struct PptParser {
    normalizer: SlideTextNormalizer,
}

impl PptParser {
    /// Create a new PPT parser.
    pub fn new() -> Self {
        Self {
            normalizer: SlideTextNormalizer::new(),
        }
    }

    /// Parse a PPT file into slide records in slide order.
    ///
    /// Legacy files carry no embedded picture extraction; records are text-only.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let stream_data = self.read_powerpoint_stream(reader)?;
        let state = self.walk_stream(&stream_data)?;

        let use_list = state.list_slots.iter().any(SlideSlot::has_text);
        let slots = if use_list {
            state.list_slots
        } else {
            state.drawing_slots
        };

        log::debug!(
            "PPT: {} slides from {} (stream {} bytes, {} malformed records)",
            slots.len(),
            if use_list { "slide list" } else { "slide drawings" },
            stream_data.len(),
            state.malformed_records
        );

        let slides: Vec<SlideRecord> = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                let text = self.normalizer.join_fragments(&slot.into_fragments());
                SlideRecord::new(i as u32 + 1, text)
            })
            .collect();

        if slides.iter().all(|s| s.text.is_empty()) {
            log::warn!("No slide text found; the presentation may contain only graphics");
        }

        Ok(slides)
    }

    /// Count slides. Legacy property sets are not read, so title and author are absent.
    pub fn read_properties<R: Read + Seek>(&self, reader: R) -> Result<DocumentProperties> {
        Ok(DocumentProperties {
            slide_count: self.parse(reader)?.len(),
            title: None,
            author: None,
        })
    }

    /// Read the PowerPoint Document stream from the CFB container.
    fn read_powerpoint_stream<R: Read + Seek>(&self, reader: R) -> Result<Vec<u8>> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        if !cfb.is_stream(POWERPOINT_STREAM) {
            return Err(Error::PptParseError(
                "Missing 'PowerPoint Document' stream. This may be a different Office format."
                    .to_string(),
            ));
        }

        let mut stream = cfb.open_stream(POWERPOINT_STREAM).map_err(|e| {
            Error::CfbError(format!("Failed to open PowerPoint Document stream: {}", e))
        })?;

        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .map_err(|e| Error::CfbError(format!("Failed to read stream: {}", e)))?;

        Ok(data)
    }

    /// Validate the stream and collect slide text.
    fn walk_stream(&self, data: &[u8]) -> Result<WalkState> {
        if data.len() < MIN_STREAM_SIZE {
            return Err(Error::CorruptedFile(format!(
                "PowerPoint Document stream too small ({} bytes, expected at least {})",
                data.len(),
                MIN_STREAM_SIZE
            )));
        }

        let mut state = WalkState::default();
        self.walk_records(data, 0, data.len(), Scope::Other, &mut state);

        if !state.has_document {
            return Err(Error::PptParseError(
                "No Document record found; the file may predate PowerPoint 97 or be corrupted"
                    .to_string(),
            ));
        }
        if state.malformed_records > MAX_MALFORMED_RECORDS {
            return Err(Error::CorruptedFile(format!(
                "Too many malformed records ({})",
                state.malformed_records
            )));
        }

        Ok(state)
    }

    /// Recursively walk records, handling container nesting.
    fn walk_records(&self, data: &[u8], start: usize, end: usize, scope: Scope, state: &mut WalkState) {
        let mut pos = start;

        while pos + 8 <= end {
            // 8-byte header: recVer (4 bits) + recInstance (12 bits), recType, recLen
            let rec_ver_instance = read_u16_le(data, pos);
            let rec_type = read_u16_le(data, pos + 2);
            let rec_len = read_u32_le(data, pos + 4) as usize;

            let rec_ver = rec_ver_instance & 0x0F;
            let rec_instance = rec_ver_instance >> 4;
            let content_start = pos + 8;
            let content_end = content_start.saturating_add(rec_len);

            if content_end > end {
                state.malformed_records += 1;
                break;
            }

            let child_scope = match rec_type {
                record_types::RT_DOCUMENT => {
                    state.has_document = true;
                    scope
                }
                record_types::RT_SLIDE_LIST_WITH_TEXT => {
                    if rec_instance == SLIDE_LIST_INSTANCE_SLIDES {
                        Scope::SlideList
                    } else {
                        Scope::Ignored
                    }
                }
                record_types::RT_SLIDE => {
                    state.drawing_slots.push(SlideSlot::default());
                    state.text_type = None;
                    Scope::Slide
                }
                record_types::RT_MAIN_MASTER | record_types::RT_NOTES => Scope::Ignored,
                record_types::RT_SLIDE_PERSIST_ATOM if scope == Scope::SlideList => {
                    state.list_slots.push(SlideSlot::default());
                    state.text_type = None;
                    scope
                }
                record_types::RT_TEXT_HEADER_ATOM => {
                    if rec_len >= 4 {
                        state.text_type = Some(TextType::from_u32(read_u32_le(data, content_start)));
                    }
                    scope
                }
                record_types::RT_TEXT_CHARS_ATOM | record_types::RT_TEXT_BYTES_ATOM => {
                    let content = &data[content_start..content_end];
                    let text = if rec_type == record_types::RT_TEXT_CHARS_ATOM {
                        decode_utf16_text(content)
                    } else {
                        decode_ansi_text(content)
                    };
                    self.collect_text(text, scope, state);
                    scope
                }
                _ => scope,
            };

            if rec_ver == 0x0F {
                self.walk_records(data, content_start, content_end, child_scope, state);
            }

            pos = content_end;
        }
    }

    fn collect_text(&self, text: Option<String>, scope: Scope, state: &mut WalkState) {
        let Some(text) = text else {
            return;
        };
        let text_type = state.text_type.unwrap_or(TextType::Body);
        if !is_valid_slide_text(&text, text_type) {
            return;
        }

        let slot = match scope {
            Scope::SlideList => state.list_slots.last_mut(),
            Scope::Slide => state.drawing_slots.last_mut(),
            Scope::Other | Scope::Ignored => None,
        };
        if let Some(slot) = slot {
            slot.push(text, text_type);
        }
    }
}

impl Default for PptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if text is slide content rather than a template placeholder or bullet.
fn is_valid_slide_text(text: &str, text_type: TextType) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || !text_type.is_slide_content() {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if TEMPLATE_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return false;
    }

    let mut chars = trimmed.chars();
    !matches!((chars.next(), chars.next()), (Some(c), None) if !c.is_alphanumeric())
}

/// Decode UTF-16LE text, stopping at a NUL terminator.
fn decode_utf16_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return None;
    }

    let units = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]));
    let text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .take_while(|&c| c != '\0')
        .collect();

    (!text.is_empty()).then_some(text)
}

/// Windows-1252 code points for bytes 0x80..=0x9F (undefined bytes map to U+FFFD).
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '•', '–', '—', '˜',
    '™', 'š', '›', 'œ', '\u{FFFD}', 'ž', 'Ÿ',
];

/// Decode 8-bit text (Windows-1252), stopping at a NUL terminator.
fn decode_ansi_text(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text: String = bytes[..end]
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => b as char,
        })
        .collect();

    (!text.trim().is_empty()).then_some(text)
}

/// Read a little-endian u16 from a byte slice.
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Read a little-endian u32 from a byte slice.
fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
