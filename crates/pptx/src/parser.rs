//! PPTX file parser implementation.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slidecheck_core::{
    DocumentProperties, Error, Result, SlideImage, SlideRecord, SlideTextNormalizer,
};
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
const CORE_PROPERTIES_PATH: &str = "docProps/core.xml";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser {
    normalizer: SlideTextNormalizer,
    include_images: bool,
}

impl PptxParser {
    /// Create a new PPTX parser that also extracts slide images.
    pub fn new() -> Self {
        Self {
            normalizer: SlideTextNormalizer::new(),
            include_images: true,
        }
    }

    /// Set whether the first embedded picture of each slide is attached.
    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Parse a PPTX file into slide records in presentation order.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let mut archive = open_archive(reader)?;
        let slide_paths = self.get_slide_order(&mut archive)?;

        let mut slides = Vec::with_capacity(slide_paths.len());
        for (idx, slide_path) in slide_paths.iter().enumerate() {
            slides.push(self.parse_slide(&mut archive, slide_path, idx as u32 + 1)?);
        }

        log::debug!(
            "PPTX: {} slides, {} with images",
            slides.len(),
            slides.iter().filter(|s| s.image.is_some()).count()
        );

        Ok(slides)
    }

    /// Read slide count plus title and author from the package properties.
    pub fn read_properties<R: Read + Seek>(&self, reader: R) -> Result<DocumentProperties> {
        let mut archive = open_archive(reader)?;
        let slide_count = self.get_slide_order(&mut archive)?.len();

        let (title, author) = match read_optional_text(&mut archive, CORE_PROPERTIES_PATH)? {
            Some(xml) => parse_core_properties(&xml)?,
            None => (None, None),
        };

        Ok(DocumentProperties {
            slide_count,
            title,
            author,
        })
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The order comes from the slide id list in `presentation.xml`. Packages
    /// without one fall back to the number in each slide's file name.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = read_optional_text(archive, PRESENTATION_RELS_PATH)?.ok_or_else(|| {
            Error::PptxParseError(format!(
                "'{}' is missing; the archive is not a presentation",
                PRESENTATION_RELS_PATH
            ))
        })?;

        let slide_targets: HashMap<String, String> = parse_relationships(&rels_content)?
            .into_iter()
            .filter(|rel| rel.rel_type.ends_with("/slide"))
            .map(|rel| (rel.id, resolve_target("ppt", &rel.target)))
            .collect();

        let listed = match read_optional_text(archive, PRESENTATION_PATH)? {
            Some(xml) => parse_slide_id_list(&xml)?,
            None => Vec::new(),
        };

        let ordered: Vec<String> = listed
            .iter()
            .filter_map(|rel_id| slide_targets.get(rel_id).cloned())
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_targets
            .into_values()
            .map(|path| {
                let number = extract_slide_number(&path);
                (path, number)
            })
            .collect();
        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        index: u32,
    ) -> Result<SlideRecord> {
        let content = read_optional_text(archive, slide_path)?.ok_or_else(|| {
            Error::PptxParseError(format!("slide part '{}' is missing", slide_path))
        })?;

        let fragments = extract_text_fragments(&content)?;
        let mut slide = SlideRecord::new(index, self.normalizer.join_fragments(&fragments));

        if self.include_images {
            if let Some(image) = self.first_image(archive, slide_path)? {
                slide = slide.with_image(image);
            }
        }

        Ok(slide)
    }

    /// Find the first embedded raster picture referenced by a slide.
    fn first_image<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Result<Option<SlideImage>> {
        let (dir, file) = slide_path.rsplit_once('/').unwrap_or(("", slide_path));
        let rels_path = format!("{}/_rels/{}.rels", dir, file);

        let Some(rels_content) = read_optional_text(archive, &rels_path)? else {
            return Ok(None);
        };

        for rel in parse_relationships(&rels_content)? {
            if !rel.rel_type.ends_with("/image") || rel.external {
                continue;
            }
            let media_path = resolve_target(dir, &rel.target);
            let Some(mime_type) = SlideImage::mime_for_name(&media_path) else {
                log::debug!("Skipping non-raster media '{}'", media_path);
                continue;
            };
            if let Some(data) = read_optional_bytes(archive, &media_path)? {
                return Ok(Some(SlideImage::new(mime_type, data)));
            }
        }

        Ok(None)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of a `.rels` part.
#[derive(Debug, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn open_archive<R: Read + Seek>(reader: R) -> Result<ZipArchive<R>> {
    ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))
}

/// Read a text part, returning `None` when the archive has no such entry.
fn read_optional_text<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<String>> {
    let Some(bytes) = read_optional_bytes(archive, path)? else {
        return Ok(None);
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| Error::PptxParseError(format!("'{}' is not valid UTF-8: {}", path, e)))
}

fn read_optional_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(Error::ZipError(format!("Failed to open '{}': {}", path, e)));
        }
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(Some(data))
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Relationship ids of `<p:sldId>` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(rel_id) = relationship_id(e) {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// The namespaced `r:id` attribute of an element (the bare `id` is numeric).
fn relationship_id(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| {
            let key = attr.key.as_ref();
            key != b"id" && local_name(key) == b"id"
        })
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Collect paragraph text from shapes and table cells, in document order.
fn extract_text_fragments(xml_content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml_content);
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Empty(ref e)) => {
                if local_name(e.name().as_ref()) == b"br" {
                    current.push('\n');
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_text_run {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::XmlError(format!("Bad text run: {}", err)))?;
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text_run = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        fragments.push(std::mem::take(&mut current));
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide XML: {}", e)));
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        fragments.push(current);
    }

    Ok(fragments)
}

/// Title and creator from `docProps/core.xml`.
fn parse_core_properties(xml: &str) -> Result<(Option<String>, Option<String>)> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut title = None;
    let mut author = None;
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                current = match local_name(e.name().as_ref()) {
                    b"title" => Some("title"),
                    b"creator" => Some("creator"),
                    _ => None,
                };
            }
            Ok(Event::Text(ref e)) => {
                let value = e.unescape().unwrap_or_default().trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match current {
                    Some("title") => title = Some(value),
                    Some("creator") => author = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing core properties: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok((title, author))
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a path like "ppt/slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
