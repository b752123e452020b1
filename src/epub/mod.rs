//! EPUB container validation
//!
//! Reads the OCF container of an EPUB held in memory and checks that it
//! describes a renderable book: `META-INF/container.xml` names a package
//! document, the package parses, and every spine item is in the archive.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;

mod opf;

pub use opf::{parse_opf, ParsedOpf};

use crate::EPUB_MIME_TYPE;

/// First bytes of every ZIP local file header.
pub const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

const CONTAINER_PATH: &str = "META-INF/container.xml";

#[derive(Error, Debug)]
pub enum EpubError {
    #[error("Failed to read ZIP archive: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("XML parse error: {0}")]
    XmlError(String),
}

/// Spine item (reading order entry)
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
    pub linear: bool,
}

/// Validated package structure of an EPUB
#[derive(Debug)]
pub struct EpubBook {
    pub title: String,
    pub spine: Vec<SpineItem>,
}

/// Cheap check that the bytes could be a ZIP archive at all.
pub fn looks_like_zip(data: &[u8]) -> bool {
    data.starts_with(ZIP_SIGNATURE)
}

impl EpubBook {
    /// Open and validate an EPUB from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, EpubError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        Self::check_mimetype(&mut archive)?;

        let opf_path = Self::find_opf_path(&mut archive)?;
        let opf_dir = opf_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();

        let opf_content = Self::read_file(&mut archive, &opf_path)?;
        let opf = parse_opf(&opf_content)?;

        if opf.spine.is_empty() {
            return Err(EpubError::InvalidEpub("Spine is empty".to_string()));
        }

        let entries: HashSet<&str> = archive.file_names().collect();
        for item in &opf.spine {
            let full_path = resolve_path(&opf_dir, &item.href);
            if !entries.contains(full_path.as_str()) {
                return Err(EpubError::InvalidEpub(format!(
                    "Spine item '{}' missing from archive ({})",
                    item.id, full_path
                )));
            }
        }

        Ok(Self {
            title: opf.title,
            spine: opf.spine,
        })
    }

    /// An optional `mimetype` entry must carry the EPUB media type.
    fn check_mimetype(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<(), EpubError> {
        let mut file = match archive.by_name("mimetype") {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        if content.trim() != EPUB_MIME_TYPE {
            return Err(EpubError::InvalidEpub(format!(
                "mimetype entry is {:?}",
                content.trim()
            )));
        }
        Ok(())
    }

    /// Find the path to the OPF file from container.xml
    fn find_opf_path(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String, EpubError> {
        let container_content = Self::read_file(archive, CONTAINER_PATH)?;
        let doc = roxmltree::Document::parse(&container_content)
            .map_err(|e| EpubError::XmlError(e.to_string()))?;

        doc.descendants()
            .filter(|node| node.tag_name().name() == "rootfile")
            .find_map(|node| node.attribute("full-path"))
            .map(|path| path.to_string())
            .ok_or_else(|| {
                EpubError::InvalidEpub("Could not find OPF path in container.xml".to_string())
            })
    }

    /// Read a file from the ZIP archive
    fn read_file(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<String, EpubError> {
        let mut file = archive.by_name(path).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => {
                EpubError::InvalidEpub(format!("Missing {}", path))
            }
            other => other.into(),
        })?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Spine items in reading order, skipping `linear="no"` entries.
    pub fn linear_spine(&self) -> impl Iterator<Item = (usize, &SpineItem)> {
        self.spine.iter().enumerate().filter(|(_, item)| item.linear)
    }
}

fn resolve_path(opf_dir: &str, href: &str) -> String {
    if opf_dir.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", opf_dir, href)
    }
}
