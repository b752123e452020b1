//! OPF (Open Packaging Format) parser
//!
//! Extracts the title and the spine needed to validate and page through a
//! book. The manifest is only consulted to resolve spine `idref`s.

use super::{EpubError, SpineItem};
use std::collections::HashMap;

/// Parsed OPF structure
pub struct ParsedOpf {
    pub title: String,
    pub spine: Vec<SpineItem>,
}

/// Parse an OPF package document
pub fn parse_opf(content: &str) -> Result<ParsedOpf, EpubError> {
    let doc = roxmltree::Document::parse(content)
        .map_err(|e| EpubError::XmlError(e.to_string()))?;

    if doc.root_element().tag_name().name() != "package" {
        return Err(EpubError::InvalidEpub(format!(
            "OPF root element is <{}>, expected <package>",
            doc.root_element().tag_name().name()
        )));
    }

    let title = parse_title(&doc);
    let manifest = parse_manifest(&doc);
    let spine = parse_spine(&doc, &manifest)?;

    Ok(ParsedOpf { title, spine })
}

/// First non-empty `dc:title`
fn parse_title(doc: &roxmltree::Document) -> String {
    doc.descendants()
        .filter(|node| node.tag_name().name() == "title")
        .filter_map(|node| node.text())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Manifest item id to href
fn parse_manifest<'a>(doc: &'a roxmltree::Document) -> HashMap<&'a str, &'a str> {
    doc.descendants()
        .filter(|node| node.tag_name().name() == "item")
        .filter_map(|node| Some((node.attribute("id")?, node.attribute("href")?)))
        .collect()
}

fn parse_spine(
    doc: &roxmltree::Document,
    manifest: &HashMap<&str, &str>,
) -> Result<Vec<SpineItem>, EpubError> {
    let mut spine = Vec::new();

    for node in doc.descendants() {
        if node.tag_name().name() == "itemref" {
            let Some(idref) = node.attribute("idref") else {
                continue;
            };
            let href = manifest.get(idref).ok_or_else(|| {
                EpubError::InvalidEpub(format!("Spine references unknown manifest item '{}'", idref))
            })?;
            let linear = node.attribute("linear").map(|s| s != "no").unwrap_or(true);

            spine.push(SpineItem {
                id: idref.to_string(),
                href: href.to_string(),
                linear,
            });
        }
    }

    Ok(spine)
}
