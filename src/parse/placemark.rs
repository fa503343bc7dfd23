// src/parse/placemark.rs
use anyhow::{Context, Result};
use roxmltree::{Document, Node};
use tracing::{debug, info, instrument};

use super::{parse_description, RawTable};
use crate::error::ExtractError;

/// Parse a KML document and turn every `<Placemark>` into a `RawTable`, in document order.
///
/// Elements are matched by local name, so the KML namespace does not matter.
/// Any placemark that is missing its description, or whose description does not
/// parse, aborts the whole load.
#[instrument(level = "info", skip(xml), fields(xml_len = xml.len()))]
pub fn load_tables(xml: &str) -> Result<Vec<RawTable>> {
    let doc = Document::parse(xml).map_err(ExtractError::from)?;

    let mut tables = Vec::new();
    for (idx, placemark) in doc
        .descendants()
        .filter(|n| is_element(n, "Placemark"))
        .enumerate()
    {
        let name = child_text(&placemark, "name");
        let description = placemark
            .descendants()
            .find(|n| is_element(n, "description"))
            .ok_or(ExtractError::MissingDescription { placemark: idx })?;

        let html = text_content(&description);
        let table = parse_description(&html).with_context(|| match &name {
            Some(name) => format!("parsing description of placemark #{} ({})", idx, name),
            None => format!("parsing description of placemark #{}", idx),
        })?;
        debug!(
            placemark = idx,
            title = %table.title,
            fields = table.fields.len(),
            "Loaded placemark"
        );
        tables.push(table);
    }

    info!(placemarks = tables.len(), "Loaded placemark tables");
    Ok(tables)
}

fn is_element(node: &Node, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

/// Trimmed text of the first direct child element called `local_name`.
fn child_text(node: &Node, local_name: &str) -> Option<String> {
    node.children()
        .find(|n| is_element(n, local_name))
        .map(|n| text_content(&n).trim().to_string())
}

/// Concatenated text and CDATA of every descendant, in document order.
fn text_content(node: &Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
