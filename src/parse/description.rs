// src/parse/description.rs
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, trace};

use super::RawTable;
use crate::error::ExtractError;

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Invalid CSS selector for tables"));
static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Invalid CSS selector for rows"));
static CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("Invalid CSS selector for cells"));

/// Parse one placemark description into its title and key/value table.
///
/// The fragment must hold exactly two `<table>`s:
///  - the first has one row with one cell, whose trimmed text is the title
///  - the second has rows of exactly two cells, `key | value`, with unique keys
///
/// Entities are decoded by the HTML parser; keys and values are otherwise kept verbatim.
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn parse_description(html: &str) -> Result<RawTable, ExtractError> {
    let fragment = Html::parse_fragment(html);

    let tables: Vec<ElementRef> = fragment.select(&TABLE).collect();
    if tables.len() != 2 {
        return Err(ExtractError::MalformedDescription {
            tables: tables.len(),
        });
    }

    let title = parse_title_table(tables[0])?;
    let fields = parse_data_table(tables[1])?;
    trace!(title = %title, fields = fields.len(), "Parsed description");

    Ok(RawTable::new(title, fields))
}

fn parse_title_table(table: ElementRef) -> Result<String, ExtractError> {
    let rows: Vec<ElementRef> = table.select(&ROW).collect();
    let cells: Vec<ElementRef> = match rows.first() {
        Some(row) => row.select(&CELL).collect(),
        None => Vec::new(),
    };
    if rows.len() != 1 || cells.len() != 1 {
        return Err(ExtractError::MalformedTitleTable {
            rows: rows.len(),
            cells: cells.len(),
        });
    }
    Ok(cell_text(cells[0]).trim().to_string())
}

fn parse_data_table(table: ElementRef) -> Result<IndexMap<String, String>, ExtractError> {
    let mut data = IndexMap::new();
    for (idx, row) in table.select(&ROW).enumerate() {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        let [key, value] = cells.as_slice() else {
            return Err(ExtractError::MalformedDataRow {
                row: idx,
                cells: cells.len(),
            });
        };
        let key = cell_text(*key);
        if data.contains_key(&key) {
            return Err(ExtractError::DuplicateKey { key });
        }
        data.insert(key, cell_text(*value));
    }
    Ok(data)
}

/// All descendant text of a cell, concatenated.
fn cell_text(cell: ElementRef) -> String {
    cell.text().collect()
}
