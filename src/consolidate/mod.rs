// src/consolidate/mod.rs
pub mod block_row;
pub mod fields;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, instrument, trace};

use crate::error::ExtractError;
use crate::parse::RawTable;
pub use block_row::BlockRow;
pub use fields::{BLOCK_GROUP_FIELD, BLOCK_ID_FIELD, FIELDS, TOWN_FIELD};

/// Block rows keyed by block identifier, in first-encounter order, all from one town.
#[derive(Debug, Clone)]
pub struct ConsolidatedTable {
    rows: IndexMap<String, BlockRow>,
    town: String,
}

impl ConsolidatedTable {
    pub fn town(&self) -> &str {
        &self.town
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, block_id: &str) -> Option<&BlockRow> {
        self.rows.get(block_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &BlockRow)> {
        self.rows.iter().map(|(id, row)| (id.as_str(), row))
    }
}

/// Fold per-placemark tables into one row per block identifier.
///
/// - tables without a block identifier (town summaries) are skipped
/// - the title goes into "Block Group", overriding any "Block Group" data key
/// - data keys outside `FIELDS` are ignored
/// - a field seen twice for the same block must have the same value
/// - every block must name the same town
#[instrument(level = "info", skip(tables), fields(tables = tables.len()))]
pub fn consolidate(tables: &[RawTable]) -> Result<ConsolidatedTable, ExtractError> {
    let mut rows: IndexMap<String, BlockRow> = IndexMap::new();

    for (idx, table) in tables.iter().enumerate() {
        let Some(block_id) = table.get(BLOCK_ID_FIELD) else {
            debug!(table = idx, title = %table.title, "No block identifier, skipping");
            continue;
        };
        let row = rows.entry(block_id.to_string()).or_default();

        // "Block Group" always comes from the title, never from the data table
        let entries = std::iter::once((BLOCK_GROUP_FIELD, table.title.as_str())).chain(
            table
                .fields
                .iter()
                .filter(|(k, _)| k.as_str() != BLOCK_GROUP_FIELD)
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        for (key, value) in entries {
            match fields::position(key) {
                Some(col) => {
                    trace!(block_id, field = key, value, "Merging field");
                    row.merge(block_id, col, value)?;
                }
                None if key == BLOCK_ID_FIELD => {}
                None => debug!(block_id, field = key, "Ignoring unrecognised field"),
            }
        }
    }

    let town = single_town(&rows)?;
    info!(blocks = rows.len(), town = %town, "Consolidated block groups");
    Ok(ConsolidatedTable { rows, town })
}

fn single_town(rows: &IndexMap<String, BlockRow>) -> Result<String, ExtractError> {
    let towns: IndexSet<Option<&str>> = rows.values().map(BlockRow::town).collect();
    match towns.len() {
        0 => Err(ExtractError::NoTownFound),
        1 => match towns[0] {
            Some(town) => Ok(town.to_string()),
            None => Err(ExtractError::NoTownFound),
        },
        _ => Err(ExtractError::MultipleTownsFound {
            towns: towns.iter().map(|t| t.map(str::to_string)).collect(),
        }),
    }
}
