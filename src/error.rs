use thiserror::Error;

/// Everything that can go wrong while turning a KML file into block tables.
///
/// All of these are fatal: the pipeline never writes partial output.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("expected exactly 2 tables in placemark description, found {tables}")]
    MalformedDescription { tables: usize },

    #[error("title table must have exactly 1 row with 1 cell, found {rows} row(s) and {cells} cell(s)")]
    MalformedTitleTable { rows: usize, cells: usize },

    #[error("data table row {row} must have exactly 2 cells, found {cells}")]
    MalformedDataRow { row: usize, cells: usize },

    #[error("duplicate key `{key}` in data table")]
    DuplicateKey { key: String },

    #[error("placemark #{placemark} has no description")]
    MissingDescription { placemark: usize },

    #[error("value of `{field}` differed in {block_id}: `{old}` vs. `{new}`")]
    InconsistentField {
        block_id: String,
        field: String,
        old: String,
        new: String,
    },

    #[error("found the following towns in data: {}", format_towns(.towns))]
    MultipleTownsFound { towns: Vec<Option<String>> },

    #[error("no town found in any block group")]
    NoTownFound,

    #[error("town `{town}` cannot be used in an output file name")]
    InvalidTownName { town: String },

    #[error("invalid KML document: {0}")]
    Xml(#[from] roxmltree::Error),
}

fn format_towns(towns: &[Option<String>]) -> String {
    towns
        .iter()
        .map(|t| match t {
            Some(t) => format!("`{}`", t),
            None => "(missing)".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
