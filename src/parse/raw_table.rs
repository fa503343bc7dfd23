use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Text of the single cell in the placemark's first table, e.g. "Block Group 3".
    pub title: String,
    /// Key/value rows of the second table, in the order they appear in the HTML.
    /// Keys are unique; the parser rejects a repeated key.
    pub fields: IndexMap<String, String>,
}

impl RawTable {
    pub fn new(title: impl Into<String>, fields: IndexMap<String, String>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}
