use super::fields::{position, FIELDS, FIELD_COUNT, TOWN_FIELD};
use crate::error::ExtractError;

/// One consolidated row: a value slot per output column, `None` until observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRow {
    values: [Option<String>; FIELD_COUNT],
}

impl Default for BlockRow {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| None),
        }
    }
}

impl BlockRow {
    /// Fill column `idx` with `value`, or check it matches what is already there.
    pub fn merge(&mut self, block_id: &str, idx: usize, value: &str) -> Result<(), ExtractError> {
        match &self.values[idx] {
            None => {
                self.values[idx] = Some(value.to_string());
                Ok(())
            }
            Some(old) if old == value => Ok(()),
            Some(old) => Err(ExtractError::InconsistentField {
                block_id: block_id.to_string(),
                field: FIELDS[idx].to_string(),
                old: old.clone(),
                new: value.to_string(),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        let idx = position(field)?;
        self.values[idx].as_deref()
    }

    pub fn town(&self) -> Option<&str> {
        self.get(TOWN_FIELD)
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.values.iter().map(Option::as_deref)
    }
}
