//! Complex column: a serde-identified opaque byte blob per row (spec §3).

use super::capabilities::ColumnCapabilities;
use crate::value::ValueType;

#[derive(Debug, Clone)]
pub struct ComplexColumn {
    type_name: String,
    rows: Vec<Option<Vec<u8>>>,
}

impl ComplexColumn {
    pub fn new(type_name: impl Into<String>, rows: Vec<Option<Vec<u8>>>) -> Self {
        Self { type_name: type_name.into(), rows }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn length(&self) -> usize {
        self.rows.len()
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        ColumnCapabilities::new(ValueType::Complex)
    }

    pub fn get_row_value(&self, offset: usize) -> Option<&[u8]> {
        self.rows.get(offset).and_then(|r| r.as_deref())
    }
}
