//! Dimension specs (spec §6): how a grouping query names and optionally
//! transforms a dimension on the way into the output schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtractionFn {
    /// Rewrites a value through a fixed lookup table; values absent from
    /// the table pass through unchanged unless `retain_missing` is false,
    /// in which case they map to `None` (spec: "lookup extraction").
    Lookup { table: std::collections::BTreeMap<String, String>, retain_missing: bool },
    /// Keeps only the leading `length` characters.
    Substring { length: usize },
}

impl ExtractionFn {
    pub fn apply(&self, value: &str) -> Option<String> {
        match self {
            ExtractionFn::Lookup { table, retain_missing } => match table.get(value) {
                Some(mapped) => Some(mapped.clone()),
                None => {
                    if *retain_missing {
                        Some(value.to_string())
                    } else {
                        None
                    }
                }
            },
            ExtractionFn::Substring { length } => Some(value.chars().take(*length).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Lexicographic,
    Numeric,
}

/// A dimension as it appears in a grouping query's output: a source
/// column, an optional output name, an optional extraction function, and
/// an ordering annotation used by merge (spec §6 "dimension specs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub dimension: String,
    pub output_name: String,
    pub extraction_fn: Option<ExtractionFn>,
    pub sort_order: SortOrder,
}

impl DimensionSpec {
    pub fn default_for(dimension: impl Into<String>) -> Self {
        let dimension = dimension.into();
        Self { output_name: dimension.clone(), dimension, extraction_fn: None, sort_order: SortOrder::Lexicographic }
    }

    pub fn apply(&self, raw_value: &str) -> Option<String> {
        match &self.extraction_fn {
            None => Some(raw_value.to_string()),
            Some(f) => f.apply(raw_value),
        }
    }
}
