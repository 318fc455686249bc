//! Column capability descriptors (spec §3 "Column").

use crate::value::ValueType;
use serde::{Deserialize, Serialize};

/// What a column reader can do, as consulted by the filter planner (C4)
/// when deciding whether a predicate leaf can be answered from a secondary
/// index or must fall through to the residual matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCapabilities {
    pub value_type: ValueType,
    pub dictionary_encoded: bool,
    pub has_multi_values: bool,
    pub has_bitmap_index: bool,
    pub has_text_index: bool,
    pub has_metric_histogram: bool,
    pub has_spatial: bool,
}

impl ColumnCapabilities {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            dictionary_encoded: false,
            has_multi_values: false,
            has_bitmap_index: false,
            has_text_index: false,
            has_metric_histogram: false,
            has_spatial: false,
        }
    }

    pub fn dictionary_encoded(mut self) -> Self {
        self.dictionary_encoded = true;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.has_multi_values = true;
        self
    }

    pub fn with_bitmap_index(mut self) -> Self {
        self.has_bitmap_index = true;
        self
    }

    pub fn with_text_index(mut self) -> Self {
        self.has_text_index = true;
        self
    }

    pub fn with_metric_histogram(mut self) -> Self {
        self.has_metric_histogram = true;
        self
    }
}
