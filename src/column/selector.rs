//! Selector abstraction: the typed accessor to "the current row" of one
//! column, as addressed by a cursor's row offset (spec §3 glossary,
//! §4.1/§4.2). Every query operator reads columns exclusively through a
//! selector rather than poking at column internals directly, which is what
//! lets the same operator code run over a persisted segment or a sealed
//! incremental index (spec §4.3 "Exposes the same selector-based read
//! interface once sealed").

use super::complex::ComplexColumn;
use super::dictionary::DictionaryEncodedColumn;
use super::numeric::NumericColumn;
use std::sync::Arc;

/// A dimension (dictionary-encoded) selector, bound to a particular
/// column and addressed by the cursor's current offset.
pub struct DimensionSelector {
    column: Arc<DictionaryEncodedColumn>,
    offset: Arc<dyn Fn() -> usize + Send + Sync>,
}

impl DimensionSelector {
    pub fn new(column: Arc<DictionaryEncodedColumn>, offset: Arc<dyn Fn() -> usize + Send + Sync>) -> Self {
        Self { column, offset }
    }

    pub fn row(&self) -> Vec<i32> {
        let off = (self.offset)();
        let single = self.column.get_single_value_row(off);
        if single != super::dictionary::ABSENT_ID || self.column.get_multi_value_row(off).is_empty() {
            vec![single]
        } else {
            self.column.get_multi_value_row(off).to_vec()
        }
    }

    pub fn lookup_name(&self, id: i32) -> String {
        self.column.lookup_name(id).unwrap_or("").to_string()
    }

    pub fn cardinality(&self) -> usize {
        self.column.cardinality()
    }

    pub fn lookup_id(&self, value: &str) -> i32 {
        self.column.lookup_id(value)
    }
}

macro_rules! numeric_selector {
    ($name:ident, $ret:ty, $getter:ident) => {
        pub struct $name {
            column: Arc<NumericColumn>,
            offset: Arc<dyn Fn() -> usize + Send + Sync>,
        }

        impl $name {
            pub fn new(column: Arc<NumericColumn>, offset: Arc<dyn Fn() -> usize + Send + Sync>) -> Self {
                Self { column, offset }
            }

            pub fn get(&self) -> $ret {
                self.column.$getter((self.offset)())
            }
        }
    };
}

numeric_selector!(LongSelector, i64, get_long_single_value_row);
numeric_selector!(FloatSelector, f32, get_float_single_value_row);
numeric_selector!(DoubleSelector, f64, get_double_single_value_row);

/// Accessor for complex (opaque blob) columns.
pub struct ObjectSelector {
    column: Arc<ComplexColumn>,
    offset: Arc<dyn Fn() -> usize + Send + Sync>,
}

impl ObjectSelector {
    pub fn new(column: Arc<ComplexColumn>, offset: Arc<dyn Fn() -> usize + Send + Sync>) -> Self {
        Self { column, offset }
    }

    pub fn get(&self) -> Option<Vec<u8>> {
        self.column.get_row_value((self.offset)()).map(|b| b.to_vec())
    }
}
