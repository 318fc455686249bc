//! Column store (C1, spec §4.1): immutable per-column readers, addressed
//! through selectors rather than direct field access, so the same operator
//! code works whether the column lives in a persisted segment or a sealed
//! incremental index.

pub mod bitmap;
pub mod capabilities;
pub mod complex;
pub mod dictionary;
pub mod index;
pub mod numeric;
pub mod selector;

use capabilities::ColumnCapabilities;
use complex::ComplexColumn;
use dictionary::DictionaryEncodedColumn;
use numeric::NumericColumn;
use std::sync::Arc;

/// One column reader, polymorphic over its physical representation. This
/// is the "deep polymorphism via inheritance" case spec §9 calls out —
/// modeled here as a closed tagged variant with exactly the operations the
/// engine consumes, rather than a reader base class with virtual methods.
#[derive(Clone)]
pub enum ColumnReader {
    Dictionary(Arc<DictionaryEncodedColumn>),
    Numeric(Arc<NumericColumn>),
    Complex(Arc<ComplexColumn>),
}

impl ColumnReader {
    pub fn length(&self) -> usize {
        match self {
            ColumnReader::Dictionary(c) => c.length(),
            ColumnReader::Numeric(c) => c.length(),
            ColumnReader::Complex(c) => c.length(),
        }
    }

    pub fn capabilities(&self) -> ColumnCapabilities {
        match self {
            ColumnReader::Dictionary(c) => c.capabilities(),
            ColumnReader::Numeric(c) => c.capabilities(),
            ColumnReader::Complex(c) => c.capabilities(),
        }
    }

    /// Rough on-segment footprint, used by capacity accounting (spec §4.3).
    pub fn serialized_size(&self) -> usize {
        match self {
            ColumnReader::Dictionary(c) => {
                c.get_dictionary().iter().map(|s| s.len()).sum::<usize>() + c.length() * 4
            }
            ColumnReader::Numeric(c) => c.length() * 8,
            ColumnReader::Complex(c) => c.length() * 64,
        }
    }
}
