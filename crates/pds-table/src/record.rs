//! Table records: one row of a table, with field values addressable by
//! 1-based field number.

use pds_model::{FieldSpec, RecordLocation};
use thiserror::Error;

/// A field's raw value could not be extracted from the record.
#[derive(Debug, Error)]
pub enum FieldReadError {
    #[error("field {number} is out of range for this record")]
    OutOfRange { number: usize },
    #[error("field {number} is not valid UTF-8")]
    Encoding { number: usize },
}

/// One row of a table.
///
/// Fixed-width records are space padded and sliced by the byte offset and
/// length declared in the field specification. Delimited records hold their
/// fields already split, with no implicit padding; enclosing quotes are
/// preserved so that malformed embedded quoting can be detected.
#[derive(Debug, Clone)]
pub enum TableRecord {
    FixedWidth {
        bytes: Vec<u8>,
        location: RecordLocation,
    },
    Delimited {
        fields: Vec<String>,
        location: RecordLocation,
    },
}

impl TableRecord {
    pub fn fixed_width(bytes: impl Into<Vec<u8>>, location: RecordLocation) -> Self {
        Self::FixedWidth {
            bytes: bytes.into(),
            location,
        }
    }

    pub fn delimited(fields: Vec<String>, location: RecordLocation) -> Self {
        Self::Delimited { fields, location }
    }

    pub fn location(&self) -> &RecordLocation {
        match self {
            Self::FixedWidth { location, .. } | Self::Delimited { location, .. } => location,
        }
    }

    pub fn is_fixed_width(&self) -> bool {
        matches!(self, Self::FixedWidth { .. })
    }

    /// Raw text of the field with the given 1-based number.
    pub fn field(&self, number: usize, spec: &FieldSpec) -> Result<String, FieldReadError> {
        match self {
            Self::FixedWidth { bytes, .. } => {
                let start = usize::try_from(spec.offset)
                    .map_err(|_| FieldReadError::OutOfRange { number })?;
                let end = start
                    .checked_add(
                        usize::try_from(spec.length)
                            .map_err(|_| FieldReadError::OutOfRange { number })?,
                    )
                    .ok_or(FieldReadError::OutOfRange { number })?;
                let slice = bytes
                    .get(start..end)
                    .ok_or(FieldReadError::OutOfRange { number })?;
                std::str::from_utf8(slice)
                    .map(str::to_string)
                    .map_err(|_| FieldReadError::Encoding { number })
            }
            Self::Delimited { fields, .. } => fields
                .get(number - 1)
                .cloned()
                .ok_or(FieldReadError::OutOfRange { number }),
        }
    }
}

/// Signal that a record's field content cannot be trusted any further.
///
/// Raised for layout corruption (overlapping bit or byte fields) and for
/// field read failures. The table scan stops rather than repeating the same
/// problem for every remaining record.
#[derive(Debug, Error)]
#[error("fatal field content read error; discontinue reading records")]
pub struct FieldContentFatal;
