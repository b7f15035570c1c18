//! Content validation of the field values in a table record.
//!
//! Walks a record's fields in declaration order, checking embedded quoting,
//! declared maximum lengths, physical layout overlap between adjacent
//! fields, blank handling, the declared data type, the declared field
//! format, and declared minimum/maximum bounds. All findings go to the
//! caller's problem sink; layout corruption and field read failures return
//! the fatal signal that stops the table scan.

use pds_model::{FieldSpec, FieldType, Problem, ProblemSink, ProblemType, Severity};

use crate::format::FormatChecker;
use crate::record::{FieldContentFatal, TableRecord};
use crate::types::TypeChecker;

pub struct FieldValueValidator {
    types: TypeChecker,
    formats: FormatChecker,
}

impl FieldValueValidator {
    pub fn new() -> Self {
        Self::with_type_checker(TypeChecker::new())
    }

    pub fn with_type_checker(types: TypeChecker) -> Self {
        Self {
            types,
            formats: FormatChecker::new(),
        }
    }

    /// Validate every field of `record` against the ordered field
    /// specification list, reporting problems through `sink`.
    ///
    /// `check_field_format` is on for character tables and off for binary
    /// tables; it gates the adjacency and format-string checks accordingly.
    /// Returns the fatal signal when the record's layout or content makes
    /// further scanning of the table untrustworthy.
    pub fn validate(
        &self,
        record: &TableRecord,
        fields: &[FieldSpec],
        check_field_format: bool,
        sink: &mut dyn ProblemSink,
    ) -> Result<(), FieldContentFatal> {
        let mut actual_field_number = 1usize;
        for (index, spec) in fields.iter().enumerate() {
            let number = index + 1;
            let value = match record.field(number, spec) {
                Ok(value) => value,
                Err(error) => {
                    tracing::error!(record = record.location().record, field = number, %error, "field read failed");
                    self.report(
                        sink,
                        record,
                        number,
                        Severity::Error,
                        ProblemType::BadFieldRead,
                        format!("error while getting field value: {error}"),
                    );
                    return Err(FieldContentFatal);
                }
            };

            self.check_embedded_quotes(record, number, &value, sink);

            // Packed bit fields share a byte offset and count as one
            // physical field in overlap messages.
            if let Some(next) = fields.get(index + 1) {
                if next.offset != spec.offset {
                    actual_field_number += 1;
                }
            }

            if let Some(max_length) = spec.max_length {
                let trimmed = value.trim();
                if trimmed.chars().count() > max_length {
                    self.report(
                        sink,
                        record,
                        number,
                        Severity::Error,
                        ProblemType::FieldValueTooLong,
                        format!(
                            "the length of the value '{trimmed}' exceeds the defined max \
                             field length (expected max {max_length}, got {})",
                            trimmed.chars().count()
                        ),
                    );
                }
            }

            if let Some(next) = fields.get(index + 1) {
                self.check_overlap(
                    record,
                    number,
                    actual_field_number,
                    spec,
                    next,
                    check_field_format,
                    sink,
                )?;
            }

            self.check_content(record, number, spec, &value, check_field_format, sink);
        }
        Ok(())
    }

    /// A value that both starts and ends with a double quote must not carry
    /// another double quote in its interior.
    fn check_embedded_quotes(
        &self,
        record: &TableRecord,
        number: usize,
        value: &str,
        sink: &mut dyn ProblemSink,
    ) {
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            let interior = &value[1..value.len() - 1];
            if interior.contains('"') {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Error,
                    ProblemType::InvalidFieldValue,
                    format!(
                        "the field value '{}' that starts with double quote should not \
                         contain double quote(s)",
                        value.trim()
                    ),
                );
            }
        }
    }

    /// Adjacency checks between a field and its successor.
    ///
    /// Character tables (format checking on) get a recoverable byte-offset
    /// check. Binary tables get the bit-field check when the field has the
    /// bit-field shape, or the general byte check otherwise; both of those
    /// mean the table's layout cannot be trusted and are fatal for the scan.
    #[allow(clippy::too_many_arguments)]
    fn check_overlap(
        &self,
        record: &TableRecord,
        number: usize,
        actual_field_number: usize,
        spec: &FieldSpec,
        next: &FieldSpec,
        check_field_format: bool,
        sink: &mut dyn ProblemSink,
    ) -> Result<(), FieldContentFatal> {
        if check_field_format {
            if spec.offset + spec.length > next.offset {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Error,
                    ProblemType::FieldValueOverlap,
                    format!(
                        "this field overlaps the next field. Current field ends at {}. \
                         Next field starts at {}",
                        spec.offset + spec.length,
                        next.offset
                    ),
                );
            }
            return Ok(());
        }

        if spec.stop_bit > 0 && spec.stop_bit != spec.length * 8 {
            // Only compare when the next field's start bit is meaningfully
            // set; packed groups end where start bits stop being declared.
            if next.start_bit > 1 && spec.stop_bit >= next.start_bit {
                self.report(
                    sink,
                    record,
                    actual_field_number,
                    Severity::Error,
                    ProblemType::FieldValueOverlap,
                    format!(
                        "the bit field overlaps the next field. Current \
                         stop_bit_location: {}. Next start_bit_location: {}",
                        spec.stop_bit + 1,
                        next.start_bit + 1
                    ),
                );
                return Err(FieldContentFatal);
            }
        } else if spec.offset > next.offset || spec.offset + spec.length > next.offset {
            self.report(
                sink,
                record,
                number,
                Severity::Error,
                ProblemType::FieldValueOverlap,
                format!(
                    "this field overlaps the next field. Current field ends at {}. \
                     Next field starts at {}",
                    spec.offset + spec.length + 1,
                    next.offset + 1
                ),
            );
            return Err(FieldContentFatal);
        }
        Ok(())
    }

    /// Blank handling plus the type, format, and range checks for one value.
    fn check_content(
        &self,
        record: &TableRecord,
        number: usize,
        spec: &FieldSpec,
        value: &str,
        check_field_format: bool,
        sink: &mut dyn ProblemSink,
    ) {
        let trimmed = value.trim();

        // Empty fields are acceptable for delimited records; space-padded
        // empty fields are acceptable for fixed-width records.
        if value.is_empty() || (trimmed.is_empty() && record.is_fixed_width()) {
            self.report(
                sink,
                record,
                number,
                Severity::Debug,
                ProblemType::BlankFieldValue,
                "field is blank",
            );
            return;
        }

        if trimmed.is_empty() {
            // Whitespace-only in a delimited record: let the type rule decide.
            match self.types.check(value, spec.field_type) {
                Ok(()) => self.report(
                    sink,
                    record,
                    number,
                    Severity::Debug,
                    ProblemType::BlankFieldValue,
                    "field is blank",
                ),
                Err(error) => self.report(
                    sink,
                    record,
                    number,
                    Severity::Error,
                    ProblemType::FieldValueDataTypeMismatch,
                    format!(
                        "value does not match its data type '{}': {error}",
                        spec.field_type.xml_type()
                    ),
                ),
            }
            return;
        }

        match self.types.check(trimmed, spec.field_type) {
            Ok(()) => self.report(
                sink,
                record,
                number,
                Severity::Debug,
                ProblemType::FieldValueDataTypeMatch,
                format!(
                    "value '{trimmed}' matches its data type '{}'",
                    spec.field_type.xml_type()
                ),
            ),
            Err(error) => self.report(
                sink,
                record,
                number,
                Severity::Error,
                ProblemType::FieldValueDataTypeMismatch,
                format!(
                    "value does not match its data type '{}': {error}",
                    spec.field_type.xml_type()
                ),
            ),
        }

        if check_field_format {
            // Fixed-width tables validate against the validation format,
            // delimited tables against the field format.
            let format = if record.is_fixed_width() {
                spec.validation_format.as_deref()
            } else {
                spec.field_format.as_deref()
            };
            if let Some(format) = format.filter(|f| !f.is_empty()) {
                for finding in self.formats.check(value, format) {
                    self.report(
                        sink,
                        record,
                        number,
                        finding.severity,
                        finding.kind,
                        finding.message,
                    );
                }
            }
        }

        if spec.minimum.is_some() || spec.maximum.is_some() {
            self.check_min_max(record, number, spec, trimmed, sink);
        }
    }

    /// Range check against the declared minimum/maximum.
    ///
    /// Values with a leading zero (or `-0`) for the plain numeric types are
    /// round-tripped through a floating-point parse so that `000810`
    /// compares as `810`. Values inside a bound report a Debug confirmation;
    /// a value exactly at a bound is never flagged.
    fn check_min_max(
        &self,
        record: &TableRecord,
        number: usize,
        spec: &FieldSpec,
        value: &str,
        sink: &mut dyn ProblemSink,
    ) {
        let plain_numeric = matches!(
            spec.field_type,
            FieldType::AsciiReal | FieldType::AsciiInteger | FieldType::AsciiNonNegativeInteger
        );
        let mut compared = value.to_string();
        if plain_numeric && (value.starts_with('0') || value.starts_with("-0")) {
            if let Ok(parsed) = value.parse::<f64>() {
                compared = parsed.to_string();
            }
        }

        let Ok(numeric) = compared.parse::<f64>() else {
            self.report(
                sink,
                record,
                number,
                Severity::Error,
                ProblemType::FieldValueNotANumber,
                format!(
                    "cannot cast field value '{compared}' to a number to validate \
                     against the min/max values defined in the label"
                ),
            );
            return;
        };

        if let Some(minimum) = spec.minimum {
            if numeric < minimum {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Error,
                    ProblemType::FieldValueOutOfMinMaxRange,
                    format!(
                        "field has a value '{compared}' that is less than the defined \
                         minimum value '{minimum}'"
                    ),
                );
            } else {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Debug,
                    ProblemType::FieldValueInMinMaxRange,
                    format!(
                        "field has a value '{compared}' that is greater than the \
                         defined minimum value '{minimum}'"
                    ),
                );
            }
        }
        if let Some(maximum) = spec.maximum {
            if numeric > maximum {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Error,
                    ProblemType::FieldValueOutOfMinMaxRange,
                    format!(
                        "field has a value '{compared}' that is greater than the \
                         defined maximum value '{maximum}'"
                    ),
                );
            } else {
                self.report(
                    sink,
                    record,
                    number,
                    Severity::Debug,
                    ProblemType::FieldValueInMinMaxRange,
                    format!(
                        "field has a value '{compared}' that is less than the defined \
                         maximum value '{maximum}'"
                    ),
                );
            }
        }
    }

    fn report(
        &self,
        sink: &mut dyn ProblemSink,
        record: &TableRecord,
        field: usize,
        severity: Severity,
        kind: ProblemType,
        message: impl Into<String>,
    ) {
        sink.add_problem(Problem::table(
            severity,
            kind,
            message,
            record.location().clone(),
            field,
        ));
    }
}

impl Default for FieldValueValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate every record of a table, stopping the whole scan on the first
/// fatal field content error.
///
/// Returns the number of records scanned, or the fatal signal; the fatal
/// signal aborts the remaining records of this table, not just the record
/// that raised it.
pub fn scan_table<'a, I>(
    validator: &FieldValueValidator,
    records: I,
    fields: &[FieldSpec],
    check_field_format: bool,
    sink: &mut dyn ProblemSink,
) -> Result<usize, FieldContentFatal>
where
    I: IntoIterator<Item = &'a TableRecord>,
{
    let mut scanned = 0usize;
    for record in records {
        validator.validate(record, fields, check_field_format, sink)?;
        scanned += 1;
    }
    Ok(scanned)
}
