//! Field-level descriptions of tabular data: the declared type of a field,
//! its physical layout within a record, and the location of a record within
//! a data product.

use serde::{Deserialize, Serialize};

/// Declared data type of a table field.
///
/// Closed enumeration; every variant carries its own validation rule in the
/// type engine. `Unspecified` means no check is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldType {
    AsciiInteger,
    AsciiNonNegativeInteger,
    AsciiReal,
    AsciiNumericBase2,
    AsciiNumericBase8,
    AsciiNumericBase16,
    AsciiMd5Checksum,
    AsciiAnyUri,
    AsciiDoi,
    AsciiLid,
    AsciiLidvid,
    AsciiLidvidLid,
    AsciiVid,
    AsciiString,
    Utf8String,
    AsciiDateDoy,
    AsciiDateTimeDoy,
    AsciiDateTimeDoyUtc,
    AsciiDateTimeYmd,
    AsciiDateTimeYmdUtc,
    AsciiDateYmd,
    AsciiTime,
    AsciiDirectoryPathName,
    AsciiFileName,
    AsciiFileSpecificationName,
    AsciiBibcode,
    #[default]
    Unspecified,
}

impl FieldType {
    /// The type identifier as written in labels.
    pub fn xml_type(&self) -> &'static str {
        match self {
            Self::AsciiInteger => "ASCII_Integer",
            Self::AsciiNonNegativeInteger => "ASCII_NonNegative_Integer",
            Self::AsciiReal => "ASCII_Real",
            Self::AsciiNumericBase2 => "ASCII_Numeric_Base2",
            Self::AsciiNumericBase8 => "ASCII_Numeric_Base8",
            Self::AsciiNumericBase16 => "ASCII_Numeric_Base16",
            Self::AsciiMd5Checksum => "ASCII_MD5_Checksum",
            Self::AsciiAnyUri => "ASCII_AnyURI",
            Self::AsciiDoi => "ASCII_DOI",
            Self::AsciiLid => "ASCII_LID",
            Self::AsciiLidvid => "ASCII_LIDVID",
            Self::AsciiLidvidLid => "ASCII_LIDVID_LID",
            Self::AsciiVid => "ASCII_VID",
            Self::AsciiString => "ASCII_String",
            Self::Utf8String => "UTF8_String",
            Self::AsciiDateDoy => "ASCII_Date_DOY",
            Self::AsciiDateTimeDoy => "ASCII_Date_Time_DOY",
            Self::AsciiDateTimeDoyUtc => "ASCII_Date_Time_DOY_UTC",
            Self::AsciiDateTimeYmd => "ASCII_Date_Time_YMD",
            Self::AsciiDateTimeYmdUtc => "ASCII_Date_Time_YMD_UTC",
            Self::AsciiDateYmd => "ASCII_Date_YMD",
            Self::AsciiTime => "ASCII_Time",
            Self::AsciiDirectoryPathName => "ASCII_Directory_Path_Name",
            Self::AsciiFileName => "ASCII_File_Name",
            Self::AsciiFileSpecificationName => "ASCII_File_Specification_Name",
            Self::AsciiBibcode => "ASCII_BibCode",
            Self::Unspecified => "",
        }
    }

    /// Look up a type by its label identifier. Unknown identifiers map to
    /// `Unspecified` (no check).
    pub fn from_xml_type(identifier: &str) -> Self {
        match identifier {
            "ASCII_Integer" => Self::AsciiInteger,
            "ASCII_NonNegative_Integer" => Self::AsciiNonNegativeInteger,
            "ASCII_Real" => Self::AsciiReal,
            "ASCII_Numeric_Base2" => Self::AsciiNumericBase2,
            "ASCII_Numeric_Base8" => Self::AsciiNumericBase8,
            "ASCII_Numeric_Base16" => Self::AsciiNumericBase16,
            "ASCII_MD5_Checksum" => Self::AsciiMd5Checksum,
            "ASCII_AnyURI" => Self::AsciiAnyUri,
            "ASCII_DOI" => Self::AsciiDoi,
            "ASCII_LID" => Self::AsciiLid,
            "ASCII_LIDVID" => Self::AsciiLidvid,
            "ASCII_LIDVID_LID" => Self::AsciiLidvidLid,
            "ASCII_VID" => Self::AsciiVid,
            "ASCII_String" => Self::AsciiString,
            "UTF8_String" => Self::Utf8String,
            "ASCII_Date_DOY" => Self::AsciiDateDoy,
            "ASCII_Date_Time_DOY" => Self::AsciiDateTimeDoy,
            "ASCII_Date_Time_DOY_UTC" => Self::AsciiDateTimeDoyUtc,
            "ASCII_Date_Time_YMD" => Self::AsciiDateTimeYmd,
            "ASCII_Date_Time_YMD_UTC" => Self::AsciiDateTimeYmdUtc,
            "ASCII_Date_YMD" => Self::AsciiDateYmd,
            "ASCII_Time" => Self::AsciiTime,
            "ASCII_Directory_Path_Name" => Self::AsciiDirectoryPathName,
            "ASCII_File_Name" => Self::AsciiFileName,
            "ASCII_File_Specification_Name" => Self::AsciiFileSpecificationName,
            "ASCII_BibCode" => Self::AsciiBibcode,
            _ => Self::Unspecified,
        }
    }

    pub fn is_date_time(&self) -> bool {
        matches!(
            self,
            Self::AsciiDateDoy
                | Self::AsciiDateTimeDoy
                | Self::AsciiDateTimeDoyUtc
                | Self::AsciiDateTimeYmd
                | Self::AsciiDateTimeYmdUtc
                | Self::AsciiDateYmd
                | Self::AsciiTime
        )
    }
}

/// Specification of one table column.
///
/// The ordered list of specs for a table is fixed for the table's lifetime;
/// offsets are expected to be monotonically non-decreasing in declaration
/// order, and a violation is reported rather than silently fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Byte offset of the field within the record.
    pub offset: i64,
    /// Byte length of the field.
    pub length: i64,
    /// First bit of a packed bit field; -1 when the field is not bit-packed.
    pub start_bit: i64,
    /// Last bit of a packed bit field; -1 when the field is not bit-packed.
    pub stop_bit: i64,
    pub field_type: FieldType,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub field_format: Option<String>,
    pub validation_format: Option<String>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            offset: 0,
            length: 0,
            start_bit: -1,
            stop_bit: -1,
            field_type: FieldType::Unspecified,
            max_length: None,
            minimum: None,
            maximum: None,
            field_format: None,
            validation_format: None,
        }
    }
}

/// Physical location of a record: which data file, which label described
/// it, which table within the product, and the 1-based record number.
///
/// Carried unchanged into every problem produced for a field of that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLocation {
    pub data_file: String,
    pub label: String,
    pub table: usize,
    pub record: usize,
}

impl RecordLocation {
    pub fn new(
        data_file: impl Into<String>,
        label: impl Into<String>,
        table: usize,
        record: usize,
    ) -> Self {
        Self {
            data_file: data_file.into(),
            label: label.into(),
            table,
            record,
        }
    }
}
