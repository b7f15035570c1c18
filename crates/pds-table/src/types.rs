//! Per-type value grammars for table fields.
//!
//! [`TypeChecker::check`] is pure: given a field's raw text and its declared
//! type it either accepts the value or explains the mismatch. All patterns
//! are compiled once when the checker is built.

use pds_model::FieldType;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::datetime::{DateTimeChecker, GrammarDateTimeChecker, accepted_patterns};

/// A field value that does not match its declared type.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TypeMismatch(String);

impl TypeMismatch {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Tokens that name non-finite numbers. Rejected outright; some of them
/// would otherwise parse as floating values.
const NON_FINITE_TOKENS: &[&str] = &["INF", "-INF", "+INF", "NAN", "-NAN", "+NAN"];

pub struct TypeChecker {
    datetime: Box<dyn DateTimeChecker>,
    integer: Regex,
    nonnegative_integer: Regex,
    real: Regex,
    base2: Regex,
    base8: Regex,
    base16: Regex,
    md5: Regex,
    doi: Regex,
    lid: Regex,
    lidvid: Regex,
    vid: Regex,
    bibcode: Regex,
    directory_segment: Regex,
    directory_path: Regex,
    file_name: Regex,
    uri_base: Url,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::with_datetime_checker(Box::new(GrammarDateTimeChecker::new()))
    }

    pub fn with_datetime_checker(datetime: Box<dyn DateTimeChecker>) -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("valid pattern");
        Self {
            datetime,
            integer: compile(r"^[+-]?\d+$"),
            nonnegative_integer: compile(r"^[+]?\d+$"),
            real: compile(r"^[+-]?(\d+(\.\d*)?|\.\d+)([Ee][+-]?\d+)?$"),
            base2: compile(r"^[0-1]{1,255}$"),
            base8: compile(r"^[0-7]{1,255}$"),
            base16: compile(r"^[0-9a-fA-F]{1,255}$"),
            md5: compile(r"^[0-9a-fA-F]{32}$"),
            doi: compile(r"^10\.\S+/\S+$"),
            lid: compile(r"^urn:[a-z]+:[a-z]+:([0-9a-z._-]:?)+$"),
            lidvid: compile(r"^urn:[a-z]+:[a-z]+:([0-9a-z._-]:?)+::[1-9][0-9]*\.[0-9]+$"),
            vid: compile(r"^[1-9][0-9]*\.[0-9]+(\.[0-9]+)?(\.[0-9]+)?$"),
            bibcode: compile(r"^\d{4}[A-Za-z\d.&]{5}[A-Za-z\d.]{9}[A-Z]$"),
            directory_segment: compile(r"^[A-Za-z0-9][A-Za-z0-9_-]*[A-Za-z0-9]$"),
            directory_path: compile(r"^/?([A-Za-z0-9][A-Za-z0-9_-]*[A-Za-z0-9]/?)*$"),
            file_name: compile(r"^[A-Za-z0-9]*[A-Za-z0-9._-]*[A-Za-z0-9]\.[A-Za-z0-9]+$"),
            uri_base: Url::parse("file:///").expect("valid base url"),
        }
    }

    /// Check a trimmed field value against its declared type.
    pub fn check(&self, value: &str, field_type: FieldType) -> Result<(), TypeMismatch> {
        if NON_FINITE_TOKENS.contains(&value) {
            return Err(TypeMismatch::new(format!("{value} is not allowed")));
        }
        match field_type {
            FieldType::AsciiInteger => {
                self.match_pattern(&self.integer, value)?;
                value.parse::<i64>().map(|_| ()).map_err(|_| {
                    TypeMismatch::new(format!(
                        "could not convert to a signed 64-bit integer: {value}"
                    ))
                })
            }
            FieldType::AsciiNonNegativeInteger => {
                self.match_pattern(&self.nonnegative_integer, value)?;
                value
                    .trim_start_matches('+')
                    .parse::<u64>()
                    .map(|_| ())
                    .map_err(|_| {
                        TypeMismatch::new(format!(
                            "could not convert to an unsigned 64-bit integer: {value}"
                        ))
                    })
            }
            FieldType::AsciiReal => {
                self.match_pattern(&self.real, value)?;
                value.parse::<f64>().map(|_| ()).map_err(|_| {
                    TypeMismatch::new(format!("could not convert to a double: {value}"))
                })
            }
            FieldType::AsciiNumericBase2 => self.match_pattern(&self.base2, value),
            FieldType::AsciiNumericBase8 => self.match_pattern(&self.base8, value),
            FieldType::AsciiNumericBase16 => self.match_pattern(&self.base16, value),
            FieldType::AsciiMd5Checksum => self.match_pattern(&self.md5, value),
            FieldType::AsciiAnyUri => self.check_uri(value),
            FieldType::AsciiDoi => self.match_pattern(&self.doi, value),
            FieldType::AsciiLid => self.match_pattern(&self.lid, value),
            FieldType::AsciiLidvid => self.match_pattern(&self.lidvid, value),
            FieldType::AsciiLidvidLid => {
                if self.lidvid.is_match(value) || self.lid.is_match(value) {
                    Ok(())
                } else {
                    Err(TypeMismatch::new(format!(
                        "'{value}' does not match the patterns '{}' or '{}'",
                        self.lidvid.as_str(),
                        self.lid.as_str()
                    )))
                }
            }
            FieldType::AsciiVid => self.match_pattern(&self.vid, value),
            FieldType::AsciiString => check_ascii(value),
            FieldType::Utf8String => check_utf8(value),
            FieldType::AsciiDateDoy
            | FieldType::AsciiDateTimeDoy
            | FieldType::AsciiDateTimeDoyUtc
            | FieldType::AsciiDateTimeYmd
            | FieldType::AsciiDateTimeYmdUtc
            | FieldType::AsciiDateYmd
            | FieldType::AsciiTime => {
                if self.datetime.is_valid(field_type, value) {
                    Ok(())
                } else {
                    Err(TypeMismatch::new(format!(
                        "could not parse {value} using these patterns '{}'",
                        accepted_patterns(field_type)
                    )))
                }
            }
            FieldType::AsciiDirectoryPathName => self.check_directory_path_name(value),
            FieldType::AsciiFileName => self.check_file_name(value),
            FieldType::AsciiFileSpecificationName => self.check_file_specification(value),
            FieldType::AsciiBibcode => self.match_pattern(&self.bibcode, value),
            FieldType::Unspecified => Ok(()),
        }
    }

    fn match_pattern(&self, pattern: &Regex, value: &str) -> Result<(), TypeMismatch> {
        if pattern.is_match(value) {
            Ok(())
        } else {
            Err(TypeMismatch::new(format!(
                "'{value}' does not match the pattern '{}'",
                pattern.as_str()
            )))
        }
    }

    fn check_uri(&self, value: &str) -> Result<(), TypeMismatch> {
        match Url::parse(value) {
            Ok(_) => Ok(()),
            // Relative references are syntactically valid URIs; exercise
            // them against a fixed base.
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .uri_base
                .join(value)
                .map(|_| ())
                .map_err(|e| TypeMismatch::new(e.to_string())),
            Err(e) => Err(TypeMismatch::new(e.to_string())),
        }
    }

    fn check_directory_path_name(&self, value: &str) -> Result<(), TypeMismatch> {
        for segment in value.split('/') {
            if !self.directory_segment.is_match(segment) {
                return Err(TypeMismatch::new(format!(
                    "{segment} does not match the pattern '{}'",
                    self.directory_segment.as_str()
                )));
            }
            if segment.len() > 255 {
                return Err(TypeMismatch::new(format!(
                    "{segment} is longer than 255 characters"
                )));
            }
        }
        Ok(())
    }

    fn check_file_name(&self, value: &str) -> Result<(), TypeMismatch> {
        if !self.file_name.is_match(value) {
            return Err(TypeMismatch::new(format!(
                "{value} does not match the pattern '{}'",
                self.file_name.as_str()
            )));
        }
        if value.len() > 255 {
            return Err(TypeMismatch::new(format!(
                "{value} is longer than 255 characters"
            )));
        }
        Ok(())
    }

    fn check_file_specification(&self, value: &str) -> Result<(), TypeMismatch> {
        let (directory, name) = match value.rfind('/') {
            Some(index) => (&value[..=index], &value[index + 1..]),
            None => ("", value),
        };
        if !directory.is_empty() {
            if directory.len() > 255 {
                return Err(TypeMismatch::new(format!(
                    "the directory spec '{directory}' is longer than 255 characters"
                )));
            }
            if !self.directory_path.is_match(directory) {
                return Err(TypeMismatch::new(format!(
                    "the directory spec '{directory}' does not match the pattern '{}'",
                    self.directory_path.as_str()
                )));
            }
        }
        if name.is_empty() {
            return Err(TypeMismatch::new(format!(
                "no filename spec found in '{value}'"
            )));
        }
        if !self.file_name.is_match(name) {
            return Err(TypeMismatch::new(format!(
                "the filename spec '{name}' does not match the pattern '{}'",
                self.file_name.as_str()
            )));
        }
        if name.len() > 255 {
            return Err(TypeMismatch::new(format!(
                "the filename spec '{name}' is longer than 255 characters"
            )));
        }
        Ok(())
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn check_ascii(value: &str) -> Result<(), TypeMismatch> {
    for ch in value.chars() {
        if (ch as u32) > 127 {
            return Err(TypeMismatch::new(format!(
                "'{}' contains non-ASCII character: {ch}",
                truncate_echo(value)
            )));
        }
    }
    Ok(())
}

fn check_utf8(value: &str) -> Result<(), TypeMismatch> {
    // A literal backslash-s escape sequence, not actual whitespace.
    if value.contains("\\s") {
        return Err(TypeMismatch::new(format!(
            "'{}' contains whitespace character(s)",
            truncate_echo(value)
        )));
    }
    Ok(())
}

/// Long values are truncated to 100 characters before being echoed back in
/// a message.
fn truncate_echo(value: &str) -> String {
    if value.chars().count() > 100 {
        let prefix: String = value.chars().take(100).collect();
        format!("{prefix}...")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn checker() -> TypeChecker {
        TypeChecker::new()
    }

    #[test]
    fn integer_accepts_signed_lexemes() {
        let c = checker();
        for value in ["0", "+7", "-42", "9223372036854775807", "-9223372036854775808"] {
            assert!(c.check(value, FieldType::AsciiInteger).is_ok(), "{value}");
        }
    }

    #[test]
    fn integer_rejects_grammar_and_range() {
        let c = checker();
        assert!(c.check("12a", FieldType::AsciiInteger).is_err());
        assert!(c.check("1.5", FieldType::AsciiInteger).is_err());
        // Out of range fails in the same error category as malformed input.
        assert!(c.check("9223372036854775808", FieldType::AsciiInteger).is_err());
    }

    #[test]
    fn nonnegative_integer_rejects_minus() {
        let c = checker();
        assert!(c.check("+810", FieldType::AsciiNonNegativeInteger).is_ok());
        assert!(c.check("-1", FieldType::AsciiNonNegativeInteger).is_err());
        assert!(
            c.check("18446744073709551615", FieldType::AsciiNonNegativeInteger)
                .is_ok()
        );
        assert!(
            c.check("18446744073709551616", FieldType::AsciiNonNegativeInteger)
                .is_err()
        );
    }

    #[test]
    fn real_rejects_non_finite_tokens() {
        let c = checker();
        for token in ["INF", "-INF", "+INF", "NAN", "-NAN", "+NAN"] {
            assert!(c.check(token, FieldType::AsciiReal).is_err(), "{token}");
        }
        assert!(c.check("1.25e-3", FieldType::AsciiReal).is_ok());
        assert!(c.check(".5", FieldType::AsciiReal).is_ok());
        assert!(c.check("1e", FieldType::AsciiReal).is_err());
    }

    #[test]
    fn base_n_alphabets() {
        let c = checker();
        assert!(c.check("1011", FieldType::AsciiNumericBase2).is_ok());
        assert!(c.check("1021", FieldType::AsciiNumericBase2).is_err());
        assert!(c.check("755", FieldType::AsciiNumericBase8).is_ok());
        assert!(c.check("758", FieldType::AsciiNumericBase8).is_err());
        assert!(c.check("deadBEEF01", FieldType::AsciiNumericBase16).is_ok());
        assert!(c.check("xyz", FieldType::AsciiNumericBase16).is_err());
    }

    #[test]
    fn md5_is_exactly_32_hex_digits() {
        let c = checker();
        assert!(
            c.check("0123456789abcdef0123456789ABCDEF", FieldType::AsciiMd5Checksum)
                .is_ok()
        );
        assert!(
            c.check("0123456789abcdef0123456789ABCDE", FieldType::AsciiMd5Checksum)
                .is_err()
        );
    }

    #[test]
    fn doi_grammar() {
        let c = checker();
        assert!(c.check("10.1000/182", FieldType::AsciiDoi).is_ok());
        assert!(c.check("1000/182", FieldType::AsciiDoi).is_err());
    }

    #[test]
    fn lid_family() {
        let c = checker();
        let lid = "urn:nasa:pds:context.mission:insight";
        let lidvid = "urn:nasa:pds:context.mission:insight::1.0";
        assert!(c.check(lid, FieldType::AsciiLid).is_ok());
        assert!(c.check(lidvid, FieldType::AsciiLidvid).is_ok());
        assert!(c.check(lid, FieldType::AsciiLidvid).is_err());
        assert!(c.check(lid, FieldType::AsciiLidvidLid).is_ok());
        assert!(c.check(lidvid, FieldType::AsciiLidvidLid).is_ok());
        assert!(c.check("urn:nasa", FieldType::AsciiLidvidLid).is_err());
        assert!(c.check("1.0", FieldType::AsciiVid).is_ok());
        assert!(c.check("0.1", FieldType::AsciiVid).is_err());
    }

    #[test]
    fn uri_syntax_only() {
        let c = checker();
        assert!(c.check("https://example.org/data", FieldType::AsciiAnyUri).is_ok());
        assert!(c.check("relative/path.xml", FieldType::AsciiAnyUri).is_ok());
        assert!(c.check("http://[invalid", FieldType::AsciiAnyUri).is_err());
    }

    #[test]
    fn ascii_string_truncates_echo() {
        let c = checker();
        assert!(c.check("plain text", FieldType::AsciiString).is_ok());
        let long = format!("{}\u{00e9}", "x".repeat(150));
        let error = c.check(&long, FieldType::AsciiString).unwrap_err();
        assert!(error.to_string().contains("..."));
        assert!(error.to_string().contains("non-ASCII"));
    }

    #[test]
    fn utf8_string_rejects_literal_escape() {
        let c = checker();
        assert!(c.check("some value", FieldType::Utf8String).is_ok());
        assert!(c.check("bad\\svalue", FieldType::Utf8String).is_err());
    }

    #[test]
    fn path_and_file_names() {
        let c = checker();
        assert!(c.check("data/browse", FieldType::AsciiDirectoryPathName).is_ok());
        assert!(c.check("data//browse", FieldType::AsciiDirectoryPathName).is_err());
        assert!(c.check("image_01.img", FieldType::AsciiFileName).is_ok());
        assert!(c.check("a.img", FieldType::AsciiFileName).is_ok());
        assert!(c.check("noextension", FieldType::AsciiFileName).is_err());
        assert!(
            c.check("data/browse/image_01.img", FieldType::AsciiFileSpecificationName)
                .is_ok()
        );
        assert!(
            c.check("data/browse/", FieldType::AsciiFileSpecificationName)
                .is_err()
        );
    }

    #[test]
    fn bibcode_grammar() {
        let c = checker();
        assert!(c.check("2019A&A...622A.193A", FieldType::AsciiBibcode).is_ok());
        assert!(c.check("not-a-bibcode", FieldType::AsciiBibcode).is_err());
    }

    #[test]
    fn unspecified_accepts_anything() {
        let c = checker();
        assert!(c.check("anything at all \\s \u{1F600}", FieldType::Unspecified).is_ok());
    }

    proptest! {
        #[test]
        fn any_in_range_integer_lexeme_is_accepted(value in -9_223_372_036_854_775_807i64..=9_223_372_036_854_775_807i64) {
            let c = checker();
            prop_assert!(c.check(&value.to_string(), FieldType::AsciiInteger).is_ok());
        }

        #[test]
        fn zero_padded_integers_are_accepted(value in 0u32..=999_999, pad in 1usize..6) {
            let c = checker();
            let padded = format!("{}{value}", "0".repeat(pad));
            prop_assert!(c.check(&padded, FieldType::AsciiInteger).is_ok());
        }
    }
}
