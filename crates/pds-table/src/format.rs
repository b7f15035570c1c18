//! Field format checks against `%[+|-]<width>[.<precision>]<specifier>`
//! specifiers declared in the label.

use pds_model::{ProblemType, Severity};
use regex::Regex;

/// A parsed field format specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub justification: Option<Justification>,
    pub width: usize,
    pub precision: Option<usize>,
    pub specifier: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    /// `+`: the value must carry no trailing whitespace.
    Right,
    /// `-`: the value must carry no leading whitespace.
    Left,
}

/// One finding from a format check, not yet located at a record/field.
#[derive(Debug, Clone)]
pub struct FormatFinding {
    pub severity: Severity,
    pub kind: ProblemType,
    pub message: String,
}

impl FormatFinding {
    fn error(kind: ProblemType, message: String) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message,
        }
    }
}

pub struct FormatChecker {
    specifier: Regex,
    leading_whitespace: Regex,
    trailing_whitespace: Regex,
    exponential: Regex,
    decimal: Regex,
    integer: Regex,
}

impl FormatChecker {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("valid pattern");
        Self {
            specifier: compile(r"^%([+-])?([0-9]+)(\.([0-9]+))?([doxfeEs])$"),
            leading_whitespace: compile(r"^\s+.*$"),
            trailing_whitespace: compile(r"^[\s\S]*\s+$"),
            exponential: compile(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)[Ee][+-]?[0-9]+$"),
            decimal: compile(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$"),
            integer: compile(r"^[+-]?[0-9]+$"),
        }
    }

    /// Parse a format string; `None` when it is not of the supported shape
    /// (in which case no format checking is performed).
    pub fn parse(&self, format: &str) -> Option<FormatSpec> {
        let caps = self.specifier.captures(format)?;
        let justification = caps.get(1).map(|m| match m.as_str() {
            "+" => Justification::Right,
            _ => Justification::Left,
        });
        let width = caps.get(2)?.as_str().parse().ok()?;
        let precision = match caps.get(4) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        let specifier = caps.get(5)?.as_str().chars().next()?;
        Some(FormatSpec {
            justification,
            width,
            precision,
            specifier,
        })
    }

    /// Check a raw field value against its declared format. Justification is
    /// judged on the untrimmed value; width and numeric checks on the
    /// trimmed one. A fully clean value yields a single Debug confirmation.
    pub fn check(&self, value: &str, format: &str) -> Vec<FormatFinding> {
        let Some(spec) = self.parse(format) else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        let trimmed = value.trim();

        match spec.justification {
            Some(Justification::Right) => {
                if self.trailing_whitespace.is_match(value) {
                    findings.push(FormatFinding::error(
                        ProblemType::FieldValueNotRightJustified,
                        format!("the value '{value}' is not right-justified"),
                    ));
                }
            }
            Some(Justification::Left) => {
                if self.leading_whitespace.is_match(value) {
                    findings.push(FormatFinding::error(
                        ProblemType::FieldValueNotLeftJustified,
                        format!("the value '{value}' is not left-justified"),
                    ));
                }
            }
            None => {}
        }

        if let Err(reason) = self.specifier_accepts(spec.specifier, trimmed) {
            findings.push(FormatFinding::error(
                ProblemType::FieldValueFormatSpecifierMismatch,
                format!(
                    "the value '{trimmed}' does not match the defined field format \
                     specifier '{}': {reason}",
                    spec.specifier
                ),
            ));
        }

        if trimmed.chars().count() > spec.width {
            findings.push(FormatFinding::error(
                ProblemType::FieldValueTooLong,
                format!(
                    "the length of the value '{trimmed}' exceeds the max width set in \
                     the defined field format (max {}, got {})",
                    spec.width,
                    trimmed.chars().count()
                ),
            ));
        }

        if let Some(precision) = spec.precision {
            if matches!(spec.specifier, 'f' | 'e' | 'E') {
                let mantissa = trimmed
                    .split(['e', 'E'])
                    .next()
                    .unwrap_or(trimmed);
                let digits = match mantissa.find('.') {
                    Some(index) => mantissa.len() - index - 1,
                    None => 0,
                };
                if digits != precision {
                    findings.push(FormatFinding::error(
                        ProblemType::FieldValueFormatPrecisionMismatch,
                        format!(
                            "the number of digits to the right of the decimal point in \
                             the value '{trimmed}' does not equal the precision set in \
                             the defined field format (expected {precision}, got {digits})"
                        ),
                    ));
                }
            }
        }

        if findings.is_empty() {
            findings.push(FormatFinding {
                severity: Severity::Debug,
                kind: ProblemType::FieldValueFormatMatch,
                message: format!(
                    "value '{value}' conforms to the defined field format '{format}'"
                ),
            });
        }
        findings
    }

    fn specifier_accepts(&self, specifier: char, trimmed: &str) -> Result<(), String> {
        match specifier {
            'e' | 'E' => {
                if !self.exponential.is_match(trimmed) || trimmed.parse::<f64>().is_err() {
                    return Err("value does not match pattern".to_string());
                }
            }
            'f' => {
                if !self.decimal.is_match(trimmed) || trimmed.parse::<f64>().is_err() {
                    return Err("value does not match pattern".to_string());
                }
            }
            'd' => {
                if !self.integer.is_match(trimmed) {
                    return Err("value is not an integer".to_string());
                }
            }
            'o' | 'x' => {
                if !self.integer.is_match(trimmed) {
                    return Err("value is not an integer".to_string());
                }
                if trimmed.starts_with('-') {
                    return Err("value must be unsigned".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for FormatChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(findings: &[FormatFinding]) -> Vec<ProblemType> {
        findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn parses_full_specifier() {
        let checker = FormatChecker::new();
        let spec = checker.parse("%+8.2f").expect("parses");
        assert_eq!(spec.justification, Some(Justification::Right));
        assert_eq!(spec.width, 8);
        assert_eq!(spec.precision, Some(2));
        assert_eq!(spec.specifier, 'f');
        assert!(checker.parse("8.2f").is_none());
        assert!(checker.parse("%8q").is_none());
    }

    #[test]
    fn right_justified_decimal_passes() {
        let checker = FormatChecker::new();
        let findings = checker.check("  3.14", "%+8.2f");
        assert_eq!(kinds(&findings), vec![ProblemType::FieldValueFormatMatch]);
        assert_eq!(findings[0].severity, Severity::Debug);
    }

    #[test]
    fn precision_mismatch_is_reported() {
        let checker = FormatChecker::new();
        let findings = checker.check("3.140", "%+8.2f");
        assert_eq!(
            kinds(&findings),
            vec![ProblemType::FieldValueFormatPrecisionMismatch]
        );
    }

    #[test]
    fn trailing_whitespace_fails_right_justification() {
        let checker = FormatChecker::new();
        let findings = checker.check("3.14  ", "%+8.2f");
        assert_eq!(
            kinds(&findings),
            vec![ProblemType::FieldValueNotRightJustified]
        );
    }

    #[test]
    fn leading_whitespace_fails_left_justification() {
        let checker = FormatChecker::new();
        let findings = checker.check(" abc", "%-6s");
        assert_eq!(
            kinds(&findings),
            vec![ProblemType::FieldValueNotLeftJustified]
        );
    }

    #[test]
    fn width_overflow_is_reported() {
        let checker = FormatChecker::new();
        let findings = checker.check("123456", "%4d");
        assert_eq!(kinds(&findings), vec![ProblemType::FieldValueTooLong]);
    }

    #[test]
    fn exponential_requires_exponent() {
        let checker = FormatChecker::new();
        let findings = checker.check("1.25e-3", "%10.2e");
        assert_eq!(kinds(&findings), vec![ProblemType::FieldValueFormatMatch]);
        let findings = checker.check("1.25", "%10.2e");
        assert_eq!(
            kinds(&findings),
            vec![ProblemType::FieldValueFormatSpecifierMismatch]
        );
    }

    #[test]
    fn octal_and_hex_must_be_unsigned() {
        let checker = FormatChecker::new();
        let findings = checker.check("-17", "%5o");
        assert_eq!(
            kinds(&findings),
            vec![ProblemType::FieldValueFormatSpecifierMismatch]
        );
        let findings = checker.check("17", "%5x");
        assert_eq!(kinds(&findings), vec![ProblemType::FieldValueFormatMatch]);
    }

    #[test]
    fn unsupported_format_string_checks_nothing() {
        let checker = FormatChecker::new();
        assert!(checker.check("anything", "not-a-format").is_empty());
    }
}
