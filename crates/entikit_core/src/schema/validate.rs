//! Field validation rules.

use super::field::{FieldDef, FieldKind, FieldValue};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Relative tolerance when checking step alignment.
const STEP_EPSILON: f64 = 1e-9;

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field was absent or blank.
    MissingValue,
    /// A select value is not one of the declared choices.
    InvalidChoice,
    /// A number is outside its bounds or off its step grid.
    OutOfRange,
    /// A number or date could not be parsed.
    InvalidFormat,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingValue => "missing value",
            Self::InvalidChoice => "invalid choice",
            Self::OutOfRange => "out of range",
            Self::InvalidFormat => "invalid format",
        };
        f.write_str(text)
    }
}

/// Per-field validation failures, keyed by field key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, ErrorKind>);

impl ValidationErrors {
    /// Creates an empty set of failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for a field.
    pub fn insert(&mut self, key: impl Into<String>, kind: ErrorKind) {
        self.0.insert(key.into(), kind);
    }

    /// Returns the failure recorded for a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ErrorKind> {
        self.0.get(key).copied()
    }

    /// Iterates over `(key, kind)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorKind)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns the number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, kind)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {kind}")?;
        }
        Ok(())
    }
}

/// Parses one raw value against its definition.
///
/// Blank input counts as absent. Returns `Ok(None)` for an absent optional
/// field; defaults are applied by the caller.
pub(crate) fn check_field(
    def: &FieldDef,
    raw: Option<&str>,
    date_format: &str,
) -> Result<Option<FieldValue>, ErrorKind> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return if def.is_required() {
            Err(ErrorKind::MissingValue)
        } else {
            Ok(None)
        };
    };
    parse_value(def, raw, date_format).map(Some)
}

/// Parses a non-blank raw value.
pub(crate) fn parse_value(
    def: &FieldDef,
    raw: &str,
    date_format: &str,
) -> Result<FieldValue, ErrorKind> {
    match def.kind() {
        FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Select => {
            if def.choices().contains(raw) {
                Ok(FieldValue::Choice(raw.to_string()))
            } else {
                Err(ErrorKind::InvalidChoice)
            }
        }
        FieldKind::Date => NaiveDate::parse_from_str(raw, date_format)
            .map(FieldValue::Date)
            .map_err(|_| ErrorKind::InvalidFormat),
        FieldKind::Number => {
            let value: f64 = raw.parse().map_err(|_| ErrorKind::InvalidFormat)?;
            if !value.is_finite() {
                return Err(ErrorKind::InvalidFormat);
            }
            check_number(def, value)?;
            Ok(FieldValue::Number(value))
        }
    }
}

fn check_number(def: &FieldDef, value: f64) -> Result<(), ErrorKind> {
    let c = def.constraints();
    if c.min.is_some_and(|min| value < min) || c.max.is_some_and(|max| value > max) {
        return Err(ErrorKind::OutOfRange);
    }
    if let Some(step) = c.step {
        if !on_step(value, c.min.unwrap_or(0.0), step) {
            return Err(ErrorKind::OutOfRange);
        }
    }
    Ok(())
}

/// True if `value = base + k * step` for some integer `k`.
pub(crate) fn on_step(value: f64, base: f64, step: f64) -> bool {
    let steps = (value - base) / step;
    (steps - steps.round()).abs() <= STEP_EPSILON * steps.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{Choices, Constraints};

    fn number(constraints: Constraints) -> FieldDef {
        FieldDef::new(
            "estimate".into(),
            "Estimate".into(),
            FieldKind::Number,
            Choices::new(),
            constraints,
        )
    }

    #[test]
    fn required_blank_is_missing() {
        let def = FieldDef::new(
            "title".into(),
            "Title".into(),
            FieldKind::Text,
            Choices::new(),
            Constraints::new().required(),
        );
        assert_eq!(check_field(&def, None, "%Y-%m-%d"), Err(ErrorKind::MissingValue));
        assert_eq!(check_field(&def, Some("   "), "%Y-%m-%d"), Err(ErrorKind::MissingValue));
    }

    #[test]
    fn optional_blank_is_absent() {
        let def = number(Constraints::new());
        assert_eq!(check_field(&def, Some(""), "%Y-%m-%d"), Ok(None));
    }

    #[test]
    fn step_from_min() {
        let def = number(Constraints::new().min(0.0).step(0.5));
        assert_eq!(
            check_field(&def, Some("1.5"), "%Y-%m-%d"),
            Ok(Some(FieldValue::Number(1.5)))
        );
        assert_eq!(check_field(&def, Some("1.3"), "%Y-%m-%d"), Err(ErrorKind::OutOfRange));
        assert_eq!(check_field(&def, Some("-0.5"), "%Y-%m-%d"), Err(ErrorKind::OutOfRange));
    }

    #[test]
    fn step_base_is_min() {
        let def = number(Constraints::new().min(0.25).step(0.5));
        assert!(check_field(&def, Some("0.75"), "%Y-%m-%d").is_ok());
        assert_eq!(check_field(&def, Some("1.0"), "%Y-%m-%d"), Err(ErrorKind::OutOfRange));
    }

    #[test]
    fn step_without_min_uses_zero() {
        let def = number(Constraints::new().step(0.1));
        assert!(check_field(&def, Some("0.3"), "%Y-%m-%d").is_ok());
        assert!(check_field(&def, Some("-0.7"), "%Y-%m-%d").is_ok());
    }

    #[test]
    fn max_is_inclusive() {
        let def = number(Constraints::new().max(10.0));
        assert!(check_field(&def, Some("10"), "%Y-%m-%d").is_ok());
        assert_eq!(check_field(&def, Some("10.01"), "%Y-%m-%d"), Err(ErrorKind::OutOfRange));
    }

    #[test]
    fn bad_number_format() {
        let def = number(Constraints::new());
        assert_eq!(check_field(&def, Some("abc"), "%Y-%m-%d"), Err(ErrorKind::InvalidFormat));
        assert_eq!(check_field(&def, Some("NaN"), "%Y-%m-%d"), Err(ErrorKind::InvalidFormat));
    }

    #[test]
    fn dates_follow_format() {
        let def = FieldDef::new(
            "due_date".into(),
            "Due".into(),
            FieldKind::Date,
            Choices::new(),
            Constraints::new(),
        );
        assert!(check_field(&def, Some("2024-02-29"), "%Y-%m-%d").is_ok());
        assert_eq!(
            check_field(&def, Some("2023-02-29"), "%Y-%m-%d"),
            Err(ErrorKind::InvalidFormat)
        );
        assert_eq!(
            check_field(&def, Some("29/02/2024"), "%Y-%m-%d"),
            Err(ErrorKind::InvalidFormat)
        );
        assert!(check_field(&def, Some("29/02/2024"), "%d/%m/%Y").is_ok());
    }

    #[test]
    fn select_must_match_choice() {
        let def = FieldDef::new(
            "priority".into(),
            "Priority".into(),
            FieldKind::Select,
            Choices::from([("low", "Low"), ("high", "High")]),
            Constraints::new(),
        );
        assert_eq!(
            check_field(&def, Some("high"), "%Y-%m-%d"),
            Ok(Some(FieldValue::Choice("high".into())))
        );
        assert_eq!(check_field(&def, Some("High"), "%Y-%m-%d"), Err(ErrorKind::InvalidChoice));
    }

    #[test]
    fn errors_display_in_key_order() {
        let mut errors = ValidationErrors::new();
        errors.insert("status", ErrorKind::MissingValue);
        errors.insert("estimate", ErrorKind::OutOfRange);
        assert_eq!(errors.to_string(), "estimate: out of range, status: missing value");
        assert_eq!(errors.len(), 2);
    }
}
