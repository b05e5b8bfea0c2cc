//! Field definitions and typed field values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Validated values of one schema, keyed by field key.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Unvalidated input values, keyed by field key.
pub type RawValues = BTreeMap<String, String>;

/// The input kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// One value out of a fixed set of choices.
    Select,
    /// A calendar date.
    Date,
    /// A number, optionally bounded and stepped.
    Number,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Select => "select",
            Self::Date => "date",
            Self::Number => "number",
        };
        f.write_str(name)
    }
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Value of a text field.
    Text(String),
    /// Selected choice value of a select field.
    Choice(String),
    /// Value of a date field.
    Date(NaiveDate),
    /// Value of a number field.
    Number(f64),
}

impl FieldValue {
    /// Returns the string for text and choice values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the date of a date value.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the number of a number value.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Renders the value back into raw input form.
    #[must_use]
    pub fn to_raw(&self, date_format: &str) -> String {
        match self {
            Self::Date(d) => d.format(date_format).to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Ordered `value -> label` choices of a select field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices(Vec<(String, String)>);

impl Choices {
    /// Creates an empty choice list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a choice.
    #[must_use]
    pub fn with(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.0.push((value.into(), label.into()));
        self
    }

    /// Returns true if `value` is one of the choices.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|(v, _)| v == value)
    }

    /// Returns the label of a choice value.
    #[must_use]
    pub fn label_of(&self, value: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, l)| l.as_str())
    }

    /// Iterates over `(value, label)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(v, l)| (v.as_str(), l.as_str()))
    }

    /// Iterates over choice values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(v, _)| v.as_str())
    }

    /// Returns the number of choices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no choices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn has_duplicates(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .any(|(i, (v, _))| self.0[..i].iter().any(|(w, _)| w == v))
    }
}

impl<V: Into<String>, L: Into<String>, const N: usize> From<[(V, L); N]> for Choices {
    fn from(pairs: [(V, L); N]) -> Self {
        Self(pairs.into_iter().map(|(v, l)| (v.into(), l.into())).collect())
    }
}

/// Validation constraints of a field.
///
/// # Example
///
/// ```rust
/// use entikit_core::Constraints;
///
/// let estimate = Constraints::new().min(0.0).step(0.5);
/// let status = Constraints::new().required().default_value("pending");
/// assert!(status.required);
/// assert_eq!(estimate.step, Some(0.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Absent or blank input is rejected.
    pub required: bool,
    /// Raw value used when the field has no stored or supplied value.
    pub default: Option<String>,
    /// Inclusive lower bound (number fields).
    pub min: Option<f64>,
    /// Inclusive upper bound (number fields).
    pub max: Option<f64>,
    /// Values must be `base + k * step` where `base` is `min` or zero.
    pub step: Option<f64>,
}

impl Constraints {
    /// Creates an unconstrained field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default raw value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the lower bound.
    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the step.
    #[must_use]
    pub const fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    fn has_numeric_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some() || self.step.is_some()
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    key: String,
    label: String,
    kind: FieldKind,
    choices: Choices,
    constraints: Constraints,
    default: Option<FieldValue>,
}

impl FieldDef {
    pub(crate) fn new(
        key: String,
        label: String,
        kind: FieldKind,
        choices: Choices,
        constraints: Constraints,
    ) -> Self {
        Self {
            key,
            label,
            kind,
            choices,
            constraints,
            default: None,
        }
    }

    /// Checks that the definition is self-consistent.
    ///
    /// Returns the reason it is not.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.key.is_empty() || self.key.contains('.') || self.key.contains(char::is_whitespace)
        {
            return Err("key must be non-empty without dots or whitespace".into());
        }
        match self.kind {
            FieldKind::Select if self.choices.is_empty() => {
                return Err("select field needs at least one choice".into());
            }
            FieldKind::Select if self.choices.has_duplicates() => {
                return Err("duplicate choice value".into());
            }
            FieldKind::Select => {}
            _ if !self.choices.is_empty() => {
                return Err(format!("{} field cannot have choices", self.kind));
            }
            _ => {}
        }
        if self.kind != FieldKind::Number && self.constraints.has_numeric_bounds() {
            return Err(format!("{} field cannot have min, max or step", self.kind));
        }
        if let Some(step) = self.constraints.step {
            if !(step.is_finite() && step > 0.0) {
                return Err("step must be a positive number".into());
            }
        }
        if let (Some(min), Some(max)) = (self.constraints.min, self.constraints.max) {
            if min > max {
                return Err("min is greater than max".into());
            }
        }
        Ok(())
    }

    pub(crate) fn set_default(&mut self, default: Option<FieldValue>) {
        self.default = default;
    }

    /// Returns the field key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns the choices (empty unless the field is a select).
    #[must_use]
    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Returns true if the field is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.constraints.required
    }

    /// Returns the typed default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(kind: FieldKind, choices: Choices, constraints: Constraints) -> FieldDef {
        FieldDef::new("k".into(), "K".into(), kind, choices, constraints)
    }

    #[test]
    fn choices_keep_order() {
        let choices = Choices::from([("low", "Low"), ("medium", "Medium"), ("high", "High")]);
        let values: Vec<_> = choices.values().collect();
        assert_eq!(values, vec!["low", "medium", "high"]);
        assert_eq!(choices.label_of("medium"), Some("Medium"));
        assert!(!choices.contains("urgent"));
    }

    #[test]
    fn select_without_choices_is_invalid() {
        let field = def(FieldKind::Select, Choices::new(), Constraints::new());
        assert!(field.check().is_err());
    }

    #[test]
    fn text_with_choices_is_invalid() {
        let field = def(FieldKind::Text, Choices::from([("a", "A")]), Constraints::new());
        assert!(field.check().is_err());
    }

    #[test]
    fn bounds_only_on_numbers() {
        assert!(def(FieldKind::Date, Choices::new(), Constraints::new().min(1.0))
            .check()
            .is_err());
        assert!(def(FieldKind::Number, Choices::new(), Constraints::new().min(1.0))
            .check()
            .is_ok());
    }

    #[test]
    fn step_must_be_positive() {
        assert!(def(FieldKind::Number, Choices::new(), Constraints::new().step(0.0))
            .check()
            .is_err());
        assert!(def(FieldKind::Number, Choices::new(), Constraints::new().step(-1.0))
            .check()
            .is_err());
    }

    #[test]
    fn dotted_key_is_invalid() {
        let field = FieldDef::new(
            "a.b".into(),
            "AB".into(),
            FieldKind::Text,
            Choices::new(),
            Constraints::new(),
        );
        assert!(field.check().is_err());
    }

    #[test]
    fn value_rendering() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(FieldValue::Date(date).to_string(), "2024-02-29");
        assert_eq!(FieldValue::Date(date).to_raw("%d/%m/%Y"), "29/02/2024");
        assert_eq!(FieldValue::Number(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Number(2.0).to_string(), "2");
        assert_eq!(FieldValue::Choice("high".into()).as_str(), Some("high"));
    }
}
