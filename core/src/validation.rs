//! Client-side parameter validation mirroring the server's rules.
//!
//! # Design
//! The rule table is a static slice keyed by JSON parameter name. Callers
//! hand in `(name, FieldValue)` pairs, either from `Request::fields` or from
//! a raw JSON map, and every violation is collected before failing so the
//! caller sees the whole list at once.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Aggregate of every rule violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", .errors.join("; "))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, ParamType::Integer | ParamType::Number)
    }
}

/// Named string formats a parameter may be required to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
    Ip,
    Date,
    HexColor,
}

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://.+").unwrap());
static IP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$|^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$",
    )
    .unwrap()
});
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static HEX_COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

impl Format {
    /// Name used in violation messages.
    pub fn name(self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::Url => "url",
            Format::Ip => "ip",
            Format::Date => "date",
            Format::HexColor => "hexColor",
        }
    }

    pub fn matches(self, value: &str) -> bool {
        let pattern = match self {
            Format::Email => &EMAIL_PATTERN,
            Format::Url => &URL_PATTERN,
            Format::Ip => &IP_PATTERN,
            Format::Date => &DATE_PATTERN,
            Format::HexColor => &HEX_COLOR_PATTERN,
        };
        pattern.is_match(value)
    }
}

/// Constraints attached to one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationRule {
    pub param_type: ParamType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<Format>,
    pub enum_values: &'static [&'static str],
}

impl ValidationRule {
    pub const fn of(param_type: ParamType) -> Self {
        Self {
            param_type,
            required: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            format: None,
            enum_values: &[],
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub const fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = values;
        self
    }
}

/// Rules enforced by the WebP Converter endpoint, in parameter order.
pub const RULES: &[(&str, ValidationRule)] = &[
    ("image", ValidationRule::of(ParamType::String).required()),
    ("outputFormat", ValidationRule::of(ParamType::String).required()),
    ("quality", ValidationRule::of(ParamType::Integer).range(1.0, 100.0)),
    ("maxWidth", ValidationRule::of(ParamType::Integer).range(1.0, 10000.0)),
    ("maxHeight", ValidationRule::of(ParamType::Integer).range(1.0, 10000.0)),
];

pub fn rule_for(name: &str) -> Option<&'static ValidationRule> {
    RULES.iter().find(|(n, _)| *n == name).map(|(_, rule)| rule)
}

/// A parameter value as seen by the rule checks.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Absent,
    Text(Cow<'a, str>),
    Number(f64),
}

impl<'a> FieldValue<'a> {
    /// Empty strings count as absent.
    pub fn text(value: &'a str) -> Self {
        if value.is_empty() {
            FieldValue::Absent
        } else {
            FieldValue::Text(Cow::Borrowed(value))
        }
    }

    pub fn number<N: Into<f64>>(value: Option<N>) -> Self {
        value.map_or(FieldValue::Absent, |n| FieldValue::Number(n.into()))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// True for absent values, empty strings and numeric zero.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Number(n) => *n == 0.0,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Absent => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Check named values against `RULES`. Names without a rule are ignored.
pub fn validate_fields<'a, I>(fields: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = (&'a str, FieldValue<'a>)>,
{
    let mut errors = Vec::new();
    for (name, value) in fields {
        if let Some(rule) = rule_for(name) {
            check_field(name, rule, &value, &mut errors);
        }
    }
    finish(errors)
}

/// Check a raw parameter map against `RULES`.
///
/// Numeric rules accept JSON numbers or strings that parse as finite
/// numbers; any other non-null value fails as `must be a valid <type>`.
/// Values of other JSON types under string rules are compared by their
/// string form.
pub fn validate_params(params: &Map<String, Value>) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    for (name, rule) in RULES {
        let value = match params.get(*name) {
            None | Some(Value::Null) => FieldValue::Absent,
            Some(raw) if rule.param_type.is_numeric() => match numeric_value(raw) {
                Some(n) => FieldValue::Number(n),
                None => {
                    errors.push(format!(
                        "Parameter [{name}] must be a valid {}",
                        rule.param_type.as_str()
                    ));
                    continue;
                }
            },
            Some(Value::String(s)) => FieldValue::text(s),
            Some(other) => FieldValue::Text(Cow::Owned(other.to_string())),
        };
        check_field(name, rule, &value, &mut errors);
    }
    finish(errors)
}

fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn finish(errors: Vec<String>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

fn check_field(name: &str, rule: &ValidationRule, value: &FieldValue<'_>, errors: &mut Vec<String>) {
    if value.is_absent() {
        if rule.required {
            errors.push(format!("Required parameter [{name}] is missing"));
        }
        return;
    }

    match (rule.param_type, value) {
        (ParamType::Integer | ParamType::Number, FieldValue::Number(n)) => {
            if let Some(min) = rule.min.filter(|min| *n < *min) {
                errors.push(format!("Parameter [{name}] must be at least {min}"));
            }
            if let Some(max) = rule.max.filter(|max| *n > *max) {
                errors.push(format!("Parameter [{name}] must be at most {max}"));
            }
        }
        (ParamType::String, FieldValue::Text(s)) => {
            let len = s.chars().count();
            if let Some(min) = rule.min_length.filter(|min| len < *min) {
                errors.push(format!("Parameter [{name}] must be at least {min} characters"));
            }
            if let Some(max) = rule.max_length.filter(|max| len > *max) {
                errors.push(format!("Parameter [{name}] must be at most {max} characters"));
            }
            if let Some(format) = rule.format.filter(|format| !format.matches(s)) {
                errors.push(format!("Parameter [{name}] must be a valid {}", format.name()));
            }
        }
        _ => {}
    }

    if !rule.enum_values.is_empty() {
        let repr = value.to_string();
        if !rule.enum_values.contains(&repr.as_str()) {
            errors.push(format!(
                "Parameter [{name}] must be one of: {}",
                rule.enum_values.join(", ")
            ));
        }
    }
}
