//! Decoding boundary for backend documents.
//!
//! Documents written by different generations of the app do not agree on
//! their shapes: `status` may be a string or an object, `measurements` an
//! object, an array or a free-form string, timestamps strings, numbers or
//! `{seconds, nanoseconds}` maps. Every model decodes through this module so
//! that views only ever see one canonical representation.
//!
//! Shapes that match none of the known forms produce a [`DecodeError`] naming
//! the document and field; they are never special-cased further downstream.

pub mod measurements;
pub mod progress;
pub mod status;
pub mod timestamp;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::Price;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// What was wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A required field is absent or null.
    Missing,
    /// The value has a shape none of the decoders accept.
    UnexpectedShape(&'static str),
    /// The shape is right but the content is not a known value.
    InvalidValue(String),
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("is missing"),
            Self::UnexpectedShape(found) => write!(f, "has an unrecognized shape ({found})"),
            Self::InvalidValue(value) => write!(f, "has an invalid value: {value}"),
        }
    }
}

/// A document could not be normalized into its canonical model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document {document}: field `{field}` {problem}")]
pub struct DecodeError {
    /// ID of the offending document.
    pub document: String,
    /// Field path inside the document.
    pub field: String,
    /// What was wrong.
    pub problem: Problem,
}

/// A model that can be decoded from a stored document.
pub trait DecodeDocument: Sized {
    /// Decode the document with the given ID and fields.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when a field is missing or has an unrecognized
    /// shape.
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError>;
}

/// Short description of a JSON value's type, for error messages.
#[must_use]
pub const fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serde helper that treats an explicit `null` like an absent field.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Render a scalar as text; `None` for arrays and objects.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a number or numeric string.
///
/// # Errors
///
/// Returns a [`Problem`] for other shapes or unparsable text.
pub fn number(value: &Value) -> Result<f64, Problem> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Problem::InvalidValue(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Problem::InvalidValue(s.clone())),
        other => Err(Problem::UnexpectedShape(shape_of(other))),
    }
}

/// Parse a price from a number or numeric string.
///
/// # Errors
///
/// Returns a [`Problem`] for other shapes, unparsable text, or negative
/// amounts.
pub fn price(value: &Value) -> Result<Price, Problem> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_owned(),
        other => return Err(Problem::UnexpectedShape(shape_of(other))),
    };
    let amount = text
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| Problem::InvalidValue(text.clone()))?;
    Price::new(amount).ok_or(Problem::InvalidValue(text))
}

/// Typed access to the fields of one document.
///
/// Every accessor attaches the document ID and field name to failures.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    id: &'a str,
    fields: &'a Fields,
}

impl<'a> FieldReader<'a> {
    /// Wrap a document's fields.
    #[must_use]
    pub const fn new(id: &'a str, fields: &'a Fields) -> Self {
        Self { id, fields }
    }

    /// The document ID.
    #[must_use]
    pub const fn id(&self) -> &'a str {
        self.id
    }

    /// Raw value of a field, treating `null` as absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Raw value of the first present field among `names`.
    #[must_use]
    pub fn first(&self, names: &[&str]) -> Option<&'a Value> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Build a [`DecodeError`] for a field.
    #[must_use]
    pub fn error(&self, field: &str, problem: Problem) -> DecodeError {
        DecodeError {
            document: self.id.to_owned(),
            field: field.to_owned(),
            problem,
        }
    }

    /// Apply a decoder to a field, attaching context to its failure.
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`Problem`] as a [`DecodeError`].
    pub fn with<T>(
        &self,
        field: &str,
        decode: impl FnOnce(Option<&'a Value>) -> Result<T, Problem>,
    ) -> Result<T, DecodeError> {
        decode(self.get(field)).map_err(|problem| self.error(field, problem))
    }

    /// A required string field, accepting legacy aliases after the primary name.
    ///
    /// # Errors
    ///
    /// Returns an error when none of the names is present or the value is not
    /// a scalar.
    pub fn string(&self, names: &[&str]) -> Result<String, DecodeError> {
        let primary = names.first().copied().unwrap_or_default();
        self.opt_string(names)?
            .ok_or_else(|| self.error(primary, Problem::Missing))
    }

    /// An optional string field, accepting legacy aliases.
    ///
    /// Numbers and booleans are rendered as text; empty strings count as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is an array or object.
    pub fn opt_string(&self, names: &[&str]) -> Result<Option<String>, DecodeError> {
        for name in names {
            if let Some(value) = self.get(name) {
                let text = scalar_text(value)
                    .ok_or_else(|| self.error(name, Problem::UnexpectedShape(shape_of(value))))?;
                if !text.trim().is_empty() {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }

    /// An optional string field that defaults to empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is an array or object.
    pub fn text(&self, names: &[&str]) -> Result<String, DecodeError> {
        Ok(self.opt_string(names)?.unwrap_or_default())
    }

    /// A list of strings; absent means empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not an array of scalars.
    pub fn string_list(&self, field: &str) -> Result<Vec<String>, DecodeError> {
        self.with(field, |value| match value {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| scalar_text(item).ok_or(Problem::UnexpectedShape(shape_of(item))))
                .filter(|item| !matches!(item, Ok(s) if s.trim().is_empty()))
                .collect(),
            Some(other) => Err(Problem::UnexpectedShape(shape_of(other))),
        })
    }

    /// An optional timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error when present in an unrecognized shape.
    pub fn timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, DecodeError> {
        self.with(field, |value| value.map(timestamp::decode).transpose())
    }

    /// An optional number.
    ///
    /// # Errors
    ///
    /// Returns an error when present but not numeric.
    pub fn number(&self, field: &str) -> Result<Option<f64>, DecodeError> {
        self.with(field, |value| value.map(number).transpose())
    }
}
