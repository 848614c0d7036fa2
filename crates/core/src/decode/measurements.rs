//! Body measurement decoding.
//!
//! Accepted shapes:
//! - an object `{ "chest": "40", "waist": 32 }`
//! - an array of part names `["chest", "waist"]` (values unknown)
//! - an array of `{ "part": .., "value": .. }` objects
//! - a free-form string `"chest: 40, waist = 32"`; entries are separated by
//!   commas, semicolons or newlines

use serde::Deserialize;
use serde_json::Value;

use super::{Problem, scalar_text, shape_of};
use crate::models::{Measurement, Measurements};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMeasurements {
    Text(String),
    Map(serde_json::Map<String, Value>),
    List(Vec<RawEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Part(String),
    Pair {
        #[serde(alias = "name")]
        part: String,
        #[serde(default)]
        value: Value,
    },
}

/// Decode a measurements value; `None` decodes as empty.
///
/// # Errors
///
/// Returns a [`Problem`] for unrecognized shapes, including non-scalar
/// measurement values.
pub fn decode(value: Option<&Value>) -> Result<Measurements, Problem> {
    let Some(value) = value else {
        return Ok(Measurements::default());
    };
    let raw = RawMeasurements::deserialize(value)
        .map_err(|_| Problem::UnexpectedShape(shape_of(value)))?;

    let entries = match raw {
        RawMeasurements::Text(text) => parse_text(&text),
        RawMeasurements::Map(map) => map
            .into_iter()
            .map(|(part, value)| entry(part, &value))
            .collect::<Result<_, _>>()?,
        RawMeasurements::List(items) => items
            .into_iter()
            .map(|item| match item {
                RawEntry::Part(part) => Ok(Measurement::new(part, String::new())),
                RawEntry::Pair { part, value } => entry(part, &value),
            })
            .collect::<Result<_, _>>()?,
    };

    Ok(Measurements::from_entries(entries))
}

fn entry(part: String, value: &Value) -> Result<Measurement, Problem> {
    let value = scalar_text(value).ok_or(Problem::UnexpectedShape(shape_of(value)))?;
    Ok(Measurement::new(part, value))
}

fn parse_text(text: &str) -> Vec<Measurement> {
    text.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once([':', '=']) {
            Some((part, value)) => Measurement::new(part.trim(), value.trim()),
            None => Measurement::new(item, ""),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pairs(measurements: &Measurements) -> Vec<(&str, &str)> {
        measurements
            .iter()
            .map(|m| (m.part.as_str(), m.value.as_str()))
            .collect()
    }

    #[test]
    fn test_object_form() {
        let decoded = decode(Some(&json!({ "chest": "40", "waist": 32 }))).unwrap();
        assert_eq!(pairs(&decoded), vec![("chest", "40"), ("waist", "32")]);
    }

    #[test]
    fn test_array_forms() {
        let decoded = decode(Some(&json!(["neck", "sleeve"]))).unwrap();
        assert_eq!(pairs(&decoded), vec![("neck", ""), ("sleeve", "")]);

        let decoded = decode(Some(&json!([{ "part": "hips", "value": 38 }]))).unwrap();
        assert_eq!(pairs(&decoded), vec![("hips", "38")]);
    }

    #[test]
    fn test_string_form() {
        let decoded = decode(Some(&json!("chest: 40, waist=32\nlength"))).unwrap();
        assert_eq!(
            pairs(&decoded),
            vec![("chest", "40"), ("waist", "32"), ("length", "")]
        );
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = decode(Some(&json!({ "chest": { "cm": 100 } }))).unwrap_err();
        assert_eq!(err, Problem::UnexpectedShape("object"));
        assert!(decode(Some(&json!(12))).is_err());
    }
}
