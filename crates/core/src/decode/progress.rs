//! Progress decoding.
//!
//! `progress` is a number in most documents, sometimes a numeric string
//! (written straight from a form input), sometimes `{ "value": n }`, and in
//! a few documents an array of history steps. History steps may also live
//! in a separate `progressHistory` array.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{Problem, number, scalar_text, shape_of, timestamp};
use crate::types::Progress;

/// One recorded step of an order's progress history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStep {
    /// Free-form step label, e.g. "Cutting done".
    pub label: String,
    /// When the step was recorded, if known.
    pub at: Option<DateTime<Utc>>,
}

/// Canonical progress: a percentage plus any recorded history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedProgress {
    /// Completion percentage.
    pub percent: Progress,
    /// History steps in stored order.
    pub history: Vec<ProgressStep>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Nested { value: Value },
    History(Vec<RawStep>),
    Scalar(Value),
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default, alias = "label")]
    status: Value,
    #[serde(default, alias = "at")]
    time: Value,
}

/// Decode the `progress` field.
///
/// A missing, null or blank value is 0%.
///
/// # Errors
///
/// Returns a [`Problem`] for unrecognized shapes or non-numeric text.
pub fn decode(value: Option<&Value>) -> Result<DecodedProgress, Problem> {
    let Some(value) = value.filter(|v| !is_blank(v)) else {
        return Ok(DecodedProgress::default());
    };
    let raw =
        RawProgress::deserialize(value).map_err(|_| Problem::UnexpectedShape(shape_of(value)))?;

    match raw {
        RawProgress::Scalar(scalar) if matches!(scalar, Value::Number(_) | Value::String(_)) => {
            Ok(DecodedProgress {
                percent: Progress::clamped(number(&scalar)?),
                history: Vec::new(),
            })
        }
        RawProgress::Nested { value } => Ok(DecodedProgress {
            percent: Progress::clamped(number(&value)?),
            history: Vec::new(),
        }),
        RawProgress::History(steps) => Ok(DecodedProgress {
            percent: Progress::NONE,
            history: steps.into_iter().map(step).collect::<Result<_, _>>()?,
        }),
        RawProgress::Scalar(other) => Err(Problem::UnexpectedShape(shape_of(&other))),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Decode a standalone history array.
///
/// # Errors
///
/// Returns a [`Problem`] when the value is not an array of steps.
pub fn decode_history(value: Option<&Value>) -> Result<Vec<ProgressStep>, Problem> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => {
            let steps = Vec::<RawStep>::deserialize(value)
                .map_err(|_| Problem::UnexpectedShape(shape_of(value)))?;
            steps.into_iter().map(step).collect()
        }
    }
}

fn step(raw: RawStep) -> Result<ProgressStep, Problem> {
    let label = match &raw.status {
        Value::Object(map) => map.get("status").and_then(scalar_text),
        other => scalar_text(other),
    }
    .ok_or(Problem::UnexpectedShape(shape_of(&raw.status)))?;
    let at = match &raw.time {
        Value::Null => None,
        other => Some(timestamp::decode(other)?),
    };
    Ok(ProgressStep { label, at })
}
