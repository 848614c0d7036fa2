//! Tailoring progress percentage.

use serde::{Deserialize, Serialize};

/// Error returned for progress values outside 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("progress must be between 0 and 100 (got {0})")]
pub struct ProgressError(pub i64);

/// Completion percentage of an order, always within 0..=100.
///
/// New writes are validated with [`Progress::new`]. Values already stored by
/// older clients are clamped by [`Progress::clamped`] when decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    /// Nothing done yet.
    pub const NONE: Self = Self(0);
    /// Finished.
    pub const DONE: Self = Self(100);

    /// Validate a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError`] when `value` is outside 0..=100.
    pub fn new(value: i64) -> Result<Self, ProgressError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ProgressError(value))
    }

    /// Clamp an arbitrary stored number into range, rounding to the nearest
    /// integer. Non-finite values map to zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self::NONE;
        }
        // Range is checked before the cast.
        Self(value.round().clamp(0.0, 100.0) as u8)
    }

    /// The percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<i64> for Progress {
    type Error = ProgressError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_bounds() {
        assert_eq!(Progress::new(0).unwrap(), Progress::NONE);
        assert_eq!(Progress::new(50).unwrap().value(), 50);
        assert_eq!(Progress::new(100).unwrap(), Progress::DONE);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert_eq!(Progress::new(101), Err(ProgressError(101)));
        assert_eq!(Progress::new(-5), Err(ProgressError(-5)));
    }

    #[test]
    fn test_clamped() {
        assert_eq!(Progress::clamped(140.0).value(), 100);
        assert_eq!(Progress::clamped(-3.0).value(), 0);
        assert_eq!(Progress::clamped(49.6).value(), 50);
        assert_eq!(Progress::clamped(f64::NAN).value(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Progress::new(75).unwrap().to_string(), "75%");
    }
}
