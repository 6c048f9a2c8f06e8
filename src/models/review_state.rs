//! Scheduling state carried between reviews of one concept.
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub repetitions: i64,
    pub ease_factor: f64,
    pub interval_days: i64,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
        }
    }
}

impl ReviewState {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.repetitions < 0 {
            return Err(ValidationError::NegativeRepetitions(self.repetitions));
        }
        if self.interval_days < 0 {
            return Err(ValidationError::NegativeInterval(self.interval_days));
        }
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(ValidationError::InvalidEaseFactor(self.ease_factor));
        }
        Ok(())
    }
}

/// Result of scheduling one review.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub repetitions: i64,
    pub ease_factor: f64,
    pub interval_days: i64,
    pub next_review_at: DateTime<Utc>,
}

impl ScheduledReview {
    pub fn state(&self) -> ReviewState {
        ReviewState {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_valid() {
        assert!(ReviewState::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_fields() {
        let state = ReviewState {
            repetitions: -1,
            ..Default::default()
        };
        assert_eq!(
            state.validate(),
            Err(ValidationError::NegativeRepetitions(-1))
        );

        let state = ReviewState {
            interval_days: -3,
            ..Default::default()
        };
        assert_eq!(state.validate(), Err(ValidationError::NegativeInterval(-3)));
    }

    #[test]
    fn test_rejects_bad_ease_factor() {
        for ef in [1.2, f64::NAN, f64::INFINITY] {
            let state = ReviewState {
                ease_factor: ef,
                ..Default::default()
            };
            assert!(matches!(
                state.validate(),
                Err(ValidationError::InvalidEaseFactor(_))
            ));
        }
    }

    #[test]
    fn test_camel_case_json() {
        let state: ReviewState =
            serde_json::from_str(r#"{"repetitions":2,"easeFactor":2.7,"intervalDays":6}"#)
                .unwrap();
        assert_eq!(state.repetitions, 2);
        assert_eq!(state.interval_days, 6);
    }
}
