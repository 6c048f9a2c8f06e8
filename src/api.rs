//! JSON request/response surface for the scheduler.
//!
//! Request: `{"quality": 4, "priorState": {"repetitions": 1, "easeFactor": 2.5, "intervalDays": 1}}`
//! with an optional RFC 3339 `reviewedAt`. Response:
//! `{"repetitions": 2, "easeFactor": 2.5, "intervalDays": 6, "nextReviewAt": "..."}`.

use crate::error::{Result, ValidationError};
use crate::models::sm2::schedule_review;
use crate::models::{ReviewQuality, ReviewState, ScheduledReview};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduleRequest {
    /// Kept wide so an out-of-range grade is a validation error, not a parse error
    pub quality: i64,
    pub prior_state: ReviewState,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

pub type ScheduleResponse = ScheduledReview;

impl ScheduleRequest {
    pub fn schedule(&self, now: DateTime<Utc>) -> std::result::Result<ScheduleResponse, ValidationError> {
        let quality = ReviewQuality::try_from(self.quality)?;
        schedule_review(&self.prior_state, quality, self.reviewed_at.unwrap_or(now))
    }
}

/// Parses a JSON request body, schedules it, and returns the JSON response body
pub fn handle_schedule_request(body: &str, now: DateTime<Utc>) -> Result<String> {
    let request: ScheduleRequest = serde_json::from_str(body).map_err(|e| {
        warn!("Rejected schedule request: {}", e);
        ValidationError::Malformed(e.to_string())
    })?;

    let response = request.schedule(now).inspect_err(|e| {
        warn!("Rejected schedule request: {}", e);
    })?;

    Ok(serde_json::to_string(&response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;
    use serde_json::Value;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_handle_request() {
        let body = r#"{"quality": 5, "priorState": {"repetitions": 0, "easeFactor": 2.5, "intervalDays": 0}}"#;
        let response: Value = serde_json::from_str(&handle_schedule_request(body, now()).unwrap()).unwrap();

        assert_eq!(response["repetitions"], 1);
        assert_eq!(response["intervalDays"], 1);
        assert!((response["easeFactor"].as_f64().unwrap() - 2.6).abs() < 1e-9);
        assert_eq!(response["nextReviewAt"], "2024-05-07T12:00:00Z");
    }

    #[test]
    fn test_reviewed_at_overrides_now() {
        let body = r#"{
            "quality": 4,
            "priorState": {"repetitions": 1, "easeFactor": 2.5, "intervalDays": 1},
            "reviewedAt": "2024-01-01T00:00:00Z"
        }"#;
        let response: Value = serde_json::from_str(&handle_schedule_request(body, now()).unwrap()).unwrap();
        assert_eq!(response["intervalDays"], 6);
        assert_eq!(response["nextReviewAt"], "2024-01-07T00:00:00Z");
    }

    #[test]
    fn test_quality_out_of_range() {
        let body = r#"{"quality": 7, "priorState": {"repetitions": 0, "easeFactor": 2.5, "intervalDays": 0}}"#;
        let err = handle_schedule_request(body, now()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::QualityOutOfRange(7))
        ));
    }

    #[test]
    fn test_malformed_prior_state() {
        for body in [
            r#"{"quality": 3}"#,
            r#"{"quality": 3, "priorState": {"repetitions": "two", "easeFactor": 2.5, "intervalDays": 0}}"#,
            r#"not json"#,
        ] {
            let err = handle_schedule_request(body, now()).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::Malformed(_))));
        }

        let negative = r#"{"quality": 3, "priorState": {"repetitions": 0, "easeFactor": 2.5, "intervalDays": -4}}"#;
        assert!(matches!(
            handle_schedule_request(negative, now()).unwrap_err(),
            Error::Validation(ValidationError::NegativeInterval(-4))
        ));
    }
}
