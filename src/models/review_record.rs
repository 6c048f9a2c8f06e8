//! Persisted per-student review progress.
use super::{ReviewQuality, ReviewState};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review progress of one student on one concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub student_id: String,
    pub concept_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub interval_days: i64,
    pub repetitions: i64,
    pub ease_factor: f64,
    /// None until the concept has been reviewed once
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// A freshly enrolled concept, due immediately.
    pub fn new(
        student_id: &str,
        concept_id: &str,
        subject_id: Option<&str>,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        let state = ReviewState::default();
        Self {
            student_id: student_id.to_string(),
            concept_id: concept_id.to_string(),
            subject_id: subject_id.map(str::to_string),
            interval_days: state.interval_days,
            repetitions: state.repetitions,
            ease_factor: state.ease_factor,
            last_reviewed_at: None,
            next_review_at: enrolled_at,
        }
    }

    pub fn state(&self) -> ReviewState {
        ReviewState {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
        }
    }

    /// Checks the scheduling state and that the next review follows the last one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.state().validate()?;
        match self.last_reviewed_at {
            Some(last) if self.next_review_at <= last => Err(ValidationError::ReviewOrder {
                last,
                next: self.next_review_at,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// One graded review, appended to the history on each submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub student_id: String,
    pub concept_id: String,
    pub quality: ReviewQuality,
    pub reviewed_at: DateTime<Utc>,
    pub interval_days: i64,
    pub ease_factor: f64,
}

/// Counters over a student's records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_concepts: usize,
    pub new_concepts: usize,
    pub learning_concepts: usize,
    pub review_concepts: usize,
    pub due_concepts: usize,
    pub reviews_today: usize,
    pub correct_today: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_new_record_is_due_immediately() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let record = ReviewRecord::new("s1", "fractions", Some("math"), now);

        assert!(record.is_due(now));
        assert!(!record.is_due(now - Duration::seconds(1)));
        assert_eq!(record.last_reviewed_at, None);
        assert_eq!(record.state(), ReviewState::default());
    }

    #[test]
    fn test_validate_review_order() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut record = ReviewRecord::new("s1", "fractions", None, now);
        assert!(record.validate().is_ok());

        record.last_reviewed_at = Some(now);
        assert_eq!(
            record.validate(),
            Err(ValidationError::ReviewOrder {
                last: now,
                next: now
            })
        );

        record.next_review_at = now + Duration::days(1);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_record_json_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let record = ReviewRecord::new("s1", "fractions", None, now);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["studentId"], "s1");
        assert_eq!(json["easeFactor"], 2.5);
        assert!(json.get("subjectId").is_none());
        assert_eq!(json["nextReviewAt"], "2024-03-01T09:00:00Z");
    }
}
