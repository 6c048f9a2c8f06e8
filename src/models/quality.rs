//! Recall quality grade (0 = complete blackout, 5 = perfect response)
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ReviewQuality(u8);

impl ReviewQuality {
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    /// Grades below 3 count as a failed recall.
    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }

    pub fn all() -> impl Iterator<Item = ReviewQuality> {
        (0..=Self::MAX).map(ReviewQuality)
    }
}

impl TryFrom<i64> for ReviewQuality {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(ReviewQuality(value as u8))
        } else {
            Err(ValidationError::QualityOutOfRange(value))
        }
    }
}

impl From<ReviewQuality> for i64 {
    fn from(quality: ReviewQuality) -> Self {
        quality.0 as i64
    }
}

impl fmt::Display for ReviewQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
