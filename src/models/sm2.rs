//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each concept has an easiness factor (EF) that adjusts based on performance
//! - Quality grades 0-2: repetitions reset and the concept is relearned tomorrow
//! - Quality grades 3-5: interval grows progressively (1 day → 6 days → EF multiplier)
//! - EF is adjusted after every review, including failed ones, and never drops below 1.3
//! - Higher quality responses lead to longer intervals between reviews

use super::review_state::MIN_EASE_FACTOR;
use super::{ReviewQuality, ReviewState, ScheduledReview};
use crate::error::ValidationError;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3
pub fn next_ease_factor(ease_factor: f64, quality: ReviewQuality) -> f64 {
    let d = (ReviewQuality::MAX - quality.value()) as f64;
    (ease_factor + (0.1 - d * (0.08 + d * 0.02))).max(MIN_EASE_FACTOR)
}

/// Computes the state after one review graded `quality` at `now`.
///
/// The prior state is validated first; nothing is computed for a negative
/// repetition count, a negative interval or an ease factor below 1.3.
pub fn schedule_review(
    state: &ReviewState,
    quality: ReviewQuality,
    now: DateTime<Utc>,
) -> Result<ScheduledReview, ValidationError> {
    state.validate()?;

    let ease_factor = next_ease_factor(state.ease_factor, quality);

    let (interval_days, repetitions) = if quality.is_pass() {
        let repetitions = state
            .repetitions
            .checked_add(1)
            .ok_or(ValidationError::RepetitionOverflow(state.repetitions))?;
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            // Subsequent: multiply previous interval by the updated EF
            _ => ((state.interval_days as f64 * ease_factor).round() as i64).max(1),
        };
        (interval, repetitions)
    } else {
        (1, 0)
    };

    let next_review_at = TimeDelta::try_days(interval_days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(ValidationError::IntervalOverflow(interval_days))?;

    debug!(
        quality = quality.value(),
        repetitions, interval_days, ease_factor, "scheduled review"
    );

    Ok(ScheduledReview {
        repetitions,
        ease_factor,
        interval_days,
        next_review_at,
    })
}

/// The interval each quality grade would produce from `state`, indexed by grade.
pub fn preview_intervals(state: &ReviewState) -> Result<[i64; 6], ValidationError> {
    state.validate()?;
    let mut intervals = [0; 6];
    for quality in ReviewQuality::all() {
        let next = schedule_review(state, quality, DateTime::<Utc>::UNIX_EPOCH)?;
        intervals[quality.value() as usize] = next.interval_days;
    }
    Ok(intervals)
}

/// Short human-readable label for an interval in days
pub fn format_interval(days: i64) -> String {
    match days {
        i64::MIN..=0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
