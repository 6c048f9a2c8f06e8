//! Review session management for spaced repetition practice.
//! Handles multi-round concept review with SM-2 algorithm integration.

use super::{ReviewQuality, ReviewRecord};
use crate::database::db;
use crate::error::{Error, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A due concept plus whether it was recalled in the current round
#[derive(Clone, Debug)]
pub struct SessionItem {
    pub record: ReviewRecord,
    pub is_recalled: bool,
}

/// Manages a review session with multiple rounds.
/// Concepts that aren't recalled (grade < 3) are repeated in subsequent rounds.
pub struct ReviewSession {
    pub student_id: String,
    pub items: Vec<SessionItem>,
    pub current_round: Vec<usize>,
    pub current_index: usize,
    pub conn: Arc<Mutex<Connection>>,
    pub round_number: usize,
}

impl ReviewSession {
    /// Creates a session from the student's concepts that are due now.
    pub fn start(
        student_id: &str,
        subject_id: Option<&str>,
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self> {
        let due = {
            let guard = conn.lock().map_err(|_| Error::LockPoisoned)?;
            db::get_due_reviews(student_id, subject_id, &guard)?
        };
        Ok(Self::from_records(student_id, due, conn))
    }

    pub fn from_records(
        student_id: &str,
        records: Vec<ReviewRecord>,
        conn: Arc<Mutex<Connection>>,
    ) -> Self {
        let items: Vec<_> = records
            .into_iter()
            .map(|record| SessionItem {
                record,
                is_recalled: false,
            })
            .collect();

        Self {
            student_id: student_id.to_string(),
            current_round: (0..items.len()).collect(),
            items,
            current_index: 0,
            conn,
            round_number: 1,
        }
    }

    pub fn current_concept(&self) -> Option<&ReviewRecord> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.items.get(idx))
            .map(|item| &item.record)
    }

    pub fn next_concept(&mut self) {
        if self.current_index + 1 < self.current_round.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with concepts that weren't recalled.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round
            .iter()
            .copied()
            .filter(|&idx| self.items.get(idx).is_some_and(|item| !item.is_recalled))
            .collect();

        if !failed.is_empty() {
            self.current_round = failed;
            self.current_index = 0;
            self.round_number += 1;
            debug!(
                round = self.round_number,
                remaining = self.current_round.len(),
                "Starting review round"
            );
        }
    }

    /// Grades the current concept and persists its SM-2 update.
    /// Grades >= 3 mark the concept as recalled for this session.
    pub fn grade_current(&mut self, quality: ReviewQuality) -> Result<Option<ReviewRecord>> {
        let Some(&idx) = self.current_round.get(self.current_index) else {
            return Ok(None);
        };
        let Some(item) = self.items.get_mut(idx) else {
            return Ok(None);
        };

        let updated = {
            let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
            db::submit_review(
                &item.record.student_id,
                &item.record.concept_id,
                quality,
                &mut conn,
            )?
        };

        item.is_recalled = quality.is_pass();
        item.record = updated.clone();
        Ok(Some(updated))
    }

    pub fn recalled_count(&self) -> usize {
        self.current_round
            .iter()
            .filter(|&&idx| self.items.get(idx).is_some_and(|item| item.is_recalled))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.recalled_count()
    }

    /// Returns true when the round is empty or every concept in it was recalled.
    pub fn is_completed(&self) -> bool {
        self.current_round.is_empty() || self.recalled_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} concepts", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Retry): {} concepts to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: i64) -> ReviewQuality {
        ReviewQuality::try_from(value).unwrap()
    }

    fn shared_store(concepts: &[&str]) -> Arc<Mutex<Connection>> {
        let conn = db::open_in_memory().unwrap();
        for concept in concepts {
            db::enroll_concept("ana", concept, Some("math"), &conn).unwrap();
        }
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_empty_session_is_completed() {
        let conn = shared_store(&[]);
        let mut session = ReviewSession::start("ana", None, conn).unwrap();
        assert!(session.is_completed());
        assert!(session.current_concept().is_none());
        assert_eq!(session.grade_current(q(5)).unwrap(), None);
        session.next_concept();
        assert!(session.is_completed());
    }

    #[test]
    fn test_all_recalled_completes_in_one_round() {
        let conn = shared_store(&["a", "b"]);
        let mut session = ReviewSession::start("ana", None, conn).unwrap();
        assert_eq!(session.phase_message(), "Round 1: 2 concepts");

        session.grade_current(q(5)).unwrap();
        session.next_concept();
        session.grade_current(q(4)).unwrap();

        assert!(session.is_completed());
        assert_eq!(session.remaining_count(), 0);
        assert_eq!(session.round_number, 1);
    }

    #[test]
    fn test_failed_concepts_repeat() {
        let conn = shared_store(&["a", "b", "c"]);
        let mut session = ReviewSession::start("ana", None, conn.clone()).unwrap();

        session.grade_current(q(5)).unwrap();
        session.next_concept();
        session.grade_current(q(1)).unwrap();
        session.next_concept();
        session.grade_current(q(4)).unwrap();
        session.next_concept();

        assert_eq!(session.round_number, 2);
        assert_eq!(session.total_count(), 1);
        assert_eq!(session.current_concept().unwrap().concept_id, "b");
        assert!(session.phase_message().contains("Retry"));
        assert!(!session.is_completed());

        let record = session.grade_current(q(3)).unwrap().unwrap();
        assert_eq!(record.repetitions, 1);
        assert!(session.is_completed());

        let guard = conn.lock().unwrap();
        assert_eq!(db::get_review_log("ana", "b", &guard).unwrap().len(), 2);
    }
}
