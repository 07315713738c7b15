// 🔁 Review Session - one pass through a due-queue snapshot
//
// NotStarted -> InProgress -> Completed, and back to NotStarted on exit.
// The queue holds card ids captured at start; rating never changes it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::card::Flashcard;
use crate::error::{Result, ReviewError};
use crate::scheduler::{Rating, ReviewOutcome, ReviewScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    state: SessionState,
    queue: Vec<String>,
    position: usize,
    rated: usize,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        ReviewSession {
            state: SessionState::NotStarted,
            queue: Vec::new(),
            position: 0,
            rated: 0,
        }
    }

    /// Snapshot the cards due on `today` and begin.
    ///
    /// An empty snapshot completes immediately.
    pub fn start(&mut self, scheduler: &ReviewScheduler, today: NaiveDate) {
        let queue = scheduler
            .due_cards(today)
            .into_iter()
            .map(|card| card.id.clone())
            .collect();
        self.start_with(queue);
    }

    /// Begin with an explicit queue of card ids
    pub fn start_with(&mut self, queue: Vec<String>) {
        self.queue = queue;
        self.position = 0;
        self.rated = 0;
        self.state = if self.queue.is_empty() {
            SessionState::Completed
        } else {
            SessionState::InProgress
        };

        log::info!("review session started with {} due cards", self.queue.len());
    }

    /// Leave the session from any state; the snapshot is discarded
    pub fn exit(&mut self) {
        *self = ReviewSession::new();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::InProgress
    }

    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of ratings applied in this session
    pub fn rated_count(&self) -> usize {
        self.rated
    }

    /// (1-based card number, total) for "Card i of n"
    pub fn progress(&self) -> (usize, usize) {
        if self.queue.is_empty() {
            (0, 0)
        } else {
            (self.position + 1, self.queue.len())
        }
    }

    pub fn current_card_id(&self) -> Option<&str> {
        self.queue.get(self.position).map(String::as_str)
    }

    pub fn current_card<'a>(&self, scheduler: &'a ReviewScheduler) -> Option<&'a Flashcard> {
        self.current_card_id().and_then(|id| scheduler.get(id))
    }

    /// Move forward one card, holding at the last one. No wraparound.
    pub fn next(&mut self) {
        self.position = advance(self.position, self.queue.len());
    }

    pub fn previous(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    /// Rate the current card through the scheduler, then advance.
    ///
    /// Rating the last card completes the session.
    pub fn rate_current(
        &mut self,
        scheduler: &mut ReviewScheduler,
        rating: Rating,
        today: NaiveDate,
    ) -> Result<ReviewOutcome> {
        if self.state != SessionState::InProgress {
            return Err(ReviewError::SessionNotActive);
        }

        let id = self
            .current_card_id()
            .ok_or(ReviewError::SessionNotActive)?
            .to_string();
        let outcome = scheduler.rate_card(&id, rating, today)?;
        self.rated += 1;

        if self.position + 1 >= self.queue.len() {
            self.state = SessionState::Completed;
            log::info!("review session completed after {} ratings", self.rated);
        } else {
            self.next();
        }

        Ok(outcome)
    }
}

/// Index arithmetic for session advance: `position + 1`, clamped to
/// `[0, len - 1]`.
pub fn advance(position: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (position + 1).min(len - 1)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn scheduler() -> ReviewScheduler {
        ReviewScheduler::from_cards(vec![
            Flashcard::new("Q1", "A1", "Bio", 3, date("2025-01-01")).with_id("a"),
            Flashcard::new("Q2", "A2", "Bio", 2, date("2025-01-05")).with_id("b"),
            Flashcard::new("Q3", "A3", "Chem", 1, date("2024-12-30")).with_id("c"),
        ])
    }

    #[test]
    fn test_advance_clamps() {
        assert_eq!(advance(0, 0), 0);
        assert_eq!(advance(0, 1), 0);
        assert_eq!(advance(0, 3), 1);
        assert_eq!(advance(2, 3), 2);
    }

    #[test]
    fn test_new_session_not_started() {
        let session = ReviewSession::new();
        assert_eq!(session.state(), SessionState::NotStarted);
        assert_eq!(session.progress(), (0, 0));
        assert!(session.current_card_id().is_none());
    }

    #[test]
    fn test_empty_queue_completes_immediately() {
        let sched = scheduler();
        let mut session = ReviewSession::new();
        session.start(&sched, date("2024-12-01"));

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.rated_count(), 0);
        assert!(session.is_empty());
    }

    #[test]
    fn test_full_pass_completes_on_last_rating() {
        let mut sched = scheduler();
        let today = date("2025-01-01");
        let mut session = ReviewSession::new();
        session.start(&sched, today);

        assert_eq!(session.queue(), &["a".to_string(), "c".to_string()]);
        assert_eq!(session.state(), SessionState::InProgress);

        let first = session.rate_current(&mut sched, Rating::Easy, today).unwrap();
        assert_eq!(first.card.id, "a");
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.progress(), (2, 2));

        let second = session.rate_current(&mut sched, Rating::Hard, today).unwrap();
        assert_eq!(second.card.id, "c");
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.rated_count(), 2);

        let err = session.rate_current(&mut sched, Rating::Easy, today).unwrap_err();
        assert!(matches!(err, ReviewError::SessionNotActive));
    }

    #[test]
    fn test_rating_does_not_change_snapshot() {
        let mut sched = scheduler();
        let today = date("2025-01-01");
        let mut session = ReviewSession::new();
        session.start(&sched, today);
        let before = session.queue().to_vec();

        session.rate_current(&mut sched, Rating::Easy, today).unwrap();

        // "a" is no longer due, but stays in the snapshot
        assert!(!sched.get("a").unwrap().is_due(today));
        assert_eq!(session.queue(), before.as_slice());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_cards_due_later_not_added() {
        let mut sched = scheduler();
        let mut session = ReviewSession::new();
        session.start(&sched, date("2025-01-01"));

        sched.insert(Flashcard::new("Q4", "A4", "Bio", 3, date("2025-01-01")).with_id("d"));

        assert_eq!(session.len(), 2);
        assert!(!session.queue().contains(&"d".to_string()));
    }

    #[test]
    fn test_manual_navigation_never_completes() {
        let sched = scheduler();
        let mut session = ReviewSession::new();
        session.start(&sched, date("2025-01-10"));
        assert_eq!(session.len(), 3);

        session.previous();
        assert_eq!(session.position(), 0);

        for _ in 0..10 {
            session.next();
        }
        assert_eq!(session.position(), 2);
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.current_card(&sched).unwrap().id, "c");
    }

    #[test]
    fn test_exit_resets_from_any_state() {
        let sched = scheduler();
        let mut session = ReviewSession::new();

        session.start(&sched, date("2025-01-01"));
        session.exit();
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.is_empty());

        session.start(&sched, date("2000-01-01"));
        assert_eq!(session.state(), SessionState::Completed);
        session.exit();
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_rate_before_start_rejected() {
        let mut sched = scheduler();
        let mut session = ReviewSession::new();
        let err = session
            .rate_current(&mut sched, Rating::Medium, date("2025-01-01"))
            .unwrap_err();
        assert!(matches!(err, ReviewError::SessionNotActive));
        assert!(sched.get("a").unwrap().last_reviewed.is_none());
    }
}
