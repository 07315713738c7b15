// 📅 Review Scheduler - spaced repetition rules
//
// A rating moves mastery by one step and pushes the next review out by a
// fixed number of days. How overdue the card was does not matter.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::card::{Flashcard, Mastery};
use crate::error::{Result, ReviewError};

// ============================================================================
// RATING
// ============================================================================

/// Learner feedback after seeing the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Hard,
    Medium,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Hard, Rating::Medium, Rating::Easy];

    pub fn mastery_delta(self) -> i64 {
        match self {
            Rating::Easy => 1,
            Rating::Medium => 0,
            Rating::Hard => -1,
        }
    }

    pub fn interval_days(self) -> u64 {
        match self {
            Rating::Easy => 7,
            Rating::Medium => 3,
            Rating::Hard => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Hard => "hard",
            Rating::Medium => "medium",
            Rating::Easy => "easy",
        }
    }
}

impl FromStr for Rating {
    type Err = ReviewError;

    /// Accepts the names (any case) or the key numbers 1/2/3
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hard" | "1" => Ok(Rating::Hard),
            "medium" | "2" => Ok(Rating::Medium),
            "easy" | "3" => Ok(Rating::Easy),
            _ => Err(ReviewError::InvalidRating(s.to_string())),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// PURE TRANSITIONS
// ============================================================================

/// Cards with `next_review <= today`, in input order
pub fn due_cards<'a, I>(cards: I, today: NaiveDate) -> Vec<&'a Flashcard>
where
    I: IntoIterator<Item = &'a Flashcard>,
{
    cards.into_iter().filter(|card| card.is_due(today)).collect()
}

/// Apply a rating given on `today` and return the updated card.
///
/// The previous `next_review` is ignored: the new one is always
/// `today + {1, 3, 7}` days. Fails only when that date is not representable.
pub fn rate(card: &Flashcard, rating: Rating, today: NaiveDate) -> Result<Flashcard> {
    let next_review = today
        .checked_add_days(Days::new(rating.interval_days()))
        .ok_or(ReviewError::DateOutOfRange(today))?;

    let mut next = card.clone();
    next.mastery = card.mastery.adjust(rating.mastery_delta());
    next.last_reviewed = Some(today);
    next.next_review = next_review;
    Ok(next)
}

// ============================================================================
// REVIEW OUTCOME
// ============================================================================

/// Everything the store needs to persist one rating
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub card: Flashcard,
    pub rating: Rating,
    pub previous_mastery: Mastery,
    pub reviewed_on: NaiveDate,
}

// ============================================================================
// SCHEDULER (owning repository)
// ============================================================================

/// Owns the card collection; the only place cards are mutated.
///
/// Insertion order is kept so `due_cards` output is stable.
#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    cards: Vec<Flashcard>,
    index: HashMap<String, usize>,
}

impl ReviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Flashcard>) -> Self {
        let mut scheduler = ReviewScheduler::new();
        for card in cards {
            scheduler.insert(card);
        }
        scheduler
    }

    /// Insert a card, replacing (in place) any card with the same id
    pub fn insert(&mut self, card: Flashcard) {
        match self.index.get(&card.id) {
            Some(&pos) => self.cards[pos] = card,
            None => {
                self.index.insert(card.id.clone(), self.cards.len());
                self.cards.push(card);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Flashcard> {
        self.index.get(id).map(|&pos| &self.cards[pos])
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn due_cards(&self, today: NaiveDate) -> Vec<&Flashcard> {
        due_cards(&self.cards, today)
    }

    pub fn due_count(&self, today: NaiveDate) -> usize {
        self.cards.iter().filter(|card| card.is_due(today)).count()
    }

    /// Rate the card with `id` and store the result in place
    pub fn rate_card(&mut self, id: &str, rating: Rating, today: NaiveDate) -> Result<ReviewOutcome> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| ReviewError::CardNotFound(id.to_string()))?;

        let previous_mastery = self.cards[pos].mastery;
        let updated = rate(&self.cards[pos], rating, today)?;
        self.cards[pos] = updated.clone();

        log::debug!(
            "rated card {} {}: mastery {} -> {}, next review {}",
            id,
            rating,
            previous_mastery.value(),
            updated.mastery.value(),
            updated.next_review
        );

        Ok(ReviewOutcome {
            card: updated,
            rating,
            previous_mastery,
            reviewed_on: today,
        })
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

    fn card(id: &str, mastery: i64, next_review: &str) -> Flashcard {
        Flashcard::new(format!("front {id}"), format!("back {id}"), "Test", mastery, date(next_review))
            .with_id(id)
    }

    #[test]
    fn test_easy_on_due_date() {
        let c = card("c1", 3, "2025-01-01");
        let rated = rate(&c, Rating::Easy, date("2025-01-01")).unwrap();

        assert_eq!(rated.mastery.value(), 4);
        assert_eq!(rated.last_reviewed, Some(date("2025-01-01")));
        assert_eq!(rated.next_review, date("2025-01-08"));
    }

    #[test]
    fn test_hard_at_floor_stays_at_one() {
        let c = card("c1", 1, "2025-01-01");
        let rated = rate(&c, Rating::Hard, date("2025-01-01")).unwrap();

        assert_eq!(rated.mastery.value(), 1);
        assert_eq!(rated.last_reviewed, Some(date("2025-01-01")));
        assert_eq!(rated.next_review, date("2025-01-02"));
    }

    #[test]
    fn test_easy_at_ceiling_stays_at_five() {
        let rated = rate(&card("c1", 5, "2025-01-01"), Rating::Easy, date("2025-01-01")).unwrap();
        assert_eq!(rated.mastery.value(), 5);
    }

    #[test]
    fn test_mastery_bounds_for_every_start_and_rating() {
        let today = date("2025-03-01");
        for start in 1..=5 {
            for rating in Rating::ALL {
                let rated = rate(&card("c", start, "2025-02-01"), rating, today).unwrap();
                let m = rated.mastery.value() as i64;
                assert!((1..=5).contains(&m), "start {start} {rating} gave {m}");
                assert_eq!(m, (start + rating.mastery_delta()).clamp(1, 5));
            }
        }
    }

    #[test]
    fn test_next_review_ignores_previous_schedule() {
        let today = date("2025-06-15");
        // Far overdue, due today, and not yet due all get the same offset
        for previous in ["2024-01-01", "2025-06-15", "2026-01-01"] {
            let c = card("c", 3, previous);
            assert_eq!(rate(&c, Rating::Hard, today).unwrap().next_review, date("2025-06-16"));
            assert_eq!(rate(&c, Rating::Medium, today).unwrap().next_review, date("2025-06-18"));
            assert_eq!(rate(&c, Rating::Easy, today).unwrap().next_review, date("2025-06-22"));
        }
    }

    #[test]
    fn test_next_review_strictly_after_today() {
        let today = date("2025-12-31");
        for rating in Rating::ALL {
            assert!(rate(&card("c", 2, "2025-12-01"), rating, today).unwrap().next_review > today);
        }
    }

    #[test]
    fn test_rate_is_deterministic() {
        let c = card("c", 2, "2025-01-01");
        let today = date("2025-01-05");
        assert_eq!(rate(&c, Rating::Medium, today).unwrap(), rate(&c, Rating::Medium, today).unwrap());
        // Input is untouched
        assert_eq!(c.mastery.value(), 2);
        assert!(c.last_reviewed.is_none());
    }

    #[test]
    fn test_rate_keeps_content_fields() {
        let c = card("c9", 2, "2025-01-01");
        let rated = rate(&c, Rating::Easy, date("2025-01-01")).unwrap();
        assert_eq!(rated.id, "c9");
        assert_eq!(rated.front, c.front);
        assert_eq!(rated.back, c.back);
        assert_eq!(rated.category, c.category);
    }

    #[test]
    fn test_rate_past_last_date_is_an_error() {
        let c = card("c", 3, "2025-01-01");
        for rating in Rating::ALL {
            let err = rate(&c, rating, NaiveDate::MAX).unwrap_err();
            assert!(matches!(err, ReviewError::DateOutOfRange(d) if d == NaiveDate::MAX));
        }

        // Six days before the end only hard and medium still fit
        let late = NaiveDate::MAX - Days::new(6);
        assert_eq!(rate(&c, Rating::Medium, late).unwrap().next_review, late + Days::new(3));
        assert!(rate(&c, Rating::Easy, late).is_err());
    }

    #[test]
    fn test_due_cards_inclusive_boundary_and_order() {
        let cards = vec![
            card("future", 3, "2025-01-02"),
            card("today", 3, "2025-01-01"),
            card("past", 3, "2024-12-20"),
        ];

        let due: Vec<&str> = due_cards(&cards, date("2025-01-01"))
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();

        assert_eq!(due, vec!["today", "past"]);
    }

    #[test]
    fn test_due_cards_empty_input() {
        let cards: Vec<Flashcard> = Vec::new();
        assert!(due_cards(&cards, date("2025-01-01")).is_empty());
    }

    #[test]
    fn test_due_cards_none_due() {
        let cards = vec![card("a", 3, "2025-02-01")];
        assert!(due_cards(&cards, date("2025-01-01")).is_empty());
    }

    #[test]
    fn test_rating_parse() {
        assert_eq!("easy".parse::<Rating>().unwrap(), Rating::Easy);
        assert_eq!("  Medium ".parse::<Rating>().unwrap(), Rating::Medium);
        assert_eq!("HARD".parse::<Rating>().unwrap(), Rating::Hard);
        assert_eq!("1".parse::<Rating>().unwrap(), Rating::Hard);
        assert_eq!("3".parse::<Rating>().unwrap(), Rating::Easy);

        match "again".parse::<Rating>() {
            Err(ReviewError::InvalidRating(v)) => assert_eq!(v, "again"),
            other => panic!("expected InvalidRating, got {:?}", other),
        }
    }

    #[test]
    fn test_rating_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Medium).unwrap(), "\"medium\"");
        let r: Rating = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(r, Rating::Easy);
        assert!(serde_json::from_str::<Rating>("\"perfect\"").is_err());
    }

    #[test]
    fn test_scheduler_rate_card_updates_in_place() {
        let mut scheduler = ReviewScheduler::from_cards(vec![
            card("a", 3, "2025-01-01"),
            card("b", 2, "2025-01-01"),
        ]);

        let outcome = scheduler.rate_card("b", Rating::Easy, date("2025-01-01")).unwrap();

        assert_eq!(outcome.previous_mastery.value(), 2);
        assert_eq!(outcome.card.mastery.value(), 3);
        assert_eq!(outcome.reviewed_on, date("2025-01-01"));
        assert_eq!(scheduler.get("b").unwrap().next_review, date("2025-01-08"));
        // Order unchanged
        assert_eq!(scheduler.cards()[1].id, "b");
        assert_eq!(scheduler.due_count(date("2025-01-01")), 1);
    }

    #[test]
    fn test_scheduler_unknown_card() {
        let mut scheduler = ReviewScheduler::new();
        let err = scheduler.rate_card("missing", Rating::Hard, date("2025-01-01")).unwrap_err();
        assert!(matches!(err, ReviewError::CardNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_scheduler_out_of_range_leaves_card_untouched() {
        let mut scheduler = ReviewScheduler::from_cards(vec![card("a", 3, "2025-01-01")]);
        let err = scheduler.rate_card("a", Rating::Easy, NaiveDate::MAX).unwrap_err();

        assert!(matches!(err, ReviewError::DateOutOfRange(_)));
        let stored = scheduler.get("a").unwrap();
        assert_eq!(stored.mastery.value(), 3);
        assert_eq!(stored.next_review, date("2025-01-01"));
        assert!(stored.last_reviewed.is_none());
    }

    #[test]
    fn test_scheduler_insert_replaces_by_id() {
        let mut scheduler = ReviewScheduler::from_cards(vec![
            card("a", 3, "2025-01-01"),
            card("b", 3, "2025-01-01"),
        ]);
        scheduler.insert(card("a", 5, "2025-03-01"));

        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.cards()[0].id, "a");
        assert_eq!(scheduler.get("a").unwrap().mastery.value(), 5);
    }
}
