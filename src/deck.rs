// 🗂️ Deck browsing - search, categories, overview
//
// Read-only views over the card collection used by the browse and stats pages.

use serde::{Deserialize, Serialize};

use crate::card::{Flashcard, MasteryLevel};

pub const ALL_CATEGORIES: &str = "All";

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFilter {
    /// Case-insensitive substring matched against front and back
    #[serde(default)]
    pub search: Option<String>,

    /// Exact category; None or "All" matches everything
    #[serde(default)]
    pub category: Option<String>,
}

impl CardFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, card: &Flashcard) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                card.front.to_lowercase().contains(&term) || card.back.to_lowercase().contains(&term)
            }
        };

        let matches_category = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(category) => card.category == category,
        };

        matches_search && matches_category
    }

    pub fn apply<'a>(&self, cards: &'a [Flashcard]) -> Vec<&'a Flashcard> {
        cards.iter().filter(|card| self.matches(card)).collect()
    }
}

/// "All" followed by each distinct category in first-seen order
pub fn categories(cards: &[Flashcard]) -> Vec<String> {
    let mut result = vec![ALL_CATEGORIES.to_string()];
    for card in cards {
        if !result.iter().any(|c| c == &card.category) {
            result.push(card.category.clone());
        }
    }
    result
}

// ============================================================================
// OVERVIEW
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MasteryOverview {
    pub mastered: usize,
    pub learning: usize,
    pub difficult: usize,
}

impl MasteryOverview {
    pub fn total(&self) -> usize {
        self.mastered + self.learning + self.difficult
    }
}

pub fn mastery_overview(cards: &[Flashcard]) -> MasteryOverview {
    let mut overview = MasteryOverview::default();
    for card in cards {
        match card.mastery_level() {
            MasteryLevel::Mastered => overview.mastered += 1,
            MasteryLevel::Learning => overview.learning += 1,
            MasteryLevel::Difficult => overview.difficult += 1,
        }
    }
    overview
}

/// Most recently reviewed first; never-reviewed cards go last
pub fn recent_activity(cards: &[Flashcard], limit: usize) -> Vec<&Flashcard> {
    let mut sorted: Vec<&Flashcard> = cards.iter().collect();
    // Option<NaiveDate> orders None first, so reversing puts it last
    sorted.sort_by(|a, b| b.last_reviewed.cmp(&a.last_reviewed));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn deck() -> Vec<Flashcard> {
        vec![
            Flashcard::new("What is mitosis?", "Cell division", "Biology", 4, date("2025-01-01"))
                .with_id("1")
                .with_last_reviewed(date("2024-12-28")),
            Flashcard::new("Avogadro's number", "6.022e23", "Chemistry", 1, date("2025-01-01"))
                .with_id("2"),
            Flashcard::new("Define derivative", "Rate of change", "Math", 2, date("2025-01-01"))
                .with_id("3")
                .with_last_reviewed(date("2024-12-31")),
            Flashcard::new("What is a cell?", "Basic unit of life", "Biology", 5, date("2025-01-01"))
                .with_id("4")
                .with_last_reviewed(date("2024-12-20")),
        ]
    }

    #[test]
    fn test_search_front_and_back_case_insensitive() {
        let cards = deck();
        let ids = |f: CardFilter| f.apply(&cards).iter().map(|c| c.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(CardFilter::new().search("CELL")), vec!["1", "4"]);
        assert_eq!(ids(CardFilter::new().search("change")), vec!["3"]);
        assert_eq!(ids(CardFilter::new().search("   ")).len(), 4);
    }

    #[test]
    fn test_category_filter() {
        let cards = deck();
        assert_eq!(CardFilter::new().category("Biology").apply(&cards).len(), 2);
        assert_eq!(CardFilter::new().category(ALL_CATEGORIES).apply(&cards).len(), 4);
        assert!(CardFilter::new().category("History").apply(&cards).is_empty());

        let both = CardFilter::new().category("Biology").search("mitosis");
        assert_eq!(both.apply(&cards).len(), 1);
    }

    #[test]
    fn test_categories_first_seen_order() {
        assert_eq!(categories(&deck()), vec!["All", "Biology", "Chemistry", "Math"]);
        assert_eq!(categories(&[]), vec!["All"]);
    }

    #[test]
    fn test_mastery_overview_buckets() {
        let overview = mastery_overview(&deck());
        assert_eq!(overview, MasteryOverview { mastered: 2, learning: 1, difficult: 1 });
        assert_eq!(overview.total(), 4);
    }

    #[test]
    fn test_recent_activity_order_and_limit() {
        let cards = deck();
        let recent: Vec<&str> = recent_activity(&cards, 3).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(recent, vec!["3", "1", "4"]);

        let all: Vec<&str> = recent_activity(&cards, 10).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(all.last(), Some(&"2"));
        // Input order untouched
        assert_eq!(cards[0].id, "1");
    }
}
