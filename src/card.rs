// 🃏 Flashcard Entity
// The only record with a lifecycle: created from seed data, mutated by rating.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// MASTERY
// ============================================================================

pub const MIN_MASTERY: u8 = 1;
pub const MAX_MASTERY: u8 = 5;

/// Learner confidence, 1 (weakest) to 5 (strongest).
///
/// Every constructor clamps, so a `Mastery` value is always in range.
/// Deserialization goes through the same clamp, which means seed data with
/// `mastery: 9` loads as 5 instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Mastery(u8);

impl Mastery {
    pub fn new(value: i64) -> Self {
        Mastery(value.clamp(MIN_MASTERY as i64, MAX_MASTERY as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Apply a signed delta, staying inside [1, 5]
    pub fn adjust(self, delta: i64) -> Self {
        Mastery::new(self.0 as i64 + delta)
    }

    pub fn level(self) -> MasteryLevel {
        match self.0 {
            4..=5 => MasteryLevel::Mastered,
            2..=3 => MasteryLevel::Learning,
            _ => MasteryLevel::Difficult,
        }
    }
}

impl Default for Mastery {
    fn default() -> Self {
        Mastery(MIN_MASTERY)
    }
}

impl From<i64> for Mastery {
    fn from(value: i64) -> Self {
        Mastery::new(value)
    }
}

impl From<Mastery> for u8 {
    fn from(mastery: Mastery) -> Self {
        mastery.0
    }
}

impl std::fmt::Display for Mastery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, MAX_MASTERY)
    }
}

/// Bucket shown in the mastery overview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasteryLevel {
    Mastered,
    Learning,
    Difficult,
}

impl MasteryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::Mastered => "Mastered",
            MasteryLevel::Learning => "Learning",
            MasteryLevel::Difficult => "Difficult",
        }
    }
}

// ============================================================================
// FLASHCARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    /// Stable identity - never changes once assigned
    #[serde(default)]
    pub id: String,

    pub front: String,
    pub back: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub mastery: Mastery,

    /// None until the card is rated for the first time
    #[serde(default)]
    pub last_reviewed: Option<NaiveDate>,

    pub next_review: NaiveDate,
}

impl Flashcard {
    /// Create a new card with a generated UUID, due on `next_review`
    pub fn new(
        front: impl Into<String>,
        back: impl Into<String>,
        category: impl Into<String>,
        mastery: i64,
        next_review: NaiveDate,
    ) -> Self {
        Flashcard {
            id: uuid::Uuid::new_v4().to_string(),
            front: front.into(),
            back: back.into(),
            category: category.into(),
            mastery: Mastery::new(mastery),
            last_reviewed: None,
            next_review,
        }
    }

    /// Builder-style override of the generated id (seed data uses short ids)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_last_reviewed(mut self, date: NaiveDate) -> Self {
        self.last_reviewed = Some(date);
        self
    }

    /// Due when the next review date has arrived or passed (inclusive)
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }

    pub fn mastery_level(&self) -> MasteryLevel {
        self.mastery.level()
    }
}

// ============================================================================
// TESTS
// ============================================================================
