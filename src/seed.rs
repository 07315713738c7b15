// 🌱 Seed data - built-in demo deck and JSON seed files

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use std::fs;
use std::path::Path;

use crate::card::Flashcard;

/// Demo deck with dates relative to `today`: some cards overdue, one due
/// today, the rest scheduled in the future. Offsets saturate at the ends of
/// the calendar.
pub fn demo_deck(today: NaiveDate) -> Vec<Flashcard> {
    let day = |offset: i64| {
        today
            .checked_add_signed(Duration::days(offset))
            .unwrap_or(if offset < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
    };

    vec![
        Flashcard::new(
            "What is the powerhouse of the cell?",
            "The mitochondria, which produces ATP through cellular respiration.",
            "Biology",
            4,
            day(-1),
        )
        .with_id("fc-1")
        .with_last_reviewed(day(-8)),
        Flashcard::new(
            "What are the four bases of DNA?",
            "Adenine, thymine, guanine and cytosine.",
            "Biology",
            3,
            day(0),
        )
        .with_id("fc-2")
        .with_last_reviewed(day(-3)),
        Flashcard::new(
            "State Newton's second law.",
            "Force equals mass times acceleration (F = ma).",
            "Physics",
            2,
            day(-4),
        )
        .with_id("fc-3")
        .with_last_reviewed(day(-5)),
        Flashcard::new(
            "What is the derivative of sin(x)?",
            "cos(x)",
            "Calculus",
            5,
            day(6),
        )
        .with_id("fc-4")
        .with_last_reviewed(day(-1)),
        Flashcard::new(
            "What is Avogadro's number?",
            "6.022 x 10^23 particles per mole.",
            "Chemistry",
            1,
            day(-2),
        )
        .with_id("fc-5"),
        Flashcard::new(
            "What does the integral of a velocity function give?",
            "Displacement over the interval.",
            "Calculus",
            3,
            day(2),
        )
        .with_id("fc-6")
        .with_last_reviewed(day(-1)),
        Flashcard::new(
            "What is the time complexity of binary search?",
            "O(log n)",
            "Computer Science",
            4,
            day(5),
        )
        .with_id("fc-7")
        .with_last_reviewed(day(-2)),
        Flashcard::new(
            "What is a covalent bond?",
            "A bond formed by two atoms sharing electron pairs.",
            "Chemistry",
            2,
            day(0),
        )
        .with_id("fc-8"),
    ]
}

/// Load a JSON array of flashcards.
///
/// Mastery is clamped by deserialization; cards without an id get a UUID.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<Flashcard>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read seed file: {:?}", path.as_ref()))?;

    let mut cards: Vec<Flashcard> =
        serde_json::from_str(&content).context("Failed to parse seed JSON")?;

    for card in &mut cards {
        if card.id.trim().is_empty() {
            card.id = uuid::Uuid::new_v4().to_string();
        }
    }

    log::info!("loaded {} cards from {:?}", cards.len(), path.as_ref());
    Ok(cards)
}
