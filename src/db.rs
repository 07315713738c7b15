// 🗄️ Card store - SQLite persistence for cards and the review log
//
// Cards are updated in place; every rating also appends an immutable
// review event so the history survives the update.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::card::{Flashcard, Mastery};
use crate::error::Result;
use crate::scheduler::{Rating, ReviewOutcome};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One rating, as recorded in the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub card_id: String,
    pub rating: Rating,
    pub mastery_before: u8,
    pub mastery_after: u8,
    pub reviewed_on: NaiveDate,
    pub next_review: NaiveDate,
    pub actor: String,
}

impl ReviewEvent {
    pub fn from_outcome(outcome: &ReviewOutcome, actor: &str) -> Self {
        ReviewEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            card_id: outcome.card.id.clone(),
            rating: outcome.rating,
            mastery_before: outcome.previous_mastery.value(),
            mastery_after: outcome.card.mastery.value(),
            reviewed_on: outcome.reviewed_on,
            next_review: outcome.card.next_review,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS flashcards (
            id TEXT PRIMARY KEY NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            category TEXT NOT NULL,
            mastery INTEGER NOT NULL CHECK (mastery BETWEEN 1 AND 5),
            last_reviewed TEXT,
            next_review TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            card_id TEXT NOT NULL,
            rating TEXT NOT NULL,
            mastery_before INTEGER NOT NULL,
            mastery_after INTEGER NOT NULL,
            reviewed_on TEXT NOT NULL,
            next_review TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_next_review ON flashcards(next_review)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_card ON review_events(card_id, timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert cards, skipping ids that already exist. Returns the number inserted.
pub fn insert_cards(conn: &Connection, cards: &[Flashcard]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for card in cards {
        let result = conn.execute(
            "INSERT INTO flashcards (id, front, back, category, mastery, last_reviewed, next_review)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                card.id,
                card.front,
                card.back,
                card.category,
                card.mastery.value(),
                card.last_reviewed.map(format_date),
                format_date(card.next_review),
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("inserted {} cards, skipped {} existing", inserted, duplicates);
    Ok(inserted)
}

/// All cards in insertion order
pub fn get_all_cards(conn: &Connection) -> Result<Vec<Flashcard>> {
    let mut stmt = conn.prepare(
        "SELECT id, front, back, category, mastery, last_reviewed, next_review
         FROM flashcards
         ORDER BY rowid",
    )?;

    let cards = stmt
        .query_map([], card_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(cards)
}

pub fn get_card(conn: &Connection, id: &str) -> Result<Option<Flashcard>> {
    let card = conn
        .query_row(
            "SELECT id, front, back, category, mastery, last_reviewed, next_review
             FROM flashcards
             WHERE id = ?1",
            [id],
            card_from_row,
        )
        .optional()?;

    Ok(card)
}

pub fn count_cards(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM flashcards", [], |row| row.get(0))?;

    Ok(count)
}

/// Persist a rating: update the card and append the event in one transaction
pub fn record_review(conn: &Connection, outcome: &ReviewOutcome, actor: &str) -> Result<ReviewEvent> {
    let event = ReviewEvent::from_outcome(outcome, actor);
    let card = &outcome.card;

    let tx = conn.unchecked_transaction()?;

    let updated = tx.execute(
        "UPDATE flashcards
         SET mastery = ?1, last_reviewed = ?2, next_review = ?3
         WHERE id = ?4",
        params![
            card.mastery.value(),
            card.last_reviewed.map(format_date),
            format_date(card.next_review),
            card.id,
        ],
    )?;

    if updated == 0 {
        return Err(crate::error::ReviewError::CardNotFound(card.id.clone()));
    }

    tx.execute(
        "INSERT INTO review_events (
            event_id, timestamp, card_id, rating, mastery_before, mastery_after,
            reviewed_on, next_review, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.card_id,
            event.rating.as_str(),
            event.mastery_before,
            event.mastery_after,
            format_date(event.reviewed_on),
            format_date(event.next_review),
            event.actor,
        ],
    )?;

    tx.commit()?;

    Ok(event)
}

/// Review history for a card, newest first
pub fn get_review_events(conn: &Connection, card_id: &str) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, card_id, rating, mastery_before, mastery_after,
                reviewed_on, next_review, actor
         FROM review_events
         WHERE card_id = ?1
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map([card_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let rating_str: String = row.get(3)?;

            Ok(ReviewEvent {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| conversion_error(1, e))?
                    .with_timezone(&Utc),
                card_id: row.get(2)?,
                rating: rating_str.parse::<Rating>().map_err(|e| conversion_error(3, e))?,
                mastery_before: row.get(4)?,
                mastery_after: row.get(5)?,
                reviewed_on: parse_date(row, 6)?,
                next_review: parse_date(row, 7)?,
                actor: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    let mastery: i64 = row.get(4)?;
    let last_reviewed: Option<String> = row.get(5)?;

    Ok(Flashcard {
        id: row.get(0)?,
        front: row.get(1)?,
        back: row.get(2)?,
        category: row.get(3)?,
        mastery: Mastery::new(mastery),
        last_reviewed: last_reviewed
            .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
            .transpose()
            .map_err(|e| conversion_error(5, e))?,
        next_review: parse_date(row, 6)?,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
