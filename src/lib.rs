// Study Review - Core Library
// Spaced-repetition flashcard scheduling, shared by the CLI, TUI and API server

pub mod card;
pub mod config;
pub mod db;
pub mod deck;
pub mod error;
pub mod scheduler;
pub mod seed;
pub mod session;

// Re-export commonly used types
pub use card::{Flashcard, Mastery, MasteryLevel, MAX_MASTERY, MIN_MASTERY};
pub use config::Config;
pub use db::{
    ReviewEvent,
    setup_database, insert_cards, get_all_cards, get_card, count_cards,
    record_review, get_review_events,
};
pub use deck::{CardFilter, MasteryOverview, categories, mastery_overview, recent_activity};
pub use error::{ReviewError, Result};
pub use scheduler::{Rating, ReviewOutcome, ReviewScheduler, due_cards, rate};
pub use session::{ReviewSession, SessionState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
