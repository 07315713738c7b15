// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use study_review::{
    count_cards, get_all_cards, get_card, get_review_events, insert_cards, mastery_overview,
    recent_activity, record_review, seed, setup_database, CardFilter, Config, Rating,
    ReviewScheduler,
};

#[derive(Parser)]
#[command(name = "study-review", version, about = "Spaced-repetition flashcard review")]
struct Cli {
    /// Config file (defaults to ./study-review.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Review as of this date instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and import the demo deck or a JSON seed file
    Init {
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// List cards due for review
    Due,
    /// Rate one card: hard, medium or easy
    Rate { id: String, rating: String },
    /// Mastery overview and recent activity
    Stats,
    /// Browse cards
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Review history for a card
    History { id: String },
    /// Interactive review session (default)
    Review,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    match cli.command.unwrap_or(Command::Review) {
        Command::Init { seed } => run_init(&config, seed.or_else(|| config.seed_path.clone()), today),
        Command::Due => run_due(&config, today),
        Command::Rate { id, rating } => run_rate(&config, &id, &rating, today),
        Command::Stats => run_stats(&config, today),
        Command::List { search, category } => run_list(&config, search, category),
        Command::History { id } => run_history(&config, &id),
        Command::Review => run_review(&config, today),
    }
}

fn open_database(path: &Path) -> Result<Connection> {
    if !path.exists() {
        eprintln!("❌ Database not found: {:?}", path);
        eprintln!("   Run: study-review init");
        eprintln!("   to create it first.");
        std::process::exit(1);
    }

    let conn = Connection::open(path).with_context(|| format!("Failed to open database {:?}", path))?;
    Ok(conn)
}

fn run_init(config: &Config, seed_path: Option<PathBuf>, today: NaiveDate) -> Result<()> {
    println!("🗄️  Initializing flashcard database");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cards = match &seed_path {
        Some(path) => {
            println!("\n📂 Loading seed file {:?}...", path);
            seed::load_json(path)?
        }
        None => {
            println!("\n📂 Using built-in demo deck...");
            seed::demo_deck(today)
        }
    };
    println!("✓ Loaded {} cards", cards.len());

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    setup_database(&conn)?;
    println!("✓ Database ready at {:?}", config.database_path);

    let inserted = insert_cards(&conn, &cards)?;
    let total = count_cards(&conn)?;
    println!("✓ Inserted {} cards ({} already present)", inserted, cards.len() - inserted);
    println!("✓ Database contains {} cards", total);

    Ok(())
}

fn run_due(config: &Config, today: NaiveDate) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let scheduler = ReviewScheduler::from_cards(get_all_cards(&conn)?);
    let due = scheduler.due_cards(today);

    if due.is_empty() {
        println!("✅ All caught up! No flashcards due on {}.", today);
        return Ok(());
    }

    println!("📚 {} cards due on {}\n", due.len(), today);
    for card in due {
        println!(
            "  {:<10} {:<18} {}  (due {}, mastery {})",
            card.id, card.category, card.front, card.next_review, card.mastery
        );
    }

    Ok(())
}

fn run_rate(config: &Config, id: &str, rating: &str, today: NaiveDate) -> Result<()> {
    let rating: Rating = rating.parse()?;
    let conn = open_database(&config.database_path)?;

    let card = match get_card(&conn, id)? {
        Some(card) => card,
        None => bail!("flashcard not found: {}", id),
    };

    let mut scheduler = ReviewScheduler::from_cards(vec![card]);
    let outcome = scheduler.rate_card(id, rating, today)?;
    record_review(&conn, &outcome, &config.actor)?;

    println!("✓ Rated '{}' {}", outcome.card.front, rating);
    println!(
        "  Mastery: {} → {}",
        outcome.previous_mastery.value(),
        outcome.card.mastery.value()
    );
    println!("  Next review: {}", outcome.card.next_review);

    Ok(())
}

fn run_stats(config: &Config, today: NaiveDate) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let cards = get_all_cards(&conn)?;
    let scheduler = ReviewScheduler::from_cards(cards);
    let overview = mastery_overview(scheduler.cards());

    println!("📊 Flashcard Stats ({} cards)", scheduler.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Due today:  {}", scheduler.due_count(today));
    println!("  Mastered:   {}", overview.mastered);
    println!("  Learning:   {}", overview.learning);
    println!("  Difficult:  {}", overview.difficult);

    println!("\n🕑 Recent Activity");
    for card in recent_activity(scheduler.cards(), config.recent_limit) {
        let reviewed = card
            .last_reviewed
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {}  (last reviewed: {}, {})",
            card.front,
            reviewed,
            card.mastery_level().as_str()
        );
    }

    Ok(())
}

fn run_list(config: &Config, search: Option<String>, category: Option<String>) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let cards = get_all_cards(&conn)?;
    let filter = CardFilter { search, category };
    let matching = filter.apply(&cards);

    println!("🗂️  {} of {} cards\n", matching.len(), cards.len());
    for card in matching {
        println!("  [{}] {} ({})", card.id, card.front, card.category);
        println!("      {}", card.back);
        println!("      mastery {}, next review {}", card.mastery, card.next_review);
    }

    Ok(())
}

fn run_history(config: &Config, id: &str) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let events = get_review_events(&conn, id)?;

    if events.is_empty() {
        println!("No reviews recorded for {}", id);
        return Ok(());
    }

    for event in events {
        println!(
            "  {}  {:<6}  mastery {} → {}  next {}  by {}",
            event.reviewed_on,
            event.rating,
            event.mastery_before,
            event.mastery_after,
            event.next_review,
            event.actor
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_review(config: &Config, today: NaiveDate) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let cards = get_all_cards(&conn)?;
    log::info!("loaded {} cards for review on {}", cards.len(), today);

    let mut app = ui::App::new(cards, today)
        .with_store(conn, config.actor.clone())
        .with_recent_limit(config.recent_limit);
    ui::run_ui(&mut app)?;

    println!("\n✅ Reviewed {} cards", app.session.rated_count());

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_review(_config: &Config, _today: NaiveDate) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: study-review due / study-review rate <ID> <RATING>");
    std::process::exit(1);
}
