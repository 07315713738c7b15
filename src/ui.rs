use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

use study_review::{
    categories, mastery_overview, recent_activity, record_review, CardFilter, Flashcard, Rating,
    ReviewScheduler, ReviewSession, SessionState, MAX_MASTERY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Review,
    Browse,
    Stats,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Review => Page::Browse,
            Page::Browse => Page::Stats,
            Page::Stats => Page::Review,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Review => Page::Stats,
            Page::Browse => Page::Review,
            Page::Stats => Page::Browse,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Review => "Review",
            Page::Browse => "Browse All",
            Page::Stats => "Stats",
        }
    }
}

pub struct App {
    pub scheduler: ReviewScheduler,
    pub session: ReviewSession,
    pub today: NaiveDate,
    pub current_page: Page,
    pub show_answer: bool,
    pub browse_state: TableState,
    pub categories: Vec<String>,
    pub category_index: usize,
    pub recent_limit: usize,
    pub message: Option<String>,
    store: Option<Connection>,
    actor: String,
}

impl App {
    pub fn new(cards: Vec<Flashcard>, today: NaiveDate) -> Self {
        let categories = categories(&cards);

        let mut browse_state = TableState::default();
        if !cards.is_empty() {
            browse_state.select(Some(0));
        }

        Self {
            scheduler: ReviewScheduler::from_cards(cards),
            session: ReviewSession::new(),
            today,
            current_page: Page::Review,
            show_answer: false,
            browse_state,
            categories,
            category_index: 0,
            recent_limit: 3,
            message: None,
            store: None,
            actor: String::new(),
        }
    }

    /// Persist every rating to `conn` as it happens
    pub fn with_store(mut self, conn: Connection, actor: impl Into<String>) -> Self {
        self.store = Some(conn);
        self.actor = actor.into();
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn selected_category(&self) -> &str {
        &self.categories[self.category_index]
    }

    pub fn browse_cards(&self) -> Vec<&Flashcard> {
        CardFilter::new()
            .category(self.selected_category())
            .apply(self.scheduler.cards())
    }

    pub fn cycle_category(&mut self) {
        self.category_index = (self.category_index + 1) % self.categories.len();
        let selected = if self.browse_cards().is_empty() { None } else { Some(0) };
        self.browse_state.select(selected);
    }

    pub fn start_session(&mut self) {
        self.session.start(&self.scheduler, self.today);
        self.show_answer = false;
        self.message = None;
    }

    pub fn exit_session(&mut self) {
        self.session.exit();
        self.show_answer = false;
    }

    pub fn flip(&mut self) {
        if self.session.is_active() {
            self.show_answer = !self.show_answer;
        }
    }

    /// Rate the current card and save it. A failed rating or save is shown in
    /// the status line and leaves the session and deck as they were.
    pub fn rate(&mut self, rating: Rating) {
        if !self.session.is_active() {
            return;
        }

        let mut scheduler = self.scheduler.clone();
        let mut session = self.session.clone();
        let saved = session
            .rate_current(&mut scheduler, rating, self.today)
            .and_then(|outcome| {
                if let Some(conn) = &self.store {
                    record_review(conn, &outcome, &self.actor)?;
                }
                Ok(outcome)
            });

        match saved {
            Ok(outcome) => {
                self.scheduler = scheduler;
                self.session = session;
                self.show_answer = false;
                self.message = Some(format!(
                    "Rated {}: mastery {} → {}, next review {}",
                    rating,
                    outcome.previous_mastery.value(),
                    outcome.card.mastery.value(),
                    outcome.card.next_review
                ));
            }
            Err(err) => {
                log::error!("rating not saved: {}", err);
                self.message = Some(format!("⚠ Rating not saved: {}", err));
            }
        }
    }

    pub fn next_card(&mut self) {
        self.session.next();
        self.show_answer = false;
    }

    pub fn previous_card(&mut self) {
        self.session.previous();
        self.show_answer = false;
    }

    pub fn browse_next(&mut self) {
        let len = self.browse_cards().len();
        if len == 0 {
            return;
        }
        let i = match self.browse_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.browse_state.select(Some(i));
    }

    pub fn browse_previous(&mut self) {
        let len = self.browse_cards().len();
        if len == 0 {
            return;
        }
        let i = match self.browse_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.browse_state.select(Some(i));
    }

    /// Apply one key press. Returns false when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
                self.current_page = self.current_page.previous()
            }
            KeyCode::BackTab => self.current_page = self.current_page.previous(),
            KeyCode::Tab => self.current_page = self.current_page.next(),
            _ => match self.current_page {
                Page::Review => self.handle_review_key(code)?,
                Page::Browse => self.handle_browse_key(code),
                Page::Stats => {}
            },
        }
        Ok(true)
    }

    fn handle_review_key(&mut self, code: KeyCode) -> Result<()> {
        match (self.session.state(), code) {
            (SessionState::NotStarted, KeyCode::Char('s')) => self.start_session(),
            (SessionState::InProgress, KeyCode::Char(' ')) | (SessionState::InProgress, KeyCode::Enter) => {
                self.flip()
            }
            (SessionState::InProgress, KeyCode::Char('1')) => self.rate(Rating::Hard),
            (SessionState::InProgress, KeyCode::Char('2')) => self.rate(Rating::Medium),
            (SessionState::InProgress, KeyCode::Char('3')) => self.rate(Rating::Easy),
            (SessionState::InProgress, KeyCode::Right) | (SessionState::InProgress, KeyCode::Char('l')) => {
                self.next_card()
            }
            (SessionState::InProgress, KeyCode::Left) | (SessionState::InProgress, KeyCode::Char('h')) => {
                self.previous_card()
            }
            (_, KeyCode::Char('x')) => self.exit_session(),
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Down | KeyCode::Char('j') => self.browse_next(),
            KeyCode::Up | KeyCode::Char('k') => self.browse_previous(),
            KeyCode::Char('f') => self.cycle_category(),
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code, key.modifiers)? {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Review => render_review(f, chunks[1], app),
        Page::Browse => render_browse(f, chunks[1], app),
        Page::Stats => render_stats(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Review, Page::Browse, Page::Stats].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Cards: {}", app.scheduler.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Due: {}", app.scheduler.due_count(app.today)),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_review(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Review Session ");

    let content: Vec<Line> = match app.session.state() {
        SessionState::NotStarted => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("{}", app.scheduler.due_count(app.today)),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from("Cards due for review"),
            Line::from(""),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled("s", Style::default().fg(Color::Yellow)),
                Span::raw(" to start a review session"),
            ]),
        ],
        SessionState::Completed if app.session.rated_count() == 0 => vec![
            Line::from(""),
            Line::from(Span::styled("All caught up!", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))),
            Line::from("You have no flashcards due for review. Check back later or browse all cards."),
        ],
        SessionState::Completed => {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled("Session complete", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))),
                Line::from(format!("{} cards reviewed", app.session.rated_count())),
            ];
            if let Some(msg) = &app.message {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(Color::DarkGray))));
            }
            lines
        }
        SessionState::InProgress => match app.session.current_card(&app.scheduler) {
            Some(card) => {
                let (i, n) = app.session.progress();
                let mut lines = vec![
                    Line::from(Span::styled(
                        format!("Card {} of {}", i, n),
                        Style::default().fg(Color::DarkGray),
                    )),
                    Line::from(Span::styled(card.category.clone(), Style::default().fg(Color::Cyan))),
                    Line::from(""),
                    Line::from(Span::styled(card.front.clone(), Style::default().add_modifier(Modifier::BOLD))),
                    Line::from(""),
                ];

                if app.show_answer {
                    lines.push(Line::from(Span::styled(card.back.clone(), Style::default().fg(Color::Green))));
                } else {
                    lines.push(Line::from(Span::styled(
                        "(space to reveal answer)",
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }

                lines.push(Line::from(""));
                lines.push(Line::from(mastery_bar(card.mastery.value())));
                if let Some(msg) = &app.message {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(Color::DarkGray))));
                }
                lines
            }
            None => vec![Line::from("Card no longer available")],
        },
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn mastery_bar(mastery: u8) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw("Mastery: ")];
    for level in 1..=MAX_MASTERY {
        let style = if level <= mastery {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled("■ ", style));
    }
    spans
}

fn render_browse(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Front", "Category", "Mastery", "Last Reviewed", "Next Review"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .browse_cards()
        .into_iter()
        .map(|card| {
            let due_style = if card.is_due(app.today) {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };

            Row::new(vec![
                Cell::from(truncate(&card.front, 45)),
                Cell::from(card.category.clone()),
                Cell::from(card.mastery.to_string()),
                Cell::from(
                    card.last_reviewed
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "never".to_string()),
                ),
                Cell::from(card.next_review.to_string()).style(due_style),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(47),
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Length(15),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Flashcards - {} ", app.selected_category())),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.browse_state);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    let overview = mastery_overview(app.scheduler.cards());

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Mastery Overview",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("  Mastered   "),
            Span::styled(format!("{:>4}", overview.mastered), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("  Learning   "),
            Span::styled(format!("{:>4}", overview.learning), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("  Difficult  "),
            Span::styled(format!("{:>4}", overview.difficult), Style::default().fg(Color::Red)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Recent Activity",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for card in recent_activity(app.scheduler.cards(), app.recent_limit) {
        let reviewed = card
            .last_reviewed
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string());
        content.push(Line::from(vec![
            Span::raw(format!("  {}  ", truncate(&card.front, 50))),
            Span::styled(format!("Last reviewed: {}  ", reviewed), Style::default().fg(Color::DarkGray)),
            Span::styled(card.mastery_level().as_str(), Style::default().fg(Color::Yellow)),
        ]));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Stats "),
    );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut spans = vec![];
    match (app.current_page, app.session.state()) {
        (Page::Review, SessionState::NotStarted) => {
            spans.extend([key(" s"), Span::raw(" Start | ")]);
        }
        (Page::Review, SessionState::InProgress) => {
            spans.extend([
                key(" Space"),
                Span::raw(" Flip | "),
                key("1/2/3"),
                Span::raw(" Hard/Medium/Easy | "),
                key("←/→"),
                Span::raw(" Nav | "),
                key("x"),
                Span::raw(" Exit | "),
            ]);
        }
        (Page::Review, SessionState::Completed) => {
            spans.extend([key(" x"), Span::raw(" Back | ")]);
        }
        (Page::Browse, _) => {
            spans.extend([
                key(" ↑/↓"),
                Span::raw(" Nav | "),
                key("f"),
                Span::raw(" Category | "),
            ]);
        }
        (Page::Stats, _) => spans.push(Span::raw(" ")),
    }

    spans.extend([
        key("Tab"),
        Span::raw(" Page | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ]);

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_review::{get_all_cards, get_review_events, insert_cards, setup_database};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cards() -> Vec<Flashcard> {
        vec![
            Flashcard::new("Q1", "A1", "Biology", 3, date("2025-01-01")).with_id("a"),
            Flashcard::new("Q2", "A2", "Physics", 2, date("2025-02-01")).with_id("b"),
            Flashcard::new("Q3", "A3", "Biology", 1, date("2024-12-01")).with_id("c"),
        ]
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code, KeyModifiers::NONE).unwrap()
    }

    #[test]
    fn test_review_flow_via_keys() {
        let mut app = App::new(cards(), date("2025-01-01"));

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.session.state(), SessionState::InProgress);
        assert_eq!(app.session.len(), 2);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.show_answer);

        press(&mut app, KeyCode::Char('3'));
        assert!(!app.show_answer);
        assert_eq!(app.scheduler.get("a").unwrap().mastery.value(), 4);

        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.session.state(), SessionState::Completed);
        assert_eq!(app.scheduler.get("c").unwrap().next_review, date("2025-01-02"));

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.session.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_quit_and_page_cycle() {
        let mut app = App::new(cards(), date("2025-01-01"));
        assert!(press(&mut app, KeyCode::Tab));
        assert_eq!(app.current_page, Page::Browse);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_page, Page::Review);
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_rating_keys_ignored_outside_session() {
        let mut app = App::new(cards(), date("2025-01-01"));
        press(&mut app, KeyCode::Char('3'));
        assert!(app.scheduler.get("a").unwrap().last_reviewed.is_none());
    }

    #[test]
    fn test_browse_category_cycle() {
        let mut app = App::new(cards(), date("2025-01-01"));
        app.current_page = Page::Browse;
        assert_eq!(app.browse_cards().len(), 3);

        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.selected_category(), "Biology");
        assert_eq!(app.browse_cards().len(), 2);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.browse_state.selected(), Some(0));
    }

    #[test]
    fn test_ratings_persist_to_store() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        insert_cards(&conn, &cards()).unwrap();
        let loaded = get_all_cards(&conn).unwrap();

        let mut app = App::new(loaded, date("2025-01-01")).with_store(conn, "tui");
        app.start_session();
        app.rate(Rating::Medium);

        let conn = app.store.as_ref().unwrap();
        let events = get_review_events(conn, "a").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "tui");
        assert_eq!(events[0].next_review, date("2025-01-04"));
    }

    #[test]
    fn test_failed_save_keeps_state_and_ui_running() {
        // Store has the schema but none of the cards, so every save fails
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut app = App::new(cards(), date("2025-01-01")).with_store(conn, "tui");
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char(' '));
        assert!(press(&mut app, KeyCode::Char('3')));

        assert!(app.message.as_deref().unwrap().contains("not saved"));
        assert_eq!(app.session.state(), SessionState::InProgress);
        assert_eq!(app.session.position(), 0);
        assert!(app.show_answer);
        let card = app.scheduler.get("a").unwrap();
        assert_eq!(card.mastery.value(), 3);
        assert!(card.last_reviewed.is_none());
        assert!(get_review_events(app.store.as_ref().unwrap(), "a").unwrap().is_empty());
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
