// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tracing::debug;

use crate::error::CellError;
use crate::fetcher::RateFetcher;
use crate::view::editable_cell::format_value;
use crate::view::table::{HEADER, HEADING, LOADING_TEXT};
use crate::view::{build_view, EditableValueCell, TableView, TypeCase};

const TICK: Duration = Duration::from_millis(100);

pub struct App {
    fetcher: RateFetcher,
    type_case: TypeCase,
    cells: Vec<EditableValueCell>,
    selected: Option<usize>,
    draft_text: String,
    draft_error: Option<CellError>,
    status: Option<String>,
    loaded_at: Option<DateTime<Local>>,
}

impl App {
    pub fn new(fetcher: RateFetcher, type_case: TypeCase) -> App {
        App {
            fetcher,
            type_case,
            cells: Vec::new(),
            selected: None,
            draft_text: String::new(),
            draft_error: None,
            status: None,
            loaded_at: None,
        }
    }

    pub fn mount(&mut self) {
        self.fetcher.mount();
    }

    pub fn unmount(&mut self) {
        self.fetcher.unmount();
    }

    /// Pulls in whatever the fetch task delivered since the last tick.
    pub fn on_tick(&mut self) {
        if self.fetcher.poll_settled() {
            self.on_settled();
        }
    }

    #[cfg(test)]
    async fn settle(&mut self) {
        if self.fetcher.settled().await {
            self.on_settled();
        }
    }

    fn on_settled(&mut self) {
        if self.fetcher.error().is_none() {
            self.loaded_at = Some(Local::now());
        }
        self.status = None;
        self.sync_cells();
    }

    /// Rows are only on screen (and editable) while there is data and no error.
    fn table_visible(&self) -> bool {
        self.fetcher.error().is_none() && self.fetcher.data().is_some()
    }

    /// Keeps one cell per currency id, in mapping order. Cells of ids that are
    /// still present keep their edit state.
    fn sync_cells(&mut self) {
        let Some(data) = self.fetcher.data() else {
            self.cells.clear();
            self.selected = None;
            return;
        };

        let mut previous = std::mem::take(&mut self.cells);
        self.cells = data
            .rates
            .iter()
            .map(|(id, rate)| {
                match previous.iter().position(|cell| cell.currency_id() == id) {
                    Some(index) => {
                        let mut cell = previous.swap_remove(index);
                        cell.sync(rate.value);
                        cell
                    }
                    None => EditableValueCell::new(id, rate.value),
                }
            })
            .collect();

        self.selected = match (self.selected, self.cells.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
    }

    pub fn next(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.cells.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn previous(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.cells.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn editing_index(&self) -> Option<usize> {
        self.selected.filter(|&i| self.cells[i].is_editing())
    }

    /// Returns `false` when the app should exit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match self.editing_index() {
            Some(i) => self.handle_edit_key(i, code),
            None => self.handle_view_key(code),
        }
    }

    fn handle_view_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => {
                self.unmount();
                return false;
            }
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(i) = self.selected.filter(|_| self.table_visible()) {
                    let cell = &mut self.cells[i];
                    cell.begin_edit();
                    self.draft_text = format_value(cell.display_value());
                    self.draft_error = None;
                    self.status = None;
                }
            }
            KeyCode::Char('r') => {
                self.mount();
                self.status = Some("Refreshing...".to_string());
            }
            _ => {}
        }
        true
    }

    fn handle_edit_key(&mut self, i: usize, code: KeyCode) -> bool {
        match code {
            KeyCode::Enter => {
                if let Some(err) = &self.draft_error {
                    self.status = Some(err.to_string());
                    return true;
                }
                let fetcher = &mut self.fetcher;
                let result = self.cells[i].commit(|id, value| fetcher.update_currency_rate(id, value));
                match result {
                    Some(Err(err)) => self.status = Some(err.to_string()),
                    Some(Ok(())) => debug!(currency_id = self.cells[i].currency_id(), "rate edited"),
                    None => {}
                }
                self.draft_text.clear();
                self.sync_cells();
            }
            KeyCode::Esc => {
                self.cells[i].cancel();
                self.draft_text.clear();
                self.draft_error = None;
                self.status = None;
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') => {
                self.draft_text.push(c);
                self.draft_changed(i);
            }
            KeyCode::Backspace => {
                self.draft_text.pop();
                self.draft_changed(i);
            }
            _ => {}
        }
        true
    }

    fn draft_changed(&mut self, i: usize) {
        self.draft_error = self.cells[i].input(&self.draft_text).err();
        self.status = self.draft_error.as_ref().map(|err| err.to_string());
    }

    fn value_cell_text(&self, i: usize, committed: &str) -> String {
        match self.cells.get(i) {
            Some(cell) if cell.is_editing() => format!("[{}▏] ✓ ⏎  ✕ Esc", self.draft_text),
            _ => committed.to_string(),
        }
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    app.mount();
    loop {
        app.on_tick();
        terminal.draw(|f| draw_ui(f, &app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                    return Ok(());
                }
            }
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(f.size());

    let mut heading = vec![Span::styled(
        HEADING,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if app.fetcher.is_in_flight() {
        heading.push(Span::raw("  fetching..."));
    } else if let Some(loaded_at) = app.loaded_at {
        heading.push(Span::raw(format!("  updated {}", loaded_at.format("%H:%M:%S"))));
    }
    let title = Paragraph::new(Line::from(heading)).block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    match build_view(app.fetcher.state(), app.type_case) {
        TableView::Error(message) => {
            let error = Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(error, chunks[1]);
        }
        TableView::Loading => {
            let loading = Paragraph::new(LOADING_TEXT).block(Block::default().borders(Borders::ALL));
            f.render_widget(loading, chunks[1]);
        }
        TableView::Table(rows) => {
            let rows: Vec<Row> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    Row::new(vec![
                        row.name.clone(),
                        row.unit.clone(),
                        app.value_cell_text(i, &row.value),
                        row.kind.clone(),
                    ])
                })
                .collect();

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(35),
                    Constraint::Percentage(15),
                    Constraint::Percentage(35),
                    Constraint::Percentage(15),
                ],
            )
            .header(Row::new(HEADER).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

            let mut state = TableState::default().with_selected(app.selected);
            f.render_stateful_widget(table, chunks[1], &mut state);
        }
    }

    let hints = if app.editing_index().is_some() {
        "Enter save · Esc cancel · Backspace delete"
    } else {
        "↑/↓ select · e edit · r refresh · q quit"
    };
    let status = match &app.status {
        Some(message) => Line::from(vec![
            Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
            Span::raw("  "),
            Span::raw(hints),
        ]),
        None => Line::from(hints),
    };
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL)),
        chunks[2],
    );
}

pub fn start_tui(app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockRateSource;
    use crate::models::CurrencyRateResponse;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn bitcoin_response() -> CurrencyRateResponse {
        serde_json::from_str(
            r#"{"rates": {
                "btc": {"name": "Bitcoin", "unit": "BTC", "value": 50000, "type": "crypto"},
                "eur": {"name": "Euro", "unit": "EUR", "value": 46000.5, "type": "fiat"}
            }}"#,
        )
        .unwrap()
    }

    async fn loaded_app() -> App {
        let mut source = MockRateSource::new();
        source.expect_fetch_rates().returning(|| Ok(bitcoin_response()));
        let mut app = App::new(RateFetcher::new(Arc::new(source)), TypeCase::Verbatim);
        app.mount();
        app.settle().await;
        app
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal.draw(|f| draw_ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    fn rate_value(app: &App, id: &str) -> f64 {
        app.fetcher.data().unwrap().rates.get(id).unwrap().value
    }

    #[tokio::test]
    async fn test_shows_loading_then_rows() {
        let mut source = MockRateSource::new();
        source.expect_fetch_rates().returning(|| Ok(bitcoin_response()));
        let mut app = App::new(RateFetcher::new(Arc::new(source)), TypeCase::Verbatim);

        app.mount();
        assert!(screen(&app).contains(LOADING_TEXT));

        app.settle().await;
        let text = screen(&app);
        assert!(text.contains("Currency rates"));
        assert!(text.contains("Bitcoin"));
        assert!(text.contains("50000"));
        assert!(text.contains("crypto"));
        assert!(!text.contains(LOADING_TEXT));
        assert_eq!(app.selected, Some(0));
    }

    #[tokio::test]
    async fn test_shows_error_without_table() {
        let mut source = MockRateSource::new();
        source
            .expect_fetch_rates()
            .returning(|| Err(anyhow::anyhow!("Network down").into()));
        let mut app = App::new(RateFetcher::new(Arc::new(source)), TypeCase::Verbatim);
        app.mount();
        app.settle().await;

        let text = screen(&app);
        assert!(text.contains("Network down"));
        assert!(!text.contains("Unit"));
    }

    #[tokio::test]
    async fn test_edit_and_commit() {
        let mut app = loaded_app().await;

        app.handle_key(KeyCode::Char('e'));
        assert!(app.editing_index().is_some());
        assert_eq!(app.draft_text, "50000");

        for _ in 0..5 {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "51000");
        app.handle_key(KeyCode::Enter);

        assert!(app.editing_index().is_none());
        assert_eq!(rate_value(&app, "btc"), 51000.0);
        assert_eq!(rate_value(&app, "eur"), 46000.5);
        assert!(screen(&app).contains("51000"));
    }

    #[tokio::test]
    async fn test_edit_and_cancel() {
        let mut app = loaded_app().await;

        app.handle_key(KeyCode::Enter);
        for _ in 0..5 {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "999");
        app.handle_key(KeyCode::Esc);

        assert!(app.editing_index().is_none());
        assert_eq!(rate_value(&app, "btc"), 50000.0);
        let text = screen(&app);
        assert!(text.contains("50000"));
        assert!(!text.contains("999"));
    }

    #[tokio::test]
    async fn test_invalid_draft_blocks_commit() {
        let mut app = loaded_app().await;

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('e'));
        type_text(&mut app, "e");
        assert!(app.draft_error.is_some());

        app.handle_key(KeyCode::Enter);
        assert!(app.editing_index().is_some());
        assert!(app.status.as_deref().unwrap().contains("is not a number"));

        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Enter);
        assert!(app.editing_index().is_none());
        assert_eq!(rate_value(&app, "eur"), 46000.5);
    }

    fn refresh_then_fail() -> MockRateSource {
        let mut source = MockRateSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_rates()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(bitcoin_response()));
        source
            .expect_fetch_rates()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(anyhow::anyhow!("Network down").into()));
        source
    }

    #[tokio::test]
    async fn test_failed_refresh_hides_rows_from_editing() {
        let mut app = App::new(RateFetcher::new(Arc::new(refresh_then_fail())), TypeCase::Verbatim);
        app.mount();
        app.settle().await;

        app.handle_key(KeyCode::Char('r'));
        app.settle().await;
        assert!(app.fetcher.error().is_some());

        app.handle_key(KeyCode::Char('e'));
        assert!(app.editing_index().is_none());
        for _ in 0..5 {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "7");
        app.handle_key(KeyCode::Enter);

        assert!(app.editing_index().is_none());
        assert_eq!(rate_value(&app, "btc"), 50000.0);
        let text = screen(&app);
        assert!(text.contains("Network down"));
        assert!(!text.contains("Bitcoin"));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_refreshing_status() {
        let mut app = App::new(RateFetcher::new(Arc::new(refresh_then_fail())), TypeCase::Verbatim);
        app.mount();
        app.settle().await;

        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status.as_deref(), Some("Refreshing..."));

        app.settle().await;
        assert!(app.status.is_none());
        assert!(!screen(&app).contains("Refreshing..."));
    }

    #[tokio::test]
    async fn test_selection_wraps() {
        let mut app = loaded_app().await;
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected, Some(1));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected, Some(0));
    }

    #[tokio::test]
    async fn test_quit_unmounts() {
        let mut app = loaded_app().await;
        assert!(app.handle_key(KeyCode::Char('r')));
        assert!(app.fetcher.is_in_flight());
        assert_eq!(app.status.as_deref(), Some("Refreshing..."));

        assert!(!app.handle_key(KeyCode::Char('q')));
        assert!(!app.fetcher.is_in_flight());
    }
}
