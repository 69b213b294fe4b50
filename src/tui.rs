use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::error::StoreError;
use crate::models::{ApplicationRecord, Intent, Status};
use crate::store::ApplicationStore;

enum Notice {
    Info(String),
    Error(String),
}

struct AppState {
    filter: Vec<Status>,
    rows: Vec<usize>, // store indices visible under the filter
    selected: usize,
    scroll_offset: u16,
    pending_delete: bool,
    notice: Option<Notice>,
}

impl AppState {
    fn new(store: &ApplicationStore, filter: Vec<Status>) -> Self {
        let mut state = Self {
            filter,
            rows: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            pending_delete: false,
            notice: None,
        };
        state.refresh(store);
        state
    }

    fn refresh(&mut self, store: &ApplicationStore) {
        self.rows = store.list(&self.filter).into_iter().map(|(i, _)| i).collect();
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn current_index(&self) -> Option<usize> {
        self.rows.get(self.selected).copied()
    }

    fn next(&mut self) {
        if !self.rows.is_empty() && self.selected < self.rows.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// All -> each status present in the table -> all.
    fn cycle_filter(&mut self, store: &ApplicationStore) {
        let present = store.statuses_present();
        self.filter = match self.filter.as_slice() {
            [] => present.first().copied().into_iter().collect(),
            [current] => present
                .iter()
                .position(|s| s == current)
                .and_then(|p| present.get(p + 1))
                .copied()
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };
        self.selected = 0;
        self.scroll_offset = 0;
        self.refresh(store);
    }

    fn filter_label(&self) -> String {
        if self.filter.is_empty() {
            "all".to_string()
        } else {
            self.filter
                .iter()
                .map(|s| s.label())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn report(&mut self, result: std::result::Result<String, StoreError>) {
        self.notice = Some(match result {
            Ok(msg) => Notice::Info(msg),
            Err(e) if e.is_recoverable() => Notice::Error(e.to_string()),
            Err(e) => Notice::Error(format!("{} (nothing was saved)", e)),
        });
    }

    fn set_status(&mut self, store: &mut ApplicationStore, status: Status) {
        let Some(index) = self.current_index() else { return };
        let result = store
            .update_status(index, status)
            .map(|_| format!("Application updated successfully! (#{} is now {})", index, status));
        self.report(result);
        self.refresh(store);
    }

    fn confirm_delete(&mut self, store: &mut ApplicationStore) {
        self.pending_delete = false;
        let Some(index) = self.current_index() else { return };
        let result = store.apply(Intent::Delete(index)).map(|o| o.to_string());
        self.report(result);
        self.refresh(store);
    }
}

pub fn run_browse(store: &mut ApplicationStore, filter: Vec<Status>) -> Result<()> {
    if store.records().is_empty() {
        println!("No applications yet. Add your first one with 'jotrack add <COMPANY> <JOB_TITLE>'.");
        return Ok(());
    }

    let mut state = AppState::new(store, filter);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    store: &mut ApplicationStore,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(state.current_index().map(|_| state.selected));
        let view: &ApplicationStore = store;
        terminal.draw(|frame| draw(frame, state, view, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if state.pending_delete {
                match key.code {
                    KeyCode::Char('y') => state.confirm_delete(store),
                    _ => {
                        state.pending_delete = false;
                        state.notice = Some(Notice::Info("Delete cancelled.".to_string()));
                    }
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('f') => state.cycle_filter(store),
                KeyCode::Char('d') => {
                    if let Some(rec) = state.current_index().and_then(|i| store.get(i)) {
                        let prompt = format!("Delete {} - {}? (y/n)", rec.company, rec.job_title);
                        state.notice = Some(Notice::Error(prompt));
                        state.pending_delete = true;
                    }
                }
                KeyCode::Char('r') => {
                    let result = store.reload().map(|_| "Reloaded from disk.".to_string());
                    state.report(result);
                    state.refresh(store);
                }
                KeyCode::Char(c @ '1'..='7') => {
                    let slot = c as usize - '1' as usize;
                    state.set_status(store, Status::ALL[slot]);
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Applied => " ",
        Status::Assessment => "a",
        Status::PhoneScreen => "p",
        Status::Interview => "*",
        Status::Offer => "$",
        Status::Rejected => "x",
        Status::Withdrawn => "-",
    }
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Assessment | Status::PhoneScreen => Style::default().fg(Color::Yellow),
        Status::Interview => Style::default().fg(Color::Magenta),
        Status::Offer => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
        Status::Withdrawn => Style::default().fg(Color::DarkGray),
    }
}

fn draw(frame: &mut Frame, state: &AppState, store: &ApplicationStore, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .rows
        .iter()
        .filter_map(|&idx| store.get(idx).map(|rec| (idx, rec)))
        .map(|(idx, rec)| {
            ListItem::new(format!(
                "{} #{:<3} {} - {}",
                status_marker(rec.status),
                idx,
                rec.company,
                rec.job_title
            ))
            .style(status_style(rec.status))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}/{}) [{}] ",
            state.rows.len(),
            store.records().len(),
            state.filter_label()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = match state.current_index().and_then(|i| store.get(i)) {
        Some(rec) => build_detail(rec),
        None => Text::raw("No applications match this filter"),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Metrics + last message
    let metrics = store.metrics();
    let mut status_line = vec![Span::raw(format!(
        " Total: {}  Active: {}  Offers: {}  ",
        metrics.total, metrics.active, metrics.offers
    ))];
    match &state.notice {
        Some(Notice::Info(msg)) => {
            status_line.push(Span::styled(msg.clone(), Style::default().fg(Color::Green)))
        }
        Some(Notice::Error(msg)) => {
            status_line.push(Span::styled(msg.clone(), Style::default().fg(Color::Red)))
        }
        None => {}
    }
    frame.render_widget(Paragraph::new(Line::from(status_line)), rows[1]);

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  1-7:Applied..Withdrawn  f:filter  d:delete  r:reload  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(rec: &ApplicationRecord) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(rec.job_title.clone(), bold)));
    lines.push(Line::from(format!("at {}", rec.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", rec.status),
        status_style(rec.status),
    )));
    lines.push(Line::from(format!("Applied: {}", rec.date_applied.format("%Y-%m-%d"))));
    if !rec.status_history.is_empty() {
        lines.push(Line::from(format!("History: {}", rec.status_history)));
    }
    lines.push(Line::from(Span::styled(
        format!("Last updated {}", rec.last_updated.format("%Y-%m-%d %H:%M:%S")),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    for (label, body) in [
        ("Description", &rec.description),
        ("Next Steps", &rec.next_steps),
        ("Notes", &rec.notes),
    ] {
        if body.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(label, bold)));
        for line in textwrap::fill(body, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    Text::from(lines)
}
