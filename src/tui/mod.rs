//! TUI module - Terminal front end with ratatui

mod live;

use std::io::{stdout, Stdout, Write};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use tokio::runtime::Handle;
use tracing::info;

use crate::db::{Store, WorkoutRepo};
use crate::error::SessionError;
use crate::models::WorkoutTemplate;
use crate::session::{RestCue, Route, SessionEngine, TokioTicker};
use crate::streak;

use live::{LiveAction, LiveScreen};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Rest cue for terminals: ring the bell
#[derive(Debug, Default, Clone, Copy)]
pub struct BellCue;

impl RestCue for BellCue {
    fn rest_start(&self) {
        let _ = stdout().write_all(b"\x07").and_then(|_| stdout().flush());
    }

    fn rest_end(&self) {
        let _ = stdout().write_all(b"\x07\x07").and_then(|_| stdout().flush());
    }
}

enum Screen<S: Store> {
    List,
    Live(Box<LiveScreen<S>>),
    /// Requested workout does not exist; only way out is home
    Missing(String),
}

/// App state for TUI
pub struct App<S: Store + Copy> {
    store: S,
    workouts: Vec<WorkoutTemplate>,
    streak_title: String,
    selected: usize,
    screen: Screen<S>,
    message: Option<String>,
    should_quit: bool,
}

impl<S: Store + Copy> App<S> {
    pub fn new(store: S) -> Result<Self> {
        let repo = WorkoutRepo::new(store);
        let workouts = repo.list()?;
        let streak_title = streak_title(&repo);
        Ok(Self {
            store,
            workouts,
            streak_title,
            selected: 0,
            screen: Screen::List,
            message: None,
            should_quit: false,
        })
    }

    /// Open straight into a live session
    pub fn with_session(store: S, workout_id: &str) -> Result<Self> {
        let mut app = Self::new(store)?;
        app.start_session(workout_id)?;
        Ok(app)
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            if let Screen::Live(live) = &mut self.screen {
                live.pump();
            }
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        let repo = WorkoutRepo::new(self.store);
        self.workouts = repo.list()?;
        self.streak_title = streak_title(&repo);
        if self.selected >= self.workouts.len() {
            self.selected = self.workouts.len().saturating_sub(1);
        }
        Ok(())
    }

    fn start_session(&mut self, workout_id: &str) -> Result<()> {
        match SessionEngine::load(self.store, workout_id) {
            Ok(engine) => {
                let engine = engine
                    .with_ticker(TokioTicker::new(Handle::current()))
                    .with_cue(BellCue);
                self.screen = Screen::Live(Box::new(LiveScreen::new(engine)));
            }
            Err(SessionError::NotFound(id)) => {
                self.screen = Screen::Missing(id);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn go(&mut self, route: Route) -> Result<()> {
        info!("Navigating to {}", route.path());
        match route {
            Route::Home => {
                self.screen = Screen::List;
                self.refresh()
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new("setstreak - Workouts")
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let footer_text = match &self.screen {
            Screen::List => {
                self.render_list(frame, chunks[1]);
                "q: quit | enter: start | d: delete | r: refresh".to_string()
            }
            Screen::Live(live) => {
                live.render(frame, chunks[1]);
                live.help().to_string()
            }
            Screen::Missing(id) => {
                let text = format!("Workout `{}` was not found.\n\nPress enter to go home.", id);
                let missing = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL).title("Not found"));
                frame.render_widget(missing, chunks[1]);
                "enter: home".to_string()
            }
        };

        let footer_text = match &self.message {
            Some(msg) => format!("{} | {}", msg, footer_text),
            None => footer_text,
        };
        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let streak_line = self.streak_title.as_str();

        if self.workouts.is_empty() {
            let empty = Paragraph::new("No workouts yet. Create one with `setstreak create`.")
                .block(Block::default().borders(Borders::ALL).title(streak_line));
            frame.render_widget(empty, area);
            return;
        }

        let rows: Vec<Row> = self
            .workouts
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let sets: usize = w.exercises.iter().map(|e| e.sets.len()).sum();
                let row = Row::new(vec![
                    Cell::from(w.title.clone()),
                    Cell::from(w.exercises.len().to_string()),
                    Cell::from(sets.to_string()),
                    Cell::from(match w.rest_seconds() {
                        0 => "-".to_string(),
                        s => format!("{}s", s),
                    }),
                ]);
                if i == self.selected {
                    row.style(Style::default().reversed())
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(6),
                Constraint::Length(6),
            ],
        )
        .header(Row::new(vec!["Title", "Exercises", "Sets", "Rest"]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title(streak_line));

        frame.render_widget(table, area);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.message = None;
            match &mut self.screen {
                Screen::List => self.handle_list_key(key.code)?,
                Screen::Missing(_) => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                        self.go(Route::Home)?;
                    }
                }
                Screen::Live(live) => match live.handle_key(key.code) {
                    Ok(LiveAction::Stay) => {}
                    Ok(LiveAction::Finished(route)) => {
                        self.message = Some("Workout finished".to_string());
                        self.go(route)?;
                    }
                    Ok(LiveAction::Abandon) => {
                        let screen = std::mem::replace(&mut self.screen, Screen::List);
                        if let Screen::Live(live) = screen {
                            let route = live.into_engine().abandon();
                            self.go(route)?;
                        }
                    }
                    Err(e) => self.message = Some(e.to_string()),
                },
            }
        }
        Ok(())
    }

    fn handle_list_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.refresh()?,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.workouts.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.workouts.get(self.selected).map(|w| w.id.clone()) {
                    self.start_session(&id)?;
                }
            }
            KeyCode::Char('d') => {
                if let Some(w) = self.workouts.get(self.selected) {
                    let title = w.title.clone();
                    WorkoutRepo::new(self.store).delete(&w.id)?;
                    self.message = Some(format!("Deleted {}", title));
                    self.refresh()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn streak_title<S: Store>(repo: &WorkoutRepo<S>) -> String {
    match repo.history() {
        Ok(history) => {
            let dates = streak::marked_dates(&history);
            let today = chrono::Local::now().date_naive();
            format!(
                "Workouts (streak: {} days, best: {})",
                streak::current_streak(&dates, today),
                streak::longest_streak(&dates)
            )
        }
        Err(_) => "Workouts".to_string(),
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
