//! Live session screen with the rest countdown popup

use crossterm::event::KeyCode;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use crate::db::Store;
use crate::error::SessionError;
use crate::session::{Route, SessionEngine, SetStatus};

pub enum LiveAction {
    Stay,
    Finished(Route),
    Abandon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Reps,
    Value,
    Name,
}

struct Input {
    field: Field,
    buffer: String,
}

/// One selectable line: an exercise header or one of its sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line {
    exercise: usize,
    set: Option<usize>,
}

pub struct LiveScreen<S: Store> {
    engine: SessionEngine<S>,
    cursor: usize,
    input: Option<Input>,
}

impl<S: Store> LiveScreen<S> {
    pub fn new(engine: SessionEngine<S>) -> Self {
        Self { engine, cursor: 0, input: None }
    }

    pub fn into_engine(self) -> SessionEngine<S> {
        self.engine
    }

    pub fn pump(&mut self) {
        self.engine.pump();
    }

    pub fn help(&self) -> &'static str {
        if self.engine.timer().resting {
            "esc: skip rest"
        } else if self.input.is_some() {
            "enter: save | esc: cancel"
        } else {
            "enter: done | s: skip | a/x: add/remove | e: exercise | +/-/r: reps | v: value | n: name | f: finish | esc: leave"
        }
    }

    fn lines(&self) -> Vec<Line> {
        self.engine
            .session()
            .exercises
            .iter()
            .enumerate()
            .flat_map(|(exercise, ex)| {
                std::iter::once(Line { exercise, set: None })
                    .chain((0..ex.sets.len()).map(move |set| Line { exercise, set: Some(set) }))
            })
            .collect()
    }

    fn current(&self) -> Option<Line> {
        self.lines().get(self.cursor).copied()
    }

    fn clamp_cursor(&mut self) {
        let len = self.lines().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<LiveAction, SessionError> {
        if self.engine.timer().resting {
            if matches!(code, KeyCode::Esc | KeyCode::Enter) {
                self.engine.dismiss_rest();
            }
            return Ok(LiveAction::Stay);
        }

        if let Some(input) = self.input.as_mut() {
            match code {
                KeyCode::Char(c) => input.buffer.push(c),
                KeyCode::Backspace => {
                    input.buffer.pop();
                }
                KeyCode::Esc => self.input = None,
                KeyCode::Enter => {
                    if let Some(input) = self.input.take() {
                        self.commit(input)?;
                    }
                }
                _ => {}
            }
            return Ok(LiveAction::Stay);
        }

        let line = self.current();
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.lines().len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(Line { exercise, set: Some(set) }) = line {
                    self.engine.mark_done(exercise, set)?;
                }
            }
            KeyCode::Char('s') => {
                if let Some(Line { exercise, set: Some(set) }) = line {
                    self.engine.mark_skipped(exercise, set)?;
                }
            }
            KeyCode::Char('a') => {
                if let Some(l) = line {
                    self.engine.add_set(l.exercise)?;
                }
            }
            KeyCode::Char('x') => {
                match line {
                    Some(Line { exercise, set: Some(set) }) => {
                        self.engine.remove_set(exercise, set)?;
                    }
                    Some(Line { exercise, set: None }) => {
                        self.engine.remove_exercise(exercise)?;
                    }
                    None => {}
                }
                self.clamp_cursor();
            }
            KeyCode::Char('e') => {
                self.engine.add_exercise();
            }
            KeyCode::Char('+') | KeyCode::Char('-') => {
                if let Some(Line { exercise, set: Some(set) }) = line {
                    let reps = self.engine.session().exercises[exercise].sets[set].reps;
                    let reps = if code == KeyCode::Char('+') {
                        reps.saturating_add(1)
                    } else {
                        reps.saturating_sub(1)
                    };
                    self.engine.set_reps(exercise, set, reps)?;
                }
            }
            KeyCode::Char('r') => self.begin(Field::Reps, line),
            KeyCode::Char('v') => self.begin(Field::Value, line),
            KeyCode::Char('n') => self.begin(Field::Name, line),
            KeyCode::Char('f') => return Ok(LiveAction::Finished(self.engine.finish()?)),
            KeyCode::Esc | KeyCode::Char('q') => return Ok(LiveAction::Abandon),
            _ => {}
        }
        Ok(LiveAction::Stay)
    }

    fn begin(&mut self, field: Field, line: Option<Line>) {
        let Some(line) = line else {
            return;
        };
        let session = self.engine.session();
        let buffer = match (field, line.set) {
            (Field::Name, _) => session.exercises[line.exercise].name.clone(),
            (Field::Reps, Some(set)) => session.exercises[line.exercise].sets[set].reps.to_string(),
            (Field::Value, Some(set)) => session.exercises[line.exercise].sets[set].value.clone(),
            _ => return,
        };
        self.input = Some(Input { field, buffer });
    }

    fn commit(&mut self, input: Input) -> Result<(), SessionError> {
        let Some(line) = self.current() else {
            return Ok(());
        };
        match (input.field, line.set) {
            (Field::Name, _) => {
                self.engine.rename_exercise(line.exercise, input.buffer)?;
            }
            (Field::Reps, Some(set)) => {
                self.engine.set_reps_text(line.exercise, set, &input.buffer)?;
            }
            (Field::Value, Some(set)) => {
                self.engine.set_value(line.exercise, set, input.buffer)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let session = self.engine.session();
        let (done, skipped, total) = session.progress();

        let rows: Vec<Row> = self
            .lines()
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let ex = &session.exercises[line.exercise];
                let editing = |field: Field| {
                    self.input
                        .as_ref()
                        .filter(|input| i == self.cursor && input.field == field)
                        .map(|input| format!("{}_", input.buffer))
                };

                let (cells, style) = match line.set {
                    None => (
                        vec![
                            Cell::from(editing(Field::Name).unwrap_or_else(|| ex.name.clone())),
                            Cell::from(""),
                            Cell::from(""),
                            Cell::from(""),
                        ],
                        Style::default().bold(),
                    ),
                    Some(j) => {
                        let set = &ex.sets[j];
                        let (mark, style) = status_look(set.status);
                        (
                            vec![
                                Cell::from(format!("  set {}", j + 1)),
                                Cell::from(mark),
                                Cell::from(editing(Field::Reps).unwrap_or_else(|| format!("{} reps", set.reps))),
                                Cell::from(editing(Field::Value).unwrap_or_else(|| set.value.clone())),
                            ],
                            style,
                        )
                    }
                };

                Row::new(cells).style(row_style(style, i == self.cursor))
            })
            .collect();

        let title = format!("{} ({}/{} done, {} skipped)", session.title, done, total, skipped);
        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(5),
                Constraint::Length(10),
                Constraint::Min(10),
            ],
        )
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(table, area);

        let timer = self.engine.timer();
        if timer.resting {
            let popup = centered(area, 30, 5);
            let countdown = Paragraph::new(format!("{}s", timer.remaining_seconds))
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Blue).bold())
                .block(Block::default().borders(Borders::ALL).title("Rest Time"));
            frame.render_widget(Clear, popup);
            frame.render_widget(countdown, popup);
        }
    }
}

fn status_look(status: SetStatus) -> (&'static str, Style) {
    match status {
        SetStatus::Pending => ("[ ]", Style::default()),
        SetStatus::Done => ("[x]", Style::default().fg(Color::Green)),
        SetStatus::Skipped => ("[-]", Style::default().fg(Color::DarkGray)),
    }
}

/// Cursor highlight goes on top of the row's own colour
fn row_style(style: Style, selected: bool) -> Style {
    if selected { style.reversed() } else { style }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_row_keeps_status_colour() {
        let (_, done) = status_look(SetStatus::Done);
        let style = row_style(done, true);
        assert_eq!(style.fg, Some(Color::Green));
        assert!(style.add_modifier.contains(Modifier::REVERSED));

        let (_, skipped) = status_look(SetStatus::Skipped);
        assert_eq!(row_style(skipped, true).fg, Some(Color::DarkGray));
        assert!(!row_style(skipped, false).add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_selected_exercise_header_stays_bold() {
        let style = row_style(Style::default().bold(), true);
        assert!(style.add_modifier.contains(Modifier::BOLD | Modifier::REVERSED));
    }
}
