//! Live workout session
//!
//! A session is a deep copy of one template with a status on every set.
//! It lives only in memory: nothing reaches the store until `finish`,
//! and `abandon` throws all of it away.

pub mod timer;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{Store, WorkoutRepo};
use crate::error::{SessionError, StoreError};
use crate::models::{
    parse_leading_int, CompletionRecord, ExerciseTemplate, SetTemplate, WorkoutTemplate,
};

pub use timer::{
    ManualTicker, RestCue, RestTimer, RestTimerState, SilentCue, TickOutcome, TickScheduler,
    TokioTicker, TICK,
};

/// Name given to exercises added during a session
pub const NEW_EXERCISE_NAME: &str = "New exercise";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetStatus {
    #[default]
    Pending,
    Done,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWithStatus {
    pub reps: u32,
    pub value: String,
    pub status: SetStatus,
}

impl SetWithStatus {
    fn pending(reps: u32, value: impl Into<String>) -> Self {
        Self { reps, value: value.into(), status: SetStatus::Pending }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseSession {
    pub name: String,
    pub sets: Vec<SetWithStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutSession {
    pub id: String,
    pub title: String,
    pub exercises: Vec<ExerciseSession>,
}

impl WorkoutSession {
    pub fn from_template(template: &WorkoutTemplate) -> Self {
        let exercises = template
            .exercises
            .iter()
            .map(|ex| ExerciseSession {
                name: ex.name.clone(),
                sets: ex
                    .sets
                    .iter()
                    .map(|s| SetWithStatus::pending(s.reps, s.value.clone()))
                    .collect(),
            })
            .collect();

        Self {
            id: template.id.clone(),
            title: template.title.clone(),
            exercises,
        }
    }

    /// Exercises as they will be written back: reps and value only
    pub fn to_exercise_templates(&self) -> Vec<ExerciseTemplate> {
        self.exercises
            .iter()
            .map(|ex| ExerciseTemplate {
                name: ex.name.clone(),
                sets: ex
                    .sets
                    .iter()
                    .map(|s| SetTemplate::new(s.reps, s.value.clone()))
                    .collect(),
            })
            .collect()
    }

    /// (done, skipped, total) over all sets
    pub fn progress(&self) -> (usize, usize, usize) {
        let sets = self.exercises.iter().flat_map(|ex| ex.sets.iter());
        sets.fold((0, 0, 0), |(done, skipped, total), s| match s.status {
            SetStatus::Done => (done + 1, skipped, total + 1),
            SetStatus::Skipped => (done, skipped + 1, total + 1),
            SetStatus::Pending => (done, skipped, total + 1),
        })
    }
}

/// Where the caller should go once the session is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Workout list
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
        }
    }
}

/// Reps typed by the user, read by their leading integer ("1.5" -> 1);
/// no digits or a negative number becomes 0
pub fn coerce_reps(text: &str) -> u32 {
    parse_leading_int(text)
}

/// Drives one live session: set statuses, structural edits, rest timer, finish
pub struct SessionEngine<S: Store> {
    repo: WorkoutRepo<S>,
    session: WorkoutSession,
    rest_seconds: u32,
    timer: RestTimer,
    ticker: Box<dyn TickScheduler>,
    cue: Box<dyn RestCue>,
}

impl<S: Store> SessionEngine<S> {
    /// Load the template `workout_id` and start a session on it.
    /// A missing or undecodable template is reported as `NotFound`.
    pub fn load(store: S, workout_id: &str) -> Result<Self, SessionError> {
        let repo = WorkoutRepo::new(store);
        let template = match repo.get(workout_id) {
            Ok(Some(template)) => template,
            Ok(None) => return Err(SessionError::NotFound(workout_id.to_string())),
            Err(StoreError::MalformedStoredData { key, reason }) => {
                warn!("Cannot read `{}` while loading {}: {}", key, workout_id, reason);
                return Err(SessionError::NotFound(workout_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let session = WorkoutSession::from_template(&template);
        let rest_seconds = template.rest_seconds();
        info!(
            "Session loaded: {} ({} exercises, rest {}s)",
            session.title,
            session.exercises.len(),
            rest_seconds
        );

        Ok(Self {
            repo,
            session,
            rest_seconds,
            timer: RestTimer::new(),
            ticker: Box::new(ManualTicker::new()),
            cue: Box::new(SilentCue),
        })
    }

    pub fn with_ticker(mut self, ticker: impl TickScheduler + 'static) -> Self {
        self.ticker.cancel();
        self.ticker = Box::new(ticker);
        self
    }

    pub fn with_cue(mut self, cue: impl RestCue + 'static) -> Self {
        self.cue = Box::new(cue);
        self
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }

    pub fn rest_seconds(&self) -> u32 {
        self.rest_seconds
    }

    pub fn timer(&self) -> RestTimerState {
        self.timer.state()
    }

    /// Overwrite one set's status. Marking `Done` starts the rest countdown.
    pub fn mark_set(
        &mut self,
        exercise: usize,
        set: usize,
        status: SetStatus,
    ) -> Result<&WorkoutSession, SessionError> {
        self.set_mut(exercise, set)?.status = status;
        debug!("Set {}/{} marked {:?}", exercise, set, status);

        if status == SetStatus::Done {
            self.start_rest();
        }
        Ok(&self.session)
    }

    pub fn mark_done(&mut self, exercise: usize, set: usize) -> Result<&WorkoutSession, SessionError> {
        self.mark_set(exercise, set, SetStatus::Done)
    }

    pub fn mark_skipped(&mut self, exercise: usize, set: usize) -> Result<&WorkoutSession, SessionError> {
        self.mark_set(exercise, set, SetStatus::Skipped)
    }

    /// Append an exercise with one default set
    pub fn add_exercise(&mut self) -> &WorkoutSession {
        self.session.exercises.push(ExerciseSession {
            name: NEW_EXERCISE_NAME.to_string(),
            sets: vec![SetWithStatus::pending(1, "")],
        });
        &self.session
    }

    pub fn remove_exercise(&mut self, exercise: usize) -> Result<&WorkoutSession, SessionError> {
        if exercise >= self.session.exercises.len() {
            return Err(SessionError::NoSuchExercise(exercise));
        }
        self.session.exercises.remove(exercise);
        Ok(&self.session)
    }

    pub fn rename_exercise(
        &mut self,
        exercise: usize,
        name: impl Into<String>,
    ) -> Result<&WorkoutSession, SessionError> {
        self.exercise_mut(exercise)?.name = name.into();
        Ok(&self.session)
    }

    /// Append a pending set copying the last set's reps/value, or `{1, ""}`
    pub fn add_set(&mut self, exercise: usize) -> Result<&WorkoutSession, SessionError> {
        let sets = &mut self.exercise_mut(exercise)?.sets;
        let next = match sets.last() {
            Some(last) => SetWithStatus::pending(last.reps, last.value.clone()),
            None => SetWithStatus::pending(1, ""),
        };
        sets.push(next);
        Ok(&self.session)
    }

    pub fn remove_set(&mut self, exercise: usize, set: usize) -> Result<&WorkoutSession, SessionError> {
        let sets = &mut self.exercise_mut(exercise)?.sets;
        if set >= sets.len() {
            return Err(SessionError::NoSuchSet { exercise, set });
        }
        sets.remove(set);
        Ok(&self.session)
    }

    pub fn set_reps(&mut self, exercise: usize, set: usize, reps: u32) -> Result<&WorkoutSession, SessionError> {
        self.set_mut(exercise, set)?.reps = reps;
        Ok(&self.session)
    }

    /// Same as `set_reps`, from raw user input
    pub fn set_reps_text(&mut self, exercise: usize, set: usize, text: &str) -> Result<&WorkoutSession, SessionError> {
        self.set_reps(exercise, set, coerce_reps(text))
    }

    pub fn set_value(
        &mut self,
        exercise: usize,
        set: usize,
        value: impl Into<String>,
    ) -> Result<&WorkoutSession, SessionError> {
        self.set_mut(exercise, set)?.value = value.into();
        Ok(&self.session)
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> RestTimerState {
        if self.timer.tick() == TickOutcome::Finished {
            self.ticker.cancel();
            info!("Rest finished");
            self.cue.rest_end();
        }
        self.timer.state()
    }

    /// Apply every tick the scheduler has delivered since the last call
    pub fn pump(&mut self) -> RestTimerState {
        let due = self.ticker.take_due();
        for _ in 0..due {
            if !self.timer.is_resting() {
                break;
            }
            self.tick();
        }
        self.timer.state()
    }

    /// Close the rest countdown early; no end cue
    pub fn dismiss_rest(&mut self) -> RestTimerState {
        if self.timer.dismiss() {
            info!("Rest dismissed");
        }
        self.ticker.cancel();
        self.timer.state()
    }

    /// Log the completion, write set edits back onto the template and
    /// send the caller home. Calling it again logs another completion.
    pub fn finish(&mut self) -> Result<Route, SessionError> {
        self.dismiss_rest();

        let record = CompletionRecord {
            workout_id: self.session.id.clone(),
            title: self.session.title.clone(),
            date: Utc::now(),
        };
        self.repo.append_completion(record)?;

        match self
            .repo
            .update_exercises(&self.session.id, self.session.to_exercise_templates())
        {
            Ok(true) => {}
            Ok(false) => warn!("Workout {} no longer stored, edits not saved", self.session.id),
            Err(StoreError::MalformedStoredData { key, reason }) => {
                warn!("Cannot write back edits, `{}` is malformed: {}", key, reason)
            }
            Err(e) => return Err(e.into()),
        }

        let (done, skipped, total) = self.session.progress();
        info!(
            "Session finished: {} ({} done, {} skipped, {} sets)",
            self.session.title, done, skipped, total
        );
        Ok(Route::Home)
    }

    /// Leave without saving anything
    pub fn abandon(mut self) -> Route {
        self.ticker.cancel();
        info!("Session abandoned: {}", self.session.title);
        Route::Home
    }

    fn start_rest(&mut self) {
        if self.timer.start(self.rest_seconds) {
            self.ticker.start(TICK);
            info!("Rest started: {}s", self.rest_seconds);
            self.cue.rest_start();
        }
    }

    fn exercise_mut(&mut self, exercise: usize) -> Result<&mut ExerciseSession, SessionError> {
        self.session
            .exercises
            .get_mut(exercise)
            .ok_or(SessionError::NoSuchExercise(exercise))
    }

    fn set_mut(&mut self, exercise: usize, set: usize) -> Result<&mut SetWithStatus, SessionError> {
        self.exercise_mut(exercise)?
            .sets
            .get_mut(set)
            .ok_or(SessionError::NoSuchSet { exercise, set })
    }
}
