//! Rest timer - one countdown shared by the whole session
//!
//! `RestTimer` is the pure state machine (idle -> resting -> idle).
//! A [`TickScheduler`] decides where the one-second ticks come from: a
//! tokio interval task in the terminal app, or hand-fed ticks in tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tick period of the rest countdown
pub const TICK: Duration = Duration::from_secs(1);

/// Snapshot of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestTimerState {
    pub resting: bool,
    pub total_seconds: u32,
    pub remaining_seconds: u32,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not resting, nothing happened
    Idle,
    /// Countdown still running
    Running(u32),
    /// Countdown just hit zero
    Finished,
}

#[derive(Debug, Default)]
pub struct RestTimer {
    state: RestTimerState,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RestTimerState {
        self.state
    }

    pub fn is_resting(&self) -> bool {
        self.state.resting
    }

    /// Begin a rest period, restarting any countdown already running.
    /// Zero seconds means no rest: the timer is left idle and false is returned.
    pub fn start(&mut self, seconds: u32) -> bool {
        if seconds == 0 {
            self.state = RestTimerState::default();
            return false;
        }
        self.state = RestTimerState {
            resting: true,
            total_seconds: seconds,
            remaining_seconds: seconds,
        };
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.resting {
            return TickOutcome::Idle;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.state.resting = false;
            TickOutcome::Finished
        } else {
            TickOutcome::Running(self.state.remaining_seconds)
        }
    }

    /// Stop early. Returns whether a countdown was actually running.
    pub fn dismiss(&mut self) -> bool {
        let was_resting = self.state.resting;
        self.state.resting = false;
        was_resting
    }
}

/// Source of countdown ticks, owned by the session
pub trait TickScheduler {
    /// Start delivering a tick every `period`, replacing any running schedule
    fn start(&mut self, period: Duration);

    /// Stop delivering ticks; ticks not yet collected are dropped
    fn cancel(&mut self);

    /// Number of ticks that came due since the last call
    fn take_due(&mut self) -> u32;

    fn is_running(&self) -> bool;
}

/// Audio/notification cues for rest start and end.
/// Implementations must swallow their own failures.
pub trait RestCue {
    fn rest_start(&self);
    fn rest_end(&self);
}

/// Cue that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl RestCue for SilentCue {
    fn rest_start(&self) {}
    fn rest_end(&self) {}
}

/// Scheduler backed by a tokio interval task
pub struct TokioTicker {
    runtime: Handle,
    task: Option<JoinHandle<()>>,
    ticks: Option<mpsc::UnboundedReceiver<()>>,
}

impl TokioTicker {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime, task: None, ticks: None }
    }
}

impl TickScheduler for TokioTicker {
    fn start(&mut self, period: Duration) {
        self.cancel();

        let (tx, rx) = mpsc::unbounded_channel();
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        self.ticks = Some(rx);
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.ticks = None;
    }

    fn take_due(&mut self) -> u32 {
        let Some(rx) = self.ticks.as_mut() else {
            return 0;
        };
        let mut due = 0;
        while rx.try_recv().is_ok() {
            due += 1;
        }
        due
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Default)]
struct ManualState {
    running: bool,
    due: u32,
    starts: u32,
    cancels: u32,
}

/// Scheduler whose ticks are fed by hand through a shared handle.
/// Clones share state, so one clone can live inside the engine while
/// another drives it.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    inner: Rc<RefCell<ManualState>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `n` ticks; ignored while not running
    pub fn fire(&self, n: u32) {
        let mut inner = self.inner.borrow_mut();
        if inner.running {
            inner.due += n;
        }
    }

    pub fn starts(&self) -> u32 {
        self.inner.borrow().starts
    }

    pub fn cancels(&self) -> u32 {
        self.inner.borrow().cancels
    }
}

impl TickScheduler for ManualTicker {
    fn start(&mut self, _period: Duration) {
        let mut inner = self.inner.borrow_mut();
        inner.running = true;
        inner.due = 0;
        inner.starts += 1;
    }

    fn cancel(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if inner.running {
            inner.cancels += 1;
        }
        inner.running = false;
        inner.due = 0;
    }

    fn take_due(&mut self) -> u32 {
        std::mem::take(&mut self.inner.borrow_mut().due)
    }

    fn is_running(&self) -> bool {
        self.inner.borrow().running
    }
}
