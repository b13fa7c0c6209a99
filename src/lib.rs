//! setstreak - Workout templates, live sessions and a streak calendar
//!
//! Templates and the completion log live in a key-value [`db::Store`];
//! a [`session::SessionEngine`] runs one template at a time in memory.

pub mod db;
pub mod editor;
pub mod error;
pub mod models;
pub mod session;
pub mod streak;
pub mod tui;

pub use db::{MemoryStore, SqliteStore, Store, WorkoutRepo};
pub use session::SessionEngine;
