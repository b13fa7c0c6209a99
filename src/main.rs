//! setstreak - Workout templates, live sessions and a streak calendar

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::Level;

use setstreak::db::{SqliteStore, WorkoutRepo};
use setstreak::editor::{ExerciseDraft, WorkoutDraft, REST_CHOICES};
use setstreak::models::SetTemplate;
use setstreak::streak;
use setstreak::tui::App;

#[derive(Parser)]
#[command(name = "setstreak")]
#[command(author, version, about = "Workout templates, live sessions and a streak calendar")]
struct Cli {
    /// Database file
    #[arg(long, global = true, env = "SETSTREAK_DB", default_value = "setstreak.db")]
    db: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui,

    /// List workouts
    List,

    /// Show one workout
    Show { id: String },

    /// Create a workout
    Create {
        #[arg(short, long)]
        title: String,

        /// Rest between sets in seconds (20, 30, 45, 60, 90, 120)
        #[arg(short, long)]
        rest: Option<u32>,

        /// Exercise as "Name=10x50kg,8x60kg" (repeatable)
        #[arg(short, long = "exercise", value_parser = parse_exercise, required = true)]
        exercises: Vec<ExerciseDraft>,
    },

    /// Edit a workout; exercises given here replace the old list
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, conflicts_with = "no_rest")]
        rest: Option<u32>,

        /// Remove the rest timer
        #[arg(long)]
        no_rest: bool,

        #[arg(short, long = "exercise", value_parser = parse_exercise)]
        exercises: Vec<ExerciseDraft>,
    },

    /// Delete a workout
    Delete { id: String },

    /// Run a live session for a workout
    Start { id: String },

    /// Show completed workouts
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the streak calendar
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },
}

/// "Squat=10x50kg,8x60kg" -> exercise with two sets
fn parse_exercise(arg: &str) -> Result<ExerciseDraft, String> {
    let (name, sets) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=REPSxVALUE,..., got `{}`", arg))?;

    let sets = sets
        .split(',')
        .map(|set| {
            let (reps, value) = set
                .trim()
                .split_once('x')
                .ok_or_else(|| format!("expected REPSxVALUE, got `{}`", set))?;
            let reps = reps
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("bad reps `{}`: {}", reps, e))?;
            Ok(SetTemplate::new(reps, value.trim()))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(ExerciseDraft { name: name.trim().to_string(), sets })
}

fn parse_month(text: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d")
        .with_context(|| format!("month must look like 2025-03, got `{}`", text))?;
    Ok((date.year(), date.month()))
}

fn warn_unusual_rest(rest: Option<u32>) {
    if let Some(rest) = rest
        && !REST_CHOICES.contains(&rest)
    {
        println!("Note: {}s is not one of the usual rest periods {:?}", rest, REST_CHOICES);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let store = SqliteStore::open(&cli.db)?;
    let repo = WorkoutRepo::new(&store);

    match cli.command {
        Some(Commands::Tui) | None => {
            let mut app = App::new(&store)?;
            app.run()?;
        }

        Some(Commands::List) => {
            let workouts = repo.list()?;
            if workouts.is_empty() {
                println!("No workouts yet.");
            }
            for w in workouts {
                let sets: usize = w.exercises.iter().map(|e| e.sets.len()).sum();
                println!(
                    "{} | {:30} | {} exercises, {} sets | rest {}",
                    w.id,
                    w.title,
                    w.exercises.len(),
                    sets,
                    w.rest.as_deref().unwrap_or("-")
                );
            }
        }

        Some(Commands::Show { id }) => {
            let Some(w) = repo.get(&id)? else {
                bail!("no such workout: {}", id);
            };
            println!("{} (rest: {})", w.title, w.rest.as_deref().unwrap_or("-"));
            println!("{:-<40}", "");
            for ex in &w.exercises {
                println!("{}", ex.name);
                for (i, set) in ex.sets.iter().enumerate() {
                    println!("  {}. {} reps - {}", i + 1, set.reps, set.value);
                }
            }
        }

        Some(Commands::Create { title, rest, exercises }) => {
            warn_unusual_rest(rest);
            let draft = WorkoutDraft {
                title,
                rest: rest.map(|r| r.to_string()),
                exercises,
            };
            let id = draft.save(&repo, None)?;
            println!("Created: {} (id: {})", draft.title, id);
        }

        Some(Commands::Edit { id, title, rest, no_rest, exercises }) => {
            let Some(existing) = repo.get(&id)? else {
                bail!("no such workout: {}", id);
            };
            warn_unusual_rest(rest);

            let mut draft = WorkoutDraft::from_template(&existing);
            if let Some(title) = title {
                draft.title = title;
            }
            if no_rest {
                draft.rest = None;
            } else if let Some(rest) = rest {
                draft.rest = Some(rest.to_string());
            }
            if !exercises.is_empty() {
                draft.exercises = exercises;
            }
            draft.save(&repo, Some(&id))?;
            println!("Updated: {}", draft.title);
        }

        Some(Commands::Delete { id }) => {
            if repo.delete(&id)? {
                println!("Deleted {}", id);
            } else {
                bail!("no such workout: {}", id);
            }
        }

        Some(Commands::Start { id }) => {
            let mut app = App::with_session(&store, &id)?;
            app.run()?;
        }

        Some(Commands::History { limit }) => {
            let history = repo.history()?;
            println!("Completed workouts:");
            println!("{:-<60}", "");
            for r in history.iter().rev().take(limit) {
                println!(
                    "{} | {:30} | {}",
                    r.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    r.title,
                    r.workout_id
                );
            }
        }

        Some(Commands::Calendar { month }) => {
            let today = Local::now().date_naive();
            let (year, month) = match month {
                Some(text) => parse_month(&text)?,
                None => (today.year(), today.month()),
            };

            let dates = streak::marked_dates(&repo.history()?);
            let grid = streak::month_grid(year, month, &dates).context("invalid month")?;
            print!("{}", grid);
            println!();
            println!("Current streak: {} days", streak::current_streak(&dates, today));
            println!("Longest streak: {} days", streak::longest_streak(&dates));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exercise() {
        let ex = parse_exercise("Squat=10x50kg, 8x60kg").unwrap();
        assert_eq!(ex.name, "Squat");
        assert_eq!(ex.sets, vec![SetTemplate::new(10, "50kg"), SetTemplate::new(8, "60kg")]);

        assert!(parse_exercise("Squat").is_err());
        assert!(parse_exercise("Squat=tenx50kg").is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-03").unwrap(), (2025, 3));
        assert!(parse_month("2025-13").is_err());
    }
}
