//! Typed access to the two stored collections
//!
//! Every read decodes the stored JSON array element by element. Elements
//! that do not decode are skipped for callers but kept verbatim, so the
//! next write puts them back exactly as found.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tracing::{debug, warn};

use super::Store;
use crate::error::{StoreError, StoreResult};
use crate::models::{CompletionRecord, ExerciseTemplate, WorkoutTemplate};

pub const WORKOUTS_KEY: &str = "workouts";
pub const COMPLETED_KEY: &str = "completedWorkouts";

enum Entry<T> {
    /// Read from the store; `raw` is written back as-is unless `changed`
    Stored { item: T, raw: Box<RawValue>, changed: bool },
    /// Created by this call
    New(T),
    Malformed(Box<RawValue>),
}

struct Collection<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Collection<T> {
    fn valid(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Stored { item, .. } | Entry::New(item) => Some(item),
            Entry::Malformed(_) => None,
        })
    }

    /// First valid item matching `pred`, flagged for re-encoding
    fn find_mut(&mut self, pred: impl Fn(&T) -> bool) -> Option<&mut T> {
        for entry in self.entries.iter_mut() {
            match entry {
                Entry::Stored { item, changed, .. } => {
                    if pred(&*item) {
                        *changed = true;
                        return Some(item);
                    }
                }
                Entry::New(item) => {
                    if pred(&*item) {
                        return Some(item);
                    }
                }
                Entry::Malformed(_) => {}
            }
        }
        None
    }
}

/// Workout templates and completion log on top of any [`Store`]
pub struct WorkoutRepo<S> {
    store: S,
}

impl<S: Store> WorkoutRepo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All decodable templates in stored order
    pub fn list(&self) -> StoreResult<Vec<WorkoutTemplate>> {
        let workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        Ok(workouts.valid().cloned().collect())
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<WorkoutTemplate>> {
        let workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        Ok(workouts.valid().find(|w| w.id == id).cloned())
    }

    /// Append a new template to the end of the list
    pub fn insert(&self, template: WorkoutTemplate) -> StoreResult<()> {
        let mut workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        debug!("Inserting workout {} ({})", template.id, template.title);
        workouts.entries.push(Entry::New(template));
        self.write(WORKOUTS_KEY, &workouts)
    }

    /// Replace the template with the same id in place.
    /// Returns false (and writes nothing) when the id is unknown.
    pub fn replace(&self, template: WorkoutTemplate) -> StoreResult<bool> {
        let mut workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        let Some(slot) = workouts.find_mut(|w| w.id == template.id) else {
            return Ok(false);
        };
        *slot = template;
        self.write(WORKOUTS_KEY, &workouts)?;
        Ok(true)
    }

    /// Overwrite only the exercise list of one template
    pub fn update_exercises(&self, id: &str, exercises: Vec<ExerciseTemplate>) -> StoreResult<bool> {
        let mut workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        let Some(slot) = workouts.find_mut(|w| w.id == id) else {
            return Ok(false);
        };
        slot.exercises = exercises;
        self.write(WORKOUTS_KEY, &workouts)?;
        Ok(true)
    }

    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut workouts = self.read::<WorkoutTemplate>(WORKOUTS_KEY)?;
        let before = workouts.entries.len();
        workouts.entries.retain(|e| match e {
            Entry::Stored { item, .. } | Entry::New(item) => item.id != id,
            Entry::Malformed(_) => true,
        });
        if workouts.entries.len() == before {
            return Ok(false);
        }
        self.write(WORKOUTS_KEY, &workouts)?;
        Ok(true)
    }

    /// Completion log in stored order (oldest first)
    pub fn history(&self) -> StoreResult<Vec<CompletionRecord>> {
        let completed = self.read::<CompletionRecord>(COMPLETED_KEY)?;
        Ok(completed.valid().cloned().collect())
    }

    /// Append one record; never deduplicates, never rewrites older ones
    pub fn append_completion(&self, record: CompletionRecord) -> StoreResult<()> {
        let mut completed = self.read::<CompletionRecord>(COMPLETED_KEY)?;
        completed.entries.push(Entry::New(record));
        self.write(COMPLETED_KEY, &completed)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Collection<T>> {
        let Some(text) = self.store.get(key)? else {
            return Ok(Collection { entries: Vec::new() });
        };

        let items: Vec<Box<RawValue>> = serde_json::from_str(&text).map_err(|e| {
            StoreError::MalformedStoredData {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| match serde_json::from_str::<T>(raw.get()) {
                Ok(item) => Entry::Stored { item, raw, changed: false },
                Err(e) => {
                    warn!("Skipping malformed entry {} under `{}`: {}", idx, key, e);
                    Entry::Malformed(raw)
                }
            })
            .collect();

        Ok(Collection { entries })
    }

    fn write<T: Serialize>(&self, key: &str, collection: &Collection<T>) -> StoreResult<()> {
        let encode_err = |source| StoreError::Encode { key: key.to_string(), source };

        let items = collection
            .entries
            .iter()
            .map(|e| match e {
                Entry::Stored { raw, changed: false, .. } | Entry::Malformed(raw) => {
                    Ok(raw.get().to_string())
                }
                Entry::Stored { item, .. } | Entry::New(item) => serde_json::to_string(item),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(encode_err)?;

        self.store.set(key, &format!("[{}]", items.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::SetTemplate;
    use chrono::Utc;
    use serde_json::Value;

    fn create_workout(id: &str, title: &str) -> WorkoutTemplate {
        WorkoutTemplate {
            id: id.to_string(),
            title: title.to_string(),
            rest: Some("30".to_string()),
            exercises: vec![ExerciseTemplate {
                name: "Squat".to_string(),
                sets: vec![SetTemplate::new(10, "50kg")],
            }],
            extra: Default::default(),
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);
        assert!(repo.list().unwrap().is_empty());
        assert!(repo.history().unwrap().is_empty());
    }

    #[test]
    fn test_insert_get_delete() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);
        repo.insert(create_workout("w1", "Leg Day")).unwrap();
        repo.insert(create_workout("w2", "Push Day")).unwrap();

        assert_eq!(repo.get("w2").unwrap().unwrap().title, "Push Day");
        assert!(repo.delete("w1").unwrap());
        assert!(!repo.delete("w1").unwrap());

        let ids: Vec<_> = repo.list().unwrap().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["w2"]);
    }

    #[test]
    fn test_malformed_collection_is_reported() {
        let store = MemoryStore::new();
        store.set(WORKOUTS_KEY, "{not json").unwrap();
        let repo = WorkoutRepo::new(&store);
        assert!(matches!(
            repo.list(),
            Err(StoreError::MalformedStoredData { .. })
        ));
    }

    #[test]
    fn test_malformed_entry_survives_writes() {
        let store = MemoryStore::new();
        store
            .set(
                WORKOUTS_KEY,
                r#"[{"id":"bad","title":7},{"id":"w1","title":"Leg Day","exercises":[]}]"#,
            )
            .unwrap();
        let repo = WorkoutRepo::new(&store);

        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(repo.get("bad").unwrap().is_none());

        repo.insert(create_workout("w2", "Push Day")).unwrap();

        let raw: Vec<Value> = serde_json::from_str(&store.get(WORKOUTS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["id"], "bad");
        assert_eq!(raw[0]["title"], 7);
    }

    #[test]
    fn test_update_exercises_unknown_id() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);
        repo.insert(create_workout("w1", "Leg Day")).unwrap();
        assert!(!repo.update_exercises("nope", vec![]).unwrap());
        assert_eq!(repo.get("w1").unwrap().unwrap().exercises.len(), 1);
    }

    #[test]
    fn test_append_completion_never_dedupes() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);
        let record = CompletionRecord {
            workout_id: "w1".into(),
            title: "Leg Day".into(),
            date: Utc::now(),
        };
        repo.append_completion(record.clone()).unwrap();
        repo.append_completion(record).unwrap();
        assert_eq!(repo.history().unwrap().len(), 2);
    }

    #[test]
    fn test_append_keeps_older_records_byte_for_byte() {
        let legacy = r#"{"workoutId":"1","workoutName":"P90X","date":"2025-03-01T10:00:00.000Z"}"#;
        let store = MemoryStore::new();
        store.set(COMPLETED_KEY, &format!("[{}]", legacy)).unwrap();
        let repo = WorkoutRepo::new(&store);

        repo.append_completion(CompletionRecord {
            workout_id: "w1".into(),
            title: "Leg Day".into(),
            date: Utc::now(),
        })
        .unwrap();

        let text = store.get(COMPLETED_KEY).unwrap().unwrap();
        assert!(text.starts_with(&format!("[{},", legacy)));
        assert_eq!(repo.history().unwrap().len(), 2);
    }

    #[test]
    fn test_untouched_templates_are_written_back_verbatim() {
        let other = r#"{"id":"w0", "title":"Arms","rest":60,"exercises":[],"createdAt":"2025-01-01"}"#;
        let store = MemoryStore::new();
        store
            .set(
                WORKOUTS_KEY,
                &format!(r#"[{},{{"id":"w1","title":"Leg Day","exercises":[],"note":"x"}}]"#, other),
            )
            .unwrap();
        let repo = WorkoutRepo::new(&store);

        let exercises = create_workout("w1", "Leg Day").exercises;
        assert!(repo.update_exercises("w1", exercises).unwrap());
        repo.insert(create_workout("w2", "Push Day")).unwrap();
        assert!(repo.delete("w2").unwrap());

        let text = store.get(WORKOUTS_KEY).unwrap().unwrap();
        assert!(text.starts_with(&format!("[{},", other)));

        let raw: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1]["exercises"][0]["name"], "Squat");
        assert_eq!(raw[1]["note"], "x");
    }
}
