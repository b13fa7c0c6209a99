//! Workout editor - drafts, validation and saving templates

use tracing::info;
use uuid::Uuid;

use crate::db::{Store, WorkoutRepo};
use crate::error::{EditorError, ValidationError};
use crate::models::{ExerciseTemplate, SetTemplate, WorkoutTemplate};

pub const MAX_TITLE_CHARS: usize = 50;
pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_VALUE_CHARS: usize = 20;
pub const REPS_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// Rest periods offered by the editor, in seconds
pub const REST_CHOICES: &[u32] = &[20, 30, 45, 60, 90, 120];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseDraft {
    pub name: String,
    pub sets: Vec<SetTemplate>,
}

impl Default for ExerciseDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            sets: vec![SetTemplate::default()],
        }
    }
}

/// Form state for creating or editing a workout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutDraft {
    pub title: String,
    pub rest: Option<String>,
    pub exercises: Vec<ExerciseDraft>,
}

impl Default for WorkoutDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            rest: None,
            exercises: vec![ExerciseDraft::default()],
        }
    }
}

impl WorkoutDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_template(template: &WorkoutTemplate) -> Self {
        Self {
            title: template.title.clone(),
            rest: template.rest.clone(),
            exercises: template
                .exercises
                .iter()
                .map(|ex| ExerciseDraft {
                    name: ex.name.clone(),
                    sets: ex.sets.clone(),
                })
                .collect(),
        }
    }

    pub fn add_exercise(&mut self) {
        self.exercises.push(ExerciseDraft::default());
    }

    /// Refused (returns false) for the last remaining exercise
    pub fn remove_exercise(&mut self, index: usize) -> bool {
        if self.exercises.len() <= 1 || index >= self.exercises.len() {
            return false;
        }
        self.exercises.remove(index);
        true
    }

    /// Append a set copying the last one, or a default set when there is none
    pub fn add_set(&mut self, exercise: usize) -> bool {
        let Some(ex) = self.exercises.get_mut(exercise) else {
            return false;
        };
        let next = ex.sets.last().cloned().unwrap_or_default();
        ex.sets.push(next);
        true
    }

    pub fn remove_set(&mut self, exercise: usize, set: usize) -> bool {
        match self.exercises.get_mut(exercise) {
            Some(ex) if set < ex.sets.len() => {
                ex.sets.remove(set);
                true
            }
            _ => false,
        }
    }

    /// Every rule violation, in field order
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let title_len = self.title.chars().count();
        if title_len == 0 {
            errors.push(ValidationError::new("title", "Title is required"));
        } else if title_len > MAX_TITLE_CHARS {
            errors.push(ValidationError::new("title", "Title must be less than 50 characters"));
        }

        if self.exercises.is_empty() {
            errors.push(ValidationError::new("exercises", "Add at least one exercise"));
        }

        for (i, ex) in self.exercises.iter().enumerate() {
            let name_len = ex.name.chars().count();
            if name_len == 0 {
                errors.push(ValidationError::new(
                    format!("exercises.{i}.name"),
                    "Exercise name is required",
                ));
            } else if name_len > MAX_NAME_CHARS {
                errors.push(ValidationError::new(
                    format!("exercises.{i}.name"),
                    "Exercise name must be less than 50 characters",
                ));
            }

            if ex.sets.is_empty() {
                errors.push(ValidationError::new(
                    format!("exercises.{i}.sets"),
                    "At least one set is required",
                ));
            }

            for (j, set) in ex.sets.iter().enumerate() {
                if !REPS_RANGE.contains(&set.reps) {
                    errors.push(ValidationError::new(
                        format!("exercises.{i}.sets.{j}.reps"),
                        "Reps must be between 1 and 100",
                    ));
                }
                let value_len = set.value.chars().count();
                if value_len == 0 || value_len > MAX_VALUE_CHARS {
                    errors.push(ValidationError::new(
                        format!("exercises.{i}.sets.{j}.value"),
                        "Value must be 1 to 20 characters",
                    ));
                }
            }
        }

        errors
    }

    /// Validate, then store as a new workout (`id == None`) or over an
    /// existing one. Returns the workout id.
    pub fn save<S: Store>(&self, repo: &WorkoutRepo<S>, id: Option<&str>) -> Result<String, EditorError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(EditorError::Invalid(errors));
        }

        let rest = self.rest.clone().filter(|r| !r.trim().is_empty());
        let exercises: Vec<ExerciseTemplate> = self
            .exercises
            .iter()
            .map(|ex| ExerciseTemplate {
                name: ex.name.clone(),
                sets: ex.sets.clone(),
            })
            .collect();

        match id {
            Some(id) => {
                let Some(mut template) = repo.get(id)? else {
                    return Err(EditorError::NotFound(id.to_string()));
                };
                template.title = self.title.clone();
                template.rest = rest;
                template.exercises = exercises;
                if !repo.replace(template)? {
                    return Err(EditorError::NotFound(id.to_string()));
                }
                info!("Workout updated: {} ({})", self.title, id);
                Ok(id.to_string())
            }
            None => {
                let id = Uuid::new_v4().to_string();
                repo.insert(WorkoutTemplate {
                    id: id.clone(),
                    title: self.title.clone(),
                    rest,
                    exercises,
                    extra: Default::default(),
                })?;
                info!("Workout created: {} ({})", self.title, id);
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, WORKOUTS_KEY};

    fn create_draft() -> WorkoutDraft {
        let mut draft = WorkoutDraft::new();
        draft.title = "Push Day".to_string();
        draft.rest = Some("45".to_string());
        draft.exercises[0].name = "Push-Up".to_string();
        draft.exercises[0].sets[0] = SetTemplate::new(15, "BW");
        draft
    }

    #[test]
    fn test_new_draft_has_one_default_exercise() {
        let draft = WorkoutDraft::new();
        assert_eq!(draft.exercises.len(), 1);
        assert_eq!(draft.exercises[0].sets, vec![SetTemplate::new(1, "")]);
    }

    #[test]
    fn test_cannot_remove_last_exercise() {
        let mut draft = WorkoutDraft::new();
        assert!(!draft.remove_exercise(0));
        draft.add_exercise();
        assert!(draft.remove_exercise(0));
        assert_eq!(draft.exercises.len(), 1);
    }

    #[test]
    fn test_add_set_copies_last() {
        let mut draft = create_draft();
        assert!(draft.add_set(0));
        assert_eq!(draft.exercises[0].sets[1], SetTemplate::new(15, "BW"));

        draft.exercises[0].sets.clear();
        draft.add_set(0);
        assert_eq!(draft.exercises[0].sets, vec![SetTemplate::default()]);
        assert!(!draft.add_set(4));
    }

    #[test]
    fn test_validate_reports_every_field() {
        let mut draft = WorkoutDraft::new();
        draft.title = "x".repeat(51);
        draft.exercises[0].sets[0].reps = 0;
        draft.add_exercise();
        draft.exercises[1].sets.clear();

        let fields: Vec<_> = draft.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "title",
                "exercises.0.name",
                "exercises.0.sets.0.reps",
                "exercises.0.sets.0.value",
                "exercises.1.name",
                "exercises.1.sets",
            ]
        );
    }

    #[test]
    fn test_valid_draft() {
        assert!(create_draft().validate().is_empty());
    }

    #[test]
    fn test_save_new_then_edit() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);

        let id = create_draft().save(&repo, None).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let stored = repo.get(&id).unwrap().unwrap();
        let mut draft = WorkoutDraft::from_template(&stored);
        draft.title = "Push Day B".to_string();
        draft.rest = Some(String::new());
        assert_eq!(draft.save(&repo, Some(&id)).unwrap(), id);

        let stored = repo.get(&id).unwrap().unwrap();
        assert_eq!(stored.title, "Push Day B");
        assert_eq!(stored.rest, None);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_edit_keeps_unknown_keys() {
        let store = MemoryStore::new();
        store
            .set(
                WORKOUTS_KEY,
                r#"[{"id":"w1","title":"Old","exercises":[],"createdAt":"2025-03-01T10:00:00Z"}]"#,
            )
            .unwrap();
        let repo = WorkoutRepo::new(&store);

        create_draft().save(&repo, Some("w1")).unwrap();

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&store.get(WORKOUTS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw[0]["title"], "Push Day");
        assert_eq!(raw[0]["createdAt"], "2025-03-01T10:00:00Z");
    }

    #[test]
    fn test_save_invalid_or_unknown() {
        let store = MemoryStore::new();
        let repo = WorkoutRepo::new(&store);
        assert!(matches!(WorkoutDraft::new().save(&repo, None), Err(EditorError::Invalid(_))));
        assert!(matches!(
            create_draft().save(&repo, Some("missing")),
            Err(EditorError::NotFound(_))
        ));
        assert!(repo.list().unwrap().is_empty());
    }
}
