//! Stored data model - workout templates and the completion log
//!
//! Field names follow the JSON already sitting in existing stores
//! (`workoutId`, camelCase), so old data stays loadable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One set as authored: how many reps and with what load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTemplate {
    pub reps: u32,
    /// Free-text load or duration, e.g. "10kg", "BW", "1min"
    pub value: String,
}

impl SetTemplate {
    pub fn new(reps: u32, value: impl Into<String>) -> Self {
        Self { reps, value: value.into() }
    }
}

impl Default for SetTemplate {
    fn default() -> Self {
        Self::new(1, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub name: String,
    pub sets: Vec<SetTemplate>,
}

/// User-authored workout definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub title: String,
    /// Rest between sets in seconds, kept as text the way the editor stores it
    #[serde(
        default,
        deserialize_with = "rest_from_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rest: Option<String>,
    pub exercises: Vec<ExerciseTemplate>,
    /// Keys this crate does not know about (`createdAt`, ...), carried through edits
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkoutTemplate {
    /// Rest interval in whole seconds; 0 means no rest timer
    pub fn rest_seconds(&self) -> u32 {
        self.rest.as_deref().map(parse_rest_seconds).unwrap_or(0)
    }
}

/// Append-only log entry written when a session is finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub workout_id: String,
    /// Older entries from the bonus program used `workoutName`
    #[serde(alias = "workoutName")]
    pub title: String,
    pub date: DateTime<Utc>,
}

/// Leading integer of user text: "12", " 45s", "1.5" -> 1.
/// No leading digits or a negative number gives 0; overflow saturates.
pub fn parse_leading_int(text: &str) -> u32 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if negative {
        return 0;
    }
    rest.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |n, d| n.saturating_mul(10).saturating_add(u32::from(d - b'0')))
}

/// Rest value in seconds ("30", " 45s"); anything unparsable counts as no rest
pub fn parse_rest_seconds(text: &str) -> u32 {
    parse_leading_int(text)
}

fn rest_from_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) if s.is_empty() => None,
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rest_seconds() {
        assert_eq!(parse_rest_seconds("30"), 30);
        assert_eq!(parse_rest_seconds(" 45s"), 45);
        assert_eq!(parse_rest_seconds(""), 0);
        assert_eq!(parse_rest_seconds("abc"), 0);
        assert_eq!(parse_rest_seconds("-20"), 0);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("12"), 12);
        assert_eq!(parse_leading_int("1.5"), 1);
        assert_eq!(parse_leading_int("12abc"), 12);
        assert_eq!(parse_leading_int("+8"), 8);
        assert_eq!(parse_leading_int("-3"), 0);
        assert_eq!(parse_leading_int("twelve"), 0);
        assert_eq!(parse_leading_int("99999999999"), u32::MAX);
    }

    #[test]
    fn test_unknown_template_keys_are_kept() {
        let json = r#"{"id":"a","title":"A","exercises":[],"createdAt":"2025-03-01","color":3}"#;
        let w: WorkoutTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(w.extra["createdAt"], "2025-03-01");

        let value = serde_json::to_value(&w).unwrap();
        assert_eq!(value["createdAt"], "2025-03-01");
        assert_eq!(value["color"], 3);
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_rest_accepts_number_and_empty_text() {
        let json = r#"{"id":"a","title":"A","rest":60,"exercises":[]}"#;
        let w: WorkoutTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(w.rest.as_deref(), Some("60"));
        assert_eq!(w.rest_seconds(), 60);

        let json = r#"{"id":"a","title":"A","rest":"","exercises":[]}"#;
        let w: WorkoutTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(w.rest, None);

        let json = r#"{"id":"a","title":"A","exercises":[]}"#;
        let w: WorkoutTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(w.rest_seconds(), 0);
    }

    #[test]
    fn test_completion_record_json_shape() {
        let record = CompletionRecord {
            workout_id: "w1".into(),
            title: "Leg Day".into(),
            date: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["workoutId"], "w1");
        assert_eq!(value["title"], "Leg Day");
        assert!(value["date"].is_string());
    }

    #[test]
    fn test_completion_record_legacy_workout_name() {
        let json = r#"{"workoutId":"1","workoutName":"P90X","date":"2025-03-01T10:00:00.000Z"}"#;
        let record: CompletionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "P90X");
    }
}
