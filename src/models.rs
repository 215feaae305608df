// Data models for TodoStore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task identifier: milliseconds since the Unix epoch at creation, bumped when the clock stalls
pub type TaskId = u64;

/// A single to-do item.
///
/// Build tasks with [`Task::new`]. The `date` field only stores whole
/// milliseconds, so a task assembled by hand with a sub-millisecond
/// `created_at` reloads with that precision dropped and no longer compares
/// equal to the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    /// Creation time, serialized as `date` in epoch milliseconds.
    /// Keep it millisecond-aligned (see [`truncate_to_millis`]) when setting it directly.
    #[serde(rename = "date", with = "epoch_millis")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task. `created_at` is truncated to milliseconds so it survives persistence.
    pub fn new(id: TaskId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: truncate_to_millis(created_at),
        }
    }
}

/// Drop sub-millisecond precision from a timestamp
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

/// Serde adapter for the `date` field.
///
/// Writes epoch milliseconds. Reads either epoch milliseconds or an RFC 3339
/// string, which is what older blobs contain.
mod epoch_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.timestamp_millis())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Millis(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match RawDate::deserialize(deserializer)? {
            RawDate::Millis(ms) => {
                DateTime::from_timestamp_millis(ms).ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", ms)))
            }
            RawDate::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| de::Error::custom(format!("invalid date {:?}: {}", s, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new(1, "Buy milk", DateTime::from_timestamp_millis(1_700_000_000_000).unwrap());
        assert_eq!(task.id, 1);
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
    }

    #[test]
    fn test_created_at_truncated_to_millis() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let task = Task::new(1, "x", ts);
        assert_eq!(task.created_at.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_task_serialization_shape() {
        let task = Task::new(42, "Walk dog", DateTime::from_timestamp_millis(1_700_000_000_000).unwrap());
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"id":42,"text":"Walk dog","completed":false,"date":1700000000000}"#);
    }

    #[test]
    fn test_round_trip_exact_only_for_millisecond_times() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();

        let built = Task::new(1, "x", ts);
        let json = serde_json::to_string(&built).unwrap();
        assert_eq!(serde_json::from_str::<Task>(&json).unwrap(), built);

        let by_hand = Task {
            created_at: ts,
            ..built.clone()
        };
        let json = serde_json::to_string(&by_hand).unwrap();
        let reloaded: Task = serde_json::from_str(&json).unwrap();
        assert_ne!(reloaded, by_hand);
        assert_eq!(reloaded.created_at, truncate_to_millis(ts));
    }

    #[test]
    fn test_task_reads_rfc3339_date() {
        let json = r#"{"id":1714557600000,"text":"Old","completed":true,"date":"2024-05-01T10:00:00.000Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.completed);
        assert_eq!(task.created_at.timestamp_millis(), 1_714_557_600_000);
    }

    #[test]
    fn test_task_rejects_garbage_date() {
        let json = r#"{"id":1,"text":"Bad","completed":false,"date":"yesterday"}"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }
}
