use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

const ENVELOPE_FIELDS: [&str; 3] = ["type", "session_id", "ts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SessionStarted,
    TurnSubmitted,
    ApiStatus,
    GenerationSucceeded,
    GenerationFailed,
    ImageDownloaded,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted => "session_started",
            SessionEvent::TurnSubmitted => "turn_submitted",
            SessionEvent::ApiStatus => "api_status",
            SessionEvent::GenerationSucceeded => "generation_succeeded",
            SessionEvent::GenerationFailed => "generation_failed",
            SessionEvent::ImageDownloaded => "image_downloaded",
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unwraps a `json!({...})` literal into a payload. Non-objects give an
/// empty payload.
pub fn json_object(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}

/// Opt-in JSONL audit trail for one chat session. Write-only: nothing in
/// pixchat reads it back.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    session_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    /// Envelope fields (`type`, `session_id`, `ts`) always win over payload
    /// keys of the same name.
    pub fn record(&self, event: SessionEvent, payload: EventPayload) -> EventPayload {
        let mut record: EventPayload = payload
            .into_iter()
            .filter(|(key, _)| !ENVELOPE_FIELDS.contains(&key.as_str()))
            .collect();
        record.insert("type".to_string(), Value::from(event.name()));
        record.insert("session_id".to_string(), Value::from(self.session_id.as_str()));
        record.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record
    }

    /// Appends one compact line and returns what was written.
    pub fn emit(&self, event: SessionEvent, payload: EventPayload) -> anyhow::Result<Value> {
        let record = Value::Object(self.record(event, payload));
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed to append event to {}", self.path.display()))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::{json_object, EventPayload, EventWriter, SessionEvent};

    #[test]
    fn emit_writes_one_line_per_event() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logs").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-1");

        let emitted = writer.emit(
            SessionEvent::TurnSubmitted,
            json_object(json!({ "model": "Base" })),
        )?;
        writer.emit(SessionEvent::ApiStatus, EventPayload::new())?;

        let content = fs::read_to_string(&path)?;
        let rows: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], emitted);
        assert_eq!(rows[0]["type"], Value::from("turn_submitted"));
        assert_eq!(rows[0]["session_id"], Value::from("session-1"));
        assert_eq!(rows[0]["model"], Value::from("Base"));
        assert_eq!(rows[1]["type"], Value::from("api_status"));

        let ts = rows[0]["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn payload_cannot_forge_envelope_fields() {
        let writer = EventWriter::new("unused.jsonl", "session-1");
        let record = writer.record(
            SessionEvent::ImageDownloaded,
            json_object(json!({
                "type": "other",
                "session_id": "other",
                "file_name": "generated_image_1.png",
            })),
        );
        assert_eq!(record["type"], Value::from("image_downloaded"));
        assert_eq!(record["session_id"], Value::from("session-1"));
        assert_eq!(record["file_name"], Value::from("generated_image_1.png"));
    }

    #[test]
    fn json_object_ignores_non_objects() {
        assert!(json_object(json!([1, 2])).is_empty());
        assert_eq!(json_object(json!({ "a": 1 })).len(), 1);
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(SessionEvent::SessionStarted.to_string(), "session_started");
        assert_eq!(
            SessionEvent::GenerationSucceeded.name(),
            "generation_succeeded"
        );
        assert_eq!(SessionEvent::GenerationFailed.name(), "generation_failed");
    }
}
