//! Event and log-record types.
//!
//! An [`Event`] is the unit the pipeline processes: a fresh, independently
//! owned set of capture attributes. Nothing here is shared or cached across
//! captures; every entry point builds (or receives) its own `Event`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::exception::ExceptionInfo;

/// Severity of an event, mirroring conventional log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Stable wire name, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error event on its way to a collector or the local store.
///
/// Optional fields left unset by the caller are filled by the pipeline
/// only where a default is defined: `level` falls back to [`Level::Error`]
/// and `server_name` to the configured process identity. Everything else
/// stays exactly as captured.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Human-readable message; defaults to the exception text when the
    /// event originates from an exception capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    /// Name of the logger that produced the event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// Exception class name, set by the exception entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Full formatted traceback text for human display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    /// Process-wide identity of the reporting host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Originating application code location, `module.function`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    /// URL of the request being handled when the event occurred, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Arbitrary structured data; the exception extractor adds its
    /// diagnostic block under the `__faultline__` key.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    /// Request metadata (headers, parameters) supplied by the caller.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub request: Map<String, Value>,
    /// Capture time, stamped at construction.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an empty event stamped with the current time.
    pub fn new() -> Self {
        Self {
            message: None,
            level: None,
            logger: None,
            class_name: None,
            traceback: None,
            server_name: None,
            view: None,
            url: None,
            data: Map::new(),
            request: Map::new(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

/// A captured log record, input to [`Client::capture_record`].
///
/// Mirrors what a logging framework hands to its handlers: the logger
/// name, severity, rendered message, and - when the record was emitted
/// from an `error!`-with-exception path - either the structured exception
/// or its preformatted text.
///
/// [`Client::capture_record`]: crate::client::Client::capture_record
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub logger: String,
    pub level: Option<Level>,
    pub message: String,
    /// Structured exception attached to the record; routes the capture
    /// through the exception extractor when present.
    pub exception: Option<ExceptionInfo>,
    /// Preformatted exception text, used as the event traceback when no
    /// structured exception is attached.
    pub exc_text: Option<String>,
    /// Extras copied onto the event only when the caller did not set them.
    pub url: Option<String>,
    pub view: Option<String>,
    pub data: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_is_empty_apart_from_timestamp() {
        let event = Event::new();
        assert!(event.message.is_none());
        assert!(event.level.is_none());
        assert!(event.data.is_empty());
        assert!(event.request.is_empty());
    }

    #[test]
    fn events_are_independently_owned() {
        let mut a = Event::new();
        a.data
            .insert("k".to_string(), Value::String("v".to_string()));
        let b = a.clone();

        a.data
            .insert("k2".to_string(), Value::String("v2".to_string()));
        assert!(b.data.get("k2").is_none());
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let event = Event::new();
        let json = serde_json::to_value(&event).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("message"));
        assert!(!obj.contains_key("data"));
        assert!(obj.contains_key("timestamp"));
    }

    #[test]
    fn level_wire_names_are_lowercase() {
        assert_eq!(
            serde_json::to_value(Level::Warning).unwrap(),
            Value::String("warning".to_string())
        );
        assert_eq!(Level::Fatal.as_str(), "fatal");
        assert_eq!(Level::Error.to_string(), "error");
    }
}
