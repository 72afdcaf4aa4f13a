//! Event fingerprinting for deduplication and grouping.
//!
//! The fingerprint is a SHA-256 hash computed from a configurable subset
//! of event attributes, enabling the collector (and the thrashing
//! limiter) to group occurrences of the same semantic failure. It must be
//! stable across processes and time: no object identity, no memory
//! addresses, and map contents contribute in sorted key order.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::event::Event;

/// Fingerprint returned when the configured field set contributes no
/// bytes at all (every selected attribute absent or empty). Hashing
/// nothing would still be deterministic, but a recognizable sentinel
/// keeps pathological events in one visible group.
pub const NULL_FINGERPRINT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Which event attributes contribute to the fingerprint.
///
/// The exact field set is policy, owned by configuration; the engine only
/// guarantees determinism. The default mirrors classic grouping: severity
/// and class name, plus the traceback when present (falling back to the
/// message), so events with equal causes but variable messages still
/// group by trace.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub include_level: bool,
    pub include_class_name: bool,
    /// Use the traceback as the grouping body when the event has one.
    pub include_traceback: bool,
    /// Use the message as the grouping body when no traceback contributes.
    pub include_message: bool,
    pub include_view: bool,
    /// Include the structured data map, in sorted key order.
    pub include_data: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            include_level: true,
            include_class_name: true,
            include_traceback: true,
            include_message: true,
            include_view: false,
            include_data: false,
        }
    }
}

/// Computes deterministic event fingerprints.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    config: FingerprintConfig,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FingerprintConfig) -> Self {
        Self { config }
    }

    /// Compute the fingerprint for an event.
    ///
    /// Pure with respect to event content: equal semantic content yields
    /// an equal hex string regardless of map insertion order. Never
    /// fails; when the selected field set contributes nothing the fixed
    /// [`NULL_FINGERPRINT`] is returned instead of a hash of nothing.
    pub fn compute(&self, event: &Event) -> String {
        const DELIMITER: &[u8] = b"\x00";

        let mut hasher = Sha256::new();
        let mut contributed = false;

        if self.config.include_level {
            if let Some(level) = event.level {
                hasher.update(level.as_str().as_bytes());
                contributed = true;
            }
        }
        hasher.update(DELIMITER);

        if self.config.include_class_name {
            if let Some(ref class_name) = event.class_name {
                hasher.update(class_name.as_bytes());
                contributed = true;
            }
        }
        hasher.update(DELIMITER);

        // Grouping body: the traceback when configured and present,
        // otherwise the message.
        let body = match (&event.traceback, &event.message) {
            (Some(traceback), _) if self.config.include_traceback && !traceback.is_empty() => {
                Some(traceback.as_str())
            }
            (_, Some(message)) if self.config.include_message => Some(message.as_str()),
            _ => None,
        };
        if let Some(body) = body {
            if !body.is_empty() {
                hasher.update(body.as_bytes());
                contributed = true;
            }
        }
        hasher.update(DELIMITER);

        if self.config.include_view {
            if let Some(ref view) = event.view {
                hasher.update(view.as_bytes());
                contributed = true;
            }
        }
        hasher.update(DELIMITER);

        if self.config.include_data && !event.data.is_empty() {
            // BTreeMap gives sorted key order, so insertion order of the
            // source map never changes the hash.
            let sorted: BTreeMap<&String, &serde_json::Value> = event.data.iter().collect();
            for (key, value) in sorted {
                hasher.update(key.as_bytes());
                hasher.update(DELIMITER);
                hasher.update(value.to_string().as_bytes());
                hasher.update(DELIMITER);
            }
            contributed = true;
        }

        if !contributed {
            return NULL_FINGERPRINT.to_string();
        }

        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Level;

    fn event_with(message: &str, class_name: Option<&str>) -> Event {
        let mut event = Event::new();
        event.message = Some(message.to_string());
        event.class_name = class_name.map(String::from);
        event.level = Some(Level::Error);
        event
    }

    #[test]
    fn equal_content_equal_fingerprint() {
        let fp = Fingerprinter::new();
        let a = event_with("connection refused", Some("IoError"));
        let b = event_with("connection refused", Some("IoError"));
        assert_eq!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn fingerprint_ignores_timestamps() {
        let fp = Fingerprinter::new();
        let a = event_with("connection refused", Some("IoError"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = event_with("connection refused", Some("IoError"));
        assert_ne!(a.timestamp, b.timestamp);
        assert_eq!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn different_class_names_differ() {
        let fp = Fingerprinter::new();
        let a = event_with("boom", Some("IoError"));
        let b = event_with("boom", Some("ValueError"));
        assert_ne!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn different_levels_differ() {
        let fp = Fingerprinter::new();
        let mut a = event_with("boom", None);
        let mut b = event_with("boom", None);
        a.level = Some(Level::Error);
        b.level = Some(Level::Warning);
        assert_ne!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn traceback_takes_precedence_over_message() {
        let fp = Fingerprinter::new();

        let mut a = event_with("request 1 failed", Some("IoError"));
        a.traceback = Some("Traceback: same cause".to_string());
        let mut b = event_with("request 2 failed", Some("IoError"));
        b.traceback = Some("Traceback: same cause".to_string());

        // Messages differ but the traceback is the grouping body.
        assert_eq!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn message_only_policy_ignores_traceback() {
        let config = FingerprintConfig {
            include_traceback: false,
            ..Default::default()
        };
        let fp = Fingerprinter::with_config(config);

        let mut a = event_with("same message", None);
        a.traceback = Some("trace one".to_string());
        let mut b = event_with("same message", None);
        b.traceback = Some("trace two".to_string());

        assert_eq!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn data_map_order_does_not_matter() {
        let config = FingerprintConfig {
            include_data: true,
            ..Default::default()
        };
        let fp = Fingerprinter::with_config(config);

        let mut a = event_with("boom", None);
        a.data
            .insert("z".to_string(), serde_json::json!("last"));
        a.data
            .insert("a".to_string(), serde_json::json!("first"));

        let mut b = event_with("boom", None);
        b.data
            .insert("a".to_string(), serde_json::json!("first"));
        b.data
            .insert("z".to_string(), serde_json::json!("last"));

        assert_eq!(fp.compute(&a), fp.compute(&b));
    }

    #[test]
    fn empty_field_set_returns_sentinel() {
        let fp = Fingerprinter::new();
        let event = Event::new();
        assert_eq!(fp.compute(&event), NULL_FINGERPRINT);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = Fingerprinter::new();
        let result = fp.compute(&event_with("boom", Some("IoError")));
        assert_eq!(result.len(), 64);
        assert!(result.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
