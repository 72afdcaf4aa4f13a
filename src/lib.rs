// src/lib.rs
//! Faultline - error-event ingestion client.
//!
//! Captures application exceptions and log records, normalizes them into
//! structured, size-bounded payloads, suppresses bursts of identical
//! failures, and forwards the result to one or more remote collectors or
//! a local grouped-message store.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod exception;
pub mod filter;
pub mod fingerprint;
pub mod normalize;
pub mod throttle;
pub mod transport;

// Re-export commonly used types
pub use client::Client;
pub use config::{Config, RemoteConfig, SecretString, ThrashingConfig};
pub use error::{CaptureError, ConfigError, CounterError, FilterError, StoreError};
pub use event::{Event, Level, Record};
pub use exception::{
    ExceptionInfo, ExceptionIntrospector, Frame, LastException, ModuleRegistry, TemplateSource,
    TracebackFrame,
};
pub use filter::EventFilter;
pub use fingerprint::{FingerprintConfig, Fingerprinter};
pub use normalize::RawValue;
pub use throttle::{CounterStore, MemoryCounterStore, ThrashingLimiter, ThrottleDecision};
pub use transport::{CaptureOutcome, MessageStore, StoredHandle};
