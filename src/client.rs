//! The capture client: entry points and pipeline orchestration.
//!
//! Three entry points feed one pipeline: filter chain → field defaults →
//! fingerprint → thrashing gate → transport. Every entry point runs
//! synchronously on the caller's task - there is no internal worker
//! pool, queue, or spawned dispatch - and always returns a normal
//! outcome; remote transport failures are recovered inside the
//! transport and never reach the caller.

use std::sync::Arc;

use crate::config::{Config, ThrashingConfig};
use crate::error::{CaptureError, ConfigError};
use crate::event::{Event, Level, Record};
use crate::exception::{
    self, ExceptionInfo, ExceptionIntrospector, LastException, ModuleRegistry, DIAGNOSTIC_KEY,
};
use crate::filter::{self, EventFilter};
use crate::fingerprint::Fingerprinter;
use crate::throttle::{CounterStore, MemoryCounterStore, ThrashingLimiter, ThrottleDecision};
use crate::transport::{CaptureOutcome, LocalTransport, MessageStore, RemoteTransport, Transport};

/// Error-event ingestion client.
///
/// Owns the configured transport, the filter chain and the thrashing
/// limiter; collaborator seams (exception introspector, installed-module
/// registry, counter store, message store, last-exception source) are
/// injected, never read from global state.
pub struct Client {
    server_name: String,
    thrashing: Option<ThrashingConfig>,
    filters: Vec<Arc<dyn EventFilter>>,
    fingerprinter: Fingerprinter,
    limiter: ThrashingLimiter,
    transport: Transport,
    introspector: Arc<dyn ExceptionIntrospector>,
    modules: Arc<dyn ModuleRegistry>,
    last_exception: Option<Arc<dyn LastException>>,
}

impl Client {
    /// Build a client from configuration.
    ///
    /// Remote mode when `config.remote` is set; otherwise `store` must
    /// provide the local persistence target. The thrashing limiter runs
    /// on an in-process [`MemoryCounterStore`] unless replaced with
    /// [`set_counter_store`].
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an unbuildable transport or when
    /// neither a remote section nor a store is available.
    ///
    /// [`set_counter_store`]: Client::set_counter_store
    pub fn new(
        config: &Config,
        introspector: Arc<dyn ExceptionIntrospector>,
        modules: Arc<dyn ModuleRegistry>,
        store: Option<Arc<dyn MessageStore>>,
    ) -> Result<Self, ConfigError> {
        let transport = match (&config.remote, store) {
            (Some(remote), _) => Transport::Remote(RemoteTransport::new(remote)?),
            (None, Some(store)) => Transport::Local(LocalTransport::new(store)),
            (None, None) => {
                return Err(ConfigError::ValidationError(
                    "no remote endpoints configured and no local store provided".to_string(),
                ))
            }
        };

        let limiter = ThrashingLimiter::new(config.thrashing, Arc::new(MemoryCounterStore::new()));

        Ok(Self {
            server_name: config.server_name.clone(),
            thrashing: config.thrashing,
            filters: Vec::new(),
            fingerprinter: Fingerprinter::new(),
            limiter,
            transport,
            introspector,
            modules,
            last_exception: None,
        })
    }

    /// Append a filter to the chain. Filters run in registration order.
    pub fn add_filter(&mut self, filter: Arc<dyn EventFilter>) {
        self.filters.push(filter);
    }

    /// Replace the fingerprint policy.
    pub fn set_fingerprinter(&mut self, fingerprinter: Fingerprinter) {
        self.fingerprinter = fingerprinter;
    }

    /// Replace the in-process counter store with a shared one (e.g. a
    /// cache server shared by all workers). Rebuilds the limiter with
    /// the configured window and limit.
    pub fn set_counter_store(&mut self, store: Arc<dyn CounterStore>) {
        self.limiter = ThrashingLimiter::new(self.thrashing, store);
    }

    /// Install the explicit source for "the currently propagating
    /// exception", consulted by [`capture_exception`] when called
    /// without one.
    ///
    /// [`capture_exception`]: Client::capture_exception
    pub fn set_last_exception_source(&mut self, source: Arc<dyn LastException>) {
        self.last_exception = Some(source);
    }

    /// Capture an error event from a log record.
    ///
    /// The record's logger, level and message are stamped onto the
    /// event; its url/view/data extras are copied only where the caller
    /// left the event's own fields unset. A record carrying a structured
    /// exception routes through the exception extractor; otherwise the
    /// record's preformatted exception text becomes the traceback.
    ///
    /// # Errors
    /// Propagates filter and local-store collaborator failures.
    pub async fn capture_record(
        &self,
        record: Record,
        mut event: Event,
    ) -> Result<CaptureOutcome, CaptureError> {
        if event.url.is_none() {
            event.url = record.url;
        }
        if event.view.is_none() {
            event.view = record.view;
        }
        if event.data.is_empty() {
            if let Some(data) = record.data {
                event.data = data;
            }
        }

        event.logger = Some(record.logger);
        event.level = record.level.or(event.level);
        event.message = Some(record.message);

        if let Some(exc) = record.exception {
            self.extract_and_process(exc, event).await
        } else {
            event.traceback = record.exc_text;
            self.process(event).await
        }
    }

    /// Capture an error event from free-form text.
    ///
    /// # Errors
    /// Propagates filter and local-store collaborator failures.
    pub async fn capture_message(
        &self,
        message: impl Into<String>,
        mut event: Event,
    ) -> Result<CaptureOutcome, CaptureError> {
        event.message = Some(message.into());
        self.process(event).await
    }

    /// Capture an error event from an exception.
    ///
    /// With `None`, the configured last-exception source supplies the
    /// currently propagating exception.
    ///
    /// # Errors
    /// Returns [`CaptureError::NoActiveException`] when no exception is
    /// available; propagates filter and local-store failures.
    pub async fn capture_exception(
        &self,
        exc_info: Option<ExceptionInfo>,
        event: Event,
    ) -> Result<CaptureOutcome, CaptureError> {
        let exc = match exc_info {
            Some(exc) => exc,
            None => self
                .last_exception
                .as_ref()
                .and_then(|source| source.current())
                .ok_or(CaptureError::NoActiveException)?,
        };
        self.extract_and_process(exc, event).await
    }

    /// Run the exception extractor, then the pipeline.
    async fn extract_and_process(
        &self,
        exc: ExceptionInfo,
        mut event: Event,
    ) -> Result<CaptureOutcome, CaptureError> {
        let frames = self.introspector.frames(&exc);
        let processed = exception::process_frames(&frames);

        if event.view.is_none() {
            let modules = self.modules.installed_modules();
            event.view = exception::resolve_view(&exc.traceback, &modules);
        }

        event.data.insert(
            DIAGNOSTIC_KEY.to_string(),
            exception::diagnostic_block(&exc, processed),
        );
        event.traceback = Some(exception::format_traceback(&exc));
        event.class_name = Some(exc.class_name);
        if event.message.is_none() {
            event.message = Some(exc.message);
        }

        self.process(event).await
    }

    /// The pipeline: filters → defaults → fingerprint → thrashing gate →
    /// transport. Dispatches at most once per call.
    async fn process(&self, event: Event) -> Result<CaptureOutcome, CaptureError> {
        metrics::counter!("faultline_events_captured_total").increment(1);

        let mut event = filter::run_chain(&self.filters, event)?;

        if event.level.is_none() {
            event.level = Some(Level::Error);
        }
        if event.server_name.is_none() {
            event.server_name = Some(self.server_name.clone());
        }

        let fingerprint = self.fingerprinter.compute(&event);

        if self.limiter.check(event.class_name.as_deref(), &fingerprint)
            == ThrottleDecision::Suppress
        {
            return Ok(CaptureOutcome::Suppressed);
        }

        let outcome = self.transport.send(&event).await?;
        tracing::debug!(fingerprint = %fingerprint, outcome = ?outcome, "Event dispatched");
        Ok(outcome)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server_name", &self.server_name)
            .field("thrashing", &self.thrashing)
            .field("filter_count", &self.filters.len())
            .field("transport", &self.transport)
            .finish()
    }
}
