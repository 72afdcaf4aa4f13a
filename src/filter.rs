//! The event filter chain.
//!
//! Filters are pluggable transforms applied in configured order before an
//! event is fingerprinted and dispatched - scrubbing credentials,
//! dropping noisy fields, tagging deployments. The core only defines the
//! contract and runs the chain; individual filter implementations live
//! with the embedding application.

use std::sync::Arc;

use crate::error::FilterError;
use crate::event::Event;

/// A single filter in the chain.
///
/// Function-shaped contract: receives the current event and returns a
/// possibly-modified replacement, or `None` to leave it unchanged. A
/// filter error aborts the capture and propagates to the caller - the
/// pipeline does not mask bugs in pluggable collaborators.
///
/// Closures implement this directly:
///
/// ```
/// use faultline::filter::EventFilter;
/// use faultline::event::Event;
/// use faultline::error::FilterError;
///
/// let tag_release = |event: &Event| -> Result<Option<Event>, FilterError> {
///     let mut event = event.clone();
///     event.data.insert("release".to_string(), "v1.2.3".into());
///     Ok(Some(event))
/// };
/// let filtered = tag_release.process(&Event::new()).unwrap().unwrap();
/// assert_eq!(filtered.data["release"], "v1.2.3");
/// ```
pub trait EventFilter: Send + Sync {
    fn process(&self, event: &Event) -> Result<Option<Event>, FilterError>;
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> Result<Option<Event>, FilterError> + Send + Sync,
{
    fn process(&self, event: &Event) -> Result<Option<Event>, FilterError> {
        self(event)
    }
}

/// Run the chain in order, threading the event through each filter.
///
/// # Errors
/// Propagates the first filter error unchanged; later filters do not run.
pub fn run_chain(filters: &[Arc<dyn EventFilter>], mut event: Event) -> Result<Event, FilterError> {
    for filter in filters {
        if let Some(replacement) = filter.process(&event)? {
            event = replacement;
        }
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Level;

    fn set_level(level: Level) -> Arc<dyn EventFilter> {
        Arc::new(
            move |event: &Event| -> Result<Option<Event>, FilterError> {
                let mut event = event.clone();
                event.level = Some(level);
                Ok(Some(event))
            },
        )
    }

    #[test]
    fn empty_chain_returns_event_unchanged() {
        let mut event = Event::new();
        event.message = Some("hello".to_string());

        let result = run_chain(&[], event).unwrap();
        assert_eq!(result.message.as_deref(), Some("hello"));
    }

    #[test]
    fn filters_run_in_configured_order() {
        let chain = vec![set_level(Level::Warning), set_level(Level::Fatal)];
        let result = run_chain(&chain, Event::new()).unwrap();
        assert_eq!(result.level, Some(Level::Fatal));
    }

    #[test]
    fn none_means_unchanged() {
        let passthrough: Arc<dyn EventFilter> =
            Arc::new(|_: &Event| -> Result<Option<Event>, FilterError> { Ok(None) });
        let mut event = Event::new();
        event.message = Some("kept".to_string());

        let result = run_chain(&[passthrough], event).unwrap();
        assert_eq!(result.message.as_deref(), Some("kept"));
    }

    #[test]
    fn filter_error_propagates_and_stops_the_chain() {
        let failing: Arc<dyn EventFilter> =
            Arc::new(|_: &Event| -> Result<Option<Event>, FilterError> {
                Err(FilterError::Failed("scrubber broke".to_string()))
            });
        let chain = vec![failing, set_level(Level::Fatal)];

        let err = run_chain(&chain, Event::new()).unwrap_err();
        assert_eq!(err.to_string(), "filter failed: scrubber broke");
    }
}
