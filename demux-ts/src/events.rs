//! Observer events surfaced during demuxing.
//!
//! Recoverable parse problems are reported through the observer with
//! `fatal: false` and parsing continues; a fatal error additionally aborts
//! the current `push` before anything reaches the remuxer. Errors never
//! touch long-lived track state.

/// Error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// A media-level (parsing) error.
    MediaError,
}

/// Error detail code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDetails {
    /// The fragment could not be (fully) parsed.
    FragParsingError,
}

/// Payload of an error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    /// Error category.
    pub error_type: ErrorType,
    /// Error detail code.
    pub details: ErrorDetails,
    /// Whether parsing of the fragment was aborted.
    pub fatal: bool,
    /// Human-readable description.
    pub reason: String,
}

/// An event emitted towards the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A parse error.
    Error(ErrorData),
}

/// Receiver for demuxer events.
pub trait Observer {
    /// Deliver one event.
    fn trigger(&mut self, event: Event);
}

impl Observer for () {
    fn trigger(&mut self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_observer() {
        struct Collect(Vec<Event>);
        impl Observer for Collect {
            fn trigger(&mut self, event: Event) {
                self.0.push(event);
            }
        }

        let mut observer = Collect(Vec::new());
        observer.trigger(Event::Error(ErrorData {
            error_type: ErrorType::MediaError,
            details: ErrorDetails::FragParsingError,
            fatal: false,
            reason: "test".into(),
        }));
        assert_eq!(observer.0.len(), 1);
    }
}
