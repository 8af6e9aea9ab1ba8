//! Callback surface for streaming chat calls.

use sensei_types::ChatError;

/// Receives the outcome of one streaming call.
///
/// `on_delta` fires zero or more times; then exactly one of `on_done` /
/// `on_error` fires, exactly once. They are mutually exclusive for a
/// given call.
pub trait ChatEvents {
    /// An incremental text fragment arrived.
    fn on_delta(&mut self, delta: &str);

    /// The stream completed normally.
    fn on_done(&mut self);

    /// The call failed before or during streaming.
    fn on_error(&mut self, error: ChatError);
}

/// Records every callback; useful in tests and simple consumers.
#[derive(Debug, Default)]
pub struct CollectingEvents {
    pub deltas: Vec<String>,
    pub done_calls: u32,
    pub errors: Vec<ChatError>,
}

impl CollectingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full reply text accumulated so far.
    pub fn text(&self) -> String {
        self.deltas.concat()
    }
}

impl ChatEvents for CollectingEvents {
    fn on_delta(&mut self, delta: &str) {
        self.deltas.push(delta.to_string());
    }

    fn on_done(&mut self) {
        self.done_calls += 1;
    }

    fn on_error(&mut self, error: ChatError) {
        self.errors.push(error);
    }
}
