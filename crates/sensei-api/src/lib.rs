//! Streaming AI tutor chat client for Sensei.
//!
//! Authenticates a request, validates and sanitizes its payload, enforces a
//! client-side request budget, opens an HTTP request to the streaming tutor
//! endpoint, and incrementally parses the newline-delimited event stream
//! into text deltas delivered through caller-supplied callbacks.

mod client;
mod events;
mod session;
mod sse;
mod stream;

pub use client::{ChatClient, DEFAULT_CHAT_RATE_LIMIT, request_id};
pub use events::{ChatEvents, CollectingEvents};
pub use session::{AllowAll, BoxFuture, NoSession, OwnershipGate, SessionProvider, StaticSession};
pub use sse::{DeltaParser, StreamItem};
pub use stream::ChatStream;
