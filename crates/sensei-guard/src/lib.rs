//! Client-side request guards for Sensei.
//!
//! Everything here runs before a chat request touches the network: the
//! window-reset rate limiter, the input sanitizers, and the message-batch
//! and format validators. These are UX throttles and hygiene checks; the
//! authoritative enforcement lives server-side.

pub mod rate;
pub mod sanitize;
pub mod validate;

pub use rate::{
    DEFAULT_WINDOW_SECS, FileStore, MemoryStore, RateDecision, RateLimitRecord, RateLimiter,
    RateStore,
};
pub use sanitize::{AI_MESSAGE_MAX_CHARS, sanitize_ai_message, sanitize_input};
pub use validate::{
    MAX_BATCH, MAX_URL_LEN, MAX_VIDEO_DURATION_SECS, VIDEO_HOST_ALLOWLIST, is_valid_email,
    is_valid_url, is_valid_uuid, is_valid_video_duration, is_valid_video_url, validate_messages,
    validate_raw_messages,
};
