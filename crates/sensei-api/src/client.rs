//! Streaming tutor chat client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use sensei_guard::{MemoryStore, RateLimiter, sanitize_ai_message, validate_raw_messages};
use sensei_types::{ChatBody, ChatError, ChatRequest, TutorMode, WEEK_RANGE};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::events::ChatEvents;
use crate::session::{AllowAll, OwnershipGate, SessionProvider};
use crate::stream::ChatStream;

/// Path of the streaming tutor endpoint.
const STREAM_PATH: &str = "/v1/tutor/chat/stream";

/// Operation name in rate-limit keys.
const RATE_OPERATION: &str = "chat";

/// Default per-window ceiling on chat requests.
pub const DEFAULT_CHAT_RATE_LIMIT: u32 = 10;

/// Default timeout for the request phase of the POST.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the streaming tutor chat endpoint.
///
/// Independent calls do not interact: each owns its stream state. The
/// only shared mutable state is the rate limiter's store.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
    gate: Arc<dyn OwnershipGate>,
    limiter: RateLimiter,
    chat_rate_limit: u32,
    request_timeout: Duration,
    cancel: Option<CancellationToken>,
}

#[derive(Debug)]
struct PreparedChat {
    token: String,
    body: ChatBody,
}

impl ChatClient {
    /// Create a new client against `base_url`, authenticating through
    /// `session`.
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            session,
            gate: Arc::new(AllowAll),
            limiter: RateLimiter::new(Arc::new(MemoryStore::new())),
            chat_rate_limit: DEFAULT_CHAT_RATE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cancel: None,
        })
    }

    /// Set the ownership gate consulted for scoped resource ids.
    pub fn with_ownership_gate(mut self, gate: Arc<dyn OwnershipGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Set the client-side rate limiter and its per-window ceiling.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter, max_requests: u32) -> Self {
        self.limiter = limiter;
        self.chat_rate_limit = max_requests;
        self
    }

    /// Set the timeout for the request phase of the POST. The open stream
    /// body itself carries no deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attach a cancellation token. Cancelling it aborts the call and
    /// surfaces [`ChatError::Cancelled`] through the error callback.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run every precondition guard, in order, without touching the
    /// network. The only side effect is the rate-limiter increment.
    async fn prepare(&self, request: &ChatRequest) -> Result<PreparedChat, ChatError> {
        // 1. Session
        let token = self.session.bearer_token().ok_or(ChatError::AuthRequired)?;

        // 2. Scoped resource: syntactic check, then ownership
        let resource_id = match &request.resource_id {
            Some(raw) => {
                if !sensei_guard::is_valid_uuid(raw) {
                    return Err(ChatError::InvalidFormat {
                        message: format!("'{raw}' is not a valid resource id"),
                    });
                }
                let id = Uuid::try_parse(raw).map_err(|_| ChatError::InvalidFormat {
                    message: format!("'{raw}' is not a valid resource id"),
                })?;
                if !self.gate.owns(&token, id).await? {
                    return Err(ChatError::Unauthorized {
                        resource: raw.clone(),
                    });
                }
                Some(id)
            }
            None => None,
        };

        // 3. Client-side throttle (the server enforces the real one)
        let identity = self
            .session
            .identity()
            .unwrap_or_else(|| "anonymous".to_string());
        let decision = self
            .limiter
            .check(&format!("{identity}:{RATE_OPERATION}"), self.chat_rate_limit);
        if !decision.allowed {
            return Err(ChatError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }

        // 4. Message batch, all-or-nothing
        let messages = validate_raw_messages(&request.messages)?;

        // 5. Context fields clamp rather than fail
        let context = &request.context;
        let mode = context
            .mode
            .as_deref()
            .map(TutorMode::parse_or_default)
            .unwrap_or_default();
        let week = context
            .week
            .map(|w| w.clamp(*WEEK_RANGE.start(), *WEEK_RANGE.end()));
        let mission = context
            .mission
            .as_deref()
            .map(sanitize_ai_message)
            .filter(|s| !s.is_empty());
        let step = context
            .step
            .as_deref()
            .map(sanitize_ai_message)
            .filter(|s| !s.is_empty());

        Ok(PreparedChat {
            token,
            body: ChatBody {
                messages,
                mode,
                week,
                mission,
                step,
                resource_id,
                stream: true,
            },
        })
    }

    /// Guard, POST, and return the delta stream.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<ChatStream, ChatError> {
        let prepared = self.prepare(request).await?;
        self.send(prepared).await
    }

    async fn send(&self, prepared: PreparedChat) -> Result<ChatStream, ChatError> {
        let url = format!("{}{STREAM_PATH}", self.base_url);
        let request_id = request_id();
        tracing::debug!(%request_id, "POST {url}");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", prepared.token)).map_err(|_| {
                ChatError::InvalidFormat {
                    message: "bearer token contains invalid header characters".into(),
                }
            })?,
        );
        headers.insert(
            "x-request-id",
            HeaderValue::from_str(&request_id).map_err(|_| ChatError::InvalidFormat {
                message: "request id contains invalid header characters".into(),
            })?,
        );

        // Race the send against a timer; a timer win is a timeout,
        // distinct from a transport failure.
        let seconds = self.request_timeout.as_secs();
        let send = self
            .http
            .post(&url)
            .headers(headers)
            .json(&prepared.body)
            .send();
        let response = match tokio::time::timeout(self.request_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(ChatError::Connection {
                    message: e.to_string(),
                });
            }
            Err(_) => return Err(ChatError::Timeout { seconds }),
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), retry_after, &body));
        }
        // A success status that carries no body cannot stream anything.
        if status == reqwest::StatusCode::NO_CONTENT {
            return Err(ChatError::Connection {
                message: "response has no body".into(),
            });
        }

        Ok(ChatStream::new(response.bytes_stream()))
    }

    /// Stream one chat call through callbacks.
    ///
    /// `on_delta` fires per fragment; afterwards exactly one of
    /// `on_done` / `on_error` fires. Guard failures are reported before
    /// any network I/O.
    pub async fn stream_chat(&self, request: &ChatRequest, events: &mut dyn ChatEvents) {
        let opened = match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(ChatError::Cancelled),
                    opened = self.open_stream(request) => opened,
                }
            }
            None => self.open_stream(request).await,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                events.on_error(e);
                return;
            }
        };

        loop {
            let next = match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            events.on_error(ChatError::Cancelled);
                            return;
                        }
                        next = stream.next() => next,
                    }
                }
                None => stream.next().await,
            };

            match next {
                Some(Ok(delta)) => events.on_delta(&delta),
                Some(Err(e)) => {
                    events.on_error(e);
                    return;
                }
                None => {
                    events.on_done();
                    return;
                }
            }
        }
    }
}

/// Opaque id correlating one call across client logs and server traces.
/// Timestamp plus a random suffix; never parsed back.
pub fn request_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{suffix}", Utc::now().timestamp_millis())
}

/// Parse a `Retry-After` header value as whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|secs| secs.ceil().max(0.0) as u64)
}

/// Classify a non-2xx response into a typed error.
///
/// The body is diagnostic only: logged, never shown to the end user.
fn classify_status(status: u16, retry_after_secs: Option<u64>, body: &str) -> ChatError {
    if !body.is_empty() {
        tracing::debug!(status, "chat endpoint error body: {body}");
    }
    match status {
        401 | 403 => ChatError::AuthFailed { status },
        402 => ChatError::CreditsDepleted,
        429 => ChatError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(60),
        },
        _ => ChatError::Connection {
            message: format!("unexpected status {status}"),
        },
    }
}
