//! External seams: session tokens and resource ownership.
//!
//! Both the auth provider and the data store behind the ownership check
//! are black boxes to this crate; these traits are the injection points.

use sensei_types::ChatError;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplies the bearer token for the authenticated user session.
pub trait SessionProvider: Send + Sync {
    /// The current bearer token, or `None` when no session is active.
    fn bearer_token(&self) -> Option<String>;

    /// Stable identity used to scope rate-limit keys. Defaults to the
    /// bearer token itself.
    fn identity(&self) -> Option<String> {
        self.bearer_token()
    }
}

/// A fixed token and identity, for CLI and test use.
pub struct StaticSession {
    token: String,
    identity: String,
}

impl StaticSession {
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity: identity.into(),
        }
    }
}

impl SessionProvider for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }

    fn identity(&self) -> Option<String> {
        Some(self.identity.clone())
    }
}

/// The signed-out state.
pub struct NoSession;

impl SessionProvider for NoSession {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Answers whether the authenticated user owns a referenced resource.
pub trait OwnershipGate: Send + Sync {
    fn owns<'a>(&'a self, token: &'a str, resource: Uuid) -> BoxFuture<'a, Result<bool, ChatError>>;
}

/// Gate that accepts every resource, for flows without scoped resources.
pub struct AllowAll;

impl OwnershipGate for AllowAll {
    fn owns<'a>(
        &'a self,
        _token: &'a str,
        _resource: Uuid,
    ) -> BoxFuture<'a, Result<bool, ChatError>> {
        Box::pin(async { Ok(true) })
    }
}
