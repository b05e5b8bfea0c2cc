//! Cache keys and entries.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A `(namespace, key)` pair addressing one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    namespace: String,
    key: String,
}

impl CacheKey {
    /// Creates a cache key.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the key within the namespace.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

/// A stored value with its expiry.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Wraps a value that expires `ttl` after `now`.
    ///
    /// A zero TTL (or one too large to represent) never expires.
    pub(crate) fn new<T>(value: T, now: DateTime<Utc>, ttl: Duration) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            expires_at: expiry(now, ttl),
        }
    }

    /// A value is live strictly before its expiry instant.
    pub(crate) fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    pub(crate) fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Clones the value out if it has type `T`.
    pub(crate) fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    if ttl.is_zero() {
        return None;
    }
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    now.checked_add_signed(ttl)
}
