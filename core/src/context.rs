//! Request-scoped actor identity and metadata.
//!
//! The host builds a [`RequestContext`] per unit of work and passes it to every
//! lifecycle hook, instead of stashing the current actor in process-wide state.

use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

use crate::version::Metadata;

/// Source of "who performed this change" and ambient version metadata.
pub trait ActorContext {
    fn current_whodunnit(&self) -> Option<String>;

    fn ambient_metadata(&self) -> Option<Metadata>;

    /// Timestamp stamped onto versions recorded under this context.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Concrete context threaded through mutation calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    whodunnit: Option<String>,
    metadata: Metadata,
    pinned_time: Option<DateTime<Utc>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context attributed to `actor`.
    pub fn as_actor(actor: impl Into<String>) -> Self {
        Self::new().with_whodunnit(actor)
    }

    pub fn with_whodunnit(mut self, actor: impl Into<String>) -> Self {
        self.whodunnit = Some(actor.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Pins the clock, e.g. to replay an import with its original timestamps.
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.pinned_time = Some(time);
        self
    }
}

impl ActorContext for RequestContext {
    fn current_whodunnit(&self) -> Option<String> {
        self.whodunnit.clone()
    }

    fn ambient_metadata(&self) -> Option<Metadata> {
        if self.metadata.is_empty() {
            None
        } else {
            Some(self.metadata.clone())
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.pinned_time.unwrap_or_else(Utc::now)
    }
}
