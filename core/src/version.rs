//! Version records and the identifiers they hang off.

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Attribute name to value. Ordered so encodings and diffs are deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Extension fields attached to a version by metadata providers and the
/// request context.
pub type Metadata = BTreeMap<String, Value>;

/// Polymorphic reference to a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_type: String,
    pub item_id: String,
}

impl ItemRef {
    pub fn new(item_type: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            item_id: item_id.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.item_type, self.item_id)
    }
}

/// The mutation a version records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Create,
    Update,
    Destroy,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::Create => "create",
            Event::Update => "update",
            Event::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version built by the lifecycle controller but not yet appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use = "a staged version must be appended to the store with its mutation"]
pub struct NewVersion {
    pub item: ItemRef,
    pub event: Event,
    /// Pre-event state. `None` for CREATE.
    pub snapshot: Option<String>,
    pub whodunnit: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// A persisted version. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub item: ItemRef,
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whodunnit: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    /// 0-based position among this entity's versions.
    pub sequence_index: u64,
}

impl Version {
    /// Stamps a staged version with the position the store assigned it.
    pub fn from_new(new: NewVersion, sequence_index: u64) -> Self {
        let NewVersion {
            item,
            event,
            snapshot,
            whodunnit,
            metadata,
            created_at,
        } = new;
        Self {
            item,
            event,
            snapshot,
            whodunnit,
            metadata,
            created_at,
            sequence_index,
        }
    }

    /// Total order key among one entity's versions.
    pub fn ordering_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence_index)
    }
}

/// Sorts versions oldest first by `(created_at, sequence_index)`.
pub fn sort_versions(versions: &mut [Version]) {
    versions.sort_by_key(Version::ordering_key);
}
