//! Persistence contract for versions, plus two reference stores.
//!
//! The engine only needs ordered reads and appends. Durable storage,
//! transactions and retention belong to the host; [`InMemoryVersionStore`]
//! and [`JsonlVersionStore`] exist for tests, tooling and small deployments.

use chrono::DateTime;
use chrono::Utc;

use crate::error::StoreError;
use crate::version::ItemRef;
use crate::version::NewVersion;
use crate::version::Version;

mod jsonl;
mod memory;

pub use jsonl::JsonlVersionStore;
pub use memory::InMemoryVersionStore;
pub use memory::StagedAppends;

pub trait VersionStore {
    /// Persists `version`, assigning its `sequence_index`.
    fn append(&self, version: NewVersion) -> Result<Version, StoreError>;

    /// All versions of `item`, ascending by `(created_at, sequence_index)`.
    fn list(&self, item: &ItemRef) -> Result<Vec<Version>, StoreError>;

    /// The oldest version of `item` created strictly after `timestamp`.
    fn first_after(
        &self,
        item: &ItemRef,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Version>, StoreError> {
        Ok(self
            .list(item)?
            .into_iter()
            .find(|version| version.created_at > timestamp))
    }
}

impl<S: VersionStore + ?Sized> VersionStore for &S {
    fn append(&self, version: NewVersion) -> Result<Version, StoreError> {
        (**self).append(version)
    }

    fn list(&self, item: &ItemRef) -> Result<Vec<Version>, StoreError> {
        (**self).list(item)
    }

    fn first_after(
        &self,
        item: &ItemRef,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Version>, StoreError> {
        (**self).first_after(item, timestamp)
    }
}
