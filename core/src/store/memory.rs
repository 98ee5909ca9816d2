use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::debug;

use super::VersionStore;
use crate::error::StoreError;
use crate::version::ItemRef;
use crate::version::NewVersion;
use crate::version::Version;
use crate::version::sort_versions;

/// Process-local store keyed by item reference.
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    versions: Mutex<HashMap<ItemRef, Vec<Version>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ItemRef, Vec<Version>>>, StoreError> {
        self.versions.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Total number of versions across all items.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Runs `work` as one unit: versions staged through [`StagedAppends`] are
    /// committed only when `work` returns `Ok`. The store lock is held for the
    /// whole call, so concurrent appends to any item wait for it.
    pub fn transaction<T, E, F>(&self, work: F) -> Result<Result<T, E>, StoreError>
    where
        F: FnOnce(&mut StagedAppends) -> Result<T, E>,
    {
        let mut guard = self.lock()?;
        let mut staged = StagedAppends::default();
        let outcome = work(&mut staged);

        match &outcome {
            Ok(_) => {
                for version in staged.pending {
                    append_locked(&mut guard, version);
                }
            }
            Err(_) => debug!(
                discarded = staged.pending.len(),
                "transaction failed; discarding staged versions"
            ),
        }

        Ok(outcome)
    }
}

/// Versions staged inside [`InMemoryVersionStore::transaction`].
#[derive(Debug, Default)]
pub struct StagedAppends {
    pending: Vec<NewVersion>,
}

impl StagedAppends {
    pub fn stage(&mut self, version: NewVersion) {
        self.pending.push(version);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn append_locked(versions: &mut HashMap<ItemRef, Vec<Version>>, version: NewVersion) -> Version {
    let entries = versions.entry(version.item.clone()).or_default();
    let sequence_index = entries.len() as u64;
    let stored = Version::from_new(version, sequence_index);
    entries.push(stored.clone());
    stored
}

impl VersionStore for InMemoryVersionStore {
    fn append(&self, version: NewVersion) -> Result<Version, StoreError> {
        let mut guard = self.lock()?;
        Ok(append_locked(&mut guard, version))
    }

    fn list(&self, item: &ItemRef) -> Result<Vec<Version>, StoreError> {
        let mut versions = self.lock()?.get(item).cloned().unwrap_or_default();
        sort_versions(&mut versions);
        Ok(versions)
    }
}
