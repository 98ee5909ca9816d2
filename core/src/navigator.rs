//! Point-in-time reconstruction and step-wise history navigation.
//!
//! A version's snapshot is the state *before* its event, so "the state at
//! time t" lives on the first version recorded after t. When no such version
//! exists the live entity is already the answer.

use chrono::DateTime;
use chrono::Utc;

use crate::codec::SnapshotCodec;
use crate::entity::EntityState;
use crate::entity::Origin;
use crate::entity::Trackable;
use crate::error::Result;
use crate::store::VersionStore;
use crate::version::Version;

pub struct Navigator<S> {
    store: S,
    codec: SnapshotCodec,
}

impl<S: VersionStore> Navigator<S> {
    pub fn new(store: S, codec: SnapshotCodec) -> Self {
        Self { store, codec }
    }

    /// Rebuilds the entity as it was just before `version`'s event.
    pub fn reify(&self, version: &Version) -> EntityState {
        EntityState::reified(
            version.item.clone(),
            self.codec.decode(version.snapshot.as_deref()),
            version.sequence_index,
            version.event,
        )
    }

    /// All versions of `entity`, oldest first.
    pub fn versions<E>(&self, entity: &E) -> Result<Vec<Version>>
    where
        E: Trackable + ?Sized,
    {
        Ok(self.store.list(&entity.item_ref())?)
    }

    /// State of `entity` as of `timestamp`.
    pub fn state_at<E>(&self, entity: &E, timestamp: DateTime<Utc>) -> Result<EntityState>
    where
        E: Trackable + ?Sized,
    {
        match self.store.first_after(&entity.item_ref(), timestamp)? {
            Some(version) => Ok(self.reify(&version)),
            None => Ok(EntityState::capture(entity)),
        }
    }

    /// The state one step back in history.
    ///
    /// For the live entity this is the last version's snapshot; for a reified
    /// state it is the snapshot of the version before its source version.
    pub fn previous<E>(&self, entity: &E) -> Result<Option<EntityState>>
    where
        E: Trackable + ?Sized,
    {
        let versions = self.versions(entity)?;
        let previous = match entity.origin() {
            Origin::Live => versions.last(),
            Origin::Reified { sequence_index, .. } => position_of(&versions, sequence_index)
                .and_then(|pos| pos.checked_sub(1))
                .and_then(|pos| versions.get(pos)),
        };
        Ok(previous.map(|version| self.reify(version)))
    }

    /// The state one step forward in history. Always `None` for the live
    /// entity and for a state reified from the newest version.
    pub fn next<E>(&self, entity: &E) -> Result<Option<EntityState>>
    where
        E: Trackable + ?Sized,
    {
        let Origin::Reified { sequence_index, .. } = entity.origin() else {
            return Ok(None);
        };
        let versions = self.versions(entity)?;
        let next = position_of(&versions, sequence_index).and_then(|pos| versions.get(pos + 1));
        Ok(next.map(|version| self.reify(version)))
    }

    /// Versions recorded within `[from, to]`, oldest first.
    pub fn versions_between<E>(
        &self,
        entity: &E,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Version>>
    where
        E: Trackable + ?Sized,
    {
        let mut versions = self.versions(entity)?;
        versions.retain(|version| version.created_at >= from && version.created_at <= to);
        Ok(versions)
    }

    /// The version whose `sequence_index` is `index`, if it was recorded.
    pub fn version_at_index<E>(&self, entity: &E, index: u64) -> Result<Option<Version>>
    where
        E: Trackable + ?Sized,
    {
        Ok(self
            .versions(entity)?
            .into_iter()
            .find(|version| version.sequence_index == index))
    }

    /// Whodunnit of the most recent version.
    pub fn originator<E>(&self, entity: &E) -> Result<Option<String>>
    where
        E: Trackable + ?Sized,
    {
        Ok(self
            .versions(entity)?
            .pop()
            .and_then(|version| version.whodunnit))
    }
}

fn position_of(versions: &[Version], sequence_index: u64) -> Option<usize> {
    versions
        .iter()
        .position(|version| version.sequence_index == sequence_index)
}
