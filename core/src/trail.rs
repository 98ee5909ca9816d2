//! Human-readable audit trail built from an entity's version history.

use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::codec::SnapshotCodec;
use crate::config::DEFAULT_TRAIL_IGNORE;
use crate::diff::AttributeChange;
use crate::diff::diff;
use crate::diff::without;
use crate::entity::Trackable;
use crate::error::Result;
use crate::store::VersionStore;
use crate::version::Event;

/// Turns a recorded whodunnit into whatever the caller wants to show.
pub trait ActorResolver {
    type Actor;

    fn resolve(&self, whodunnit: Option<&str>) -> Self::Actor;
}

/// Returns the whodunnit unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl ActorResolver for IdentityResolver {
    type Actor = Option<String>;

    fn resolve(&self, whodunnit: Option<&str>) -> Option<String> {
        whodunnit.map(str::to_string)
    }
}

impl<F, A> ActorResolver for F
where
    F: Fn(Option<&str>) -> A,
{
    type Actor = A;

    fn resolve(&self, whodunnit: Option<&str>) -> A {
        self(whodunnit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailOptions {
    /// Attributes stripped from both sides before diffing.
    pub ignored: BTreeSet<String>,
}

impl Default for TrailOptions {
    fn default() -> Self {
        Self::ignoring([DEFAULT_TRAIL_IGNORE])
    }
}

impl TrailOptions {
    pub fn ignoring<I, T>(attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            ignored: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Diff every attribute.
    pub fn all_attributes() -> Self {
        Self {
            ignored: BTreeSet::new(),
        }
    }
}

/// One transition in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry<A = Option<String>> {
    pub event: Event,
    pub changed_by: A,
    pub changed_at: DateTime<Utc>,
    pub changes: Vec<AttributeChange>,
    /// `sequence_index` of the version this entry describes.
    pub index: u64,
}

impl fmt::Display for AuditEntry<Option<String>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} by {} at {}",
            self.index,
            self.event,
            self.changed_by.as_deref().unwrap_or("unknown"),
            self.changed_at.to_rfc3339()
        )?;
        if !self.changes.is_empty() {
            let changes: Vec<String> = self.changes.iter().map(ToString::to_string).collect();
            write!(f, ": {}", changes.join(", "))?;
        }
        Ok(())
    }
}

pub struct TrailBuilder<S> {
    store: S,
    codec: SnapshotCodec,
}

impl<S: VersionStore> TrailBuilder<S> {
    pub fn new(store: S, codec: SnapshotCodec) -> Self {
        Self { store, codec }
    }

    /// Audit trail with whodunnits reported as-is.
    pub fn audit_trail<E>(&self, entity: &E, options: &TrailOptions) -> Result<Vec<AuditEntry>>
    where
        E: Trackable + ?Sized,
    {
        self.audit_trail_with(entity, options, &IdentityResolver)
    }

    /// Audit trail, newest change first, one entry per persisted version.
    ///
    /// Walks `[live state, newest version, ..., oldest version]` and diffs each
    /// older snapshot against the state that followed it.
    pub fn audit_trail_with<E, R>(
        &self,
        entity: &E,
        options: &TrailOptions,
        resolver: &R,
    ) -> Result<Vec<AuditEntry<R::Actor>>>
    where
        E: Trackable + ?Sized,
        R: ActorResolver + ?Sized,
    {
        let versions = self.store.list(&entity.item_ref())?;
        let mut newer = without(&entity.attributes(), &options.ignored);
        let mut entries = Vec::with_capacity(versions.len());

        for older in versions.iter().rev() {
            let older_state = without(
                &self.codec.decode(older.snapshot.as_deref()),
                &options.ignored,
            );
            entries.push(AuditEntry {
                event: older.event,
                changed_by: resolver.resolve(older.whodunnit.as_deref()),
                changed_at: older.created_at,
                changes: diff(&older_state, &newer),
                index: older.sequence_index,
            });
            newer = older_state;
        }

        Ok(entries)
    }
}
