//! Decides, for each entity mutation, whether a version is recorded and what
//! it contains.
//!
//! The host calls the hooks explicitly:
//!
//! - [`LifecycleController::after_create`] once the row exists,
//! - [`LifecycleController::before_update`] with the computed change set,
//!   before committing; the returned [`NewVersion`] must be appended in the
//!   same unit of work as the mutation,
//! - [`LifecycleController::after_destroy`] once the row is gone.
//!
//! Nothing is recorded unless both the controller's global switch and the
//! item type's switch are on.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Value;
use tracing::debug;

use crate::codec::SnapshotCodec;
use crate::config::Registry;
use crate::config::TrackingConfig;
use crate::context::ActorContext;
use crate::entity::Trackable;
use crate::entity::is_live;
use crate::error::Result;
use crate::error::VersioningError;
use crate::store::VersionStore;
use crate::version::Attributes;
use crate::version::Event;
use crate::version::Metadata;
use crate::version::NewVersion;
use crate::version::Version;

/// Attribute name to `(old, new)` for one pending update. `None` means the
/// attribute is absent on that side.
pub type Changes = BTreeMap<String, (Option<Value>, Option<Value>)>;

/// Computes the change set between two attribute maps.
pub fn changes_between(before: &Attributes, after: &Attributes) -> Changes {
    crate::diff::diff(before, after)
        .into_iter()
        .map(|change| (change.attribute, (change.before, change.after)))
        .collect()
}

pub struct LifecycleController<S> {
    registry: Registry,
    store: S,
    codec: SnapshotCodec,
    enabled: AtomicBool,
}

impl<S: VersionStore> LifecycleController<S> {
    pub fn new(registry: Registry, store: S, codec: SnapshotCodec) -> Self {
        Self {
            registry,
            store,
            codec,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> SnapshotCodec {
        self.codec
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Records a CREATE version.
    pub fn after_create<E, C>(&self, entity: &E, ctx: &C) -> Result<Option<Version>>
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        let Some(config) = self.gate(entity, Event::Create)? else {
            return Ok(None);
        };

        let version = self.build(entity, Event::Create, None, &config, ctx);
        self.persist(version).map(Some)
    }

    /// Stages an UPDATE version capturing the pre-change state, or `None` when
    /// the change is not worth recording.
    ///
    /// `entity` carries the new values; `changes` maps every changed attribute
    /// to its `(old, new)` pair.
    pub fn before_update<E, C>(
        &self,
        entity: &E,
        changes: &Changes,
        ctx: &C,
    ) -> Result<Option<NewVersion>>
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        let Some(config) = self.gate(entity, Event::Update)? else {
            return Ok(None);
        };
        if !config.changed_and_we_care(changes.keys()) {
            debug!(
                item = %entity.item_ref(),
                changed = ?changes.keys().collect::<Vec<_>>(),
                "only ignored attributes changed; no version staged"
            );
            return Ok(None);
        }

        let mut previous = entity.attributes();
        for (attribute, (old, _new)) in changes {
            match old {
                Some(old) => previous.insert(attribute.clone(), old.clone()),
                None => previous.remove(attribute),
            };
        }
        let snapshot = self.codec.encode(&previous)?;

        let version = self.build(entity, Event::Update, Some(snapshot), &config, ctx);
        debug!(item = %version.item, "staged update version");
        Ok(Some(version))
    }

    /// Records a DESTROY version holding the entity's last state. A no-op for
    /// entities that were never persisted.
    pub fn after_destroy<E, C>(&self, entity: &E, ctx: &C) -> Result<Option<Version>>
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        let Some(config) = self.gate(entity, Event::Destroy)? else {
            return Ok(None);
        };
        if !entity.is_persisted() {
            debug!(item = %entity.item_ref(), "destroying unpersisted entity; nothing to record");
            return Ok(None);
        }

        let snapshot = self.codec.encode(&entity.attributes())?;
        let version = self.build(entity, Event::Destroy, Some(snapshot), &config, ctx);
        self.persist(version).map(Some)
    }

    /// Metadata for one version: per-type providers first, then the request
    /// context's ambient metadata, which wins on key collisions.
    pub fn merge_metadata<E, C>(&self, config: &TrackingConfig, entity: &E, ctx: &C) -> Metadata
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        let mut metadata: Metadata = config
            .metadata
            .iter()
            .map(|(key, provider)| (key.clone(), provider.resolve(entity)))
            .collect();
        if let Some(ambient) = ctx.ambient_metadata() {
            metadata.extend(ambient);
        }
        metadata
    }

    /// Returns the type's config when recording is allowed for this entity.
    fn gate<E: Trackable>(
        &self,
        entity: &E,
        event: Event,
    ) -> Result<Option<Arc<TrackingConfig>>> {
        if !is_live(entity) {
            debug!(item = %entity.item_ref(), %event, "reified entities are not versioned");
            return Ok(None);
        }

        let item_type = entity.item_type();
        let (Some(config), Some(type_enabled)) = (
            self.registry.config(item_type),
            self.registry.is_enabled(item_type),
        ) else {
            return Err(VersioningError::UnregisteredType(item_type.to_string()));
        };

        if !(self.is_enabled() && type_enabled) {
            debug!(
                item = %entity.item_ref(),
                %event,
                global = self.is_enabled(),
                per_type = type_enabled,
                "versioning switched off"
            );
            return Ok(None);
        }

        Ok(Some(config))
    }

    fn build<E, C>(
        &self,
        entity: &E,
        event: Event,
        snapshot: Option<String>,
        config: &TrackingConfig,
        ctx: &C,
    ) -> NewVersion
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        NewVersion {
            item: entity.item_ref(),
            event,
            snapshot,
            whodunnit: ctx.current_whodunnit(),
            metadata: self.merge_metadata(config, entity, ctx),
            created_at: ctx.now(),
        }
    }

    fn persist(&self, version: NewVersion) -> Result<Version> {
        let stored = self.store.append(version)?;
        debug!(
            item = %stored.item,
            event = %stored.event,
            sequence_index = stored.sequence_index,
            "recorded version"
        );
        Ok(stored)
    }
}
