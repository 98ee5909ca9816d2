//! One-stop facade over the lifecycle controller and the read-side queries.

use chrono::DateTime;
use chrono::Utc;

use crate::codec::SnapshotCodec;
use crate::config::EngineConfig;
use crate::config::Registry;
use crate::context::ActorContext;
use crate::entity::EntityState;
use crate::entity::Trackable;
use crate::error::ConfigError;
use crate::error::Result;
use crate::lifecycle::Changes;
use crate::lifecycle::LifecycleController;
use crate::navigator::Navigator;
use crate::store::VersionStore;
use crate::trail::ActorResolver;
use crate::trail::AuditEntry;
use crate::trail::TrailBuilder;
use crate::trail::TrailOptions;
use crate::version::NewVersion;
use crate::version::Version;

pub struct Chronicle<S> {
    controller: LifecycleController<S>,
}

impl<S: VersionStore> Chronicle<S> {
    pub fn new(registry: Registry, store: S) -> Self {
        Self::with_codec(registry, store, SnapshotCodec::default())
    }

    pub fn with_codec(registry: Registry, store: S, codec: SnapshotCodec) -> Self {
        Self {
            controller: LifecycleController::new(registry, store, codec),
        }
    }

    /// Builds the registry, codec and global switch from file configuration.
    pub fn from_config(config: EngineConfig, store: S) -> std::result::Result<Self, ConfigError> {
        let enabled = config.enabled;
        let codec = SnapshotCodec::new(config.snapshot_format);
        let chronicle = Self::with_codec(config.into_registry()?, store, codec);
        if !enabled {
            chronicle.disable();
        }
        Ok(chronicle)
    }

    pub fn controller(&self) -> &LifecycleController<S> {
        &self.controller
    }

    pub fn registry(&self) -> &Registry {
        self.controller.registry()
    }

    pub fn store(&self) -> &S {
        self.controller.store()
    }

    pub fn navigator(&self) -> Navigator<&S> {
        Navigator::new(self.controller.store(), self.controller.codec())
    }

    pub fn trail(&self) -> TrailBuilder<&S> {
        TrailBuilder::new(self.controller.store(), self.controller.codec())
    }

    // Switches

    pub fn enable(&self) {
        self.controller.enable();
    }

    pub fn disable(&self) {
        self.controller.disable();
    }

    pub fn enable_type(&self, item_type: &str) -> bool {
        self.registry().enable(item_type)
    }

    pub fn disable_type(&self, item_type: &str) -> bool {
        self.registry().disable(item_type)
    }

    // Write side

    pub fn after_create<E, C>(&self, entity: &E, ctx: &C) -> Result<Option<Version>>
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        self.controller.after_create(entity, ctx)
    }

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
        self.controller.before_update(entity, changes, ctx)
    }

    /// Appends a version staged by [`Self::before_update`]. Call it inside the
    /// same unit of work that commits the mutation.
    pub fn append_staged(&self, version: NewVersion) -> Result<Version> {
        Ok(self.controller.store().append(version)?)
    }

    pub fn after_destroy<E, C>(&self, entity: &E, ctx: &C) -> Result<Option<Version>>
    where
        E: Trackable,
        C: ActorContext + ?Sized,
    {
        self.controller.after_destroy(entity, ctx)
    }

    // Read side

    pub fn versions<E: Trackable + ?Sized>(&self, entity: &E) -> Result<Vec<Version>> {
        self.navigator().versions(entity)
    }

    pub fn originator<E: Trackable + ?Sized>(&self, entity: &E) -> Result<Option<String>> {
        self.navigator().originator(entity)
    }

    pub fn state_at<E: Trackable + ?Sized>(
        &self,
        entity: &E,
        timestamp: DateTime<Utc>,
    ) -> Result<EntityState> {
        self.navigator().state_at(entity, timestamp)
    }

    pub fn previous_version<E: Trackable + ?Sized>(&self, entity: &E) -> Result<Option<EntityState>> {
        self.navigator().previous(entity)
    }

    pub fn next_version<E: Trackable + ?Sized>(&self, entity: &E) -> Result<Option<EntityState>> {
        self.navigator().next(entity)
    }

    pub fn version_at_index<E: Trackable + ?Sized>(
        &self,
        entity: &E,
        index: u64,
    ) -> Result<Option<Version>> {
        self.navigator().version_at_index(entity, index)
    }

    pub fn audit_trail<E: Trackable + ?Sized>(
        &self,
        entity: &E,
        options: &TrailOptions,
    ) -> Result<Vec<AuditEntry>> {
        self.trail().audit_trail(entity, options)
    }

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
        self.trail().audit_trail_with(entity, options, resolver)
    }
}
