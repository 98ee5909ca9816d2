//! Version history for mutable entities.
//!
//! Every create, update and destroy of a tracked entity records a [`Version`]
//! holding the entity's state *before* the event. From that history the crate
//! can:
//!
//! - rebuild the entity as of any timestamp ([`Navigator::state_at`]),
//! - step backwards and forwards one version at a time,
//! - produce an attribute-level audit trail with actor attribution
//!   ([`TrailBuilder::audit_trail`]).
//!
//! Persistence, mutation interception and actor identity stay with the host,
//! behind [`VersionStore`], explicit lifecycle hooks on
//! [`LifecycleController`], and [`ActorContext`].

mod chronicle;
mod codec;
mod config;
mod context;
mod diff;
mod entity;
mod error;
mod lifecycle;
mod navigator;
mod store;
mod trail;
mod version;


pub use chronicle::Chronicle;
pub use codec::SnapshotCodec;
pub use codec::SnapshotFormat;
pub use config::DEFAULT_TRAIL_IGNORE;
pub use config::EngineConfig;
pub use config::MetadataProvider;
pub use config::RESERVED_METADATA_KEYS;
pub use config::Registry;
pub use config::TrackingConfig;
pub use config::TrackingConfigBuilder;
pub use config::TypeConfigToml;
pub use context::ActorContext;
pub use context::RequestContext;
pub use diff::AttributeChange;
pub use diff::diff;
pub use diff::without;
pub use entity::EntityState;
pub use entity::Origin;
pub use entity::Trackable;
pub use entity::is_live;
pub use error::CodecError;
pub use error::ConfigError;
pub use error::Result;
pub use error::StoreError;
pub use error::VersioningError;
pub use lifecycle::Changes;
pub use lifecycle::LifecycleController;
pub use lifecycle::changes_between;
pub use navigator::Navigator;
pub use store::InMemoryVersionStore;
pub use store::JsonlVersionStore;
pub use store::StagedAppends;
pub use store::VersionStore;
pub use trail::ActorResolver;
pub use trail::AuditEntry;
pub use trail::IdentityResolver;
pub use trail::TrailBuilder;
pub use trail::TrailOptions;
pub use version::Attributes;
pub use version::Event;
pub use version::ItemRef;
pub use version::Metadata;
pub use version::NewVersion;
pub use version::Version;
pub use version::sort_versions;
