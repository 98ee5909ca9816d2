//! Per-type tracking configuration and the registry that holds it.
//!
//! A [`TrackingConfig`] is frozen when it is registered. The only thing that
//! changes afterwards is the per-type enable switch, which is an atomic so a
//! shared registry can be toggled through `&self`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::codec::SnapshotFormat;
use crate::entity::Trackable;
use crate::error::ConfigError;

/// Version fields that metadata keys may not shadow.
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "item_type",
    "item_id",
    "event",
    "object",
    "whodunnit",
    "created_at",
];

/// Attribute ignored by the audit trail unless told otherwise.
pub const DEFAULT_TRAIL_IGNORE: &str = "updated_at";

type ComputeFn = dyn Fn(&dyn Trackable) -> Value + Send + Sync;

/// Supplies one metadata value for every version recorded for a type.
#[derive(Clone)]
pub enum MetadataProvider {
    Static(Value),
    /// Invoked with the entity being versioned.
    Computed(Arc<ComputeFn>),
}

impl MetadataProvider {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&dyn Trackable) -> Value + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    pub fn resolve(&self, entity: &dyn Trackable) -> Value {
        match self {
            MetadataProvider::Static(value) => value.clone(),
            MetadataProvider::Computed(f) => f(entity),
        }
    }
}

impl fmt::Debug for MetadataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataProvider::Static(value) => f.debug_tuple("Static").field(value).finish(),
            MetadataProvider::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Value> for MetadataProvider {
    fn from(value: Value) -> Self {
        MetadataProvider::Static(value)
    }
}

/// How one entity type is versioned.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Attributes whose changes alone never produce an UPDATE version.
    pub ignore: BTreeSet<String>,
    /// When non-empty, only changes to these attributes produce an UPDATE version.
    pub only: BTreeSet<String>,
    pub metadata: BTreeMap<String, MetadataProvider>,
    /// Initial state of the per-type switch.
    pub enabled: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            ignore: BTreeSet::new(),
            only: BTreeSet::new(),
            metadata: BTreeMap::new(),
            enabled: true,
        }
    }
}

impl TrackingConfig {
    pub fn builder() -> TrackingConfigBuilder {
        TrackingConfigBuilder::default()
    }

    /// Whether a change to `changed` is worth an UPDATE version.
    pub fn changed_and_we_care<'a, I>(&self, changed: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        changed.into_iter().any(|attribute| {
            !self.ignore.contains(attribute)
                && (self.only.is_empty() || self.only.contains(attribute))
        })
    }
}

#[derive(Debug, Default)]
pub struct TrackingConfigBuilder {
    config: TrackingConfig,
}

impl TrackingConfigBuilder {
    pub fn ignore(mut self, attribute: impl Into<String>) -> Self {
        self.config.ignore.insert(attribute.into());
        self
    }

    pub fn only(mut self, attribute: impl Into<String>) -> Self {
        self.config.only.insert(attribute.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, provider: impl Into<MetadataProvider>) -> Self {
        self.config.metadata.insert(key.into(), provider.into());
        self
    }

    pub fn meta_fn<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Trackable) -> Value + Send + Sync + 'static,
    {
        self.meta(key, MetadataProvider::computed(f))
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn build(self) -> TrackingConfig {
        self.config
    }
}

#[derive(Debug)]
struct Registration {
    config: Arc<TrackingConfig>,
    enabled: AtomicBool,
}

/// Tracking configuration for every versioned type, keyed by item type.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `item_type`. Each type may be registered once.
    pub fn register(
        &mut self,
        item_type: impl Into<String>,
        config: TrackingConfig,
    ) -> Result<(), ConfigError> {
        let item_type = item_type.into();
        if self.types.contains_key(&item_type) {
            return Err(ConfigError::AlreadyRegistered(item_type));
        }
        if let Some(key) = config
            .metadata
            .keys()
            .find(|key| RESERVED_METADATA_KEYS.contains(&key.as_str()))
        {
            return Err(ConfigError::ReservedMetadataKey {
                item_type,
                key: key.clone(),
            });
        }

        let enabled = AtomicBool::new(config.enabled);
        self.types.insert(
            item_type,
            Registration {
                config: Arc::new(config),
                enabled,
            },
        );
        Ok(())
    }

    pub fn config(&self, item_type: &str) -> Option<Arc<TrackingConfig>> {
        self.types
            .get(item_type)
            .map(|registration| Arc::clone(&registration.config))
    }

    pub fn is_registered(&self, item_type: &str) -> bool {
        self.types.contains_key(item_type)
    }

    /// Current state of the per-type switch; `None` for unknown types.
    pub fn is_enabled(&self, item_type: &str) -> Option<bool> {
        self.types
            .get(item_type)
            .map(|registration| registration.enabled.load(Ordering::SeqCst))
    }

    /// Turns versioning on for `item_type`. Returns `false` for unknown types.
    pub fn enable(&self, item_type: &str) -> bool {
        self.set_enabled(item_type, true)
    }

    /// Turns versioning off for `item_type`. Returns `false` for unknown types.
    pub fn disable(&self, item_type: &str) -> bool {
        self.set_enabled(item_type, false)
    }

    fn set_enabled(&self, item_type: &str, enabled: bool) -> bool {
        match self.types.get(item_type) {
            Some(registration) => {
                registration.enabled.store(enabled, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn item_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Engine configuration as read from a TOML file.
///
/// ```toml
/// enabled = true
/// snapshot_format = "json"
///
/// [types.Widget]
/// ignore = ["updated_at"]
///
/// [types.Widget.metadata]
/// source = "import"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial state of the global switch.
    pub enabled: bool,
    pub snapshot_format: SnapshotFormat,
    pub types: BTreeMap<String, TypeConfigToml>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_format: SnapshotFormat::default(),
            types: BTreeMap::new(),
        }
    }
}

/// `[types.<Name>]` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TypeConfigToml {
    pub ignore: Vec<String>,
    pub only: Vec<String>,
    pub enabled: bool,
    /// Static metadata values; computed providers can only be registered in code.
    pub metadata: BTreeMap<String, Value>,
}

impl Default for TypeConfigToml {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            only: Vec::new(),
            enabled: true,
            metadata: BTreeMap::new(),
        }
    }
}

impl From<TypeConfigToml> for TrackingConfig {
    fn from(toml: TypeConfigToml) -> Self {
        TrackingConfig {
            ignore: toml.ignore.into_iter().collect(),
            only: toml.only.into_iter().collect(),
            metadata: toml
                .metadata
                .into_iter()
                .map(|(key, value)| (key, MetadataProvider::Static(value)))
                .collect(),
            enabled: toml.enabled,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Ignore list configured for `item_type`, if any.
    pub fn ignored_for(&self, item_type: &str) -> Option<&[String]> {
        self.types.get(item_type).map(|t| t.ignore.as_slice())
    }

    pub fn into_registry(self) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new();
        for (item_type, table) in self.types {
            registry.register(item_type, table.into())?;
        }
        Ok(registry)
    }
}
