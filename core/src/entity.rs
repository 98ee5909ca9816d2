//! The tracked-entity contract and reconstructed entity states.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::version::Attributes;
use crate::version::Event;
use crate::version::ItemRef;

/// Where an entity representation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Origin {
    /// The current, up-to-date representation.
    Live,
    /// Rebuilt from the snapshot stored on a version.
    Reified { sequence_index: u64, event: Event },
}

/// An entity type that opts into versioning.
///
/// Implementors expose their identity and current attribute map; the engine
/// never mutates them.
pub trait Trackable {
    /// Registry key for this entity's tracking configuration.
    fn item_type(&self) -> &str;

    fn item_id(&self) -> String;

    /// Full current attribute map, identity included.
    fn attributes(&self) -> Attributes;

    fn origin(&self) -> Origin {
        Origin::Live
    }

    /// Whether the entity has ever been written to the host's storage.
    fn is_persisted(&self) -> bool {
        true
    }

    fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.item_type(), self.item_id())
    }
}

/// Returns `true` for the live representation, `false` for reified history.
pub fn is_live(entity: &(impl Trackable + ?Sized)) -> bool {
    matches!(entity.origin(), Origin::Live)
}

/// A plain attribute-map entity: either a live state handed in by the host or
/// a state reconstructed from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub item: ItemRef,
    pub attributes: Attributes,
    pub origin: Origin,
    #[serde(default = "default_persisted")]
    pub persisted: bool,
}

fn default_persisted() -> bool {
    true
}

impl EntityState {
    /// A live, persisted entity.
    pub fn live(item: ItemRef, attributes: Attributes) -> Self {
        Self {
            item,
            attributes,
            origin: Origin::Live,
            persisted: true,
        }
    }

    /// Captures the current state of any trackable entity.
    pub fn capture(entity: &(impl Trackable + ?Sized)) -> Self {
        Self {
            item: entity.item_ref(),
            attributes: entity.attributes(),
            origin: entity.origin(),
            persisted: entity.is_persisted(),
        }
    }

    pub(crate) fn reified(
        item: ItemRef,
        attributes: Attributes,
        sequence_index: u64,
        event: Event,
    ) -> Self {
        Self {
            item,
            attributes,
            origin: Origin::Reified {
                sequence_index,
                event,
            },
            persisted: true,
        }
    }

    /// Marks a live entity as not yet written to storage.
    pub fn unpersisted(mut self) -> Self {
        self.persisted = false;
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Converts the attribute map into a domain type.
    pub fn reify<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        let object = self.attributes.clone().into_iter().collect();
        serde_json::from_value(Value::Object(object))
    }
}

impl Trackable for EntityState {
    fn item_type(&self) -> &str {
        &self.item.item_type
    }

    fn item_id(&self) -> String {
        self.item.item_id.clone()
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn item_ref(&self) -> ItemRef {
        self.item.clone()
    }
}
