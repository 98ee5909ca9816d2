//! Attribute-level diffing between two attribute maps.

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::version::Attributes;

/// One attribute whose value differs between two states.
///
/// `None` means the attribute is absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.attribute,
            render(self.before.as_ref()),
            render(self.after.as_ref())
        )
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(absent)".to_string(),
    }
}

/// Lists every attribute whose value differs between `before` and `after`,
/// sorted by attribute name. Applies no filtering; see [`without`].
pub fn diff(before: &Attributes, after: &Attributes) -> Vec<AttributeChange> {
    // BTreeMap keys are already sorted, so walking the merged key set keeps
    // the output ordered.
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key);
            let new = after.get(key);
            (old != new).then(|| AttributeChange {
                attribute: key.clone(),
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}

/// Returns a copy of `attributes` without the `ignored` keys.
pub fn without<'a, I>(attributes: &Attributes, ignored: I) -> Attributes
where
    I: IntoIterator<Item = &'a String>,
{
    let mut filtered = attributes.clone();
    for key in ignored {
        filtered.remove(key);
    }
    filtered
}
