//! Conversion between [`Value`] graphs and `serde_json` documents.

use serde_json::{Map, Number};

use crate::{
    dyn_object::DynObject,
    list::ObservableList,
    object::{IndexKey, Indexer, PropertyKey},
    value::Value,
};

/// Object graphs deeper than this are cut off when snapshotting.
const MAX_SNAPSHOT_DEPTH: usize = 64;

/// Type name given to objects built from JSON.
pub const JSON_OBJECT_TYPE: &str = "Object";

impl Value {
    /// Build an observable value graph from a JSON document.
    ///
    /// Objects become [`DynObject`]s, arrays become [`ObservableList`]s and
    /// integral numbers that fit an `i64` become [`Value::Int`].
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => ObservableList::from_vec(
                items.into_iter().map(Value::from_json).collect(),
            )
            .into_value(),
            serde_json::Value::Object(fields) => fields
                .into_iter()
                .fold(DynObject::new(JSON_OBJECT_TYPE), |object, (name, value)| {
                    object.with_property(name, Value::from_json(value))
                })
                .into_value(),
        }
    }

    /// Snapshot the current state of this value as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        snapshot(self, 0)
    }
}

fn snapshot(value: &Value, depth: usize) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(object) => {
            if depth >= MAX_SNAPSHOT_DEPTH {
                tracing::warn!(
                    type_name = object.type_name(),
                    "value graph too deep to snapshot, truncating"
                );
                return serde_json::Value::Null;
            }
            match (object.indexer(), object.item_count()) {
                (Indexer::Positional, Some(count)) => serde_json::Value::Array(
                    (0..count)
                        .map(|i| {
                            let item = object.item(&IndexKey::Position(i)).unwrap_or_default();
                            snapshot(&item, depth + 1)
                        })
                        .collect(),
                ),
                _ => {
                    let mut fields = Map::new();
                    for name in object.property_names() {
                        let value = object
                            .property(&PropertyKey::new(&name))
                            .unwrap_or_default();
                        fields.insert(name.to_string(), snapshot(&value, depth + 1));
                    }
                    serde_json::Value::Object(fields)
                }
            }
        }
    }
}
