//! A dynamically shaped observable object.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    error::WriteError,
    error_store::ErrorStore,
    event::Event,
    id::ObjectId,
    object::{DataObject, ErrorSource, IndexKey, Indexer, PropertyChanged, PropertyKey},
    value::Value,
};

/// An observable property bag.
///
/// Properties keep their insertion order. Assigning a different value fires
/// [`PropertyChanged`] after the new value is stored, so listeners always
/// observe the updated object. Attached properties are stored under their
/// qualified `Owner.Name` spelling.
///
/// # Example
///
/// ```rust
/// use floem_observable::{DynObject, Value};
///
/// let address = DynObject::new("Address").with_property("City", "Lyon");
/// assert_eq!(address.get("City"), Some(Value::from("Lyon")));
///
/// address.set("City", "Nantes");
/// assert_eq!(address.get("City"), Some(Value::from("Nantes")));
/// ```
pub struct DynObject {
    id: ObjectId,
    type_name: Rc<str>,
    properties: RefCell<IndexMap<Rc<str>, Value>>,
    keyed: bool,
    property_changed: Event<PropertyChanged>,
    errors: Option<ErrorStore>,
}

impl fmt::Debug for DynObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DynObject");
        s.field("id", &self.id);
        s.field("type_name", &self.type_name);
        s.field("properties", &self.properties.borrow());
        s.finish()
    }
}

impl DynObject {
    pub fn new(type_name: impl Into<Rc<str>>) -> Self {
        Self {
            id: ObjectId::next(),
            type_name: type_name.into(),
            properties: RefCell::new(IndexMap::new()),
            keyed: false,
            property_changed: Event::new(),
            errors: None,
        }
    }

    /// Give this object an [`ErrorStore`], exposing the error-reporting
    /// capability.
    pub fn with_errors(mut self) -> Self {
        self.errors = Some(ErrorStore::new());
        self
    }

    /// Make the object indexable by property name: `obj[Name]` reads the
    /// same slot as `obj.Name`.
    pub fn keyed(mut self) -> Self {
        self.keyed = true;
        self
    }

    /// Builder form of [`DynObject::set`]; does not notify.
    pub fn with_property(self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.properties
            .borrow_mut()
            .insert(name.into(), value.into());
        self
    }

    pub fn with_attached(self, owner: &str, name: &str, value: impl Into<Value>) -> Self {
        self.with_property(format!("{owner}.{name}"), value)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    /// Store `value` under `name`, returning whether anything changed.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let changed = {
            let mut properties = self.properties.borrow_mut();
            match properties.get_mut(name) {
                Some(slot) if *slot == value => false,
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => {
                    properties.insert(name.into(), value);
                    true
                }
            }
        };
        if changed {
            tracing::trace!(object = %self.id, property = name, "property changed");
            self.property_changed.emit(&PropertyChanged::named(name));
        }
        changed
    }

    pub fn set_attached(&self, owner: &str, name: &str, value: impl Into<Value>) -> bool {
        self.set(&format!("{owner}.{name}"), value)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = self.properties.borrow_mut().shift_remove(name);
        if removed.is_some() {
            self.property_changed.emit(&PropertyChanged::named(name));
        }
        removed
    }

    /// Tell listeners that every property may have changed.
    pub fn notify_all(&self) {
        self.property_changed.emit(&PropertyChanged::all());
    }

    pub fn len(&self) -> usize {
        self.properties.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error_store(&self) -> Option<&ErrorStore> {
        self.errors.as_ref()
    }

    pub fn into_value(self) -> Value {
        Value::object(self)
    }

    fn lookup(&self, key: &PropertyKey<'_>) -> Option<Value> {
        let properties = self.properties.borrow();
        let found = match key.owner {
            None => properties.get(key.name),
            Some(owner) => {
                let qualified = key.qualified_name();
                match properties.get(&*qualified) {
                    Some(value) => Some(value),
                    None if owner == &*self.type_name => properties.get(key.name),
                    None => None,
                }
            }
        };
        found.cloned()
    }
}

impl DataObject for DynObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property(&self, key: &PropertyKey<'_>) -> Option<Value> {
        self.lookup(key)
    }

    fn set_property(&self, key: &PropertyKey<'_>, value: Value) -> Result<(), WriteError> {
        let name = if self.contains(&key.qualified_name()) {
            key.qualified_name().into_owned()
        } else if key.owner.is_none_or(|owner| owner == &*self.type_name) && self.contains(key.name) {
            key.name.to_owned()
        } else {
            return Err(WriteError::MissingProperty {
                type_name: self.type_name.to_string(),
                property: key.qualified_name().into_owned(),
            });
        };
        self.set(&name, value);
        Ok(())
    }

    fn property_names(&self) -> Vec<Rc<str>> {
        self.properties.borrow().keys().cloned().collect()
    }

    fn indexer(&self) -> Indexer {
        if self.keyed {
            Indexer::Keyed
        } else {
            Indexer::None
        }
    }

    fn item(&self, index: &IndexKey<'_>) -> Option<Value> {
        match index {
            IndexKey::Key(key) if self.keyed => self.get(key),
            _ => None,
        }
    }

    fn set_item(&self, index: &IndexKey<'_>, value: Value) -> Result<(), WriteError> {
        match index {
            IndexKey::Key(key) if self.keyed => {
                self.set(key, value);
                Ok(())
            }
            IndexKey::Position(position) if self.keyed => Err(WriteError::InvalidIndex {
                type_name: self.type_name.to_string(),
                index: position.to_string(),
            }),
            _ => Err(WriteError::NotIndexable {
                type_name: self.type_name.to_string(),
            }),
        }
    }

    fn property_changed(&self) -> Option<&Event<PropertyChanged>> {
        Some(&self.property_changed)
    }

    fn as_error_source(&self) -> Option<&dyn ErrorSource> {
        self.errors.as_ref().map(|errors| errors as &dyn ErrorSource)
    }
}
