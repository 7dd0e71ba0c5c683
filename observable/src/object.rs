//! The capability surface a bindable object exposes.

use std::{borrow::Cow, rc::Rc};

use crate::{error::WriteError, event::Event, value::Value};

/// Property name under which indexers report their changes.
pub const INDEXER_PROPERTY: &str = "Item[]";

/// Name of the element count property exposed by positional collections.
pub const COUNT_PROPERTY: &str = "Count";

/// A property lookup, optionally scoped to an owner type.
///
/// `PropertyKey::attached("Grid", "Row")` is the key produced by the path
/// segment `(Grid.Row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyKey<'a> {
    pub owner: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> PropertyKey<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { owner: None, name }
    }

    pub fn attached(owner: &'a str, name: &'a str) -> Self {
        Self {
            owner: Some(owner),
            name,
        }
    }

    /// `Owner.Name` for attached keys, `Name` otherwise.
    pub fn qualified_name(&self) -> Cow<'a, str> {
        match self.owner {
            Some(owner) => Cow::Owned(format!("{owner}.{}", self.name)),
            None => Cow::Borrowed(self.name),
        }
    }

    /// Whether a change reported under `changed` concerns this key.
    pub fn matches(&self, changed: &str) -> bool {
        changed == self.name || (self.owner.is_some() && changed == self.qualified_name())
    }
}

/// How an object can be indexed with `[...]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Indexer {
    /// Not indexable.
    #[default]
    None,
    /// Addressed by integer position.
    Positional,
    /// Addressed by string key.
    Keyed,
}

/// A resolved index, ready to be handed to [`DataObject::item`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKey<'a> {
    Position(usize),
    Key(&'a str),
}

impl<'a> IndexKey<'a> {
    /// Interpret the raw contents of a `[...]` segment for `indexer`.
    ///
    /// Positional indexers need a non-negative integer; anything else yields
    /// `None`. Keyed indexers take the contents verbatim.
    pub fn parse(indexer: Indexer, raw: &'a str) -> Option<Self> {
        match indexer {
            Indexer::None => None,
            Indexer::Positional => raw.trim().parse().ok().map(IndexKey::Position),
            Indexer::Keyed => Some(IndexKey::Key(raw)),
        }
    }
}

/// Payload of a property change notification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyChanged {
    /// `None` means every property may have changed.
    pub property: Option<Rc<str>>,
}

impl PropertyChanged {
    pub fn named(property: impl Into<Rc<str>>) -> Self {
        Self {
            property: Some(property.into()),
        }
    }

    pub fn all() -> Self {
        Self { property: None }
    }

    pub fn affects(&self, key: &PropertyKey<'_>) -> bool {
        match &self.property {
            None => true,
            Some(changed) => changed.is_empty() || key.matches(changed),
        }
    }

    pub fn affects_indexer(&self) -> bool {
        match &self.property {
            None => true,
            Some(changed) => changed.is_empty() || &**changed == INDEXER_PROPERTY,
        }
    }
}

/// Structural change of a positional collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionChanged {
    Insert { index: usize, count: usize },
    Remove { index: usize, count: usize },
    Replace { index: usize },
    Reset,
}

/// Payload of an error-set change notification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataErrorsChanged {
    /// `None` refers to errors of the whole object.
    pub property: Option<Rc<str>>,
}

/// The error-reporting capability: validation errors tied to named properties.
pub trait ErrorSource {
    fn has_errors(&self) -> bool;

    /// Errors for `property`, or object-level errors for `None`.
    fn errors(&self, property: Option<&str>) -> Vec<Rc<str>>;

    fn errors_changed(&self) -> &Event<DataErrorsChanged>;
}

/// An object a binding path can walk through.
///
/// Every capability is optional and checked before it is used, so a path
/// node never has to guess what an object supports.
pub trait DataObject {
    fn type_name(&self) -> &str;

    /// `None` means the object has no such property, which breaks the path.
    /// A property that exists but holds nothing is `Some(Value::Null)`.
    fn property(&self, key: &PropertyKey<'_>) -> Option<Value>;

    fn set_property(&self, key: &PropertyKey<'_>, value: Value) -> Result<(), WriteError> {
        let _ = value;
        Err(WriteError::ReadOnly {
            type_name: self.type_name().to_owned(),
            property: key.qualified_name().into_owned(),
        })
    }

    /// Property names, in a stable order. Used for snapshots only.
    fn property_names(&self) -> Vec<Rc<str>> {
        Vec::new()
    }

    fn indexer(&self) -> Indexer {
        Indexer::None
    }

    fn item(&self, index: &IndexKey<'_>) -> Option<Value> {
        let _ = index;
        None
    }

    fn set_item(&self, index: &IndexKey<'_>, value: Value) -> Result<(), WriteError> {
        let _ = (index, value);
        Err(WriteError::NotIndexable {
            type_name: self.type_name().to_owned(),
        })
    }

    /// Number of items for positional collections.
    fn item_count(&self) -> Option<usize> {
        None
    }

    fn property_changed(&self) -> Option<&Event<PropertyChanged>> {
        None
    }

    fn collection_changed(&self) -> Option<&Event<CollectionChanged>> {
        None
    }

    fn as_error_source(&self) -> Option<&dyn ErrorSource> {
        None
    }
}
