use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    error::WriteError,
    event::Event,
    id::ObjectId,
    object::{
        CollectionChanged, DataObject, IndexKey, Indexer, PropertyChanged, PropertyKey,
        COUNT_PROPERTY, INDEXER_PROPERTY,
    },
    value::Value,
};

/// A positional collection that reports its mutations.
///
/// Every mutation fires [`CollectionChanged`] first, then
/// `PropertyChanged("Item[]")`, then `PropertyChanged("Count")` when the
/// length changed.
pub struct ObservableList {
    id: ObjectId,
    items: RefCell<Vec<Value>>,
    property_changed: Event<PropertyChanged>,
    collection_changed: Event<CollectionChanged>,
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObservableList");
        s.field("id", &self.id);
        s.field("items", &self.items.borrow());
        s.finish()
    }
}

impl Default for ObservableList {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for ObservableList {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl ObservableList {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            id: ObjectId::next(),
            items: RefCell::new(items),
            property_changed: Event::new(),
            collection_changed: Event::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let index = {
            let mut items = self.items.borrow_mut();
            items.push(value.into());
            items.len() - 1
        };
        self.notify(CollectionChanged::Insert { index, count: 1 });
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let index = {
            let mut items = self.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, value.into());
            index
        };
        self.notify(CollectionChanged::Insert { index, count: 1 });
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.items.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.notify(CollectionChanged::Remove { index, count: 1 });
        }
        removed
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Value, WriteError> {
        let value = value.into();
        let previous = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(WriteError::OutOfRange { index, len })?;
            std::mem::replace(slot, value)
        };
        self.notify(CollectionChanged::Replace { index });
        Ok(previous)
    }

    pub fn clear(&self) {
        let was_empty = {
            let mut items = self.items.borrow_mut();
            let was_empty = items.is_empty();
            items.clear();
            was_empty
        };
        if !was_empty {
            self.notify(CollectionChanged::Reset);
        }
    }

    pub fn into_value(self) -> Value {
        Value::object(self)
    }

    fn notify(&self, change: CollectionChanged) {
        tracing::trace!(list = %self.id, ?change, "collection changed");
        self.collection_changed.emit(&change);
        self.property_changed
            .emit(&PropertyChanged::named(INDEXER_PROPERTY));
        if !matches!(change, CollectionChanged::Replace { .. }) {
            self.property_changed
                .emit(&PropertyChanged::named(COUNT_PROPERTY));
        }
    }
}

impl DataObject for ObservableList {
    fn type_name(&self) -> &str {
        "List"
    }

    fn property(&self, key: &PropertyKey<'_>) -> Option<Value> {
        (key.owner.is_none() && key.name == COUNT_PROPERTY).then(|| self.len().into())
    }

    fn property_names(&self) -> Vec<Rc<str>> {
        vec![COUNT_PROPERTY.into()]
    }

    fn indexer(&self) -> Indexer {
        Indexer::Positional
    }

    fn item(&self, index: &IndexKey<'_>) -> Option<Value> {
        match index {
            IndexKey::Position(position) => self.get(*position),
            IndexKey::Key(_) => None,
        }
    }

    fn set_item(&self, index: &IndexKey<'_>, value: Value) -> Result<(), WriteError> {
        match index {
            IndexKey::Position(position) => self.set(*position, value).map(drop),
            IndexKey::Key(key) => Err(WriteError::InvalidIndex {
                type_name: "List".to_owned(),
                index: (*key).to_owned(),
            }),
        }
    }

    fn item_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn property_changed(&self) -> Option<&Event<PropertyChanged>> {
        Some(&self.property_changed)
    }

    fn collection_changed(&self) -> Option<&Event<CollectionChanged>> {
        Some(&self.collection_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_report_structure_then_indexer_then_count() {
        let list: ObservableList = ["a", "b"].into_iter().collect();
        let log = Rc::new(RefCell::new(Vec::<String>::new()));

        let _collection = {
            let log = log.clone();
            list.collection_changed
                .subscribe(move |c| log.borrow_mut().push(format!("{c:?}")))
        };
        let _property = {
            let log = log.clone();
            list.property_changed.subscribe(move |p| {
                log.borrow_mut()
                    .push(p.property.as_deref().unwrap_or("*").to_owned())
            })
        };

        list.push("c");
        assert_eq!(
            *log.borrow(),
            vec!["Insert { index: 2, count: 1 }", "Item[]", "Count"]
        );

        log.borrow_mut().clear();
        list.set(0, "z").unwrap();
        assert_eq!(*log.borrow(), vec!["Replace { index: 0 }", "Item[]"]);
    }

    #[test]
    fn out_of_range_writes_fail() {
        let list: ObservableList = [1, 2, 3].into_iter().collect();
        assert_eq!(
            list.set(5, 0),
            Err(WriteError::OutOfRange { index: 5, len: 3 })
        );
        assert_eq!(list.item(&IndexKey::Position(2)), Some(Value::Int(3)));
        assert_eq!(list.item(&IndexKey::Position(3)), None);
    }
}
