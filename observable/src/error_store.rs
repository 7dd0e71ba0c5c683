use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    event::Event,
    object::{DataErrorsChanged, ErrorSource},
};

/// Per-property validation errors, reported through [`ErrorSource`].
///
/// Object-level errors live under the empty property name. Every change to a
/// property's error list fires `errors_changed` once for that property.
#[derive(Default)]
pub struct ErrorStore {
    errors: RefCell<IndexMap<Rc<str>, Vec<Rc<str>>>>,
    changed: Event<DataErrorsChanged>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the errors of `property`. An empty list clears it.
    pub fn set_errors<I, S>(&self, property: &str, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        let errors: Vec<Rc<str>> = errors.into_iter().map(Into::into).collect();
        let changed = {
            let mut table = self.errors.borrow_mut();
            if errors.is_empty() {
                table.shift_remove(property).is_some()
            } else if table.get(property) == Some(&errors) {
                false
            } else {
                table.insert(property.into(), errors);
                true
            }
        };
        if changed {
            self.notify(property);
        }
    }

    pub fn add_error(&self, property: &str, error: impl Into<Rc<str>>) {
        self.errors
            .borrow_mut()
            .entry(property.into())
            .or_default()
            .push(error.into());
        self.notify(property);
    }

    pub fn clear(&self, property: &str) {
        self.set_errors(property, std::iter::empty::<Rc<str>>());
    }

    pub fn clear_all(&self) {
        let properties: Vec<Rc<str>> = self.errors.borrow_mut().drain(..).map(|(k, _)| k).collect();
        for property in properties {
            self.notify(&property);
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.borrow().values().map(Vec::len).sum()
    }

    fn notify(&self, property: &str) {
        let property = (!property.is_empty()).then(|| Rc::from(property));
        self.changed.emit(&DataErrorsChanged { property });
    }
}

impl ErrorSource for ErrorStore {
    fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    fn errors(&self, property: Option<&str>) -> Vec<Rc<str>> {
        self.errors
            .borrow()
            .get(property.unwrap_or_default())
            .cloned()
            .unwrap_or_default()
    }

    fn errors_changed(&self) -> &Event<DataErrorsChanged> {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn clearing_notifies_once_per_property() {
        let store = ErrorStore::new();
        let notified = Rc::new(Cell::new(0));
        let _sub = {
            let notified = notified.clone();
            store
                .errors_changed()
                .subscribe(move |_| notified.set(notified.get() + 1))
        };

        store.set_errors("Age", ["must be positive"]);
        assert!(store.has_errors());
        assert_eq!(store.errors(Some("Age")), vec![Rc::<str>::from("must be positive")]);

        // Same errors again: nothing changes.
        store.set_errors("Age", ["must be positive"]);
        assert_eq!(notified.get(), 1);

        store.clear("Age");
        store.clear("Age");
        assert_eq!(notified.get(), 2);
        assert!(!store.has_errors());
    }

    #[test]
    fn object_level_errors_use_no_property_name() {
        let store = ErrorStore::new();
        let last = Rc::new(RefCell::new(None));
        let _sub = {
            let last = last.clone();
            store
                .errors_changed()
                .subscribe(move |e: &DataErrorsChanged| *last.borrow_mut() = Some(e.clone()))
        };
        store.add_error("", "invalid record");
        assert_eq!(store.errors(None).len(), 1);
        assert_eq!(last.borrow().as_ref().map(|e| e.property.clone()), Some(None));
    }
}
