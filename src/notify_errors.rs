//! Forwarding of error-source notifications to a binding's validation state.
//!
//! A walker watches up to three objects for reported errors: the source of
//! the last node, the value of the last node and the value of the node
//! before it. Only objects that expose [`ErrorSource`] are watched, each at
//! most once.
//!
//! [`ErrorSource`]: floem_observable::ErrorSource

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use floem_observable::{DataErrorsChanged, DataObject, Subscription, Value};
use smallvec::SmallVec;

use crate::{host::ValidationSink, walker::Chain};

struct AttachedSource {
    object: Weak<dyn DataObject>,
    _subscription: Subscription,
}

impl AttachedSource {
    fn is(&self, other: &Rc<dyn DataObject>) -> bool {
        self.object
            .upgrade()
            .is_some_and(|object| same_object(&object, other))
    }
}

fn same_object(a: &Rc<dyn DataObject>, b: &Rc<dyn DataObject>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub(crate) struct ErrorBinder {
    sink: Option<Rc<dyn ValidationSink>>,
    attached: RefCell<SmallVec<[AttachedSource; 3]>>,
}

impl ErrorBinder {
    pub(crate) fn new(sink: Option<Rc<dyn ValidationSink>>) -> Self {
        Self {
            sink,
            attached: RefCell::new(SmallVec::new()),
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        !self.attached.borrow().is_empty()
    }

    pub(crate) fn attached_count(&self) -> usize {
        self.attached.borrow().len()
    }

    pub(crate) fn detach(&self) {
        let released = std::mem::take(&mut *self.attached.borrow_mut());
        if !released.is_empty() {
            tracing::trace!(count = released.len(), "released error sources");
        }
        // Subscriptions drop here, after the borrow is gone.
        drop(released);
    }

    /// Watch the current error sources of `chain`. Keeps the existing
    /// subscriptions when the watched objects did not change.
    pub(crate) fn attach(&self, chain: &Rc<Chain>) {
        if self.sink.is_none() {
            return;
        }

        let mut targets: SmallVec<[Rc<dyn DataObject>; 3]> = SmallVec::new();
        for candidate in chain.error_candidates() {
            let Value::Object(object) = candidate else {
                continue;
            };
            if object.as_error_source().is_none() {
                continue;
            }
            if !targets.iter().any(|target| same_object(target, &object)) {
                targets.push(object);
            }
        }

        let unchanged = {
            let attached = self.attached.borrow();
            attached.len() == targets.len()
                && attached
                    .iter()
                    .zip(&targets)
                    .all(|(attached, target)| attached.is(target))
        };
        if unchanged {
            return;
        }

        self.detach();
        let mut attached = SmallVec::new();
        for object in targets {
            let Some(source) = object.as_error_source() else {
                continue;
            };
            let weak_chain = Rc::downgrade(chain);
            let weak_object = Rc::downgrade(&object);
            let subscription = source.errors_changed().subscribe(move |change| {
                let (Some(chain), Some(object)) = (weak_chain.upgrade(), weak_object.upgrade())
                else {
                    return;
                };
                chain.errors().on_errors_changed(&chain, &object, change);
            });
            tracing::debug!(
                path = %chain.path(),
                type_name = object.type_name(),
                "watching error source"
            );
            attached.push(AttachedSource {
                object: Rc::downgrade(&object),
                _subscription: subscription,
            });
        }
        *self.attached.borrow_mut() = attached;
    }

    fn on_errors_changed(
        &self,
        chain: &Chain,
        object: &Rc<dyn DataObject>,
        change: &DataErrorsChanged,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };
        let Some(property) = chain.tail().kind.property_name() else {
            return;
        };
        if change.property.as_deref() != Some(property) {
            return;
        }
        let Some(source) = object.as_error_source() else {
            return;
        };

        let errors = if source.has_errors() {
            source.errors(Some(property))
        } else {
            Vec::new()
        };
        if errors.is_empty() {
            tracing::trace!(property, "validation errors cleared");
            sink.clear_invalid();
        } else {
            tracing::trace!(property, count = errors.len(), "validation errors reported");
            for error in &errors {
                sink.mark_invalid(error);
            }
        }
    }
}
