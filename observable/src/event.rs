//! Listener registries and the subscriptions that own them.
//!
//! An [`Event`] is the change-notification primitive every observable object in
//! this crate exposes. Subscribing returns a [`Subscription`] handle; the
//! listener stays registered exactly as long as the handle is alive.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Identifies one listener registered on an [`Event`].
    pub struct ListenerId;
}

type Listener<A> = Rc<dyn Fn(&A)>;
type Listeners<A> = RefCell<SlotMap<ListenerId, Listener<A>>>;

/// Type-erased access to a listener table, so a [`Subscription`] does not need
/// to know the argument type of the event it came from.
trait Registry {
    fn remove(&self, id: ListenerId) -> bool;
    fn contains(&self, id: ListenerId) -> bool;
}

impl<A> Registry for Listeners<A> {
    fn remove(&self, id: ListenerId) -> bool {
        self.borrow_mut().remove(id).is_some()
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.borrow().contains_key(id)
    }
}

/// A list of listeners called with a shared reference to `A` on every emit.
pub struct Event<A: 'static> {
    listeners: Rc<Listeners<A>>,
}

impl<A: 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Event");
        s.field("listeners", &self.listener_count());
        s.finish()
    }
}

impl<A: 'static> Event<A> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    /// Register `f`. The listener is removed when the returned handle is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe(&self, f: impl Fn(&A) + 'static) -> Subscription {
        let id = self.listeners.borrow_mut().insert(Rc::new(f));
        let listeners = Rc::downgrade(&self.listeners);
        let registry: Weak<dyn Registry> = listeners;
        Subscription {
            id,
            registry: Some(registry),
        }
    }

    /// Call every listener registered at the time of the call.
    ///
    /// The listener table is not borrowed while a listener runs, so listeners
    /// may subscribe or unsubscribe freely. A listener removed by an earlier
    /// listener of the same emit is skipped.
    pub fn emit(&self, args: &A) {
        let listeners: SmallVec<[(ListenerId, Listener<A>); 4]> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (id, listener.clone()))
            .collect();

        for (id, listener) in listeners {
            if self.listeners.contains(id) {
                listener(args);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Owns one listener registration on an [`Event`].
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    id: ListenerId,
    registry: Option<Weak<dyn Registry>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Subscription");
        s.field("id", &self.id);
        s.field("active", &self.is_active());
        s.finish()
    }
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener is still registered on a live event.
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|registry| registry.contains(self.id))
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().as_ref().and_then(Weak::upgrade) {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
