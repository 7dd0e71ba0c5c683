//! The path walker: a chain of nodes that keeps a path's value current.
//!
//! Node `i + 1`'s source is always node `i`'s value. When a node's value
//! changes, the change is pushed into the next node's source, and so on to
//! the end of the chain, where the owning [`BindingHost`] is told.
//!
//! Every node subscribes to its source before resolving against it, so a
//! change raised while resolving is not lost. Notifications that arrive
//! while a node is resolving mark it dirty and it resolves again, up to
//! [`MAX_RESOLVE_PASSES`] times.
//!
//! ```rust
//! use floem_databind::{PathWalker, Value};
//! use serde_json::json;
//!
//! let person = Value::from_json(json!({ "Address": { "City": "Lyon" } }));
//! let walker = PathWalker::new("Address.City", person, true).unwrap();
//! assert_eq!(walker.final_value(), Value::from("Lyon"));
//! assert!(!walker.is_path_broken());
//! ```

use std::{
    cell::Cell,
    fmt,
    rc::{Rc, Weak},
};

use floem_observable::{IndexKey, Value};
use smallvec::{smallvec, SmallVec};

use crate::{
    config::BindingMode,
    error::WalkerError,
    host::{BindingHost, ValidationSink},
    node::{NodeKind, NodeSnapshot, NodeStatus, PathNode, Resolution},
    notify_errors::ErrorBinder,
    parser::{ParseError, PathParser},
};

/// Upper bound on how often a node re-resolves because it was notified
/// while resolving.
pub const MAX_RESOLVE_PASSES: usize = 16;

pub(crate) struct Chain {
    path: Rc<str>,
    nodes: Box<[PathNode]>,
    listen_for_changes: bool,
    host: Option<Rc<dyn BindingHost>>,
    errors: ErrorBinder,
    initializing: Cell<bool>,
    reroot_depth: Cell<u32>,
    detached: Cell<bool>,
}

impl Chain {
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn errors(&self) -> &ErrorBinder {
        &self.errors
    }

    pub(crate) fn tail(&self) -> &PathNode {
        // A chain always has at least one node.
        &self.nodes[self.nodes.len() - 1]
    }

    fn tail_index(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Objects that may report errors for the bound property.
    pub(crate) fn error_candidates(&self) -> SmallVec<[Value; 3]> {
        let tail = self.tail();
        let parent = match self.nodes.len() {
            1 => tail,
            len => &self.nodes[len - 2],
        };
        smallvec![tail.source(), tail.value(), parent.value()]
    }

    pub(crate) fn is_path_broken(&self) -> bool {
        self.nodes.iter().any(PathNode::is_broken)
    }

    fn notifier(self: &Rc<Self>, index: usize) -> Rc<dyn Fn()> {
        let chain = Rc::downgrade(self);
        Rc::new(move || {
            if let Some(chain) = chain.upgrade() {
                chain.source_notified(index);
            }
        })
    }

    fn source_notified(self: &Rc<Self>, index: usize) {
        if self.detached.get() {
            return;
        }
        tracing::trace!(path = %self.path, node = index, "source changed");
        self.pump(index);
    }

    /// Give node `index` a new source and resolve it.
    fn set_source(self: &Rc<Self>, index: usize, source: Value) {
        let node = &self.nodes[index];
        let released = {
            let mut state = node.state.borrow_mut();
            let replaced = state.status == NodeStatus::Unresolved || state.source != source;
            if replaced {
                state.source = source.clone();
                Some(std::mem::take(&mut state.subscriptions))
            } else {
                None
            }
        };

        let Some(released) = released else {
            self.pump(index);
            return;
        };
        drop(released);

        if self.listen_for_changes && !self.detached.get() {
            let subscriptions = node.kind.subscribe(&source, self.notifier(index));
            node.state.borrow_mut().subscriptions = subscriptions;
        }
        self.pump(index);

        if index == self.tail_index() {
            self.follow_error_sources();
        }
    }

    /// Resolve node `index` against its current source and push a changed
    /// value downstream.
    fn pump(self: &Rc<Self>, index: usize) {
        let node = &self.nodes[index];
        {
            let mut state = node.state.borrow_mut();
            if state.resolving {
                state.dirty = true;
                return;
            }
            state.resolving = true;
        }

        let mut passes = 0;
        let resolution = loop {
            passes += 1;
            let source = {
                let mut state = node.state.borrow_mut();
                state.dirty = false;
                state.source.clone()
            };
            let resolution = node.kind.resolve(&source);
            if !node.state.borrow().dirty {
                break resolution;
            }
            if passes >= MAX_RESOLVE_PASSES {
                tracing::warn!(
                    path = %self.path,
                    node = index,
                    passes,
                    "source keeps changing while resolving, giving up"
                );
                break resolution;
            }
        };

        let (value, status, broken_link) = match resolution {
            Resolution::Resolved(value) => (value, NodeStatus::Resolved, None),
            Resolution::Broken(link) => {
                tracing::trace!(path = %self.path, node = index, %link, "broken link");
                (Value::Null, NodeStatus::Broken, Some(link))
            }
        };

        let changed = {
            let mut state = node.state.borrow_mut();
            state.resolving = false;
            let changed = state.value != value || state.status != status;
            state.value = value.clone();
            state.status = status;
            state.broken_link = broken_link;
            changed
        };

        if index < self.tail_index() {
            // Walkers that do not listen re-read the whole chain on demand.
            if changed || !self.listen_for_changes {
                self.set_source(index + 1, value);
            }
        } else if changed {
            self.tail_changed();
        }
    }

    fn tail_changed(self: &Rc<Self>) {
        if self.initializing.get() {
            return;
        }
        self.follow_error_sources();
        if let Some(host) = &self.host {
            tracing::trace!(path = %self.path, "value changed");
            host.value_changed();
        }
    }

    fn follow_error_sources(self: &Rc<Self>) {
        if self.initializing.get() || self.reroot_depth.get() > 0 || self.detached.get() {
            return;
        }
        self.errors.attach(self);
    }

    fn release(&self) {
        self.errors.detach();
        for node in self.nodes.iter() {
            let released = std::mem::take(&mut node.state.borrow_mut().subscriptions);
            drop(released);
        }
    }
}

fn build_nodes(path: &str) -> Result<Box<[PathNode]>, ParseError> {
    if path.trim() == "." {
        return Ok(Box::new([PathNode::new(NodeKind::Source)]));
    }
    let mut nodes = PathParser::new(path)
        .map(|step| step.map(|step| PathNode::new(NodeKind::from_step(step))))
        .collect::<Result<Vec<_>, _>>()?;
    if nodes.is_empty() {
        nodes.push(PathNode::new(NodeKind::Fallback));
    }
    Ok(nodes.into_boxed_slice())
}

/// Resolves a binding path against a source object and keeps the result
/// current as objects along the path change.
///
/// Dropping the walker releases every subscription it holds.
pub struct PathWalker {
    chain: Rc<Chain>,
}

impl PathWalker {
    /// Build a walker for `path` rooted at `source`.
    ///
    /// Only a malformed path fails; a path that cannot be resolved yields a
    /// walker whose [`is_path_broken`](Self::is_path_broken) is true.
    pub fn new(
        path: &str,
        source: impl Into<Value>,
        listen_for_changes: bool,
    ) -> Result<Self, WalkerError> {
        Self::builder(path)
            .listen_for_changes(listen_for_changes)
            .build(source)
    }

    pub fn builder(path: impl Into<String>) -> WalkerBuilder {
        WalkerBuilder {
            path: path.into(),
            listen_for_changes: true,
            host: None,
            validation_sink: None,
        }
    }

    /// Re-root the walker at a new source.
    ///
    /// Error-source subscriptions are released first and re-established
    /// once the chain has settled on the new source.
    pub fn update(&self, source: impl Into<Value>) {
        let chain = &self.chain;
        if chain.detached.get() {
            tracing::debug!(path = %chain.path, "ignoring update of a detached walker");
            return;
        }
        let source = source.into();
        tracing::trace!(path = %chain.path, source = %source.type_name(), "re-rooting");

        chain.errors.detach();
        chain.reroot_depth.set(chain.reroot_depth.get() + 1);
        chain.set_source(0, source);
        chain.reroot_depth.set(chain.reroot_depth.get() - 1);
        if chain.reroot_depth.get() == 0 && !chain.detached.get() {
            chain.errors.attach(chain);
        }
    }

    /// Whether any link of the path could not be resolved.
    pub fn is_path_broken(&self) -> bool {
        self.chain.is_path_broken()
    }

    /// The resolved value, or [`Value::Null`] when the path is broken.
    pub fn final_value(&self) -> Value {
        self.chain.tail().value()
    }

    /// The object the last step is read from.
    pub fn final_source(&self) -> Value {
        self.chain.tail().source()
    }

    /// The property the last step reads, when it is a property step.
    pub fn final_property(&self) -> Option<&str> {
        self.chain.tail().kind.property_name()
    }

    /// The source the walker is rooted at.
    pub fn first_source(&self) -> Value {
        self.chain.nodes[0].source()
    }

    pub fn listen_for_changes(&self) -> bool {
        self.chain.listen_for_changes
    }

    /// Whether the walker currently forwards error notifications.
    pub fn is_bound_to_notify_error(&self) -> bool {
        self.chain.errors.is_bound()
    }

    /// Number of objects currently watched for error notifications.
    pub fn error_source_count(&self) -> usize {
        self.chain.errors.attached_count()
    }

    pub fn path(&self) -> &str {
        &self.chain.path
    }

    pub fn len(&self) -> usize {
        self.chain.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.nodes.is_empty()
    }

    pub fn nodes(&self) -> Vec<NodeSnapshot> {
        self.chain.nodes.iter().map(PathNode::snapshot).collect()
    }

    pub fn is_detached(&self) -> bool {
        self.chain.detached.get()
    }

    /// Write `value` to the property or item the path ends at.
    pub fn set_final_value(&self, value: impl Into<Value>) -> Result<(), WalkerError> {
        let chain = &self.chain;
        if chain.detached.get() {
            return Err(WalkerError::Detached {
                path: chain.path.to_string(),
            });
        }
        let tail = chain.tail();
        let source = tail.source();
        let object = match (&tail.kind, source.as_object()) {
            (NodeKind::Source | NodeKind::Fallback, _) => {
                return Err(WalkerError::SourceNotWritable {
                    path: chain.path.to_string(),
                })
            }
            (_, None) => {
                return Err(WalkerError::PathBroken {
                    path: chain.path.to_string(),
                })
            }
            (_, Some(object)) => object.clone(),
        };

        let value = value.into();
        match &tail.kind {
            NodeKind::Indexed { index } => {
                let indexer = object.indexer();
                match IndexKey::parse(indexer, index) {
                    Some(key) => object.set_item(&key, value)?,
                    // Let the object report why it cannot take this index.
                    None => object.set_item(&IndexKey::Key(index), value)?,
                }
            }
            kind => {
                if let Some(key) = kind.property_key() {
                    object.set_property(&key, value)?;
                }
            }
        }

        if !chain.listen_for_changes {
            chain.pump(chain.tail_index());
        }
        Ok(())
    }

    /// Release every subscription. The walker stays readable but no longer
    /// follows changes, and [`update`](Self::update) is ignored.
    pub fn detach(&self) {
        if self.chain.detached.replace(true) {
            return;
        }
        self.chain.release();
        tracing::debug!(path = %self.chain.path, "detached");
    }

    pub(crate) fn downgrade(&self) -> Weak<Chain> {
        Rc::downgrade(&self.chain)
    }
}

impl fmt::Debug for PathWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathWalker")
            .field("path", &self.chain.path)
            .field("listen_for_changes", &self.chain.listen_for_changes)
            .field("detached", &self.chain.detached.get())
            .field("nodes", &self.nodes())
            .finish()
    }
}

/// Configures a [`PathWalker`] before it resolves for the first time.
pub struct WalkerBuilder {
    path: String,
    listen_for_changes: bool,
    host: Option<Rc<dyn BindingHost>>,
    validation_sink: Option<Rc<dyn ValidationSink>>,
}

impl WalkerBuilder {
    pub fn listen_for_changes(mut self, listen: bool) -> Self {
        self.listen_for_changes = listen;
        self
    }

    pub fn mode(self, mode: BindingMode) -> Self {
        self.listen_for_changes(mode.listens_for_changes())
    }

    pub fn host(mut self, host: Rc<dyn BindingHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Forward errors reported along the path to `sink`.
    pub fn validation_sink(mut self, sink: Rc<dyn ValidationSink>) -> Self {
        self.validation_sink = Some(sink);
        self
    }

    pub fn build(self, source: impl Into<Value>) -> Result<PathWalker, WalkerError> {
        let nodes = build_nodes(&self.path)?;
        let chain = Rc::new(Chain {
            path: self.path.into(),
            nodes,
            listen_for_changes: self.listen_for_changes,
            host: self.host,
            errors: ErrorBinder::new(self.validation_sink),
            initializing: Cell::new(true),
            reroot_depth: Cell::new(0),
            detached: Cell::new(false),
        });

        chain.set_source(0, source.into());
        chain.initializing.set(false);
        chain.errors.attach(&chain);

        tracing::debug!(
            path = %chain.path,
            nodes = chain.nodes.len(),
            broken = chain.is_path_broken(),
            "built path walker"
        );
        Ok(PathWalker { chain })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use floem_observable::{DataObject, DynObject, ObservableList};
    use serde_json::json;

    use super::*;

    fn person() -> (Rc<DynObject>, Rc<DynObject>) {
        let address = Rc::new(DynObject::new("Address").with_property("City", "Lyon"));
        let person = Rc::new(DynObject::new("Person").with_property("Address", address.clone()));
        (person, address)
    }

    fn listeners(object: &DynObject) -> usize {
        object
            .property_changed()
            .map_or(0, |event| event.listener_count())
    }

    fn counter() -> (Rc<Cell<usize>>, Rc<dyn BindingHost>) {
        let count = Rc::new(Cell::new(0));
        let host: Rc<dyn BindingHost> = {
            let count = count.clone();
            Rc::new(move || count.set(count.get() + 1))
        };
        (count, host)
    }

    #[test]
    fn dot_and_empty_paths_bind_to_the_source() {
        let source = Value::from_json(json!({ "A": 1 }));

        let dot = PathWalker::new(".", source.clone(), true).unwrap();
        assert_eq!(dot.nodes()[0].kind, NodeKind::Source);
        assert_eq!(dot.final_value(), source);

        let empty = PathWalker::new("", source.clone(), true).unwrap();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.nodes()[0].kind, NodeKind::Fallback);
        assert_eq!(empty.final_value(), source);
        assert!(!empty.is_path_broken());
    }

    #[test]
    fn malformed_paths_fail_to_build() {
        let err = PathWalker::new("Items[2", Value::Null, true).unwrap_err();
        assert!(matches!(err, WalkerError::Parse(_)));
    }

    #[test]
    fn every_node_subscribes_to_its_own_source() {
        let (person, address) = person();
        let walker = PathWalker::new("Address.City", person.clone(), true).unwrap();

        let nodes = walker.nodes();
        assert_eq!(nodes[0].subscriptions, 1);
        assert_eq!(nodes[1].subscriptions, 1);
        assert_eq!(nodes[1].source, Value::from(address.clone()));
        assert_eq!(nodes[0].value, nodes[1].source);
    }

    #[test]
    fn host_hears_changes_but_not_construction() {
        let (person, address) = person();
        let (count, host) = counter();
        let walker = PathWalker::builder("Address.City")
            .host(host)
            .build(person.clone())
            .unwrap();
        assert_eq!(count.get(), 0);

        address.set("City", "Paris");
        assert_eq!(walker.final_value(), Value::from("Paris"));
        assert_eq!(count.get(), 1);

        // Same value, no notification.
        address.set("City", "Paris");
        address.notify_all();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn intermediate_changes_move_downstream_subscriptions() {
        let (person, old_address) = person();
        let walker = PathWalker::new("Address.City", person.clone(), true).unwrap();

        let new_address = Rc::new(DynObject::new("Address").with_property("City", "Nice"));
        person.set("Address", new_address.clone());
        assert_eq!(walker.final_value(), Value::from("Nice"));

        old_address.set("City", "Lille");
        assert_eq!(walker.final_value(), Value::from("Nice"));
        assert_eq!(listeners(&old_address), 0);

        new_address.set("City", "Metz");
        assert_eq!(walker.final_value(), Value::from("Metz"));
    }

    #[test]
    fn one_time_walkers_do_not_subscribe() {
        let (person, address) = person();
        let walker = PathWalker::builder("Address.City")
            .mode(BindingMode::OneTime)
            .build(person.clone())
            .unwrap();
        assert!(!walker.listen_for_changes());
        assert!(walker.nodes().iter().all(|node| node.subscriptions == 0));

        address.set("City", "Paris");
        assert_eq!(walker.final_value(), Value::from("Lyon"));

        // Re-rooting at the same source re-reads the whole chain.
        walker.update(person.clone());
        assert_eq!(walker.final_value(), Value::from("Paris"));
    }

    #[test]
    fn detach_is_terminal() {
        let (person, address) = person();
        let (count, host) = counter();
        let walker = PathWalker::builder("Address.City")
            .host(host)
            .build(person.clone())
            .unwrap();

        walker.detach();
        walker.detach();
        assert!(walker.is_detached());
        assert_eq!(listeners(&address), 0);
        assert_eq!(listeners(&person), 0);

        address.set("City", "Paris");
        walker.update(Value::Null);
        assert_eq!(count.get(), 0);
        assert_eq!(walker.final_value(), Value::from("Lyon"));
        assert!(matches!(
            walker.set_final_value("Nice"),
            Err(WalkerError::Detached { .. })
        ));
    }

    #[test]
    fn writes_go_to_the_last_link() {
        let (person, address) = person();
        let walker = PathWalker::new("Address.City", person, true).unwrap();
        walker.set_final_value("Nice").unwrap();
        assert_eq!(address.get("City"), Some(Value::from("Nice")));
        assert_eq!(walker.final_value(), Value::from("Nice"));

        let list: Rc<ObservableList> = Rc::new(["a", "b"].into_iter().collect());
        let walker = PathWalker::new("[1]", list.clone(), false).unwrap();
        walker.set_final_value("z").unwrap();
        assert_eq!(walker.final_value(), Value::from("z"));
        assert!(walker.set_final_value("x").is_ok());
        assert!(matches!(
            PathWalker::new("[7]", list, false)
                .unwrap()
                .set_final_value("x"),
            Err(WalkerError::Write(_))
        ));

        let walker = PathWalker::new(".", Value::from(1), true).unwrap();
        assert!(matches!(
            walker.set_final_value(2),
            Err(WalkerError::SourceNotWritable { .. })
        ));

        let walker = PathWalker::new("Address.City", Value::Null, true).unwrap();
        assert!(matches!(
            walker.set_final_value("x"),
            Err(WalkerError::PathBroken { .. })
        ));
    }

    #[test]
    fn resolving_twice_when_notified_mid_resolution() {
        // An object whose getter changes another property it is observed by.
        struct Restless {
            inner: DynObject,
            reads: Cell<usize>,
        }

        impl DataObject for Restless {
            fn type_name(&self) -> &str {
                "Restless"
            }

            fn property(&self, key: &floem_observable::PropertyKey<'_>) -> Option<Value> {
                let reads = self.reads.get() + 1;
                self.reads.set(reads);
                if reads == 1 {
                    self.inner.set("Value", 2);
                }
                self.inner.property(key)
            }

            fn property_changed(
                &self,
            ) -> Option<&floem_observable::Event<floem_observable::PropertyChanged>> {
                self.inner.property_changed()
            }
        }

        let restless = Rc::new(Restless {
            inner: DynObject::new("Inner").with_property("Value", 1),
            reads: Cell::new(0),
        });
        let walker = PathWalker::new("Value", restless.clone(), true).unwrap();
        assert_eq!(walker.final_value(), Value::Int(2));
        assert_eq!(restless.reads.get(), 2);
    }

    #[test]
    fn hosts_may_read_the_walker_while_notified() {
        let (person, address) = person();
        let seen: Rc<RefCell<Vec<Value>>> = Rc::default();
        let cell: Rc<RefCell<Option<Weak<Chain>>>> = Rc::default();
        let host = {
            let seen = seen.clone();
            let cell = cell.clone();
            Rc::new(move || {
                let chain = cell.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(chain) = chain {
                    seen.borrow_mut().push(chain.tail().value());
                }
            })
        };
        let walker = PathWalker::builder("Address.City")
            .host(host)
            .build(person)
            .unwrap();
        *cell.borrow_mut() = Some(walker.downgrade());

        address.set("City", "Paris");
        assert_eq!(*seen.borrow(), vec![Value::from("Paris")]);
    }
}
