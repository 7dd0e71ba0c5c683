//! The links of a path walker's chain.
//!
//! A node resolves one step of the path against its source. Nodes never
//! fail: a link that cannot be resolved is marked broken and yields
//! [`Value::Null`], and resolution continues downstream against that.

use std::{cell::RefCell, fmt, rc::Rc};

use floem_observable::{IndexKey, Indexer, PropertyKey, Subscription, Value};
use smallvec::SmallVec;

use crate::parser::PathStep;

/// The step a node resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The explicit `.` path: the value is the source itself.
    Source,
    /// A named property, optionally scoped to an owner type.
    Standard {
        owner: Option<Rc<str>>,
        name: Rc<str>,
    },
    /// An indexer with its raw, uninterpreted contents.
    Indexed { index: Rc<str> },
    /// Terminal node of the empty path; behaves like [`NodeKind::Source`].
    Fallback,
}

/// Lifecycle of a node. Every source assignment re-enters it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    #[default]
    Unresolved,
    Resolved,
    Broken,
}

/// Why a link could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum BrokenLink {
    /// The source is absent.
    NoSource,
    /// The source is a primitive, so it has no properties or indexer.
    NotAnObject,
    /// The source has no such property.
    MissingProperty,
    /// The source has no indexer.
    NotIndexable,
    /// The index does not fit the source's indexer.
    InvalidIndex,
    /// The indexer has no item at that index.
    OutOfRange,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Resolution {
    Resolved(Value),
    Broken(BrokenLink),
}

impl Resolution {
    fn from_lookup(value: Option<Value>, missing: BrokenLink) -> Self {
        value.map_or(Resolution::Broken(missing), Resolution::Resolved)
    }
}

impl NodeKind {
    pub(crate) fn from_step(step: PathStep<'_>) -> Self {
        match step {
            PathStep::Property { name } => NodeKind::Standard {
                owner: None,
                name: name.into(),
            },
            PathStep::AttachedProperty { owner, name } => NodeKind::Standard {
                owner: Some(owner.into()),
                name: name.into(),
            },
            PathStep::Indexed { index } => NodeKind::Indexed {
                index: index.into(),
            },
        }
    }

    /// The property this node reads, for standard nodes.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            NodeKind::Standard { name, .. } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn property_key(&self) -> Option<PropertyKey<'_>> {
        match self {
            NodeKind::Standard { owner, name } => Some(PropertyKey {
                owner: owner.as_deref(),
                name: &**name,
            }),
            _ => None,
        }
    }

    /// Compute this node's value from `source`. Calls into user objects; the
    /// caller must not hold any chain borrow across it.
    pub(crate) fn resolve(&self, source: &Value) -> Resolution {
        match self {
            NodeKind::Source | NodeKind::Fallback => match source {
                Value::Null => Resolution::Broken(BrokenLink::NoSource),
                source => Resolution::Resolved(source.clone()),
            },
            NodeKind::Standard { .. } => {
                let object = match source {
                    Value::Null => return Resolution::Broken(BrokenLink::NoSource),
                    Value::Object(object) => object,
                    _ => return Resolution::Broken(BrokenLink::NotAnObject),
                };
                let Some(key) = self.property_key() else {
                    return Resolution::Broken(BrokenLink::MissingProperty);
                };
                Resolution::from_lookup(object.property(&key), BrokenLink::MissingProperty)
            }
            NodeKind::Indexed { index } => {
                let object = match source {
                    Value::Null => return Resolution::Broken(BrokenLink::NoSource),
                    Value::Object(object) => object,
                    _ => return Resolution::Broken(BrokenLink::NotAnObject),
                };
                let indexer = object.indexer();
                if indexer == Indexer::None {
                    return Resolution::Broken(BrokenLink::NotIndexable);
                }
                match IndexKey::parse(indexer, index) {
                    Some(key) => Resolution::from_lookup(object.item(&key), BrokenLink::OutOfRange),
                    None => Resolution::Broken(BrokenLink::InvalidIndex),
                }
            }
        }
    }

    /// Subscribe `on_change` to whatever notifications of `source` can
    /// change this node's value. Capabilities are checked first; an object
    /// without them yields no subscription.
    pub(crate) fn subscribe(
        &self,
        source: &Value,
        on_change: Rc<dyn Fn()>,
    ) -> SmallVec<[Subscription; 2]> {
        let mut subscriptions = SmallVec::new();
        let Some(object) = source.as_object() else {
            return subscriptions;
        };

        match self {
            NodeKind::Source | NodeKind::Fallback => {}
            NodeKind::Standard { owner, name } => {
                if let Some(event) = object.property_changed() {
                    let owner = owner.clone();
                    let name = name.clone();
                    subscriptions.push(event.subscribe(move |change| {
                        let key = PropertyKey {
                            owner: owner.as_deref(),
                            name: &*name,
                        };
                        if change.affects(&key) {
                            on_change();
                        }
                    }));
                }
            }
            NodeKind::Indexed { index } => {
                if let Some(event) = object.property_changed() {
                    let on_change = on_change.clone();
                    // Keyed objects report an item change under its key.
                    let key = (object.indexer() == Indexer::Keyed).then(|| index.clone());
                    subscriptions.push(event.subscribe(move |change| {
                        let key_changed = key
                            .as_deref()
                            .is_some_and(|key| change.property.as_deref() == Some(key));
                        if key_changed || change.affects_indexer() {
                            on_change();
                        }
                    }));
                }
                if let Some(event) = object.collection_changed() {
                    subscriptions.push(event.subscribe(move |_| on_change()));
                }
            }
        }
        subscriptions
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => f.write_str("."),
            NodeKind::Standard {
                owner: Some(owner),
                name,
            } => write!(f, "({owner}.{name})"),
            NodeKind::Standard { owner: None, name } => f.write_str(name),
            NodeKind::Indexed { index } => write!(f, "[{index}]"),
            NodeKind::Fallback => Ok(()),
        }
    }
}

#[derive(Default)]
pub(crate) struct NodeState {
    pub(crate) source: Value,
    pub(crate) value: Value,
    pub(crate) status: NodeStatus,
    pub(crate) broken_link: Option<BrokenLink>,
    /// Set while this node is inside `resolve`.
    pub(crate) resolving: bool,
    /// Set when the node was poked again while resolving.
    pub(crate) dirty: bool,
    pub(crate) subscriptions: SmallVec<[Subscription; 2]>,
}

pub(crate) struct PathNode {
    pub(crate) kind: NodeKind,
    pub(crate) state: RefCell<NodeState>,
}

impl PathNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            state: RefCell::new(NodeState::default()),
        }
    }

    pub(crate) fn source(&self) -> Value {
        self.state.borrow().source.clone()
    }

    pub(crate) fn value(&self) -> Value {
        self.state.borrow().value.clone()
    }

    pub(crate) fn is_broken(&self) -> bool {
        self.state.borrow().status == NodeStatus::Broken
    }

    pub(crate) fn snapshot(&self) -> NodeSnapshot {
        let state = self.state.borrow();
        NodeSnapshot {
            kind: self.kind.clone(),
            source: state.source.clone(),
            value: state.value.clone(),
            status: state.status,
            broken_link: state.broken_link,
            subscriptions: state.subscriptions.len(),
        }
    }
}

/// A point-in-time view of one node, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub kind: NodeKind,
    pub source: Value,
    pub value: Value,
    pub status: NodeStatus,
    /// Why the node is broken, when it is.
    pub broken_link: Option<BrokenLink>,
    /// Live change subscriptions the node holds on its source.
    pub subscriptions: usize,
}

#[cfg(test)]
mod tests {
    use floem_observable::{DynObject, ObservableList};

    use super::*;

    fn standard(name: &str) -> NodeKind {
        NodeKind::from_step(PathStep::Property { name })
    }

    fn indexed(index: &str) -> NodeKind {
        NodeKind::from_step(PathStep::Indexed { index })
    }

    #[test]
    fn source_nodes_mirror_their_source() {
        let object = Value::object(DynObject::new("A"));
        assert_eq!(
            NodeKind::Fallback.resolve(&object),
            Resolution::Resolved(object.clone())
        );
        assert_eq!(
            NodeKind::Source.resolve(&Value::Null),
            Resolution::Broken(BrokenLink::NoSource)
        );
        assert_eq!(
            NodeKind::Source.resolve(&Value::Int(3)),
            Resolution::Resolved(Value::Int(3))
        );
    }

    #[test]
    fn standard_nodes_tell_null_from_missing() {
        let object = DynObject::new("Person")
            .with_property("Address", Value::Null)
            .into_value();
        assert_eq!(
            standard("Address").resolve(&object),
            Resolution::Resolved(Value::Null)
        );
        assert_eq!(
            standard("Phone").resolve(&object),
            Resolution::Broken(BrokenLink::MissingProperty)
        );
        assert_eq!(
            standard("Phone").resolve(&Value::from("text")),
            Resolution::Broken(BrokenLink::NotAnObject)
        );
    }

    #[test]
    fn indexed_nodes_follow_the_indexer_kind() {
        let list: ObservableList = ["a", "b", "c"].into_iter().collect();
        let list = list.into_value();
        assert_eq!(
            indexed("2").resolve(&list),
            Resolution::Resolved(Value::from("c"))
        );
        assert_eq!(
            indexed("5").resolve(&list),
            Resolution::Broken(BrokenLink::OutOfRange)
        );
        assert_eq!(
            indexed("x").resolve(&list),
            Resolution::Broken(BrokenLink::InvalidIndex)
        );

        let map = DynObject::new("Map").keyed().with_property("x", 1).into_value();
        assert_eq!(indexed("x").resolve(&map), Resolution::Resolved(Value::Int(1)));

        let plain = DynObject::new("Plain").into_value();
        assert_eq!(
            indexed("0").resolve(&plain),
            Resolution::Broken(BrokenLink::NotIndexable)
        );
    }

    #[test]
    fn display_round_trips_the_step_syntax() {
        assert_eq!(standard("City").to_string(), "City");
        assert_eq!(indexed("2").to_string(), "[2]");
        assert_eq!(
            NodeKind::from_step(PathStep::AttachedProperty {
                owner: "Grid",
                name: "Row"
            })
            .to_string(),
            "(Grid.Row)"
        );
    }
}
