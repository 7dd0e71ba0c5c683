//! # Floem Databind
//! Floem Databind resolves binding paths such as `Address.City` or `Items[2]` against an object
//! graph and keeps the result current while the graph changes.
//!
//! ## Example: following a path
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use floem_databind::{DynObject, PathWalker, Value};
//!
//! let address = Rc::new(DynObject::new("Address").with_property("City", "Lyon"));
//! let person = Rc::new(DynObject::new("Person").with_property("Address", address.clone()));
//!
//! let changes = Rc::new(Cell::new(0));
//! let walker = PathWalker::builder("Address.City")
//!     .host(Rc::new({
//!         let changes = changes.clone();
//!         move || changes.set(changes.get() + 1)
//!     }))
//!     .build(person)
//!     .unwrap();
//! assert_eq!(walker.final_value(), Value::from("Lyon"));
//!
//! address.set("City", "Paris");
//! assert_eq!(walker.final_value(), Value::from("Paris"));
//! assert_eq!(changes.get(), 1);
//! ```
//!
//! ## Paths
//! A path is parsed by the [`parser`] into steps: properties (`Name`), attached properties
//! qualified by their owner type (`(Grid.Row)`) and indexers (`[2]`, `[key]`). Each step
//! becomes a node of a [`PathWalker`]. Node `i + 1` reads from node `i`'s value, and every node
//! subscribes to the change notifications of the object it reads from, so a change anywhere
//! along the path re-resolves the rest of it.
//!
//! A path that cannot be resolved is not an error. The walker reports it through
//! [`PathWalker::is_path_broken`] and resolves to [`Value::Null`]. Only a malformed path fails,
//! with a [`ParseError`].
//!
//! ## Objects
//! The object model lives in the [`observable`] crate. Any type implementing
//! [`DataObject`] can sit on a path. [`DynObject`] and [`ObservableList`] are ready-made
//! observable objects, and [`Value::from_json`] builds a graph of them from JSON.
//!
//! ## Validation
//! Objects that report validation errors ([`ErrorSource`]) are watched when a walker has a
//! [`ValidationSink`]. Errors reported for the property the path ends at are forwarded to the
//! sink.
//!
//! ## Bindings
//! [`BindingExpression`] packages a walker with a [`BindingConfig`]: binding mode, fallback and
//! target-null values, and the validation state.

mod config;
mod error;
mod expression;
mod host;
pub mod node;
mod notify_errors;
pub mod parser;
mod walker;

pub use floem_observable as observable;

pub use config::{BindingConfig, BindingMode};
#[cfg(feature = "serde")]
pub use config::ConfigError;
pub use error::WalkerError;
pub use expression::BindingExpression;
pub use host::{BindingHost, ValidationSink};
pub use node::{BrokenLink, NodeKind, NodeSnapshot, NodeStatus};
pub use parser::{ParseError, ParseErrorKind, PathParser, PathStep, StepKind};
pub use walker::{PathWalker, WalkerBuilder, MAX_RESOLVE_PASSES};

pub use floem_observable::{
    DataObject, DynObject, ErrorSource, ErrorStore, ObservableList, PropertyKey, Value,
    WriteError,
};
