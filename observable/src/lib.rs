//! # Floem Observable
//!
//! The object model Floem data bindings walk through.
//!
//! A binding path such as `Address.City` is resolved against [`Value`]s. A
//! value is either a primitive or an object implementing [`DataObject`], the
//! trait through which an object optionally exposes properties, an indexer,
//! change notification and the error-reporting capability ([`ErrorSource`]).
//!
//! Change notification is built on [`Event`]: a listener table where each
//! registration is owned by a [`Subscription`] handle. Dropping the handle
//! unsubscribes, so a binding only has to drop what it holds to release an
//! object.
//!
//! Two ready-made observable objects cover most sources: [`DynObject`], a
//! property bag, and [`ObservableList`], a positional collection. Both can be
//! built from JSON with [`Value::from_json`].
//!
//! ```rust
//! use floem_observable::{DataObject, PropertyKey, Value};
//! use serde_json::json;
//!
//! let person = Value::from_json(json!({ "Name": "Ada" }));
//! let name = person
//!     .as_object()
//!     .and_then(|object| object.property(&PropertyKey::new("Name")));
//! assert_eq!(name, Some(Value::from("Ada")));
//! ```

mod dyn_object;
mod error;
mod error_store;
mod event;
mod id;
mod json;
mod list;
mod object;
mod value;

pub use dyn_object::DynObject;
pub use error::WriteError;
pub use error_store::ErrorStore;
pub use event::{Event, ListenerId, Subscription};
pub use id::ObjectId;
pub use json::JSON_OBJECT_TYPE;
pub use list::ObservableList;
pub use object::{
    CollectionChanged, DataErrorsChanged, DataObject, ErrorSource, IndexKey, Indexer,
    PropertyChanged, PropertyKey, COUNT_PROPERTY, INDEXER_PROPERTY,
};
pub use value::Value;
