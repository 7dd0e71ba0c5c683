/// A write through [`DataObject::set_property`] or [`DataObject::set_item`]
/// that the object refused.
///
/// [`DataObject::set_property`]: crate::DataObject::set_property
/// [`DataObject::set_item`]: crate::DataObject::set_item
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("property `{property}` of `{type_name}` is read-only")]
    ReadOnly { type_name: String, property: String },
    #[error("`{type_name}` has no property `{property}`")]
    MissingProperty { type_name: String, property: String },
    #[error("`{type_name}` is not indexable")]
    NotIndexable { type_name: String },
    #[error("index {index} is out of range for a collection of {len} items")]
    OutOfRange { index: usize, len: usize },
    #[error("`{index}` is not a valid index for `{type_name}`")]
    InvalidIndex { type_name: String, index: String },
}
