//! What a path walker reports to, and what it forwards validation errors to.

/// The binding that owns a [`PathWalker`](crate::PathWalker).
///
/// Called after the value at the end of the path changed, once the whole
/// chain has settled. The host pulls the new value from the walker.
pub trait BindingHost {
    fn value_changed(&self);
}

impl<F: Fn()> BindingHost for F {
    fn value_changed(&self) {
        self()
    }
}

/// Receives validation errors reported by error-source objects on the path.
pub trait ValidationSink {
    fn mark_invalid(&self, message: &str);
    fn clear_invalid(&self);
}
