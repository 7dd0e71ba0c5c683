//! A binding expression: a path walker plus the settings of one binding.
//!
//! The expression is the walker's host. It turns the walker's raw result
//! into the value a target should show, applying the fallback value while
//! the path is broken and the target-null value in place of `null`, and it
//! collects the validation errors reported along the path.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use floem_observable::Value;

use crate::{
    config::{BindingConfig, BindingMode},
    error::WalkerError,
    host::{BindingHost, ValidationSink},
    walker::{Chain, PathWalker},
};

struct ExpressionState {
    mode: BindingMode,
    fallback_value: Value,
    target_null_value: Option<Value>,
    errors: RefCell<Vec<Rc<str>>>,
    on_change: RefCell<Option<Rc<dyn Fn(&Value)>>>,
    chain: RefCell<Weak<Chain>>,
}

impl ExpressionState {
    fn effective_value(&self, broken: bool, value: Value) -> Value {
        if broken {
            return self.fallback_value.clone();
        }
        match (&value, &self.target_null_value) {
            (Value::Null, Some(null_value)) => null_value.clone(),
            _ => value,
        }
    }
}

impl BindingHost for ExpressionState {
    fn value_changed(&self) {
        let chain = self.chain.borrow().upgrade();
        let Some(chain) = chain else {
            return;
        };
        let value = self.effective_value(chain.is_path_broken(), chain.tail().value());
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback(&value);
        }
    }
}

impl ValidationSink for ExpressionState {
    fn mark_invalid(&self, message: &str) {
        let mut errors = self.errors.borrow_mut();
        if !errors.iter().any(|error| &**error == message) {
            errors.push(message.into());
        }
    }

    fn clear_invalid(&self) {
        self.errors.borrow_mut().clear();
    }
}

/// One binding between a source object graph and a target value.
///
/// ```rust
/// use floem_databind::{BindingConfig, BindingExpression, Value};
/// use serde_json::json;
///
/// let person = Value::from_json(json!({ "Address": null }));
/// let binding = BindingExpression::new(
///     BindingConfig::new("Address.City").fallback_value("unknown"),
///     person,
/// )
/// .unwrap();
/// assert!(binding.is_path_broken());
/// assert_eq!(binding.value(), Value::from("unknown"));
/// ```
pub struct BindingExpression {
    walker: PathWalker,
    state: Rc<ExpressionState>,
}

impl BindingExpression {
    pub fn new(config: BindingConfig, source: impl Into<Value>) -> Result<Self, WalkerError> {
        let state = Rc::new(ExpressionState {
            mode: config.mode,
            fallback_value: config
                .fallback_value
                .map(Value::from_json)
                .unwrap_or_default(),
            target_null_value: config.target_null_value.map(Value::from_json),
            errors: RefCell::default(),
            on_change: RefCell::default(),
            chain: RefCell::new(Weak::new()),
        });

        let mut builder = PathWalker::builder(config.path)
            .mode(config.mode)
            .host(state.clone());
        if config.validates_on_notify_data_errors {
            builder = builder.validation_sink(state.clone());
        }
        let walker = builder.build(source)?;
        *state.chain.borrow_mut() = walker.downgrade();

        Ok(Self { walker, state })
    }

    pub fn mode(&self) -> BindingMode {
        self.state.mode
    }

    /// The value the target should show.
    pub fn value(&self) -> Value {
        self.state
            .effective_value(self.walker.is_path_broken(), self.walker.final_value())
    }

    pub fn is_path_broken(&self) -> bool {
        self.walker.is_path_broken()
    }

    /// Call `f` with the new target value whenever it changes.
    pub fn on_value_changed(&self, f: impl Fn(&Value) + 'static) {
        *self.state.on_change.borrow_mut() = Some(Rc::new(f));
    }

    /// Point the binding at a different source object.
    pub fn set_source(&self, source: impl Into<Value>) {
        self.walker.update(source);
    }

    /// Push a target value back into the source graph.
    pub fn update_source(&self, value: impl Into<Value>) -> Result<(), WalkerError> {
        let mode = self.state.mode;
        if !mode.writes_to_source() {
            return Err(WalkerError::ReadOnlyMode { mode });
        }
        self.walker.set_final_value(value)
    }

    /// Errors currently reported for the bound property.
    pub fn validation_errors(&self) -> Vec<Rc<str>> {
        self.state.errors.borrow().clone()
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.state.errors.borrow().is_empty()
    }

    pub fn walker(&self) -> &PathWalker {
        &self.walker
    }

    /// Stop following the source. See [`PathWalker::detach`].
    pub fn detach(&self) {
        self.walker.detach();
    }
}

impl fmt::Debug for BindingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingExpression")
            .field("mode", &self.state.mode)
            .field("walker", &self.walker)
            .field("errors", &self.state.errors.borrow())
            .finish()
    }
}
