//! Binding options.

use strum::{Display, EnumString};

/// Direction of data flow between a binding's source and its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BindingMode {
    /// Resolve once; no change subscriptions are made.
    OneTime,
    /// Follow source changes.
    #[default]
    OneWay,
    /// Follow source changes and write target changes back.
    TwoWay,
    /// Only write target changes back.
    OneWayToSource,
}

impl BindingMode {
    /// Whether path nodes subscribe to their sources' change notifications.
    pub fn listens_for_changes(self) -> bool {
        self != BindingMode::OneTime
    }

    pub fn writes_to_source(self) -> bool {
        matches!(self, BindingMode::TwoWay | BindingMode::OneWayToSource)
    }
}

/// Everything a [`BindingExpression`](crate::BindingExpression) needs besides
/// its source.
///
/// With the `serde` feature the configuration reads from JSON using
/// camel-cased keys:
///
/// ```rust
/// # #[cfg(feature = "serde")] {
/// use floem_databind::{BindingConfig, BindingMode};
///
/// let config = BindingConfig::from_json(
///     r#"{ "path": "Address.City", "mode": "TwoWay", "fallbackValue": "n/a" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.mode, BindingMode::TwoWay);
/// assert!(config.validates_on_notify_data_errors);
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct BindingConfig {
    pub path: String,
    pub mode: BindingMode,
    /// Forward errors reported by error-source objects along the path to the
    /// binding's validation state.
    pub validates_on_notify_data_errors: bool,
    /// Used instead of the resolved value while the path is broken.
    pub fallback_value: Option<serde_json::Value>,
    /// Used instead of a resolved `null`.
    pub target_null_value: Option<serde_json::Value>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            mode: BindingMode::default(),
            validates_on_notify_data_errors: true,
            fallback_value: None,
            target_null_value: None,
        }
    }
}

impl BindingConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: BindingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validates_on_notify_data_errors(mut self, validates: bool) -> Self {
        self.validates_on_notify_data_errors = validates;
        self
    }

    pub fn fallback_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.fallback_value = Some(value.into());
        self
    }

    pub fn target_null_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.target_null_value = Some(value.into());
        self
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid binding configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn only_one_time_skips_change_tracking() {
        assert!(!BindingMode::OneTime.listens_for_changes());
        assert!(BindingMode::OneWay.listens_for_changes());
        assert!(BindingMode::TwoWay.listens_for_changes());
        assert!(BindingMode::OneWayToSource.writes_to_source());
        assert!(!BindingMode::OneWay.writes_to_source());
    }

    #[test]
    fn modes_parse_from_their_names() {
        assert_eq!(BindingMode::from_str("TwoWay"), Ok(BindingMode::TwoWay));
        assert_eq!(BindingMode::OneTime.to_string(), "OneTime");
        assert!(BindingMode::from_str("Sideways").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_configuration_fills_defaults() {
        let config = BindingConfig::from_json(r#"{ "path": "Items[2]" }"#).unwrap();
        assert_eq!(config, BindingConfig::new("Items[2]"));

        let config = BindingConfig::from_json(
            r#"{ "path": "Age", "mode": "OneTime", "validatesOnNotifyDataErrors": false, "targetNullValue": 0 }"#,
        )
        .unwrap();
        assert_eq!(config.mode, BindingMode::OneTime);
        assert!(!config.validates_on_notify_data_errors);
        assert_eq!(config.target_null_value, Some(serde_json::json!(0)));

        assert!(BindingConfig::from_json(r#"{ "mode": "Sideways" }"#).is_err());
    }
}
