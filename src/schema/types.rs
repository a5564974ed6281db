//! Setting specification types: value types, constraints, per-key rules

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

// =============================================================================
// Setting Types
// =============================================================================

/// Value type of a setting
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    /// Free-form string
    #[default]
    Text,
    /// Boolean flag
    Toggle,
    /// Whole number
    Integer,
    /// String restricted to a closed option set
    Select,
    /// Nested key/value object
    Map,
}

impl SettingType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            SettingType::Text => "string",
            SettingType::Toggle => "boolean",
            SettingType::Integer => "integer",
            SettingType::Select => "string",
            SettingType::Map => "object",
        }
    }
}

/// Short name of a raw JSON value's type, for error reporting
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Type-Specific Constraints
// =============================================================================

/// Constraints for Integer type settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegerConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// Constraints for Text type settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextConstraints {
    /// Anchored regex pattern the value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

// =============================================================================
// Setting Specification
// =============================================================================

/// Specification of a single recognized setting key
///
/// # Example
///
/// ```
/// use syncgw_config::SettingSpec;
///
/// let port = SettingSpec::integer_required().min(1).max(65535);
/// let level = SettingSpec::select("info", &["error", "warn", "info", "debug"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingSpec {
    /// Value type of the setting
    #[serde(rename = "type")]
    pub setting_type: SettingType,

    /// Default applied when the key is absent; `None` means the key is
    /// either required or genuinely optional
    pub default: Option<Value>,

    /// Whether raw input must supply the key
    pub required: bool,

    /// Options for Select type (required for Select)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// Integer constraints
    #[serde(flatten)]
    pub integer: IntegerConstraints,

    /// Text constraints
    #[serde(flatten)]
    pub text: TextConstraints,
}

impl Default for SettingSpec {
    fn default() -> Self {
        Self {
            setting_type: SettingType::Text,
            default: None,
            required: false,
            options: None,
            integer: IntegerConstraints::default(),
            text: TextConstraints::default(),
        }
    }
}

impl SettingSpec {
    // =========================================================================
    // Type-specific constructors
    // =========================================================================

    /// Text setting with a default value
    pub fn text(default: impl Into<String>) -> Self {
        Self {
            setting_type: SettingType::Text,
            default: Some(Value::String(default.into())),
            ..Default::default()
        }
    }

    /// Text setting the raw input must supply
    #[must_use]
    pub fn text_required() -> Self {
        Self {
            setting_type: SettingType::Text,
            required: true,
            ..Default::default()
        }
    }

    /// Text setting that may be absent, with no default
    #[must_use]
    pub fn text_optional() -> Self {
        Self {
            setting_type: SettingType::Text,
            ..Default::default()
        }
    }

    /// Boolean flag with a default value
    #[must_use]
    pub fn toggle(default: bool) -> Self {
        Self {
            setting_type: SettingType::Toggle,
            default: Some(Value::Bool(default)),
            ..Default::default()
        }
    }

    /// Integer setting with a default value
    #[must_use]
    pub fn integer(default: i64) -> Self {
        Self {
            setting_type: SettingType::Integer,
            default: Some(Value::Number(default.into())),
            ..Default::default()
        }
    }

    /// Integer setting the raw input must supply
    #[must_use]
    pub fn integer_required() -> Self {
        Self {
            setting_type: SettingType::Integer,
            required: true,
            ..Default::default()
        }
    }

    /// Select setting with a closed option set
    ///
    /// **Options are required** at construction time.
    pub fn select(default: impl Into<String>, options: &[&str]) -> Self {
        Self {
            setting_type: SettingType::Select,
            default: Some(Value::String(default.into())),
            options: Some(options.iter().map(|s| (*s).to_string()).collect()),
            ..Default::default()
        }
    }

    /// Optional nested map setting
    #[must_use]
    pub fn map() -> Self {
        Self {
            setting_type: SettingType::Map,
            ..Default::default()
        }
    }

    // =========================================================================
    // Constraint setters (builder pattern)
    // =========================================================================

    /// Set minimum value for Integer type
    #[must_use]
    pub fn min(mut self, val: i64) -> Self {
        self.integer.min = Some(val);
        self
    }

    /// Set maximum value for Integer type
    #[must_use]
    pub fn max(mut self, val: i64) -> Self {
        self.integer.max = Some(val);
        self
    }

    /// Set anchored regex pattern for Text type
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.text.pattern = Some(pattern.into());
        self
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate a raw value against this specification
    ///
    /// Checks type compatibility first, then integer range, text pattern,
    /// or select option membership.
    pub fn check(&self, key: &str, value: &Value) -> Result<(), SchemaError> {
        let mismatch = || SchemaError::TypeMismatch {
            key: key.to_string(),
            expected: self.setting_type.name(),
            actual: value_type(value),
        };
        let invalid = |reason: String| SchemaError::ValidationFailed {
            key: key.to_string(),
            reason,
        };

        match self.setting_type {
            SettingType::Toggle => {
                if !value.is_boolean() {
                    return Err(mismatch());
                }
            }
            SettingType::Integer => {
                let num = value.as_i64().ok_or_else(mismatch)?;
                if let Some(min) = self.integer.min {
                    if num < min {
                        return Err(invalid(format!("must be at least {min}")));
                    }
                }
                if let Some(max) = self.integer.max {
                    if num > max {
                        return Err(invalid(format!("must be at most {max}")));
                    }
                }
            }
            SettingType::Text => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if let Some(ref pattern) = self.text.pattern {
                    let re = regex::Regex::new(pattern)
                        .map_err(|e| invalid(format!("invalid pattern: {e}")))?;
                    if !re.is_match(text) {
                        return Err(invalid(format!("does not match pattern: {pattern}")));
                    }
                }
            }
            SettingType::Select => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if let Some(ref options) = self.options {
                    if !options.iter().any(|opt| opt == text) {
                        return Err(invalid(format!(
                            "must be one of: {}",
                            options.join(", ")
                        )));
                    }
                }
            }
            SettingType::Map => {
                if !value.is_object() {
                    return Err(mismatch());
                }
            }
        }
        Ok(())
    }

    /// Validate the specification itself
    ///
    /// Checks that:
    /// - Select type has options
    /// - Integer range has min <= max
    /// - Pattern is a valid, non-empty regex
    /// - A declared default satisfies the spec's own constraints
    /// - Required keys carry no default
    pub fn validate_spec(&self) -> Result<(), String> {
        if self.setting_type == SettingType::Select && self.options.is_none() {
            return Err("Select type must have options defined".to_string());
        }

        if let (Some(min), Some(max)) = (self.integer.min, self.integer.max) {
            if min > max {
                return Err(format!("min ({min}) cannot be greater than max ({max})"));
            }
        }

        if let Some(ref pattern) = self.text.pattern {
            if pattern.is_empty() {
                return Err("Pattern cannot be empty string".to_string());
            }
            regex::Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {e}"))?;
        }

        if self.required && self.default.is_some() {
            return Err("Required keys cannot carry a default".to_string());
        }

        if let Some(ref default) = self.default {
            self.check("default", default)
                .map_err(|e| format!("Default value is invalid: {e}"))?;
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_range_check() {
        let spec = SettingSpec::integer(143).min(1).max(65535);

        assert!(spec.check("imap.port", &json!(993)).is_ok());
        assert!(spec.check("imap.port", &json!(1)).is_ok());
        assert!(spec.check("imap.port", &json!(65535)).is_ok());

        assert!(spec.check("imap.port", &json!(0)).is_err());
        assert!(spec.check("imap.port", &json!(70000)).is_err());
    }

    #[test]
    fn test_integer_rejects_float_and_string() {
        let spec = SettingSpec::integer(300);

        let err = spec.check("retry", &json!(30.5)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { actual: "float", .. }
        ));

        let err = spec.check("retry", &json!("30")).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { actual: "string", .. }
        ));
    }

    #[test]
    fn test_text_pattern_check() {
        let spec = SettingSpec::text("UTC").pattern(r"^[A-Za-z_]+(/[A-Za-z0-9_+-]+)*$");

        assert!(spec.check("tz", &json!("UTC")).is_ok());
        assert!(spec.check("tz", &json!("America/Sao_Paulo")).is_ok());
        assert!(spec.check("tz", &json!("not a zone!")).is_err());
    }

    #[test]
    fn test_select_membership() {
        let spec = SettingSpec::select("info", &["error", "warn", "info", "debug"]);

        assert!(spec.check("log.level", &json!("debug")).is_ok());
        let err = spec.check("log.level", &json!("verbose")).unwrap_err();
        assert!(matches!(err, SchemaError::ValidationFailed { .. }));
    }

    #[test]
    fn test_toggle_rejects_strings() {
        let spec = SettingSpec::toggle(false);

        assert!(spec.check("flag", &json!(true)).is_ok());
        assert!(spec.check("flag", &json!("true")).is_err());
    }

    #[test]
    fn test_map_accepts_objects_only() {
        let spec = SettingSpec::map();

        assert!(spec.check("smtp.params", &json!({"host": "x"})).is_ok());
        assert!(spec.check("smtp.params", &json!(["host"])).is_err());
    }

    #[test]
    fn test_validate_spec() {
        assert!(SettingSpec::integer(50).min(0).max(100).validate_spec().is_ok());

        // min > max
        assert!(SettingSpec::integer(50).min(100).max(0).validate_spec().is_err());

        // default violates own range
        assert!(SettingSpec::integer(0).min(1).validate_spec().is_err());

        // select without options
        let mut bad = SettingSpec::text("x");
        bad.setting_type = SettingType::Select;
        assert!(bad.validate_spec().is_err());
    }
}
