/// Parameter schema validation
///
/// A `ParameterSpec` describes one typed, named input. The same validator is applied
/// to integration credentials and to task arguments: each `ParameterKind` owns its
/// parse rule, unknown keys are rejected, and required values must be present and
/// non-empty.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Ordered key/value bag used for credentials and task params
pub type ParamMap = IndexMap<String, Value>;

/// Supported parameter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    /// Same wire shape as `String`, flagged so it is never echoed back
    Password,
}

impl ParameterKind {
    /// Parse a raw value into the canonical JSON representation for this kind.
    ///
    /// Numbers and booleans are accepted in their native JSON form or as their
    /// textual form (form inputs arrive as strings). Anything else is a mismatch.
    pub fn coerce(self, value: &Value) -> Result<Value, String> {
        match self {
            ParameterKind::String | ParameterKind::Password => match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(format!("expected string, got {}", json_type_name(other))),
            },
            ParameterKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => {
                    let text = s.trim();
                    // integers stay exact so connectors can use them as ids
                    text.parse::<i64>()
                        .map(Value::from)
                        .ok()
                        .or_else(|| {
                            text.parse::<f64>()
                                .ok()
                                .filter(|n| n.is_finite())
                                .and_then(serde_json::Number::from_f64)
                                .map(Value::Number)
                        })
                        .ok_or_else(|| format!("expected number, got '{}'", s))
                }
                other => Err(format!("expected number, got {}", json_type_name(other))),
            },
            ParameterKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(format!("expected boolean, got '{}'", s)),
                },
                other => Err(format!("expected boolean, got {}", json_type_name(other))),
            },
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::String => "string",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Password => "password",
        };
        f.write_str(name)
    }
}

/// A single typed input declared by an integration type or a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

fn default_required() -> bool {
    true
}

/// One reason a value bag failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    MissingRequired { name: String },
    TypeMismatch { name: String, detail: String },
    UnknownParameter { name: String },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::MissingRequired { name } => {
                write!(f, "missing required parameter '{}'", name)
            }
            SchemaViolation::TypeMismatch { name, detail } => {
                write!(f, "parameter '{}': {}", name, detail)
            }
            SchemaViolation::UnknownParameter { name } => {
                write!(f, "unknown parameter '{}'", name)
            }
        }
    }
}

/// All violations found in one value bag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_violations(.0))]
pub struct SchemaError(pub Vec<SchemaViolation>);

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structural problems in a schema definition itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaDefinitionError {
    #[error("parameter name must not be empty")]
    EmptyName,
    #[error("parameter '{0}' declared more than once")]
    DuplicateName(String),
}

/// Check that a schema has non-empty, unique parameter names
pub fn check_definition(specs: &[ParameterSpec]) -> Result<(), SchemaDefinitionError> {
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(SchemaDefinitionError::EmptyName);
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(SchemaDefinitionError::DuplicateName(spec.name.clone()));
        }
    }
    Ok(())
}

/// Validate a value bag against a schema.
///
/// Returns the coerced values in schema order. Optional parameters that are absent
/// (or null/empty) are omitted from the result.
pub fn validate_values(specs: &[ParameterSpec], values: &ParamMap) -> Result<ParamMap, SchemaError> {
    let mut violations = Vec::new();
    let mut validated = ParamMap::new();

    for spec in specs {
        match values.get(&spec.name) {
            Some(value) if !is_empty_value(value) => match spec.kind.coerce(value) {
                Ok(coerced) => {
                    validated.insert(spec.name.clone(), coerced);
                }
                Err(detail) => violations.push(SchemaViolation::TypeMismatch {
                    name: spec.name.clone(),
                    detail,
                }),
            },
            _ if spec.required => violations.push(SchemaViolation::MissingRequired {
                name: spec.name.clone(),
            }),
            _ => {}
        }
    }

    for key in values.keys() {
        if !specs.iter().any(|spec| &spec.name == key) {
            violations.push(SchemaViolation::UnknownParameter { name: key.clone() });
        }
    }

    if violations.is_empty() {
        Ok(validated)
    } else {
        Err(SchemaError(violations))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, kind: ParameterKind, required: bool) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            kind,
            required,
            description: String::new(),
        }
    }

    fn params(value: Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_accepts_valid_values_in_schema_order() {
        let schema = vec![
            spec("url", ParameterKind::String, true),
            spec("retries", ParameterKind::Number, false),
            spec("verbose", ParameterKind::Boolean, false),
        ];
        let validated = validate_values(
            &schema,
            &params(json!({"verbose": "true", "retries": "3", "url": "https://x"})),
        )
        .unwrap();

        let keys: Vec<&str> = validated.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["url", "retries", "verbose"]);
        assert_eq!(validated["retries"], json!(3));
        assert_eq!(validated["verbose"], json!(true));
    }

    #[test]
    fn test_reports_missing_required_and_empty_strings() {
        let schema = vec![
            spec("token", ParameterKind::Password, true),
            spec("user", ParameterKind::String, true),
        ];
        let err = validate_values(&schema, &params(json!({"user": "  "}))).unwrap_err();
        assert_eq!(
            err.0,
            vec![
                SchemaViolation::MissingRequired { name: "token".into() },
                SchemaViolation::MissingRequired { name: "user".into() },
            ]
        );
    }

    #[test]
    fn test_rejects_non_numeric_number_without_coercing() {
        let schema = vec![spec("port", ParameterKind::Number, true)];
        let err = validate_values(&schema, &params(json!({"port": "eighty"}))).unwrap_err();
        assert!(matches!(err.0[0], SchemaViolation::TypeMismatch { .. }));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_large_integers_keep_their_precision() {
        assert_eq!(
            ParameterKind::Number.coerce(&json!("9007199254740993")).unwrap(),
            json!(9007199254740993i64)
        );
        assert_eq!(ParameterKind::Number.coerce(&json!(" -42 ")).unwrap(), json!(-42));
        assert_eq!(ParameterKind::Number.coerce(&json!("2.5")).unwrap(), json!(2.5));
        assert!(ParameterKind::Number.coerce(&json!("NaN")).is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let schema = vec![spec("a", ParameterKind::String, false)];
        let err = validate_values(&schema, &params(json!({"b": "x"}))).unwrap_err();
        assert_eq!(err.0, vec![SchemaViolation::UnknownParameter { name: "b".into() }]);
    }

    #[test]
    fn test_definition_check_catches_duplicates() {
        let schema = vec![
            spec("a", ParameterKind::String, true),
            spec("a", ParameterKind::Number, false),
        ];
        assert_eq!(
            check_definition(&schema),
            Err(SchemaDefinitionError::DuplicateName("a".into()))
        );
    }

    #[test]
    fn test_parameter_deserializes_with_defaults() {
        let parsed: ParameterSpec = serde_json::from_value(json!({"name": "x", "type": "password"})).unwrap();
        assert!(parsed.required);
        assert_eq!(parsed.kind, ParameterKind::Password);
    }
}
