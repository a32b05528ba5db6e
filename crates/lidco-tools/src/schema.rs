//! Argument validation against a tool's JSON schema
//!
//! Supports the subset tools actually declare: an object root, `required`,
//! per-property `type` (single or list) and `enum`. Unknown keywords are
//! ignored.

use crate::error::{Error, Result};
use serde_json::Value;

/// Validate `args` against `schema`
pub fn validate(schema: &Value, args: &Value) -> Result<()> {
    if let Some(expected) = schema.get("type") {
        if !type_matches(expected, args) {
            return Err(Error::InvalidArguments(format!(
                "expected {}, got {}",
                render_type(expected),
                json_type_name(args)
            )));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if obj.get(name).map_or(true, Value::is_null) {
                return Err(Error::InvalidArguments(format!(
                    "missing required field '{name}'"
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, value) in obj {
        let Some(prop) = properties.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(expected) = prop.get("type") {
            if !type_matches(expected, value) {
                return Err(Error::InvalidArguments(format!(
                    "field '{name}' must be {}, got {}",
                    render_type(expected),
                    json_type_name(value)
                )));
            }
        }
        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(Error::InvalidArguments(format!(
                    "field '{name}' must be one of {}",
                    Value::Array(allowed.clone())
                )));
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => single_type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| single_type_matches(name, value)),
        _ => true,
    }
}

fn single_type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn render_type(expected: &Value) -> String {
    match expected {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "limit": {"type": "integer"},
                "mode": {"type": "string", "enum": ["fast", "full"]}
            },
            "required": ["path"]
        })
    }

    #[test]
    fn test_valid_arguments() {
        assert!(validate(&schema(), &json!({"path": "a.rs", "limit": 10})).is_ok());
        assert!(validate(&schema(), &json!({"path": "a.rs", "extra": true})).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = validate(&schema(), &json!({"limit": 3})).unwrap_err();
        assert!(err.to_string().contains("missing required field 'path'"));
    }

    #[test]
    fn test_wrong_property_type() {
        let err = validate(&schema(), &json!({"path": "a", "limit": "ten"})).unwrap_err();
        assert!(err.to_string().contains("field 'limit' must be integer"));
    }

    #[test]
    fn test_float_is_not_integer() {
        assert!(validate(&schema(), &json!({"path": "a", "limit": 1.5})).is_err());
    }

    #[test]
    fn test_enum() {
        assert!(validate(&schema(), &json!({"path": "a", "mode": "fast"})).is_ok());
        assert!(validate(&schema(), &json!({"path": "a", "mode": "slow"})).is_err());
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(validate(&schema(), &json!("a.rs")).is_err());
    }
}
