use crate::manifest::BridgeManifest;
use agentos_protocol::{CoreError, CoreResult, ErrorDomain};
use serde_json::{json, Map, Value};

/// Fill keys missing from `config` with the top-level `properties.*.default`
/// values of `schema`. Non-object configs are returned unchanged.
#[must_use]
pub fn apply_schema_defaults(schema: &Value, config: &Value) -> Value {
    let mut resolved = match config {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    let (Some(target), Some(properties)) = (
        resolved.as_object_mut(),
        schema.get("properties").and_then(Value::as_object),
    ) else {
        return resolved;
    };

    for (key, property) in properties {
        if target.contains_key(key) {
            continue;
        }
        if let Some(default) = property.get("default") {
            target.insert(key.clone(), default.clone());
        }
    }
    resolved
}

/// Resolve defaults and validate `config` against the manifest's config schema.
///
/// Returns the resolved configuration. An invalid schema or a failing config
/// is reported as `VALIDATION` with the validator messages in `details.errors`.
pub fn validate_bridge_config(manifest: &BridgeManifest, config: &Value) -> CoreResult<Value> {
    let resolved = apply_schema_defaults(&manifest.config_schema, config);

    let validator = jsonschema::validator_for(&manifest.config_schema).map_err(|err| {
        CoreError::validation(
            ErrorDomain::Bridge,
            format!("bridge {} declares an invalid config schema", manifest.name),
        )
        .with_details(json!({ "bridge": manifest.name }))
        .with_cause(err)
    })?;

    let errors: Vec<String> = validator
        .iter_errors(&resolved)
        .map(|err| err.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(CoreError::validation(
            ErrorDomain::Bridge,
            format!("invalid config for bridge {}", manifest.name),
        )
        .with_details(json!({ "bridge": manifest.name, "errors": errors })));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentos_protocol::ErrorCode;
    use pretty_assertions::assert_eq;

    fn manifest() -> BridgeManifest {
        BridgeManifest::new("echo", "1.0.0").with_config_schema(json!({
            "type": "object",
            "properties": {
                "model": { "type": "string" },
                "temperature": { "type": "number", "default": 0.7 },
                "stream": { "type": "boolean", "default": false }
            },
            "required": ["model"],
            "additionalProperties": false
        }))
    }

    #[test]
    fn defaults_fill_missing_keys_only() {
        let resolved =
            validate_bridge_config(&manifest(), &json!({ "model": "m", "stream": true })).unwrap();
        assert_eq!(
            resolved,
            json!({ "model": "m", "temperature": 0.7, "stream": true })
        );
    }

    #[test]
    fn null_config_is_an_empty_object() {
        let open = BridgeManifest::new("open", "1");
        assert_eq!(validate_bridge_config(&open, &Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn schema_violations_are_validation_errors() {
        let err =
            validate_bridge_config(&manifest(), &json!({ "model": 3, "extra": 1 })).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        let errors = err.details().unwrap()["errors"].as_array().unwrap();
        assert!(errors.len() >= 2, "{errors:?}");
    }

    #[test]
    fn missing_required_key_fails() {
        let err = validate_bridge_config(&manifest(), &json!({})).unwrap_err();
        assert!(err.is(ErrorCode::Validation));
    }

    #[test]
    fn broken_schema_is_reported() {
        let broken = BridgeManifest::new("broken", "1")
            .with_config_schema(json!({ "type": 12, "pattern": "(" }));
        let err = validate_bridge_config(&broken, &json!({})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }
}
