use agentos_protocol::{CoreError, CoreResult, ErrorDomain};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

fn open_object_schema() -> Value {
    json!({ "type": "object" })
}

/// Declarative descriptor of a bridge implementation, independent of any instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeManifest {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// JSON Schema for the bridge configuration
    #[serde(default = "open_object_schema")]
    pub config_schema: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BridgeManifest {
    /// Manifest accepting any object as configuration
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            capabilities: Vec::new(),
            config_schema: open_object_schema(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_config_schema(mut self, schema: Value) -> Self {
        self.config_schema = schema;
        self
    }

    /// Derive the config schema from a typed configuration struct.
    pub fn with_config_type<C: JsonSchema>(self) -> CoreResult<Self> {
        Ok(self.with_config_schema(config_schema_for::<C>()?))
    }
}

/// JSON Schema for `C`, as stored in [`BridgeManifest::config_schema`]
pub fn config_schema_for<C: JsonSchema>() -> CoreResult<Value> {
    serde_json::to_value(schemars::schema_for!(C)).map_err(|err| {
        CoreError::internal(ErrorDomain::Bridge, "failed to encode config schema").with_cause(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct SampleConfig {
        model: String,
        temperature: Option<f64>,
    }

    #[test]
    fn missing_schema_defaults_to_open_object() {
        let manifest: BridgeManifest =
            serde_json::from_value(json!({ "name": "echo", "vendor": "acme" })).unwrap();
        assert_eq!(manifest.config_schema, json!({ "type": "object" }));
        assert_eq!(manifest.extra["vendor"], "acme");
        assert_eq!(manifest.version, "");
    }

    #[test]
    fn typed_config_schema_lists_properties() {
        let manifest = BridgeManifest::new("echo", "1.0.0")
            .with_config_type::<SampleConfig>()
            .unwrap();
        let properties = manifest.config_schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("model"));
        assert!(properties.contains_key("temperature"));
        assert_eq!(manifest.config_schema["required"], json!(["model"]));
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(BridgeManifest::new("echo", "1")).unwrap();
        assert!(value.get("configSchema").is_some());
    }
}
