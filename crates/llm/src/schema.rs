//! Tool definitions and their JSON-Schema parameter descriptions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of JSON Schema the tool catalog needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ParameterSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ParameterSchema {
    fn typed(schema_type: &str, description: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description: description.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn string(description: Option<&str>) -> Self {
        Self::typed("string", description)
    }

    pub fn integer(description: Option<&str>) -> Self {
        Self::typed("integer", description)
    }

    pub fn number(description: Option<&str>) -> Self {
        Self::typed("number", description)
    }

    pub fn boolean(description: Option<&str>) -> Self {
        Self::typed("boolean", description)
    }

    /// String restricted to `values`.
    pub fn string_enum<S: AsRef<str>>(description: Option<&str>, values: &[S]) -> Self {
        Self {
            enum_values: Some(values.iter().map(|v| v.as_ref().to_string()).collect()),
            ..Self::string(description)
        }
    }

    pub fn object(
        description: Option<&str>,
        properties: HashMap<String, ParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            properties: Some(properties),
            required: Some(required),
            ..Self::typed("object", description)
        }
    }

    pub fn array(description: Option<&str>, items: ParameterSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", description)
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Inclusive numeric bounds.
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ParameterSchema,
}
