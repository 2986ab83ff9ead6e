//! Action parameter and descriptor types.
//!
//! An action's parameters are declared as a list of [`Parameter`]s and sent to
//! backends as a JSON Schema object built by [`parameters_to_json_schema`].
//! [`ActionDescriptor`] is the handler-less shape that adapters consume and
//! that clients declare.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Declared type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterType {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "number[]")]
    NumberArray,
    #[serde(rename = "boolean[]")]
    BooleanArray,
    #[serde(rename = "object[]")]
    ObjectArray,
}

/// A single named parameter of an action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters are required unless explicitly marked `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Allowed values for string parameters.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Nested attributes for `object` and `object[]` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Parameter>>,
}

impl Parameter {
    /// A required string parameter.
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterType::String,
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn is_required(&self) -> bool {
        self.required != Some(false)
    }
}

/// Build the JSON Schema object describing a parameter list.
pub fn parameters_to_json_schema(parameters: &[Parameter]) -> Value {
    let (properties, required) = object_members(parameters);
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn object_members(parameters: &[Parameter]) -> (Map<String, Value>, Vec<String>) {
    let properties = parameters
        .iter()
        .map(|p| (p.name.clone(), parameter_schema(p)))
        .collect();
    let required = parameters
        .iter()
        .filter(|p| p.is_required())
        .map(|p| p.name.clone())
        .collect();
    (properties, required)
}

fn parameter_schema(parameter: &Parameter) -> Value {
    let mut schema = Map::new();
    match parameter.kind {
        ParameterType::String => {
            schema.insert("type".into(), json!("string"));
            if let Some(values) = &parameter.enum_values {
                schema.insert("enum".into(), json!(values));
            }
        }
        ParameterType::Number => {
            schema.insert("type".into(), json!("number"));
        }
        ParameterType::Boolean => {
            schema.insert("type".into(), json!("boolean"));
        }
        ParameterType::Object => {
            schema.insert("type".into(), json!("object"));
            extend_object(&mut schema, parameter.attributes.as_deref());
        }
        ParameterType::ObjectArray => {
            let mut items = Map::new();
            items.insert("type".into(), json!("object"));
            extend_object(&mut items, parameter.attributes.as_deref());
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), Value::Object(items));
        }
        ParameterType::StringArray => array_of(&mut schema, "string"),
        ParameterType::NumberArray => array_of(&mut schema, "number"),
        ParameterType::BooleanArray => array_of(&mut schema, "boolean"),
    }
    if let Some(description) = &parameter.description {
        schema.insert("description".into(), json!(description));
    }
    Value::Object(schema)
}

fn array_of(schema: &mut Map<String, Value>, item_type: &str) {
    schema.insert("type".into(), json!("array"));
    schema.insert("items".into(), json!({ "type": item_type }));
}

fn extend_object(schema: &mut Map<String, Value>, attributes: Option<&[Parameter]>) {
    let Some(attributes) = attributes else {
        return;
    };
    let (properties, required) = object_members(attributes);
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
}

/// Handler-less description of an action, as sent to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the action's arguments.
    #[serde(default = "empty_object_schema")]
    pub json_schema: Value,
}

fn empty_object_schema() -> Value {
    parameters_to_json_schema(&[])
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, json_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            json_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_marks_required_unless_false() {
        let params = vec![
            Parameter::string("query", "Search query"),
            Parameter {
                name: "limit".to_string(),
                kind: ParameterType::Number,
                required: Some(false),
                ..Default::default()
            },
        ];

        let schema = parameters_to_json_schema(&params);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["query"]["description"], "Search query");
        assert_eq!(schema["properties"]["limit"]["type"], "number");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_schema_enum_and_primitive_arrays() {
        let params = vec![
            Parameter {
                name: "unit".to_string(),
                enum_values: Some(vec!["c".to_string(), "f".to_string()]),
                ..Default::default()
            },
            Parameter {
                name: "tags".to_string(),
                kind: ParameterType::StringArray,
                ..Default::default()
            },
        ];

        let schema = parameters_to_json_schema(&params);
        assert_eq!(schema["properties"]["unit"]["enum"], json!(["c", "f"]));
        assert_eq!(schema["properties"]["tags"]["type"], "array");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn test_schema_nested_object_array() {
        let params = vec![Parameter {
            name: "rows".to_string(),
            kind: ParameterType::ObjectArray,
            description: Some("Table rows".to_string()),
            attributes: Some(vec![
                Parameter::string("label", "Row label"),
                Parameter {
                    name: "note".to_string(),
                    required: Some(false),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }];

        let schema = parameters_to_json_schema(&params);
        let rows = &schema["properties"]["rows"];
        assert_eq!(rows["type"], "array");
        assert_eq!(rows["description"], "Table rows");
        assert_eq!(rows["items"]["type"], "object");
        assert_eq!(rows["items"]["properties"]["label"]["type"], "string");
        assert_eq!(rows["items"]["required"], json!(["label"]));
    }

    #[test]
    fn test_parameter_type_wire_names() {
        let parsed: Parameter =
            serde_json::from_str(r#"{"name":"ids","type":"number[]"}"#).unwrap();
        assert_eq!(parsed.kind, ParameterType::NumberArray);
        assert!(parsed.is_required());
    }

    #[test]
    fn test_descriptor_defaults_schema() {
        let parsed: ActionDescriptor = serde_json::from_str(r#"{"name":"ping"}"#).unwrap();
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.json_schema["type"], "object");
    }
}
