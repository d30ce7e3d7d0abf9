//! Tool registry: the immutable catalog of tool declarations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

use crate::call::{ArgValue, Arguments};
use crate::error::{Error, Result};
use crate::executor::ToolError;
use crate::protocol::Tool;

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Check a value against this type, coercing where the intent is plain.
    ///
    /// Models often quote numbers and booleans, so `"10"` passes as a number
    /// and `"true"` as a boolean. String parameters also take raw JSON
    /// documents, which tools receive serialized.
    fn coerce(self, value: ArgValue) -> Option<ArgValue> {
        match (self, value) {
            (Self::String, v @ (ArgValue::String(_) | ArgValue::Raw(_))) => Some(v),
            (Self::Number, v @ ArgValue::Number(_)) => Some(v),
            (Self::Number, ArgValue::String(s)) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .map(Number::from)
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(Number::from_f64))
                    .map(ArgValue::Number)
            }
            (Self::Boolean, v @ ArgValue::Bool(_)) => Some(v),
            (Self::Boolean, ArgValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(ArgValue::Bool(true)),
                "false" => Some(ArgValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgValue>,
}

impl ParameterSpec {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// A tool declaration: name, description and ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// JSON-Schema rendering used on the wire.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                let mut property = json!({
                    "type": p.param_type.as_str(),
                    "description": p.description,
                });
                if let Some(default) = &p.default {
                    property["default"] = default.clone().into_json();
                }
                (p.name.clone(), property)
            })
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        let required: Vec<&str> = self.required_parameters().map(|p| p.name.as_str()).collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema(),
        }
    }

    /// Check arguments against the declaration and fill in defaults.
    ///
    /// Required parameters must be present and non-blank. Arguments the
    /// declaration does not mention pass through untouched.
    pub fn validate(&self, mut arguments: Arguments) -> std::result::Result<Arguments, ToolError> {
        for spec in &self.parameters {
            let present = arguments
                .get(&spec.name)
                .filter(|v| !v.is_null())
                .cloned();

            let Some(value) = present else {
                if let Some(default) = &spec.default {
                    arguments.insert(spec.name.clone(), default.clone());
                } else if spec.required {
                    return Err(missing(&spec.name));
                }
                continue;
            };

            if spec.required && value.is_blank() {
                return Err(missing(&spec.name));
            }

            let coerced = spec.param_type.coerce(value).ok_or_else(|| {
                ToolError::InvalidInput(format!(
                    "argument {} must be a {}",
                    spec.name, spec.param_type
                ))
            })?;
            arguments.insert(spec.name.clone(), coerced);
        }
        Ok(arguments)
    }
}

fn missing(name: &str) -> ToolError {
    ToolError::InvalidInput(format!("missing required argument: {name}"))
}

/// Immutable, ordered catalog of tools.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// request.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate names.
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (position, tool) in tools.iter().enumerate() {
            if index.insert(tool.name.clone(), position).is_some() {
                return Err(Error::DuplicateTool(tool.name.clone()));
            }
        }
        Ok(Self { tools, index })
    }

    /// All tools in declaration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Exact lookup by name.
    pub fn describe(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Lookup that tolerates surrounding whitespace and letter case.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        let name = name.trim();
        self.describe(name).or_else(|| {
            self.tools
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(name))
        })
    }

    /// Wire representation for `tools/list`.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
