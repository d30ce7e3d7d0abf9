//! Tool calls and their arguments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A single argument value.
///
/// Scalars get their own variants; arrays and objects (for example a
/// database filter document) are carried verbatim in `Raw` and left for the
/// tool to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Raw(Value),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, or a string with nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the value as text for tools that take string input.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::Raw(v) => v.to_string(),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
            Self::Raw(v) => v,
        }
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            raw @ (Value::Array(_) | Value::Object(_)) => Self::Raw(raw),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

/// Named arguments for a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, ArgValue>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; `None` unless it is an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(
                map.into_iter().map(|(k, v)| (k, ArgValue::from(v))).collect(),
            )),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().into_json()))
                .collect(),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    /// Missing, null, or whitespace-only.
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(ArgValue::is_blank)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A resolved request to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_stay_raw() {
        let args = Arguments::from_json(json!({
            "databaseName": "shop",
            "filter": {"price": {"$gt": 10}},
            "limit": 5,
            "verbose": true,
            "note": null
        }))
        .unwrap();

        assert_eq!(args.get_str("databaseName"), Some("shop"));
        assert_eq!(
            args.get("filter"),
            Some(&ArgValue::Raw(json!({"price": {"$gt": 10}})))
        );
        assert_eq!(args.get("limit"), Some(&ArgValue::from(5i64)));
        assert_eq!(args.get("verbose"), Some(&ArgValue::Bool(true)));
        assert!(args.get("note").unwrap().is_null());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(Arguments::from_json(json!("appName=Safari")).is_none());
        assert!(Arguments::from_json(json!([1, 2])).is_none());
    }

    #[test]
    fn blank_detection() {
        let args = Arguments::new().with("query", "  ").with("appName", "Safari");
        assert!(args.is_blank("query"));
        assert!(args.is_blank("missing"));
        assert!(!args.is_blank("appName"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let args = Arguments::new()
            .with("appName", "Safari")
            .with("filter", ArgValue::Raw(json!({"a": 1})));
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json, json!({"appName": "Safari", "filter": {"a": 1}}));
        assert_eq!(json, args.to_json());

        let back: Arguments = serde_json::from_value(json).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn raw_values_render_as_json_text() {
        let value = ArgValue::Raw(json!({"name": "Ann"}));
        assert_eq!(value.to_text(), r#"{"name":"Ann"}"#);
    }
}
