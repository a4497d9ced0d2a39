//! Parameter schemas for tool invocations.
//!
//! Every tool declares an ordered set of named, typed parameters. The
//! dispatcher validates arguments against this schema before the handler
//! runs, so handlers only ever see well-formed input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::tool::Arguments;

/// The declared type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// JSON-Schema-compatible type name.
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Check whether a JSON value matches this type.
    ///
    /// An integer-valued JSON number satisfies both `Integer` and `Number`.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Declaration of one named tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, the key callers supply in `arguments`.
    pub name: String,
    /// Declared type; supplied values must match.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Human-readable description for discovery output.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    /// Declare a required parameter.
    pub fn required(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
            description: String::new(),
        }
    }

    /// Declare an optional parameter.
    pub fn optional(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: false,
            description: String::new(),
        }
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// A single schema violation found while validating arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A required parameter was not supplied.
    MissingRequired { param: String },
    /// A supplied parameter's value does not match its declared type.
    TypeMismatch {
        param: String,
        expected: ParamType,
        found: &'static str,
    },
}

impl SchemaViolation {
    /// The offending parameter name.
    pub fn param(&self) -> &str {
        match self {
            SchemaViolation::MissingRequired { param } => param,
            SchemaViolation::TypeMismatch { param, .. } => param,
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::MissingRequired { param } => {
                write!(f, "missing required parameter: {param}")
            }
            SchemaViolation::TypeMismatch {
                param,
                expected,
                found,
            } => write!(f, "parameter {param} must be a {expected}, got {found}"),
        }
    }
}

/// The full set of violations from one validation pass.
///
/// Validation never stops at the first problem; the caller gets every
/// offending parameter in one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations(pub Vec<SchemaViolation>);

impl SchemaViolations {
    /// Names of all offending parameters, in declaration order.
    pub fn params(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.param()).collect()
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", details.join("; "))
    }
}

impl std::error::Error for SchemaViolations {}

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

/// Ordered parameter schema for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// An empty schema accepting any (or no) arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter declaration.
    pub fn with(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Declared parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Validate supplied arguments against this schema.
    ///
    /// Every missing required parameter and every type mismatch is
    /// reported. Parameters not declared in the schema are accepted
    /// unchecked; tools own the semantics of their extension fields.
    pub fn validate(&self, args: &Arguments) -> Result<(), SchemaViolations> {
        let mut violations = Vec::new();

        for spec in &self.params {
            match args.get(&spec.name) {
                None if spec.required => {
                    violations.push(SchemaViolation::MissingRequired {
                        param: spec.name.clone(),
                    });
                }
                None => {}
                Some(value) => {
                    if !spec.ty.matches(value) {
                        violations.push(SchemaViolation::TypeMismatch {
                            param: spec.name.clone(),
                            expected: spec.ty,
                            found: json_type_name(value),
                        });
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations(violations))
        }
    }

    /// Render as a JSON-Schema-like object for discovery output.
    pub fn to_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for spec in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(spec.ty.name().into()));
            if !spec.description.is_empty() {
                prop.insert(
                    "description".into(),
                    Value::String(spec.description.clone()),
                );
            }
            properties.insert(spec.name.clone(), Value::Object(prop));
            if spec.required {
                required.push(Value::String(spec.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
