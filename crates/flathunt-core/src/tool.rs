//! Tool definitions: the handler seam between the dispatch layer and
//! concrete capability implementations.
//!
//! A [`ToolSpec`] couples a validated name, a parameter schema, and a
//! handler. Agents never invoke handlers directly; every call goes through
//! the dispatcher, which validates arguments against the schema first.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::identifiers::ToolName;
use crate::schema::ToolSchema;

/// Named arguments for one tool invocation.
///
/// A thin wrapper over a JSON object with typed accessors, so handlers can
/// pull their parameters without re-matching on `serde_json::Value`.
/// Arguments reaching a handler have already passed schema validation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String-typed argument.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Integer-typed argument.
    pub fn i64_arg(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    /// Floating-point argument (integers coerce).
    pub fn f64_arg(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Boolean argument.
    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Object-typed argument.
    pub fn object_arg(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    /// Array-typed argument.
    pub fn array_arg(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    /// Number of supplied arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// The capability behind a tool: receives validated arguments, produces a
/// structured payload or raises a typed failure.
///
/// Handlers run inside the dispatcher's timeout envelope. Cancellation is
/// cooperative: a handler aborted at timeout stops at its next await
/// point, and side effects it already performed are not rolled back.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with schema-validated arguments.
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError>;
}

/// Blanket handler for plain async closures, used heavily in tests and by
/// the built-in demo servers.
#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        self(args).await
    }
}

/// One named, schema-validated operation exposed by a tool server.
///
/// Immutable after construction; the registry index borrows these for the
/// life of the process.
#[derive(Clone)]
pub struct ToolSpec {
    name: ToolName,
    description: String,
    schema: ToolSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    /// Create a tool from its parts.
    pub fn new(
        name: ToolName,
        description: &str,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name,
            description: description.to_string(),
            schema,
            handler,
        }
    }

    /// The tool's validated name.
    pub fn name(&self) -> &ToolName {
        &self.name
    }

    /// Human-readable description for discovery output.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The declared parameter schema.
    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// The handler capability reference.
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// Discovery descriptor: name, description, and rendered input schema.
    pub fn descriptor(&self) -> Value {
        serde_json::json!({
            "name": self.name.as_str(),
            "description": self.description,
            "inputSchema": self.schema.to_json(),
        })
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSpec, ParamType};
    use serde_json::json;

    fn echo_tool() -> ToolSpec {
        ToolSpec::new(
            ToolName::parse("echo").unwrap(),
            "Echoes its arguments back",
            ToolSchema::new().with(ParamSpec::required("text", ParamType::String)),
            Arc::new(|args: Arguments| async move { Ok(args.into_value()) }),
        )
    }

    #[tokio::test]
    async fn handler_receives_arguments() {
        let tool = echo_tool();
        let args = Arguments::new().with("text", "hello");
        let out = tool.handler().handle(args).await.unwrap();
        assert_eq!(out, json!({"text": "hello"}));
    }

    #[test]
    fn typed_accessors() {
        let args = Arguments::new()
            .with("name", "unit")
            .with("count", 3)
            .with("ratio", 0.5)
            .with("flag", true)
            .with("items", json!([1, 2]));

        assert_eq!(args.str_arg("name"), Some("unit"));
        assert_eq!(args.i64_arg("count"), Some(3));
        assert_eq!(args.f64_arg("ratio"), Some(0.5));
        assert_eq!(args.f64_arg("count"), Some(3.0));
        assert_eq!(args.bool_arg("flag"), Some(true));
        assert_eq!(args.array_arg("items").map(Vec::len), Some(2));
        assert_eq!(args.str_arg("missing"), None);
        assert_eq!(args.len(), 5);
    }

    #[test]
    fn descriptor_includes_schema() {
        let descriptor = echo_tool().descriptor();
        assert_eq!(descriptor["name"], "echo");
        assert_eq!(descriptor["inputSchema"]["required"], json!(["text"]));
    }
}
