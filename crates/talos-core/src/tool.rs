//! Tool trait and registry
//!
//! Tools are a closed set built once at startup. The registry turns their
//! parameter declarations into the schema the model sees, and dispatches
//! invocations by name. Dispatch never fails the caller: unknown names and
//! handler errors both come back as result text.

use async_trait::async_trait;
use serde_json::Value;

/// Declared parameter: a name and a type string, one of `string`, `integer`,
/// or `boolean`. A trailing `?` marks the parameter optional.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: &'static str,
}

impl ParamSpec {
    pub fn is_optional(&self) -> bool {
        self.ty.ends_with('?')
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.trim_end_matches('?')
    }
}

/// A named capability the model may invoke.
///
/// `invoke` validates its own required parameters and reports every failure
/// as `Err(text)` - errors are content for the model, never faults for the
/// agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn params(&self) -> &'static [ParamSpec];

    async fn invoke(&self, args: &Value) -> Result<String, String>;
}

/// Immutable collection of tools, built once at startup.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schema entries for the transport, one per tool:
    /// `{name, description, input_schema: {type, properties, required}}`.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for param in tool.params() {
                    properties.insert(
                        param.name.to_string(),
                        serde_json::json!({ "type": param.type_name() }),
                    );
                    if !param.is_optional() {
                        required.push(param.name);
                    }
                }
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "input_schema": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }
                })
            })
            .collect()
    }

    /// Execute a tool by name. Always returns result text.
    pub async fn dispatch(&self, name: &str, args: &Value) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return format!("error: unknown tool: {}", name);
        };
        match tool.invoke(args).await {
            Ok(output) => output,
            Err(err) => err,
        }
    }
}

/// Fetch a required string argument, or the error text for its absence.
pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("error: missing required parameter: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the input back"
        }

        fn params(&self) -> &'static [ParamSpec] {
            &[
                ParamSpec { name: "text", ty: "string" },
                ParamSpec { name: "count", ty: "integer?" },
                ParamSpec { name: "loud", ty: "boolean?" },
            ]
        }

        async fn invoke(&self, args: &Value) -> Result<String, String> {
            let text = require_str(args, "text")?;
            Ok(text.to_string())
        }
    }

    #[test]
    fn test_schema_generation() {
        let registry = ToolRegistry::new(vec![Box::new(EchoTool)]);
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);

        let schema = &schemas[0];
        assert_eq!(schema["name"], "echo");
        assert_eq!(schema["input_schema"]["type"], "object");
        assert_eq!(schema["input_schema"]["properties"]["text"]["type"], "string");
        // optional sentinel is stripped from the exposed type
        assert_eq!(schema["input_schema"]["properties"]["count"]["type"], "integer");
        assert_eq!(schema["input_schema"]["properties"]["loud"]["type"], "boolean");
        // required holds exactly the params without the sentinel
        let required = schema["input_schema"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "text");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::new(vec![Box::new(EchoTool)]);
        let result = registry.dispatch("launch_missiles", &serde_json::json!({})).await;
        assert_eq!(result, "error: unknown tool: launch_missiles");
    }

    #[tokio::test]
    async fn test_dispatch_missing_param() {
        let registry = ToolRegistry::new(vec![Box::new(EchoTool)]);
        let result = registry.dispatch("echo", &serde_json::json!({})).await;
        assert_eq!(result, "error: missing required parameter: text");
    }

    #[tokio::test]
    async fn test_dispatch_ok() {
        let registry = ToolRegistry::new(vec![Box::new(EchoTool)]);
        let result = registry
            .dispatch("echo", &serde_json::json!({"text": "hi"}))
            .await;
        assert_eq!(result, "hi");
    }
}
