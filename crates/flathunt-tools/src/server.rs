//! Tool servers: named groups of related tools under one capability domain.

use std::collections::{BTreeSet, HashMap};

use flathunt_core::{RegistrationError, ServerName, ToolName, ToolSpec};
use serde_json::Value;

/// A named group of related tools sharing a capability domain.
///
/// Created once at process startup, registered whole with the registry,
/// and never mutated afterwards. Tool names are unique within a server;
/// the builder rejects duplicates instead of silently replacing.
#[derive(Debug, Clone)]
pub struct ToolServer {
    name: ServerName,
    capability_tags: BTreeSet<String>,
    tools: HashMap<ToolName, ToolSpec>,
}

impl ToolServer {
    /// Start building a server with the given name.
    pub fn builder(name: ServerName) -> ToolServerBuilder {
        ToolServerBuilder {
            name,
            capability_tags: BTreeSet::new(),
            tools: Vec::new(),
        }
    }

    /// The server's unique name.
    pub fn name(&self) -> &ServerName {
        &self.name
    }

    /// Capability domain labels, e.g. `scheduling`.
    pub fn capability_tags(&self) -> &BTreeSet<String> {
        &self.capability_tags
    }

    /// Whether this server carries the given capability tag.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capability_tags.contains(tag)
    }

    /// Look up one of this server's tools by name.
    pub fn tool(&self, name: &ToolName) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Iterate over all tools.
    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// Names of all tools this server exposes.
    pub fn tool_names(&self) -> Vec<&ToolName> {
        self.tools.keys().collect()
    }

    /// Number of tools on this server.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the server exposes no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Discovery blob: name, capability tags, and tool descriptors.
    pub fn server_info(&self) -> Value {
        let mut descriptors: Vec<Value> = self.tools.values().map(ToolSpec::descriptor).collect();
        descriptors.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        serde_json::json!({
            "name": self.name.as_str(),
            "capabilities": self.capability_tags,
            "tools": descriptors,
        })
    }
}

/// Builder for [`ToolServer`].
#[derive(Debug)]
pub struct ToolServerBuilder {
    name: ServerName,
    capability_tags: BTreeSet<String>,
    tools: Vec<ToolSpec>,
}

impl ToolServerBuilder {
    /// Add a capability tag.
    pub fn capability(mut self, tag: &str) -> Self {
        self.capability_tags.insert(tag.to_string());
        self
    }

    /// Add a tool.
    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    /// Finish the server.
    ///
    /// Fails with [`RegistrationError::DuplicateToolName`] if two tools on
    /// this server share a name.
    pub fn build(self) -> Result<ToolServer, RegistrationError> {
        let mut tools = HashMap::with_capacity(self.tools.len());
        for tool in self.tools {
            let name = tool.name().clone();
            if tools.insert(name.clone(), tool).is_some() {
                return Err(RegistrationError::DuplicateToolName {
                    tool: name,
                    existing_server: self.name.clone(),
                    incoming_server: self.name,
                });
            }
        }
        Ok(ToolServer {
            name: self.name,
            capability_tags: self.capability_tags,
            tools,
        })
    }
}
