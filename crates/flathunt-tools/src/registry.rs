//! The process-wide tool registry.
//!
//! Built once at startup through [`RegistryBuilder`], then treated as
//! immutable: `resolve` is a pure lookup with no locking. Registration is
//! all-or-nothing per server: a name collision rejects the incoming
//! server whole, so the flat index can never be partially populated.

use std::collections::HashMap;

use flathunt_core::{RegistrationError, ServerName, ToolName, ToolSpec};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::server::ToolServer;

/// Introspection descriptor for one registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// The server providing the tool.
    pub server: ServerName,
    /// The tool's name.
    pub name: ToolName,
    /// Human-readable description.
    pub description: String,
    /// JSON-Schema-like rendering of the input schema.
    pub input_schema: Value,
}

/// Immutable catalog mapping tool names to the servers implementing them.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    servers: HashMap<ServerName, ToolServer>,
    tool_index: HashMap<ToolName, ServerName>,
}

impl ToolRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolve a tool name to its server and spec. Pure lookup; absent for
    /// unknown names.
    pub fn resolve(&self, tool_name: &ToolName) -> Option<(&ToolServer, &ToolSpec)> {
        let server_name = self.tool_index.get(tool_name)?;
        let server = self.servers.get(server_name)?;
        let tool = server.tool(tool_name)?;
        Some((server, tool))
    }

    /// Descriptors for all registered tools, optionally filtered to
    /// servers carrying the given capability tag. Used by agents deciding
    /// what to call.
    pub fn list_tools(&self, capability_tag: Option<&str>) -> Vec<ToolDescriptor> {
        let mut out: Vec<ToolDescriptor> = self
            .servers
            .values()
            .filter(|server| capability_tag.is_none_or(|tag| server.has_capability(tag)))
            .flat_map(|server| {
                server.tools().map(|tool| ToolDescriptor {
                    server: server.name().clone(),
                    name: tool.name().clone(),
                    description: tool.description().to_string(),
                    input_schema: tool.schema().to_json(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Discovery blob for every registered server.
    pub fn server_info(&self) -> HashMap<&ServerName, Value> {
        self.servers
            .iter()
            .map(|(name, server)| (name, server.server_info()))
            .collect()
    }

    /// Number of registered servers.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Number of tools in the flat index.
    pub fn tool_count(&self) -> usize {
        self.tool_index.len()
    }
}

/// Staged registration of tool servers, finished by [`RegistryBuilder::build`].
///
/// Failed registrations leave the builder exactly as it was; none of the
/// rejected server's tools become resolvable.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    servers: HashMap<ServerName, ToolServer>,
    tool_index: HashMap<ToolName, ServerName>,
}

impl RegistryBuilder {
    /// Register a server, adding all of its tools to the flat index.
    pub fn register(&mut self, server: ToolServer) -> Result<&mut Self, RegistrationError> {
        if self.servers.contains_key(server.name()) {
            return Err(RegistrationError::AlreadyRegistered {
                server: server.name().clone(),
            });
        }

        // Validate the whole tool set before touching the index.
        for tool_name in server.tool_names() {
            if let Some(existing) = self.tool_index.get(tool_name) {
                return Err(RegistrationError::DuplicateToolName {
                    tool: tool_name.clone(),
                    existing_server: existing.clone(),
                    incoming_server: server.name().clone(),
                });
            }
        }

        for tool_name in server.tool_names() {
            self.tool_index
                .insert(tool_name.clone(), server.name().clone());
        }
        info!(
            server = %server.name(),
            tools = server.len(),
            "registered tool server"
        );
        self.servers.insert(server.name().clone(), server);
        Ok(self)
    }

    /// Finish registration, producing the immutable registry.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            servers: self.servers,
            tool_index: self.tool_index,
        }
    }
}
