//! Built-in demo tool servers.
//!
//! These cover the scheduling, messaging, and routing capability domains
//! with deterministic in-process handlers. They stand in for vendor-backed
//! servers during development and tests; a production deployment registers
//! its own servers with real adapters behind the same
//! [`ToolHandler`](flathunt_core::ToolHandler) seam.

mod calendar;
mod communication;
mod maps;

pub use calendar::scheduling_server;
pub use communication::messaging_server;
pub use maps::routing_server;

use crate::registry::{RegistryBuilder, ToolRegistry};
use flathunt_core::RegistrationError;

/// Build a registry holding all three demo servers.
pub fn demo_registry() -> Result<ToolRegistry, RegistrationError> {
    let mut builder = RegistryBuilder::default();
    builder.register(scheduling_server()?)?;
    builder.register(messaging_server()?)?;
    builder.register(routing_server()?)?;
    Ok(builder.build())
}
