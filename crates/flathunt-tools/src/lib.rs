//! # Flathunt Tools
//!
//! Tool servers, the process-wide registry, and the validating dispatcher.
//!
//! The registry is built once at startup through [`RegistryBuilder`] and
//! is immutable afterwards; the [`Dispatcher`] resolves invocation
//! requests against it, validates arguments against the tool's schema,
//! and executes the handler under a timeout with cooperative
//! cancellation. The `standard` module carries demo servers for the
//! scheduling, messaging, and routing capability domains.

pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod standard;

pub use dispatcher::{DEFAULT_GRACE_PERIOD, Dispatcher};
pub use registry::{RegistryBuilder, ToolDescriptor, ToolRegistry};
pub use server::{ToolServer, ToolServerBuilder};
