//! MCP dispatch shim: JSON-RPC 2.0 over stdio, tool registry, resources
//! and prompts. Thin by design; all failure classification lives in the
//! client.

mod content;
mod protocol;
mod server;
mod tools;

pub use server::McpServer;
