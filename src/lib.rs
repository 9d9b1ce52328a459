pub mod aviationstack;
pub mod mcp;
