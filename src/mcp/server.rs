//! Stdio MCP server: reads one JSON-RPC request per line, dispatches, and
//! writes one response per line.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::aviationstack::{ErrorPayload, FetchResource};

use super::content;
use super::protocol::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, methods,
};
use super::tools;

/// MCP dispatch layer over a fetch client.
///
/// The client is constructed once at startup and passed in explicitly; the
/// server itself holds no other state.
pub struct McpServer<C: FetchResource> {
    client: C,
}

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

#[derive(Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

impl<C: FetchResource> McpServer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Serves requests from stdin until EOF, one JSON object per line.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        info!("Aviationstack MCP server listening on stdio");

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from stdin")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(line).await {
                stdout
                    .write_all(response.as_bytes())
                    .await
                    .context("Failed to write response to stdout")?;
                stdout
                    .write_all(b"\n")
                    .await
                    .context("Failed to write response to stdout")?;
                stdout.flush().await.context("Failed to flush stdout")?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw input line; `None` means no response is owed
    /// (notifications).
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.dispatch(request).await?,
            Err(e) => {
                debug!("Unparseable request line: {}", e);
                JsonRpcResponse::error(JsonRpcError::parse_error(), None)
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to serialize response: {}", e);
                let fallback = JsonRpcResponse::error(
                    JsonRpcError::internal_error("Failed to serialize response"),
                    None,
                );
                serde_json::to_string(&fallback).ok()
            }
        }
    }

    #[tracing::instrument(skip(self, request), fields(method = %request.method))]
    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let outcome = if request.jsonrpc != JSONRPC_VERSION {
            Err(JsonRpcError::invalid_request())
        } else {
            match request.method.as_str() {
                methods::INITIALIZE => Ok(initialize_result()),
                methods::PING => Ok(json!({})),
                methods::LIST_TOOLS => Ok(json!({"tools": tools::list_tools()})),
                methods::CALL_TOOL => self.call_tool(request.params.clone()).await,
                methods::LIST_RESOURCES => {
                    Ok(json!({"resources": content::list_resources()}))
                }
                methods::READ_RESOURCE => read_resource(request.params.clone()),
                methods::LIST_PROMPTS => Ok(json!({"prompts": content::list_prompts()})),
                methods::GET_PROMPT => get_prompt(request.params.clone()),
                other => Err(JsonRpcError::method_not_found(other)),
            }
        };

        // Notifications are processed but never answered.
        if request.is_notification() {
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(result, request.id),
            Err(error) => JsonRpcResponse::error(error, request.id),
        })
    }

    /// Tool failures are tool results (`isError: true` content blocks), not
    /// JSON-RPC errors; only malformed params reach the protocol layer.
    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params, "tools/call")?;

        let Some(resource) = tools::endpoint_for(&params.name) else {
            let payload = ErrorPayload::unknown_tool(&params.name, &tools::TOOL_NAMES);
            return Ok(tool_error(&payload));
        };

        match self.client.fetch(resource, &params.arguments).await {
            Ok(envelope) => match serde_json::to_string(&envelope) {
                Ok(text) => Ok(tool_text(text, false)),
                Err(e) => {
                    let payload = ErrorPayload::unexpected(format!(
                        "Failed to serialize the response envelope: {}",
                        e
                    ));
                    Ok(tool_error(&payload))
                }
            },
            Err(payload) => Ok(tool_error(&payload)),
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": "avstack-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn read_resource(params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: ReadResourceParams = parse_params(params, "resources/read")?;
    match content::read_resource(&params.uri) {
        Some(contents) => Ok(json!({"contents": contents})),
        None => Err(JsonRpcError::invalid_params(format!(
            "Unknown resource: {}",
            params.uri
        ))),
    }
}

fn get_prompt(params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: GetPromptParams = parse_params(params, "prompts/get")?;
    content::get_prompt(&params.name, &params.arguments).ok_or_else(|| {
        JsonRpcError::invalid_params(format!("Unknown prompt: {}", params.name))
    })
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
    method: &str,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid {} params: {}", method, e)))
}

fn tool_text(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error
    })
}

fn tool_error(payload: &ErrorPayload) -> Value {
    tool_text(json!({"error": payload}).to_string(), true)
}
