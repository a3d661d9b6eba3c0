//! JSON-RPC 2.0 envelope for MCP over stateless streamable HTTP.
//!
//! Only JSON response mode is supported: one POST carries one request and
//! gets one response. Notifications are acknowledged with 202.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::auth::extract_bearer;
use crate::tools::{Dispatcher, Tool, ToolOutput};
use crate::Error;

/// MCP protocol revision we speak.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    /// `None` for both an absent and a null id
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    fn from_error(id: Value, err: &Error) -> Self {
        Self::error(
            id,
            err.rpc_code(),
            err.to_string(),
            Some(json!({ "kind": err.kind() })),
        )
    }
}

/// HTTP status plus optional JSON body.
#[derive(Debug)]
pub struct RpcReply {
    pub status: u16,
    pub body: Option<RpcResponse>,
}

impl RpcReply {
    fn json(status: u16, body: RpcResponse) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn accepted() -> Self {
        Self {
            status: 202,
            body: None,
        }
    }
}

/// Handle one POSTed JSON-RPC message.
///
/// The bearer token is checked before the body is even parsed.
pub async fn handle(dispatcher: &Dispatcher, authorization: Option<&str>, body: &[u8]) -> RpcReply {
    let token = extract_bearer(authorization);
    if let Err(e) = dispatcher.authorize(token) {
        return RpcReply::json(e.status_code(), RpcResponse::from_error(Value::Null, &e));
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unparseable JSON-RPC body");
            return RpcReply::json(
                400,
                RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e), None),
            );
        }
    };

    if value.is_array() {
        return RpcReply::json(
            400,
            RpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                "Batch requests are not supported",
                None,
            ),
        );
    }

    let notification = is_notification(&value);
    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return RpcReply::json(
                400,
                RpcResponse::error(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                    None,
                ),
            );
        }
    };

    if request.jsonrpc != "2.0" {
        return RpcReply::json(
            400,
            RpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
                None,
            ),
        );
    }

    if notification {
        debug!(method = %request.method, "Acknowledged notification");
        return RpcReply::accepted();
    }
    let id = request.id.unwrap_or(Value::Null);

    debug!(method = %request.method, "Handling JSON-RPC request");

    let response = match request.method.as_str() {
        "initialize" => RpcResponse::result(id, initialize_result(dispatcher)),
        "ping" => RpcResponse::result(id, json!({})),
        "tools/list" => {
            let tools: Vec<_> = Tool::ALL.into_iter().map(Tool::definition).collect();
            RpcResponse::result(id, json!({ "tools": tools }))
        }
        "tools/call" => {
            let params = match request
                .params
                .map(serde_json::from_value::<CallToolParams>)
                .transpose()
            {
                Ok(Some(params)) => params,
                Ok(None) => {
                    return RpcReply::json(
                        200,
                        RpcResponse::error(id, INVALID_PARAMS, "Missing tools/call params", None),
                    );
                }
                Err(e) => {
                    return RpcReply::json(
                        200,
                        RpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            format!("Invalid tools/call params: {}", e),
                            None,
                        ),
                    );
                }
            };

            let arguments = params.arguments.unwrap_or_default();
            match dispatcher.dispatch(token, &params.name, arguments).await {
                Ok(output) => match call_tool_result(&output) {
                    Ok(result) => RpcResponse::result(id, result),
                    Err(e) => RpcResponse::from_error(id, &e),
                },
                Err(e) => {
                    return RpcReply::json(e.status_code(), RpcResponse::from_error(id, &e));
                }
            }
        }
        other => RpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
            None,
        ),
    };

    RpcReply::json(200, response)
}

/// A notification has no `id` member at all. `"id": null` is still a request.
fn is_notification(message: &Value) -> bool {
    message.as_object().is_some_and(|obj| !obj.contains_key("id"))
}

fn initialize_result(dispatcher: &Dispatcher) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": dispatcher.config().server_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": "Call validate first, then get_apod_with_image or get_planet.",
    })
}

/// Wrap tool output in an MCP `CallToolResult`.
fn call_tool_result(output: &ToolOutput) -> crate::Result<Value> {
    Ok(match output {
        ToolOutput::Text(text) => json!({
            "content": [{ "type": "text", "text": text }],
            "isError": false,
        }),
        ToolOutput::Apod(_) | ToolOutput::Planet(_) => {
            let structured = output.to_value()?;
            json!({
                "content": [{ "type": "text", "text": serde_json::to_string(&structured)? }],
                "structuredContent": structured,
                "isError": false,
            })
        }
    })
}
