//! HTTP implementation of the core crate's [`ToolClient`] trait
//! (component C). Each call performs its own `initialize` -> `tools/call`
//! exchange; there is no connection state carried between calls, so the
//! per-call bearer token is attached to a fresh transport instance rather
//! than mutating shared state.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::protocol::{
    CallToolResult, ClientCapabilities, ClientInfo, InitializeParams, MCPRequest, MCPResponse,
    ResponseResult, ToolCallParams, ToolContent,
};
use crate::transport::HttpTransport;
use workflow_engine_core::error::WorkflowError;
use workflow_engine_core::tool_client::ToolClient;

const TOOL_CALL_BUDGET: Duration = Duration::from_secs(45);

#[derive(Debug, Clone)]
pub struct HttpMcpClient {
    base_url: String,
    client_name: String,
    client_version: String,
}

impl HttpMcpClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client_name: "workflow-engine".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn initialize_and_call(
        &self,
        transport: &HttpTransport,
        tool_name: &str,
        params: Value,
    ) -> Result<Value, WorkflowError> {
        let init_request = MCPRequest::Initialize {
            id: Uuid::new_v4().to_string(),
            params: InitializeParams {
                protocol_version: "2024-11-05".to_string(),
                capabilities: ClientCapabilities {
                    roots: None,
                    sampling: None,
                },
                client_info: ClientInfo {
                    name: self.client_name.clone(),
                    version: self.client_version.clone(),
                },
            },
        };

        let init_response = transport
            .send_request(init_request)
            .await
            .map_err(|e| WorkflowError::MCPTransportError {
                tool_name: tool_name.to_string(),
                message: e.to_string(),
            })?;

        match init_response {
            MCPResponse::Result {
                result: ResponseResult::Initialize(_),
                ..
            } => {}
            MCPResponse::Error { error, .. } => {
                return Err(WorkflowError::MCPError {
                    tool_name: tool_name.to_string(),
                    message: format!("initialize failed: {}", error.message),
                });
            }
            _ => {
                return Err(WorkflowError::MCPProtocolError {
                    message: "unexpected response to initialize".to_string(),
                });
            }
        }

        let arguments: Option<HashMap<String, Value>> = match params {
            Value::Object(map) => Some(map.into_iter().collect()),
            Value::Null => None,
            other => {
                let mut map = HashMap::new();
                map.insert("value".to_string(), other);
                Some(map)
            }
        };

        let call_request = MCPRequest::CallTool {
            id: Uuid::new_v4().to_string(),
            params: ToolCallParams {
                name: tool_name.to_string(),
                arguments,
            },
        };

        let call_response = transport
            .send_request(call_request)
            .await
            .map_err(|e| WorkflowError::MCPTransportError {
                tool_name: tool_name.to_string(),
                message: e.to_string(),
            })?;

        match call_response {
            MCPResponse::Result {
                result: ResponseResult::CallTool(result),
                ..
            } => decode_result(tool_name, result),
            MCPResponse::Error { error, .. } => Err(WorkflowError::MCPError {
                tool_name: tool_name.to_string(),
                message: error.message,
            }),
            _ => Err(WorkflowError::MCPProtocolError {
                message: format!("unexpected response to tools/call '{tool_name}'"),
            }),
        }
    }
}

fn decode_result(tool_name: &str, result: CallToolResult) -> Result<Value, WorkflowError> {
    if result.is_error.unwrap_or(false) {
        let message = result
            .content
            .into_iter()
            .find_map(|c| match c {
                ToolContent::Text { text } => Some(text),
                _ => None,
            })
            .unwrap_or_else(|| "tool reported an error".to_string());
        return Err(WorkflowError::MCPError {
            tool_name: tool_name.to_string(),
            message,
        });
    }

    let text = result
        .content
        .into_iter()
        .find_map(|c| match c {
            ToolContent::Text { text } => Some(text),
            _ => None,
        })
        .ok_or_else(|| WorkflowError::MCPProtocolError {
            message: format!("tool '{tool_name}' returned no text content"),
        })?;

    serde_json::from_str(&text).map_err(|e| WorkflowError::MCPProtocolError {
        message: format!("tool '{tool_name}' returned undecodable JSON: {e}"),
    })
}

#[async_trait]
impl ToolClient for HttpMcpClient {
    async fn call(&self, tool_name: &str, params: Value, token: &str) -> Result<Value, WorkflowError> {
        let transport = HttpTransport::new(self.base_url.clone()).with_auth_token(token.to_string());

        tokio::time::timeout(TOOL_CALL_BUDGET, self.initialize_and_call(&transport, tool_name, params))
            .await
            .map_err(|_| WorkflowError::ToolTimeout {
                tool_name: tool_name.to_string(),
                elapsed_secs: TOOL_CALL_BUDGET.as_secs(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn call_decodes_text_content_as_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(move |req: &wiremock::Request| {
                let body: MCPRequest = req.body_json().unwrap();
                match body {
                    MCPRequest::Initialize { id, .. } => ResponseTemplate::new(200).set_body_json(
                        serde_json::json!({
                            "type": "result",
                            "id": id,
                            "result": {
                                "protocol_version": "2024-11-05",
                                "capabilities": {"logging": null, "prompts": null, "resources": null, "tools": null},
                                "server_info": {"name": "fake", "version": "0.0.0"}
                            }
                        }),
                    ),
                    MCPRequest::CallTool { id, .. } => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "type": "result",
                        "id": id,
                        "result": {
                            "content": [{"type": "text", "text": "{\"status\":\"ok\"}"}],
                            "is_error": false
                        }
                    })),
                    _ => ResponseTemplate::new(400),
                }
            })
            .mount(&server)
            .await;

        let client = HttpMcpClient::new(server.uri());
        let value = client
            .call("lookup_account", serde_json::json!({"id": "1"}), "tok")
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn call_maps_tool_error_flag_to_mcp_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(move |req: &wiremock::Request| {
                let body: MCPRequest = req.body_json().unwrap();
                match body {
                    MCPRequest::Initialize { id, .. } => ResponseTemplate::new(200).set_body_json(
                        serde_json::json!({
                            "type": "result",
                            "id": id,
                            "result": {
                                "protocol_version": "2024-11-05",
                                "capabilities": {"logging": null, "prompts": null, "resources": null, "tools": null},
                                "server_info": {"name": "fake", "version": "0.0.0"}
                            }
                        }),
                    ),
                    MCPRequest::CallTool { id, .. } => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "type": "result",
                        "id": id,
                        "result": {
                            "content": [{"type": "text", "text": "account not found"}],
                            "is_error": true
                        }
                    })),
                    _ => ResponseTemplate::new(400),
                }
            })
            .mount(&server)
            .await;

        let client = HttpMcpClient::new(server.uri());
        let err = client
            .call("lookup_account", serde_json::json!({"id": "1"}), "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MCPError { .. }));
    }
}
