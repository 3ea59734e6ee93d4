//! Request adaptor (component I): the HTTP front door. Decodes the
//! inbound agent-message envelope, drives the manager, and projects its
//! reply back into the outbound envelope shape.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use workflow_engine_core::error::WorkflowError;

use crate::catalogue::WorkflowStore;
use crate::manager::{ManagerInput, WorkflowManager};

const AGENT_NAME: &str = "workflow-engine";

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[allow(dead_code)]
    role: String,
    parts: Vec<InboundPart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum InboundPart {
    Data { data: InboundPayload },
}

#[derive(Debug, Deserialize)]
struct InboundPayload {
    #[serde(rename = "workflow-id")]
    workflow_id: String,
    #[serde(rename = "task-id")]
    task_id: String,
    #[serde(default)]
    input: Option<String>,
    #[serde(default, rename = "input-data")]
    input_data: Option<Value>,
    #[serde(default, rename = "is-new-conversation")]
    is_new_conversation: Option<bool>,
    token: String,
}

#[derive(Debug, Serialize)]
struct OutboundEnvelope {
    role: &'static str,
    parts: Vec<OutboundPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum OutboundPart {
    Data {
        data: OutboundPayload,
        metadata: Map<String, Value>,
    },
}

#[derive(Debug, Serialize)]
struct OutboundPayload {
    output: Value,
    #[serde(rename = "task-state")]
    task_state: String,
    status: String,
    #[serde(rename = "event-log")]
    event_log: Vec<String>,
    #[serde(rename = "workflow-id")]
    workflow_id: String,
    #[serde(rename = "workflow-name")]
    workflow_name: String,
}

fn error_envelope(code: &str, message: String) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "error": {
            "code": code,
            "message": message,
        }
    }))
}

pub async fn handle_message<S: WorkflowStore + 'static>(
    manager: web::Data<WorkflowManager<S>>,
    body: web::Json<InboundMessage>,
) -> HttpResponse {
    let payload = match body.parts.iter().map(|p| match p {
        InboundPart::Data { data } => data,
    }).next() {
        Some(p) => p,
        None => return error_envelope("invalid-request", "message has no data part".to_string()),
    };

    let input_data = match &payload.input_data {
        Some(Value::Object(map)) => map.clone(),
        Some(_) | None => Map::new(),
    };

    let manager_input = ManagerInput {
        workflow_id: payload.workflow_id.clone(),
        workflow_run_id: payload.task_id.clone(),
        token: payload.token.clone(),
        input: payload.input.clone(),
        input_data,
        is_new_conversation: payload.is_new_conversation.unwrap_or(false),
    };

    match manager.handle(manager_input).await {
        Ok(result) => {
            let metadata_value = serde_json::json!({
                "event-log": result.event_log,
                "workflow-id": result.workflow_id,
                "workflow-name": result.workflow_name,
            });
            let mut metadata = Map::new();
            metadata.insert(AGENT_NAME.to_string(), metadata_value);

            let envelope = OutboundEnvelope {
                role: "agent",
                parts: vec![OutboundPart::Data {
                    data: OutboundPayload {
                        output: result.output,
                        task_state: result.status.clone(),
                        status: result.status,
                        event_log: result.event_log,
                        workflow_id: result.workflow_id,
                        workflow_name: result.workflow_name,
                    },
                    metadata,
                }],
            };
            HttpResponse::Ok().json(envelope)
        }
        Err(WorkflowError::WorkflowNotFound { workflow_id }) => {
            error_envelope("workflow-not-found", format!("no authorised workflow '{workflow_id}'"))
        }
        Err(e) => error_envelope("internal-error", e.to_string()),
    }
}

/// Cancellation from the transport is not supported.
pub async fn cancel() -> HttpResponse {
    error_envelope("cancel-unsupported", "cancellation is not supported".to_string())
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}
