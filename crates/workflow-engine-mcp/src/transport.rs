//! HTTP transport for the tool-invocation protocol. Each operation is a
//! separate request-response cycle; there is no persistent connection to
//! keep alive between calls.

use crate::protocol::{MCPRequest, MCPResponse};
use std::io;

#[derive(Debug)]
pub enum TransportError {
    IoError(io::Error),
    SerializationError(serde_json::Error),
    HttpError(reqwest::Error),
    ConnectionError(String),
    ProtocolError(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::IoError(e) => write!(f, "io error: {e}"),
            TransportError::SerializationError(e) => write!(f, "serialization error: {e}"),
            TransportError::HttpError(e) => write!(f, "http error: {e}"),
            TransportError::ConnectionError(msg) => write!(f, "connection error: {msg}"),
            TransportError::ProtocolError(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::IoError(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::SerializationError(err)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::HttpError(err)
    }
}

#[derive(Debug)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(45))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url,
            client,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    pub fn set_auth_token(&mut self, token: Option<String>) {
        self.auth_token = token;
    }

    pub async fn send_request(&self, request: MCPRequest) -> Result<MCPResponse, TransportError> {
        let mut request_builder = self.client.post(format!("{}/mcp", self.base_url)).json(&request);

        if let Some(ref token) = self.auth_token {
            request_builder = request_builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = request_builder.send().await?;

        if !response.status().is_success() {
            return Err(TransportError::ConnectionError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let mcp_response: MCPResponse = response
            .json()
            .await
            .map_err(|e| TransportError::ProtocolError(e.to_string()))?;

        Ok(mcp_response)
    }
}
