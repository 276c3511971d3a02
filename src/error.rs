use serde_json::json;

use crate::client::ServiceResponse;

/// Broad classification of a [`NoteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Encoding,
    Transport,
    ProtocolArgument,
}

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Encoding(String),

    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("request cancelled")]
    Cancelled,

    /// Non-success HTTP status. The body is still decoded for diagnostics.
    #[error("request failed with status {status}: {}", .response.message)]
    Status {
        status: u16,
        response: Box<ServiceResponse>,
    },

    /// Status OK, but the service did not hand back a memo.
    #[error("service returned no memo (code {}): {}", .response.code, .response.message)]
    MissingMemo { response: Box<ServiceResponse> },

    #[error("invalid tool arguments: {0}")]
    ProtocolArgument(String),
}

impl NoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NoteError::Validation(_) => ErrorKind::Validation,
            NoteError::Encoding(_) => ErrorKind::Encoding,
            NoteError::Transport(_)
            | NoteError::Timeout(_)
            | NoteError::Cancelled
            | NoteError::Status { .. }
            | NoteError::MissingMemo { .. } => ErrorKind::Transport,
            NoteError::ProtocolArgument(_) => ErrorKind::ProtocolArgument,
        }
    }

    /// The decoded service response, when the failure came with one.
    pub fn response(&self) -> Option<&ServiceResponse> {
        match self {
            NoteError::Status { response, .. } | NoteError::MissingMemo { response } => {
                Some(response)
            }
            _ => None,
        }
    }
}

/// Errors raised while serving JSON-RPC requests.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Note(#[from] NoteError),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl McpError {
    pub fn to_jsonrpc_error(&self) -> serde_json::Value {
        let code = match self {
            McpError::Parse(_) => -32700,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidParams(_) | McpError::ToolNotFound(_) => -32602,
            McpError::Note(e) if e.kind() == ErrorKind::ProtocolArgument => -32602,
            McpError::Note(_) | McpError::SerdeJson(_) => -32603,
        };

        json!({
            "code": code,
            "message": self.to_string(),
        })
    }
}
