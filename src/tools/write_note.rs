use rmcp::model::{CallToolResult, Content, JsonObject, Tool as ToolDefinition};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::Tool;
use crate::client::{NoteClient, NoteReceipt};
use crate::error::NoteError;

pub const TOOL_NAME: &str = "write_note";
const LOG_TARGET: &str = "flomo::server";

/// Validated arguments of a `write_note` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteNoteArgs {
    pub content: String,
}

impl WriteNoteArgs {
    /// Extract `content` from an untyped argument map.
    pub fn from_arguments(arguments: Option<&JsonObject>) -> Result<Self, NoteError> {
        let arguments = arguments.ok_or_else(|| {
            NoteError::ProtocolArgument("missing required parameter 'content'".to_string())
        })?;

        match arguments.get("content") {
            Some(Value::String(content)) => Ok(Self {
                content: content.clone(),
            }),
            Some(other) => Err(NoteError::ProtocolArgument(format!(
                "parameter 'content' must be a string, got {}",
                json_type(other)
            ))),
            None => Err(NoteError::ProtocolArgument(
                "missing required parameter 'content'".to_string(),
            )),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Writes a note to flomo on behalf of a protocol caller.
pub struct WriteNoteTool {
    client: Arc<NoteClient>,
    view_url: String,
}

impl WriteNoteTool {
    pub fn new(client: Arc<NoteClient>, view_url: impl Into<String>) -> Self {
        Self {
            client,
            view_url: view_url.into(),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert(
            "properties".to_string(),
            json!({
                "content": {
                    "type": "string",
                    "description": "Text content of the note with markdown format"
                }
            }),
        );
        schema.insert("required".to_string(), json!(["content"]));

        ToolDefinition {
            name: TOOL_NAME.into(),
            title: None,
            description: Some("Write note to flomo".into()),
            input_schema: Arc::new(schema),
            output_schema: None,
            annotations: None,
            icons: None,
        }
    }

    /// Handle one `tools/call`.
    ///
    /// Bad arguments are returned as `Err`; failures of the note service come
    /// back as an error-flagged result.
    pub async fn call(
        &self,
        arguments: Option<JsonObject>,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, NoteError> {
        let args = WriteNoteArgs::from_arguments(arguments.as_ref())?;
        log::info!(
            target: LOG_TARGET,
            "Received write_note request with content length: {}",
            args.content.chars().count()
        );

        match self.run(args, cancel).await {
            Ok(receipt) => {
                let text = self.success_text(&receipt);
                log::info!(
                    target: LOG_TARGET,
                    "Successfully wrote note. Memo URL: {}",
                    receipt.memo.view_url(&self.view_url)
                );
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Error writing note: {}", e);
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "failed to write note: {}",
                    e
                ))]))
            }
        }
    }

    pub fn success_text(&self, receipt: &NoteReceipt) -> String {
        format!(
            "Successfully wrote note to Flomo.\nMemo URL: {}\nCreated at: {}",
            receipt.memo.view_url(&self.view_url),
            receipt.memo.created_at
        )
    }
}

#[async_trait::async_trait]
impl Tool for WriteNoteTool {
    type Input = WriteNoteArgs;
    type Output = NoteReceipt;

    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn run(
        &self,
        input: WriteNoteArgs,
        cancel: CancellationToken,
    ) -> Result<NoteReceipt, NoteError> {
        self.client
            .submit_note_with_cancel(&input.content, &cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{memo_body, test_config};
    use crate::error::ErrorKind;
    use rmcp::model::RawContent;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(value: Value) -> Option<JsonObject> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn tool_for(server: &MockServer) -> WriteNoteTool {
        let client = NoteClient::new(&test_config(&server.uri())).unwrap();
        WriteNoteTool::new(Arc::new(client), "https://v.flomoapp.com")
    }

    #[test]
    fn test_args_missing_content() {
        let err = WriteNoteArgs::from_arguments(args(json!({})).as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolArgument);

        let err = WriteNoteArgs::from_arguments(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolArgument);
    }

    #[test]
    fn test_args_wrong_type() {
        let err =
            WriteNoteArgs::from_arguments(args(json!({"content": 12})).as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolArgument);
        assert!(err.to_string().contains("number"));
    }

    #[tokio::test]
    async fn test_definition() {
        let server = MockServer::start().await;
        let tool = tool_for(&server).await;
        let def = tool.definition();

        assert_eq!(def.name, TOOL_NAME);
        assert_eq!(tool.name(), TOOL_NAME);
        assert_eq!(def.input_schema["required"], json!(["content"]));
        assert_eq!(def.input_schema["properties"]["content"]["type"], "string");
    }

    #[tokio::test]
    async fn test_bad_call_then_good_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(memo_body("MTIz")))
            .expect(1)
            .mount(&server)
            .await;
        let tool = tool_for(&server).await;

        let err = tool
            .call(args(json!({"text": "hi"})), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolArgument);

        let result = tool
            .call(args(json!({"content": "hi"})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        let text = text_of(&result);
        assert!(text.starts_with("Successfully wrote note to Flomo."));
        assert!(text.contains("Memo URL: https://v.flomoapp.com/mine/?memo_id=MTIz"));
        assert!(text.contains("Created at: 2024-01-15 10:30:00"));
    }

    #[tokio::test]
    async fn test_service_failure_is_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"code": 500, "message": "server down"})),
            )
            .mount(&server)
            .await;
        let tool = tool_for(&server).await;

        let result = tool
            .call(args(json!({"content": "hi"})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("failed to write note"));
        assert!(text_of(&result).contains("server down"));
    }

    #[tokio::test]
    async fn test_empty_content_is_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(memo_body("x")))
            .expect(0)
            .mount(&server)
            .await;
        let tool = tool_for(&server).await;

        let result = tool
            .call(args(json!({"content": "  "})), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("content cannot be empty"));
    }
}
