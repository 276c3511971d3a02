use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::mcp::{parse_error_response, JsonRpcHandler};

const LOG_TARGET: &str = "flomo::server";

/// Newline-delimited JSON-RPC over stdio.
///
/// Requests run concurrently; responses go through a single writer task so
/// frames never interleave.
pub struct StdioTransport {
    handler: Arc<JsonRpcHandler>,
}

impl StdioTransport {
    pub fn new(handler: Arc<JsonRpcHandler>) -> Self {
        Self { handler }
    }

    /// Run the stdio transport, reading from stdin and writing to stdout
    pub async fn run(&self) -> io::Result<()> {
        log::info!(target: LOG_TARGET, "Starting stdio transport");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches EOF, then wait for in-flight requests.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_loop(writer, rx));

        let mut lines = BufReader::new(reader).lines();
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            log::debug!(target: LOG_TARGET, "Processing line: {}", line);

            let message = match serde_json::from_str::<Value>(&line) {
                Ok(message) => message,
                Err(e) => {
                    log::error!(target: LOG_TARGET, "Failed to parse JSON-RPC request: {}", e);
                    if tx.send(parse_error_response(&e)).is_err() {
                        break;
                    }
                    continue;
                }
            };

            if JsonRpcHandler::is_notification(&message) {
                self.handler.handle_notification(&message).await;
                continue;
            }

            let cancel = self.handler.register(&message).await;
            let handler = Arc::clone(&self.handler);
            let tx = tx.clone();
            tasks.spawn(async move {
                if let Some(response) = handler.handle_request(message, cancel).await {
                    if tx.send(response).is_err() {
                        log::error!(target: LOG_TARGET, "Response dropped, writer has stopped");
                    }
                }
            });

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    log::error!(target: LOG_TARGET, "Request task failed: {}", e);
                }
            }
        }

        log::debug!(target: LOG_TARGET, "EOF reached on stdin");
        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                log::error!(target: LOG_TARGET, "Request task failed: {}", e);
            }
        }

        drop(tx);
        writer_task.await.map_err(io::Error::other)?
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Value>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let frame = serde_json::to_string(&response)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        log::debug!(target: LOG_TARGET, "Sent response: {}", frame);
    }
    Ok(())
}
