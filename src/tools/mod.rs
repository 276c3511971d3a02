pub mod write_note;

pub use write_note::{WriteNoteArgs, WriteNoteTool};

use tokio_util::sync::CancellationToken;

use crate::error::NoteError;

/// Tool trait for capabilities exposed to protocol callers.
///
/// Not object-safe (associated types). The server holds each tool by
/// concrete type, not `dyn Tool`.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn name(&self) -> &str;
    async fn run(
        &self,
        input: Self::Input,
        cancel: CancellationToken,
    ) -> Result<Self::Output, NoteError>;
}
