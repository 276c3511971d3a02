//! Send short markdown notes to flomo.
//!
//! [`client::NoteClient`] performs the HTTP exchange. It is shared by the
//! `flomo` command and the `flomo-mcp` tool server, which exposes it as the
//! `write_note` tool through [`tools::WriteNoteTool`].

pub mod bootstrap;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod tags;
pub mod tools;
pub mod transport;

pub use client::{Memo, NoteClient, NoteReceipt, ServiceResponse};
pub use config::Config;
pub use error::{ErrorKind, McpError, NoteError};
pub use tags::TagSet;
