use clap::Parser;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::NoteReceipt;
use crate::tags::TagSet;

const LOG_TARGET: &str = "flomo::cli";

#[derive(Parser, Debug)]
#[command(
    name = "flomo",
    version,
    about = "Send a note to flomo",
    after_help = "Examples:\n  flomo -c \"This is a note\"\n  flomo --content \"This is a note\" --tags \"work,todo\"\n  echo \"This is a note\" | flomo"
)]
pub struct Cli {
    /// Note content. Read from stdin when omitted
    #[arg(short, long)]
    pub content: Option<String>,

    /// Comma-separated tags
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a TOML configuration file
    #[arg(long, env = "FLOMO_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "flomo-mcp", version, about = "MCP server exposing a write_note tool for flomo")]
pub struct ServerArgs {
    /// Path to a TOML configuration file
    #[arg(long, env = "FLOMO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Long flags that are also accepted with a single dash (`-content`).
const SINGLE_DASH_LONG: &[&str] = &["content", "tags", "verbose"];

/// Rewrite `-content`, `-tags` and `-verbose` (with or without `=value`)
/// to their `--` forms so clap does not read them as bundled short flags.
/// Arguments after `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut options_done = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if options_done {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                options_done = true;
                return arg;
            }
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if SINGLE_DASH_LONG.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

/// Pick the note body: the flag if non-empty, else piped stdin.
///
/// Returns `None` when neither yields any text.
pub fn resolve_content<R: Read>(
    flag: Option<&str>,
    mut stdin: R,
    stdin_is_terminal: bool,
) -> io::Result<Option<String>> {
    let mut content = flag.map(str::trim).unwrap_or_default().to_string();

    if content.is_empty() && !stdin_is_terminal {
        log::info!(target: LOG_TARGET, "No content provided via flags, reading stdin");
        let mut input = String::new();
        stdin.read_to_string(&mut input)?;
        content = input.trim().to_string();
        log::info!(target: LOG_TARGET, "Read {} characters from stdin", content.chars().count());
    }

    Ok(if content.is_empty() { None } else { Some(content) })
}

/// Append the `#tag` suffixes for an optional comma-separated tag list.
pub fn compose_note(content: &str, tags: Option<&str>) -> String {
    let tags = TagSet::parse(tags.unwrap_or_default());
    if tags.is_empty() {
        return content.to_string();
    }
    log::info!(target: LOG_TARGET, "Processing tags: {}", tags.as_slice().join(", "));
    tags.apply(content)
}

/// Human-readable report of a successful submission.
pub fn render_success(
    receipt: &NoteReceipt,
    view_url: &str,
    verbose: bool,
    elapsed: Duration,
) -> String {
    let memo = &receipt.memo;
    let mut out = String::from("\nNote sent successfully! 🎉\n");
    out.push_str(&format!("Created at: {}\n", memo.created_at));
    if !memo.tags.is_empty() {
        out.push_str(&format!("Tags: {}\n", memo.tags.join(", ")));
    }
    out.push_str(&format!("View at: {}\n", memo.view_url(view_url)));

    if verbose {
        out.push_str("\nDetailed information:\n");
        out.push_str(&format!("- Source: {}\n", memo.source));
        out.push_str(&format!("- Creator ID: {}\n", memo.creator_id));
        out.push_str(&format!("- Response code: {}\n", receipt.code));
        out.push_str(&format!("- Response message: {}\n", receipt.message));
        out.push_str(&format!("- Total time: {:?}\n", elapsed));
    }
    out
}
