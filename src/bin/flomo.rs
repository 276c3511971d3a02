use anyhow::Result;
use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Instant;

use flomo_notes::cli::{compose_note, normalize_args, render_success, resolve_content, Cli};
use flomo_notes::{bootstrap, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    logging::init(if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    });

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let start = Instant::now();
    let (config, client) = bootstrap::init_client(cli.config.as_deref())?;

    let stdin = std::io::stdin();
    let is_terminal = stdin.is_terminal();
    let Some(content) = resolve_content(cli.content.as_deref(), stdin.lock(), is_terminal)? else {
        log::error!(target: "flomo::cli", "No content provided");
        eprintln!("Error: Note content is required\n");
        eprintln!("{}", Cli::command().render_help());
        return Ok(ExitCode::FAILURE);
    };

    let content = compose_note(&content, cli.tags.as_deref());

    log::info!(target: "flomo::cli", "Sending note to flomo");
    match client.submit_note(&content).await {
        Ok(receipt) => {
            let elapsed = start.elapsed();
            log::info!(target: "flomo::cli", "Note sent successfully (took {:?})", elapsed);
            print!("{}", render_success(&receipt, &config.view_url, cli.verbose, elapsed));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::error!(target: "flomo::cli", "Error sending note: {}", e);
            eprintln!("Error sending note: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
