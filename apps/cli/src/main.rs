//! Interactive bigfs shell.

mod commands;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use bigfs_client::WsClient;
use bigfs_protocol::ErrorKind;
use bigfs_transfer::{
    DigestAlgorithm, DownloadSession, RemoteFs, TransferError, TransferOptions, TransferProgress,
    UploadSession, verify_remote_checksum,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use commands::{Command, HELP, parse_command};

const DEFAULT_URL: &str = "ws://127.0.0.1:9090";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let url = match std::env::args().nth(1).or_else(|| std::env::var("BIGFS_URL").ok()) {
        Some(url) => url,
        None => {
            prompt(&format!("server URL [{DEFAULT_URL}]: "))?;
            match lines.next_line().await? {
                Some(line) if !line.trim().is_empty() => line.trim().to_string(),
                _ => DEFAULT_URL.to_string(),
            }
        }
    };

    let client = match WsClient::connect(&url).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("server unavailable at {url}: {e}");
            std::process::exit(1);
        }
    };
    println!("connected to {url}");
    println!("{HELP}");

    loop {
        prompt("bigfs> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Nothing => {}
            Command::Help => println!("{HELP}"),
            Command::Exit => break,
            other => {
                if let Err(e) = execute(&client, other).await {
                    tracing::debug!(error = ?e, "command failed");
                    println!("error: {}", present(&e));
                }
            }
        }
    }

    client.close().await;
    Ok(())
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{text}");
    std::io::stdout().flush().context("flushing stdout")
}

async fn execute(client: &WsClient, command: Command) -> Result<(), TransferError> {
    match command {
        Command::List(dir) => {
            let mut entries = client.list(&dir).await?;
            entries.sort();
            println!("=> /{dir}");
            for entry in entries {
                println!("{entry}");
            }
        }
        Command::Download { remote, local } => {
            let mut session = DownloadSession::new(client, remote.as_str(), TransferOptions::default())
                .on_progress(progress_printer());
            let bytes = session.run(&local).await;
            finish_progress();
            let bytes = bytes?;
            println!("downloaded remote/{remote} => {} ({bytes} bytes)", local.display());
            report_checksum(client, &remote, &local).await?;
        }
        Command::Upload { local, remote } => {
            if !local.is_file() {
                println!("local file not found: {}", local.display());
                return Ok(());
            }
            let mut session = UploadSession::new(client, remote.as_str(), TransferOptions::default())
                .on_progress(progress_printer());
            let bytes = session.run(&local).await;
            finish_progress();
            let bytes = bytes?;
            println!("uploaded {} => remote/{remote} ({bytes} bytes)", local.display());
            report_checksum(client, &remote, &local).await?;
        }
        Command::Remove(path) => {
            let message = client.delete(&path).await?;
            println!("{message}");
        }
        Command::Sum(path) => {
            let digest = client.checksum(&path, DigestAlgorithm::Sha256).await?;
            println!("{digest}  remote/{path}");
        }
        Command::Help | Command::Exit | Command::Nothing => {}
    }
    Ok(())
}

async fn report_checksum(
    client: &WsClient,
    remote: &str,
    local: &Path,
) -> Result<(), TransferError> {
    if verify_remote_checksum(client, remote, local).await? {
        println!("checksum verified");
    } else {
        println!("warning: checksum mismatch between {} and remote/{remote}", local.display());
    }
    Ok(())
}

/// Prints whole-percent steps on a single line.
fn progress_printer() -> bigfs_transfer::ProgressCallback {
    let mut last = None;
    Box::new(move |p: &TransferProgress| {
        let pct = p.percent().floor() as u32;
        if last != Some(pct) {
            last = Some(pct);
            print!("\rprogress: {:>3}%", pct);
            let _ = std::io::stdout().flush();
        }
    })
}

fn finish_progress() {
    println!();
}

/// User-facing text for a failed command.
fn present(err: &TransferError) -> String {
    match err {
        TransferError::Remote { kind, message } => match kind {
            ErrorKind::PathEscape => "that path is outside the shared directory".into(),
            ErrorKind::NotFound => format!("not found on the server ({message})"),
            ErrorKind::NotADirectory => format!("not a directory ({message})"),
            ErrorKind::HashMismatch | ErrorKind::DecodeError => {
                format!("a chunk was corrupted in transit, retry the copy ({message})")
            }
            _ => format!("{kind}: {message}"),
        },
        TransferError::Transport(msg) => format!("server unavailable: {msg}"),
        other => other.to_string(),
    }
}
