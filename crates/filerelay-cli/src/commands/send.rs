//! `send` command: offer files to an online user.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::mpsc;

use filerelay_core::error::{AppError, ErrorKind};
use filerelay_core::traits::TransferLog;
use filerelay_core::types::PublicProfile;
use filerelay_realtime::OutboundMessage;
use filerelay_transfer::{HttpTransferLog, NoopTransferLog, OutgoingFile, ProgressUpdate, SenderSession};

use super::{Context, parse_user_id};
use crate::client;
use crate::output;

/// Arguments for the send command
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Your user id
    #[arg(short, long)]
    pub user: String,

    /// Recipient user id
    #[arg(long)]
    pub to: String,

    /// Files to send, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the send command
pub async fn execute(args: &SendArgs, ctx: &Context) -> Result<(), AppError> {
    let me = parse_user_id(&args.user)?;
    let to = parse_user_id(&args.to)?;
    let files = read_files(&args.files).await?;

    let mut conn =
        client::connect(&ctx.server, ctx.token.as_deref(), ctx.config.realtime.channel_buffer_size)
            .await?;
    let roster = conn.join(&me).await?;
    let profile = roster
        .iter()
        .find(|p| p.id == me)
        .cloned()
        .unwrap_or_else(|| PublicProfile::anonymous(&me));

    // Keep the reader flowing; only NACKs and errors matter to a sender.
    if let Some(mut events) = conn.take_events() {
        tokio::spawn(async move {
            while let Some(msg) = events.recv().await {
                match msg {
                    OutboundMessage::Undeliverable { to, event } => {
                        output::print_warning(&format!("'{event}' was not delivered to {to}"));
                    }
                    OutboundMessage::Error { code, message } => {
                        output::print_error(&format!("{code}: {message}"));
                    }
                    _ => {}
                }
            }
        });
    }

    let log: Arc<dyn TransferLog> = match &ctx.config.transfer.history_url {
        Some(url) => Arc::new(HttpTransferLog::new(url.clone(), ctx.token.clone())),
        None => Arc::new(NoopTransferLog),
    };

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressUpdate>();
    let printer = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            output::print_progress(&update.file_name, update.percent);
        }
    });

    let mut session = SenderSession::new(conn.link(), profile, log, ctx.config.transfer.clone())
        .with_progress(progress_tx);
    let result = session.send_batch(&to, files).await;
    drop(session);
    let _ = printer.await;
    conn.close().await;

    let report = result?;
    println!();
    output::print_success(&format!("Sent {} file(s) to {}", report.sent.len(), to));
    output::print_kv("Batch", &report.batch_id.to_string());
    for name in &report.sent {
        output::print_kv("Sent", name);
    }
    for name in &report.skipped {
        output::print_warning(&format!("Skipped empty file '{name}'"));
    }

    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<OutgoingFile>, AppError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read {}", path.display()),
                e,
            )
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        files.push(OutgoingFile::new(name, mime_type, data));
    }
    Ok(files)
}
