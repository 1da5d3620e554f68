//! `receive` command: wait for incoming files.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::mpsc;

use filerelay_core::error::AppError;
use filerelay_core::traits::OfferDecider;
use filerelay_transfer::{
    AutoAccept, AutoReject, DirectorySink, PromptDecider, ReceiverDriver, ReceiverNotice,
};

use super::{Context, parse_user_id};
use crate::client;
use crate::output;

/// Arguments for the receive command
#[derive(Debug, Args)]
pub struct ReceiveArgs {
    /// Your user id
    #[arg(short, long)]
    pub user: String,

    /// Accept every offer without asking
    #[arg(long, conflicts_with = "reject_all")]
    pub auto_accept: bool,

    /// Reject every offer without asking
    #[arg(long)]
    pub reject_all: bool,

    /// Directory for received files (defaults to transfer.download_dir)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Execute the receive command
pub async fn execute(args: &ReceiveArgs, ctx: &Context) -> Result<(), AppError> {
    let me = parse_user_id(&args.user)?;
    let dir = args
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&ctx.config.transfer.download_dir));

    let decider: Arc<dyn OfferDecider> = if args.auto_accept {
        Arc::new(AutoAccept)
    } else if args.reject_all {
        Arc::new(AutoReject)
    } else {
        Arc::new(PromptDecider)
    };

    let mut conn =
        client::connect(&ctx.server, ctx.token.as_deref(), ctx.config.realtime.channel_buffer_size)
            .await?;
    let roster = conn.join(&me).await?;
    let events = conn
        .take_events()
        .ok_or_else(|| AppError::internal("Event stream unavailable"))?;

    output::print_success(&format!(
        "Joined as {} ({} online), saving to {}",
        me,
        roster.len(),
        dir.display()
    ));

    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let driver = ReceiverDriver::new(decider, Arc::new(DirectorySink::new(dir)), &ctx.config.transfer)
        .with_notices(notice_tx);
    let mut driver_task = tokio::spawn(driver.run(events));

    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Some(notice) => print_notice(notice),
                None => break,
            },
            _ = &mut driver_task => {
                output::print_warning("Relay connection closed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    conn.close().await;
    driver_task.abort();
    Ok(())
}

fn print_notice(notice: ReceiverNotice) {
    match notice {
        ReceiverNotice::Offered(offer) => {
            let from = offer
                .meta
                .sender
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| offer.from.to_string());
            output::print_kv("Offer", &format!("'{}' from {}", offer.meta.name, from));
        }
        ReceiverNotice::Accepted(offer) => output::print_kv("Accepted", &offer.meta.name),
        ReceiverNotice::Rejected(offer) => output::print_kv("Rejected", &offer.meta.name),
        ReceiverNotice::Progress {
            file_name,
            received,
            size,
        } => {
            let percent = if size == 0 {
                0
            } else {
                (received.saturating_mul(100) / size).min(99) as u8
            };
            output::print_progress(&file_name, percent);
        }
        ReceiverNotice::Saved {
            file_name,
            from,
            location,
        } => {
            output::print_progress(&file_name, 100);
            output::print_success(&format!("Saved '{file_name}' from {from} to {location}"));
        }
        ReceiverNotice::Aborted { file_name, reason } => {
            println!();
            output::print_warning(&format!("'{file_name}' aborted: {reason}"));
        }
        ReceiverNotice::Failed(e) => output::print_error(&e.to_string()),
    }
}
