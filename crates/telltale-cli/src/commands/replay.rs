//! Replay command - Send recorded records through a tracker again.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use telltale::prelude::*;
use telltale_record::glyph;

use crate::OutputFormat;
use crate::commands::{print_json, read_records};

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the JSON-lines record file
    #[arg(required = true)]
    pub file: PathBuf,

    /// Only replay records with this name
    #[arg(long)]
    pub name: Option<String>,
}

/// Execute the replay command.
pub async fn execute(
    args: ReplayArgs,
    settings: &TrackerSettings,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let records = read_records(&args.file)?;
    let stats = Arc::new(StatsDelegate::new(Arc::new(LoggingDelegate::new())));

    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_settings(settings)
        .with_delegate(stats.clone())
        .build()
        .context("Invalid tracker settings")?;

    let mut replayed = 0usize;
    for delivery in records.deliveries {
        if args
            .name
            .as_deref()
            .is_some_and(|name| name != delivery.record.name())
        {
            continue;
        }
        replay(&tracker, delivery).await;
        replayed += 1;
    }
    info!(
        file = %args.file.display(),
        replayed,
        malformed = records.malformed,
        "Replay finished"
    );

    let snapshot = stats.snapshot();
    match format {
        OutputFormat::Human => {
            if !quiet {
                println!("Replayed {replayed} record(s) from {}", args.file.display());
                if records.malformed > 0 {
                    println!("Skipped {} malformed line(s)", records.malformed);
                }
            }
            print!("{}", snapshot.to_text());
        }
        _ => print_json(&snapshot, format)?,
    }
    Ok(())
}

/// Send one delivery through the operation that would have produced it.
async fn replay(tracker: &Tracker, delivery: Delivery) {
    let event = match delivery.record {
        Record::Error(report) => {
            tracker.error(report).await;
            return;
        }
        Record::Event(event) => event,
    };

    let props = event.payload().cloned();
    match delivery.method {
        DelegateMethod::Log => {
            let sign = event.sign.as_deref();
            let status = sign != Some(glyph::LOG.failure) && sign != Some(glyph::WARN.failure);
            let is_warning = sign.is_some_and(|s| s == glyph::WARN.success || s == glyph::WARN.failure);

            let mut entry = LogEntry::new(event.name, event.reason.unwrap_or_default())
                .with_status(status);
            entry.msg = event.msg;
            entry.props = props;
            if is_warning {
                tracker.warn(entry).await;
            } else {
                tracker.log(entry).await;
            }
        }
        method => {
            let args = EventArgs {
                reason: event.reason,
                sign: event.sign,
                msg: event.msg,
                props,
                status: method != DelegateMethod::EventFailure,
            };
            tracker.event(event.name, args).await;
        }
    }
}
