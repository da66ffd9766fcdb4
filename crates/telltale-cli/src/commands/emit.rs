//! Emit command - Report a single record.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde_json::Value;

use telltale::prelude::*;
use telltale_observe::shared;

use crate::OutputFormat;
use crate::commands::print_json;

/// What to report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EmitKind {
    /// A named event
    #[default]
    Event,
    /// A free-form log entry
    Log,
    /// A free-form warning entry
    Warn,
    /// A captured error
    Error,
}

/// Arguments for the emit command.
#[derive(Args)]
pub struct EmitArgs {
    /// Kind of record
    #[arg(short, long, value_enum, default_value = "event")]
    pub kind: EmitKind,

    /// Record name (the error message for errors)
    #[arg(required = true)]
    pub name: String,

    /// Reason; required for log and warn entries
    #[arg(short, long)]
    pub reason: Option<String>,

    /// Message
    #[arg(short, long)]
    pub msg: Option<String>,

    /// Override the status glyph
    #[arg(long)]
    pub sign: Option<String>,

    /// Report a failure instead of a success
    #[arg(long)]
    pub failed: bool,

    /// Payload entry as key=value; values are read as JSON when they parse
    #[arg(short, long = "prop", value_name = "KEY=VALUE")]
    pub props: Vec<String>,

    /// Extended details (errors only)
    #[arg(long)]
    pub details: Option<String>,
}

/// Execute the emit command.
pub async fn execute(args: EmitArgs, settings: &TrackerSettings, format: OutputFormat) -> Result<()> {
    let collector = Arc::new(CollectingDelegate::default());
    let delegate = FanoutDelegate::new()
        .with(shared(LoggingDelegate::new()))
        .with(collector.clone());

    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_settings(settings)
        .with_delegate(Arc::new(delegate))
        .build()
        .context("Invalid tracker settings")?;

    let props = parse_props(&args.props)?;
    emit(&tracker, args, props).await?;

    let deliveries = collector.deliveries();
    match format {
        OutputFormat::Human => {
            if deliveries.is_empty() {
                println!("Nothing was delivered (reporting disabled)");
            }
            for delivery in &deliveries {
                println!("{}", delivery.summary());
            }
        }
        OutputFormat::Json => print_json(&deliveries, format)?,
        OutputFormat::JsonCompact => {
            for delivery in &deliveries {
                print_json(delivery, format)?;
            }
        }
    }
    Ok(())
}

async fn emit(tracker: &Tracker, args: EmitArgs, props: Option<Props>) -> Result<()> {
    let status = !args.failed;
    match args.kind {
        EmitKind::Event => {
            let mut event = EventArgs::new().with_status(status);
            event.reason = args.reason;
            event.msg = args.msg;
            event.sign = args.sign;
            event.props = props;
            tracker.event(args.name, event).await;
        }
        EmitKind::Log | EmitKind::Warn => {
            let Some(reason) = args.reason else {
                bail!("--reason is required for log and warn entries");
            };
            let mut entry = LogEntry::new(args.name, reason).with_status(status);
            entry.msg = args.msg;
            entry.props = props;
            if args.kind == EmitKind::Log {
                tracker.log(entry).await;
            } else {
                tracker.warn(entry).await;
            }
        }
        EmitKind::Error => {
            let mut report = ErrorReport::create(args.name);
            if let Some(sign) = args.sign {
                report = report.with_sign(sign);
            }
            if let Some(details) = args.details.or(args.msg) {
                report = report.with_details(details);
            }
            tracker.error(report).await;
        }
    }
    Ok(())
}

/// Parse `key=value` pairs into a payload.
pub fn parse_props(pairs: &[String]) -> Result<Option<Props>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut props = Props::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Invalid property '{pair}', expected KEY=VALUE");
        };
        if key.is_empty() {
            bail!("Invalid property '{pair}', key is empty");
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        props.insert(key.to_string(), Prop::from(value));
    }
    Ok(Some(props))
}
