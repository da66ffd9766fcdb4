//! Inspect command - Summarize a record file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use telltale_observe::Delivery;

use crate::OutputFormat;
use crate::commands::{print_json, read_records};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Path to the JSON-lines record file
    #[arg(required = true)]
    pub file: PathBuf,

    /// List every record
    #[arg(long, short)]
    pub all: bool,
}

/// Inspection result.
#[derive(Debug, Serialize)]
struct InspectionResult {
    path: String,
    records: usize,
    malformed: usize,
    methods: BTreeMap<String, usize>,
    names: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deliveries: Option<Vec<Delivery>>,
}

impl InspectionResult {
    fn new(path: String, deliveries: Vec<Delivery>, malformed: usize, all: bool) -> Self {
        let mut methods = BTreeMap::new();
        let mut names = BTreeMap::new();
        for delivery in &deliveries {
            *methods.entry(delivery.method.as_str().to_string()).or_insert(0) += 1;
            *names.entry(delivery.record.name().to_string()).or_insert(0) += 1;
        }

        let received = deliveries.iter().map(|d| d.received_at);
        let first_received = received.clone().min().map(|t| t.to_rfc3339());
        let last_received = received.max().map(|t| t.to_rfc3339());

        Self {
            path,
            records: deliveries.len(),
            malformed,
            methods,
            names,
            first_received,
            last_received,
            deliveries: all.then_some(deliveries),
        }
    }

    fn to_text(&self) -> String {
        let mut out = format!("File: {}\n", self.path);
        out.push_str(&format!("Records: {}\n", self.records));
        if self.malformed > 0 {
            out.push_str(&format!("Malformed lines: {}\n", self.malformed));
        }
        if let (Some(first), Some(last)) = (&self.first_received, &self.last_received) {
            out.push_str(&format!("Received: {first} .. {last}\n"));
        }
        out.push_str("By method:\n");
        for (method, count) in &self.methods {
            out.push_str(&format!("  {method}: {count}\n"));
        }
        out.push_str("By name:\n");
        for (name, count) in &self.names {
            out.push_str(&format!("  {name}: {count}\n"));
        }
        if let Some(deliveries) = &self.deliveries {
            out.push_str("Deliveries:\n");
            for delivery in deliveries {
                out.push_str(&format!("  {}\n", delivery.summary()));
            }
        }
        out
    }
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let records = read_records(&args.file)?;
    let result = InspectionResult::new(
        args.file.display().to_string(),
        records.deliveries,
        records.malformed,
        args.all,
    );

    match format {
        OutputFormat::Human => print!("{}", result.to_text()),
        _ => print_json(&result, format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use telltale_core::DelegateMethod;
    use telltale_record::{ErrorReport, Event};

    #[test]
    fn test_inspection_counts() {
        let deliveries = vec![
            Delivery::event(DelegateMethod::Event, &Event::create("signup")),
            Delivery::event(DelegateMethod::EventFailure, &Event::create("signup")),
            Delivery::error(&ErrorReport::create("disk full")),
        ];

        let result = InspectionResult::new("records.jsonl".to_string(), deliveries, 2, false);

        assert_eq!(result.records, 3);
        assert_eq!(result.methods["event_failure"], 1);
        assert_eq!(result.names["signup"], 2);
        assert!(result.deliveries.is_none());
        let text = result.to_text();
        assert!(text.contains("Malformed lines: 2"));
        assert!(text.contains("  error: 1"));
    }
}
