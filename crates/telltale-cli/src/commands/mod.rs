//! Command implementations and the helpers they share.

pub mod emit;
pub mod inspect;
pub mod replay;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use telltale_core::{DelegateMethod, TrackerSettings};
use telltale_observe::Delivery;
use telltale_record::{ErrorReport, Event};

use crate::OutputFormat;

/// Load tracker settings from a TOML file, or defaults without one.
pub fn load_settings(path: Option<&Path>) -> Result<TrackerSettings> {
    let Some(path) = path else {
        return Ok(TrackerSettings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

/// The deliveries read from a record file.
#[derive(Debug, Default)]
pub struct RecordFile {
    pub deliveries: Vec<Delivery>,
    /// Lines that held neither a delivery nor a record.
    pub malformed: usize,
}

/// Read a JSON-lines record file.
///
/// Each line is either a delivery as printed by `telltale emit -f
/// json-compact`, or a bare record map. Bare maps with a `name` are taken as
/// events, other maps as error reports.
pub fn read_records(path: &Path) -> Result<RecordFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file {}", path.display()))?;
    Ok(parse_records(&text))
}

fn parse_records(text: &str) -> RecordFile {
    let mut file = RecordFile::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_line(line) {
            Some(delivery) => file.deliveries.push(delivery),
            None => file.malformed += 1,
        }
    }
    file
}

fn parse_line(line: &str) -> Option<Delivery> {
    if let Ok(delivery) = serde_json::from_str::<Delivery>(line) {
        return Some(delivery);
    }

    let value: Value = serde_json::from_str(line).ok()?;
    let map = value.as_object()?;
    if map.contains_key("name") {
        let event = Event::parse(&value);
        (!event.is_empty()).then(|| Delivery::event(DelegateMethod::Event, &event))
    } else {
        let report = ErrorReport::parse(&value);
        (!report.is_empty()).then(|| Delivery::error(&report))
    }
}

/// Print a value in a machine-readable format.
pub fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::JsonCompact => serde_json::to_string(value)?,
        _ => serde_json::to_string_pretty(value)?,
    };
    println!("{text}");
    Ok(())
}
