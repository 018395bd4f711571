use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::app::{CardBatchResult, ProgressEvent, ProgressSink, SetBatchResult, SetListResult};
use crate::config::Settings;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sets(result: &SetListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_set_batch(result: &SetBatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_card_batch(result: &CardBatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_settings(settings: &Settings) -> io::Result<()> {
        Self::print_json(settings)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Stdout is reserved for the final JSON document; progress only goes to
/// the debug log.
impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        debug!(elapsed = ?event.elapsed, "{}", event.message);
    }
}
