//! Terminal output for research events.

use anyhow::Result;
use std::io::Write;

use deepr_research::ResearchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Status lines on stderr, the report on stdout
    Text,
    /// One JSON object per event on stdout
    Json,
}

pub struct EventRenderer<O, E> {
    mode: OutputMode,
    out: O,
    err: E,
}

impl<O: Write, E: Write> EventRenderer<O, E> {
    pub fn new(mode: OutputMode, out: O, err: E) -> Self {
        Self { mode, out, err }
    }

    pub fn render(&mut self, event: &ResearchEvent) -> Result<()> {
        match self.mode {
            OutputMode::Json => {
                writeln!(self.out, "{}", serde_json::to_string(event)?)?;
            }
            OutputMode::Text => {
                writeln!(self.err, "==> {}", event.status)?;
                if event.is_final() && !event.report.is_empty() {
                    writeln!(self.out, "\n{}", event.report.trim_end())?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
