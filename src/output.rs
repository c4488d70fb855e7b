use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::app::{
    CreateWorkflowResult, LoadConfigResult, ProgressEvent, ProgressSink, WorkflowStatus,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_load(result: &LoadConfigResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_workflow(result: &CreateWorkflowResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Plain-text summaries on stdout; progress goes to the log.
pub struct HumanOutput;

impl HumanOutput {
    pub fn print_load(result: &LoadConfigResult) {
        println!(
            "Downloaded config file from record {} as {}.",
            result.recid, result.config_file
        );
    }

    pub fn print_workflow(result: &CreateWorkflowResult) {
        match (result.status, &result.directory) {
            (WorkflowStatus::ConfigError, _) | (_, None) => {}
            (_, Some(directory)) => println!("Created `{directory}` directory."),
        }
    }
}

impl ProgressSink for HumanOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => debug!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => debug!("{}", event.message),
        }
    }
}
