//! Harvest progress reporting.
//!
//! The orchestrator emits a [`HarvestEvent`] per source and per matched
//! file. Reporters render them on **stdout**, as human-readable lines or as
//! one JSON object per line (`--json`). Warnings about skipped work go
//! through `tracing` on stderr, so stdout stays parseable.

use std::io::Write;

use crate::models::HarvestResult;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum HarvestEvent {
    /// Work on a source begins.
    SourceStarted {
        source: String,
        kind: &'static str,
        reference: String,
    },
    /// A matched file reached the sink.
    Delivered {
        source: String,
        path: String,
        destination: String,
    },
    /// A matched file could not be fetched or written.
    FileSkipped {
        source: String,
        path: String,
        error: String,
    },
    /// A source could not be cloned or walked.
    SourceFailed { source: String, error: String },
    /// The whole harvest finished.
    Done {
        result: HarvestResult,
        output: Option<String>,
    },
}

/// Receives harvest events.
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent);
}

/// Which tool's wording human output uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryStyle {
    /// `Added: <source>/<path>` lines.
    Archive,
    /// `Copied <org>/<repo>:<path>` lines.
    Feed,
}

/// Human-friendly lines on stdout.
pub struct HumanReporter {
    style: DeliveryStyle,
}

impl HumanReporter {
    pub fn new(style: DeliveryStyle) -> Self {
        Self { style }
    }
}

impl HarvestReporter for HumanReporter {
    fn report(&self, event: HarvestEvent) {
        if let Some(line) = human_line(&event, self.style) {
            let _ = writeln!(std::io::stdout().lock(), "{}", line);
        }
    }
}

/// Machine-readable progress: one JSON object per line on stdout.
pub struct JsonReporter;

impl HarvestReporter for JsonReporter {
    fn report(&self, event: HarvestEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
}

/// Discards every event.
pub struct NoProgress;

impl HarvestReporter for NoProgress {
    fn report(&self, _event: HarvestEvent) {}
}

fn human_line(event: &HarvestEvent, style: DeliveryStyle) -> Option<String> {
    match (event, style) {
        (HarvestEvent::SourceStarted { .. }, DeliveryStyle::Feed) => None,
        (
            HarvestEvent::SourceStarted {
                kind, reference, ..
            },
            DeliveryStyle::Archive,
        ) => Some(match *kind {
            "remote" => format!("Fetching {} via API...", reference),
            "git" => format!("Cloning {}...", reference),
            _ => format!("Processing local repo {}...", reference),
        }),
        (HarvestEvent::Delivered { destination, .. }, DeliveryStyle::Archive) => {
            Some(format!("Added: {}", destination))
        }
        (HarvestEvent::Delivered { source, path, .. }, DeliveryStyle::Feed) => {
            Some(format!("Copied {}:{}", source, path))
        }
        (HarvestEvent::FileSkipped { .. } | HarvestEvent::SourceFailed { .. }, _) => None,
        (HarvestEvent::Done { result, .. }, DeliveryStyle::Feed) => {
            Some(format!("\nCopied {} feed file(s)", result.delivered))
        }
        (HarvestEvent::Done { result, output }, DeliveryStyle::Archive) => Some(format!(
            "Created {} with {} file(s)",
            output.as_deref().unwrap_or("archive"),
            result.delivered
        )),
    }
}

fn json_event(event: &HarvestEvent) -> serde_json::Value {
    match event {
        HarvestEvent::SourceStarted {
            source,
            kind,
            reference,
        } => serde_json::json!({
            "event": "source_started",
            "source": source,
            "kind": kind,
            "reference": reference,
        }),
        HarvestEvent::Delivered {
            source,
            path,
            destination,
        } => serde_json::json!({
            "event": "delivered",
            "source": source,
            "path": path,
            "destination": destination,
        }),
        HarvestEvent::FileSkipped {
            source,
            path,
            error,
        } => serde_json::json!({
            "event": "file_skipped",
            "source": source,
            "path": path,
            "error": error,
        }),
        HarvestEvent::SourceFailed { source, error } => serde_json::json!({
            "event": "source_failed",
            "source": source,
            "error": error,
        }),
        HarvestEvent::Done { result, output } => serde_json::json!({
            "event": "done",
            "delivered": result.delivered,
            "skipped_files": result.skipped_files,
            "failed_sources": result.failed_sources,
            "output": output,
        }),
    }
}

/// Output mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Human,
    Json,
}

impl ProgressMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            ProgressMode::Json
        } else {
            ProgressMode::Human
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self, style: DeliveryStyle) -> Box<dyn HarvestReporter> {
        match self {
            ProgressMode::Human => Box::new(HumanReporter::new(style)),
            ProgressMode::Json => Box::new(JsonReporter),
        }
    }
}
