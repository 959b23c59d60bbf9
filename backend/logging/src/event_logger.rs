//! Pipeline Event Logger
//!
//! Typed events (mapping calls, contract issues, record writes, operator
//! edits) serialized into the tracing stream under `pipeline_events`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    MappingRequested {
        shape: String,
        provider: String,
        letters: usize,
    },
    MappingCompleted {
        shape: String,
        mapped: usize,
        unresolved: usize,
        issues: usize,
        latency_ms: u64,
    },
    ContractViolation {
        shape: String,
        detail: String,
    },
    ProviderFailed {
        provider: String,
        error: String,
    },
    RecordWritten {
        order_id: String,
        path: String,
    },
    OperatorEdit {
        order_id: String,
        page: u32,
        line: u32,
        letter: String,
        value: Option<f64>,
    },
}

impl PipelineEvent {
    fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineEvent::ContractViolation { .. } | PipelineEvent::ProviderFailed { .. }
        )
    }

    fn redact(&mut self) {
        match self {
            PipelineEvent::ContractViolation { detail, .. } => {
                *detail = redact_sensitive_data(detail);
            }
            PipelineEvent::ProviderFailed { error, .. } => {
                *error = redact_sensitive_data(error);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineLogEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct PipelineEventLogger;

impl PipelineEventLogger {
    /// Build the redacted entry that `log_event` writes.
    pub fn entry(run_id: Uuid, mut event: PipelineEvent) -> PipelineLogEntry {
        event.redact();
        PipelineLogEntry {
            run_id,
            timestamp: Utc::now(),
            event,
        }
    }

    /// Log a pipeline event; failures go out at WARN.
    pub fn log_event(run_id: Uuid, event: PipelineEvent) {
        let entry = Self::entry(run_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_else(|e| format!("{entry:?} ({e})"));
        if entry.event.is_failure() {
            warn!(target: "pipeline_events", run_id = %run_id, event = %json, "Pipeline event");
        } else {
            info!(target: "pipeline_events", run_id = %run_id, event = %json, "Pipeline event");
        }
    }
}
