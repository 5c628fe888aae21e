//! Shared test helpers.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::DiagResult;
use crate::events::{DiagnosticEvent, EventSink};

/// Sink that records every event for later assertions.
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all events sent so far, in order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: DiagnosticEvent) -> DiagResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
