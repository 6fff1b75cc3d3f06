//! Pluggable event sinks.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::events::SimulationEvent;

/// Consumer of bus events.
pub trait EventSink: Send {
    fn handle(&mut self, event: &SimulationEvent);

    /// Called once when the run ends.
    fn finalize(&mut self) {}

    fn name(&self) -> &str;
}

/// Event storage shared between a [`VecSink`] and its creator.
pub type SharedEvents = Arc<Mutex<Vec<SimulationEvent>>>;

/// Collects events in memory. Clone [`VecSink::events`] before handing the
/// sink to a bus to read them back later.
#[derive(Default)]
pub struct VecSink {
    pub events: SharedEvents,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of the events received so far.
    pub fn snapshot(events: &SharedEvents) -> Vec<SimulationEvent> {
        match events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Logs every event through `tracing` at the configured level.
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        match self.level {
            tracing::Level::ERROR | tracing::Level::WARN | tracing::Level::INFO => {
                tracing::info!(step = event.step, event = ?event.kind, "simulation_event")
            }
            tracing::Level::DEBUG => {
                tracing::debug!(step = event.step, event = ?event.kind, "simulation_event")
            }
            tracing::Level::TRACE => {
                tracing::trace!(step = event.step, event = ?event.kind, "simulation_event")
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}

/// Writes one JSON object per event to any writer.
///
/// Write errors are counted rather than propagated; the sink keeps going
/// so a full disk does not stop the simulation.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    failed: usize,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, failed: 0 }
    }

    pub fn failed_writes(&self) -> usize {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn handle(&mut self, event: &SimulationEvent) {
        let written = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if written.is_err() {
            self.failed += 1;
        }
    }

    fn finalize(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, "failed to flush json lines sink");
        }
    }

    fn name(&self) -> &str {
        "json_lines_sink"
    }
}
