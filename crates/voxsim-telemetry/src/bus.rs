//! Event bus: channel-backed event dispatch with pluggable sinks.
//!
//! Producers call [`EventBus::emit`], which only enqueues. Sinks see the
//! events when the owner calls [`EventBus::flush`], typically once per
//! step or at the end of a run.

use std::sync::mpsc;

use crate::events::SimulationEvent;
use crate::sinks::EventSink;

pub struct EventBus {
    sender: mpsc::Sender<SimulationEvent>,
    receiver: mpsc::Receiver<SimulationEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// A disabled bus drops events on emit.
    enabled: bool,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A sender for producers on other threads. Events sent through it
    /// bypass the enabled flag.
    pub fn sender(&self) -> mpsc::Sender<SimulationEvent> {
        self.sender.clone()
    }

    pub fn emit(&self, event: SimulationEvent) {
        if !self.enabled {
            return;
        }
        // The receiver lives as long as the bus.
        let _ = self.sender.send(event);
    }

    /// Delivers all pending events to every sink, in order. Returns the
    /// number of events delivered.
    pub fn flush(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.receiver.try_recv() {
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
            delivered += 1;
        }
        delivered
    }

    /// Flushes, then lets every sink finalize.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
