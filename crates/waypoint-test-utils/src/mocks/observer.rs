use parking_lot::Mutex;
use std::sync::Arc;
use waypoint_core::{Delivery, EventObserver, FlowEvent};

/// Observer that keeps every `(event, delivery)` pair it is given
///
/// Clones share the same record, so a test can hand one clone to a runner
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    records: Arc<Mutex<Vec<(FlowEvent, Delivery)>>>,
}

impl RecordingObserver {
    /// An observer with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first
    pub fn records(&self) -> Vec<(FlowEvent, Delivery)> {
        self.records.lock().clone()
    }

    /// Names of the observed events, oldest first
    pub fn event_names(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|(event, _)| event.name.clone())
            .collect()
    }

    /// Events that escaped the flow unhandled
    pub fn bubbled(&self) -> Vec<FlowEvent> {
        self.records
            .lock()
            .iter()
            .filter_map(|(_, delivery)| match delivery {
                Delivery::Bubbled(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent record
    pub fn last(&self) -> Option<(FlowEvent, Delivery)> {
        self.records.lock().last().cloned()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EventObserver for RecordingObserver {
    fn on_event(&mut self, event: &FlowEvent, delivery: &Delivery) {
        self.records.lock().push((event.clone(), delivery.clone()));
    }
}
