use std::sync::{Arc, Mutex};

use deck_integration::{DeckBackend, DeckError, DeckInput, DeckInputSink, KeySize, Rgb};
use shared::domain::{Event, EventId, EventPhase, ProductionId};

use crate::catalog::{Catalog, QueuedEvent};

pub fn ready(id: &str) -> Event {
    Event {
        id: EventId::new(id),
        name: format!("Event {id}"),
        phase: EventPhase::Ready,
        preview_url: None,
        parameters: Vec::new(),
        trigger: true,
        modify: false,
        longdesc: None,
        verb: None,
    }
}

pub fn active_instance(template: &str, instance: u32) -> Event {
    Event {
        id: EventId::new(format!("{template}-{instance}")),
        phase: EventPhase::Active {
            production_id: None,
        },
        ..ready(template)
    }
}

pub fn active_with_production(id: &str, production_id: &str) -> Event {
    Event {
        id: EventId::new(id),
        phase: EventPhase::Active {
            production_id: Some(ProductionId::new(production_id)),
        },
        ..ready(id)
    }
}

pub fn catalog(ids: &[&str]) -> Catalog {
    Catalog::from_events(ids.iter().map(|id| ready(id)).collect())
}

pub fn queued(id: &str) -> QueuedEvent {
    QueuedEvent {
        key: EventId::new(id),
        event: ready(id),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckCall {
    Clear(u8),
    ClearAll,
    Color(u8, Rgb),
    Image(u8, usize),
    Brightness(u8),
    Subscribe,
}

/// In-memory deck that records calls and can be told to start failing.
#[derive(Clone, Default)]
pub struct RecordingDeck {
    pub calls: Arc<Mutex<Vec<DeckCall>>>,
    pub fail: Arc<Mutex<bool>>,
    pub sink: Arc<Mutex<Option<DeckInputSink>>>,
    pub key_count: usize,
}

impl RecordingDeck {
    pub fn new(key_count: usize) -> Self {
        Self {
            key_count,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DeckCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn take_calls(&self) -> Vec<DeckCall> {
        std::mem::take(&mut *self.calls.lock().expect("calls"))
    }

    pub fn start_failing(&self) {
        *self.fail.lock().expect("fail") = true;
    }

    pub fn press(&self, key: u8) {
        if let Some(sink) = self.sink.lock().expect("sink").as_ref() {
            sink(DeckInput::KeyUp(key));
        }
    }

    pub fn report_error(&self, message: &str) {
        if let Some(sink) = self.sink.lock().expect("sink").as_ref() {
            sink(DeckInput::Error(message.to_string()));
        }
    }

    fn record(&self, call: DeckCall) -> Result<(), DeckError> {
        if *self.fail.lock().expect("fail") {
            return Err(DeckError::Io("device unplugged".to_string()));
        }
        self.calls.lock().expect("calls").push(call);
        Ok(())
    }
}

impl DeckBackend for RecordingDeck {
    fn key_count(&self) -> usize {
        self.key_count
    }

    fn key_size(&self) -> KeySize {
        KeySize::new(8, 8)
    }

    fn clear_key(&mut self, key: u8) -> Result<(), DeckError> {
        self.record(DeckCall::Clear(key))
    }

    fn clear_all_keys(&mut self) -> Result<(), DeckError> {
        self.record(DeckCall::ClearAll)
    }

    fn fill_color(&mut self, key: u8, color: Rgb) -> Result<(), DeckError> {
        self.record(DeckCall::Color(key, color))
    }

    fn fill_image(&mut self, key: u8, rgb: &[u8]) -> Result<(), DeckError> {
        self.record(DeckCall::Image(key, rgb.len()))
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), DeckError> {
        self.record(DeckCall::Brightness(percent))
    }

    fn subscribe(&mut self, sink: DeckInputSink) -> Result<(), DeckError> {
        self.record(DeckCall::Subscribe)?;
        *self.sink.lock().expect("sink") = Some(sink);
        Ok(())
    }
}
