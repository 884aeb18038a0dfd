//! Failure-isolated deck façade and the slot table to key visuals mapping.

use deck_integration::{DeckBackend, DeckError, DeckInput, KeySize, Rgb};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    artwork::{compose_key_image, ArtworkSet},
    catalog::QueuedEvent,
    launcher::LauncherInput,
    slots::SlotTable,
};

pub const ACTIVE_COLOR: Rgb = Rgb::new(40, 167, 69);
pub const READY_COLOR: Rgb = Rgb::new(220, 53, 69);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPalette {
    pub active: Rgb,
    pub ready: Rgb,
}

impl Default for KeyPalette {
    fn default() -> Self {
        Self {
            active: ACTIVE_COLOR,
            ready: READY_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyVisual {
    Clear,
    Color(Rgb),
    /// Raw RGB bytes sized for the deck's keys.
    Image(Vec<u8>),
}

/// Computes what every key should show for `table`.
pub fn plan_render(
    table: &SlotTable,
    artwork: &ArtworkSet,
    palette: KeyPalette,
    key_size: KeySize,
) -> Vec<KeyVisual> {
    table
        .iter()
        .map(|slot| match slot {
            None => KeyVisual::Clear,
            Some(entry) => plan_occupied_key(entry, artwork, palette, key_size),
        })
        .collect()
}

fn plan_occupied_key(
    entry: &QueuedEvent,
    artwork: &ArtworkSet,
    palette: KeyPalette,
    key_size: KeySize,
) -> KeyVisual {
    let color = if entry.event.is_active() {
        palette.active
    } else {
        palette.ready
    };

    let Some(preview) = entry
        .event
        .preview_url
        .as_ref()
        .and_then(|url| artwork.get(url))
    else {
        return KeyVisual::Color(color);
    };

    match compose_key_image(preview, color, key_size) {
        Ok(rgb) => KeyVisual::Image(rgb),
        Err(err) => {
            warn!(event_id = %entry.event.id, error = %err, "render: falling back to flat color");
            KeyVisual::Color(color)
        }
    }
}

/// Owns the deck handle. Any device error drops the handle, after which
/// every call is a no-op until the process restarts.
pub struct DeviceController {
    backend: Option<Box<dyn DeckBackend>>,
}

impl DeviceController {
    pub fn new(backend: Box<dyn DeckBackend>) -> Self {
        info!(keys = backend.key_count(), "deck: attached");
        Self {
            backend: Some(backend),
        }
    }

    pub fn absent() -> Self {
        Self { backend: None }
    }

    pub fn is_present(&self) -> bool {
        self.backend.is_some()
    }

    pub fn key_count(&self) -> Option<usize> {
        self.backend.as_ref().map(|backend| backend.key_count())
    }

    pub fn key_size(&self) -> Option<KeySize> {
        self.backend.as_ref().map(|backend| backend.key_size())
    }

    pub fn clear_key(&mut self, key: u8) {
        if self.key_in_range(key) {
            self.with_backend("clear_key", |deck| deck.clear_key(key));
        }
    }

    pub fn clear_all_keys(&mut self) {
        self.with_backend("clear_all_keys", |deck| deck.clear_all_keys());
    }

    pub fn fill_color(&mut self, key: u8, color: Rgb) {
        if self.key_in_range(key) {
            self.with_backend("fill_color", |deck| deck.fill_color(key, color));
        }
    }

    pub fn fill_image(&mut self, key: u8, rgb: &[u8]) {
        if self.key_in_range(key) {
            self.with_backend("fill_image", |deck| deck.fill_image(key, rgb));
        }
    }

    pub fn set_brightness(&mut self, percent: u8) {
        self.with_backend("set_brightness", |deck| deck.set_brightness(percent.min(100)));
    }

    /// Forwards key-ups and device errors into the launcher's input queue.
    pub fn subscribe(&mut self, inputs: mpsc::UnboundedSender<LauncherInput>) {
        self.with_backend("subscribe", move |deck| {
            deck.subscribe(Box::new(move |input| {
                let input = match input {
                    DeckInput::KeyUp(key) => LauncherInput::KeyUp(key),
                    DeckInput::Error(message) => LauncherInput::DeviceError(message),
                };
                let _ = inputs.send(input);
            }))
        });
    }

    /// Applies one visual per key, starting at key 0.
    pub fn render(&mut self, visuals: &[KeyVisual]) {
        for (index, visual) in visuals.iter().enumerate() {
            if !self.is_present() {
                return;
            }
            let Ok(key) = u8::try_from(index) else {
                break;
            };
            match visual {
                KeyVisual::Clear => self.clear_key(key),
                KeyVisual::Color(color) => self.fill_color(key, *color),
                KeyVisual::Image(rgb) => self.fill_image(key, rgb),
            }
        }
    }

    /// Drops the device after an asynchronous error report.
    pub fn disconnect(&mut self, reason: &str) {
        if self.backend.take().is_some() {
            error!(reason, "deck: device reported an error, continuing without device");
        }
    }

    fn key_in_range(&self, key: u8) -> bool {
        match self.key_count() {
            Some(count) if usize::from(key) < count => true,
            Some(count) => {
                debug!(key, key_count = count, "deck: ignoring key outside the device");
                false
            }
            None => false,
        }
    }

    fn with_backend<F>(&mut self, operation: &'static str, f: F)
    where
        F: FnOnce(&mut dyn DeckBackend) -> Result<(), DeckError>,
    {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if let Err(err) = f(backend.as_mut()) {
            error!(operation, error = %err, "deck: lost connection, continuing without device");
            self.backend = None;
        }
    }
}

#[cfg(test)]
#[path = "tests/device_tests.rs"]
mod tests;
