//! Capability boundary for button decks.
//!
//! Everything above this crate talks to a [`DeckBackend`]; the `hid` feature
//! provides one backed by a USB Stream Deck.

use thiserror::Error;

#[cfg(feature = "hid")]
pub mod hid;
pub mod worker;

pub use worker::{DeckDevice, DeckWrite, ThreadedDeck};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Pixel dimensions of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySize {
    pub width: u32,
    pub height: u32,
}

impl KeySize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of a raw RGB buffer covering one key.
    pub const fn rgb_len(self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckInput {
    KeyUp(u8),
    Error(String),
}

pub type DeckInputSink = Box<dyn Fn(DeckInput) + Send + 'static>;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("no deck connected")]
    NotFound,
    #[error("key {key} is out of range for a deck with {key_count} keys")]
    KeyOutOfRange { key: u8, key_count: usize },
    #[error("image buffer for key {key} has {actual} bytes, expected {expected}")]
    ImageSize {
        key: u8,
        expected: usize,
        actual: usize,
    },
    #[error("deck i/o failed: {0}")]
    Io(String),
}

/// Raw device operations. Every call may fail once the device is unplugged.
pub trait DeckBackend: Send {
    fn key_count(&self) -> usize;
    fn key_size(&self) -> KeySize;
    fn clear_key(&mut self, key: u8) -> Result<(), DeckError>;
    fn clear_all_keys(&mut self) -> Result<(), DeckError>;
    fn fill_color(&mut self, key: u8, color: Rgb) -> Result<(), DeckError>;
    /// `rgb` is a row-major RGB buffer of exactly [`KeySize::rgb_len`] bytes.
    fn fill_image(&mut self, key: u8, rgb: &[u8]) -> Result<(), DeckError>;
    fn set_brightness(&mut self, percent: u8) -> Result<(), DeckError>;
    /// Registers `sink` for key-up and device error notifications.
    fn subscribe(&mut self, sink: DeckInputSink) -> Result<(), DeckError>;
}

/// Converts raw button state reports into key-up notifications.
#[derive(Debug, Default, Clone)]
pub struct KeyUpDetector {
    pressed: Vec<bool>,
}

impl KeyUpDetector {
    pub fn new(key_count: usize) -> Self {
        Self {
            pressed: vec![false; key_count],
        }
    }

    /// Returns the keys that went from pressed to released in this report.
    pub fn update(&mut self, states: &[bool]) -> Vec<u8> {
        if self.pressed.len() < states.len() {
            self.pressed.resize(states.len(), false);
        }
        let mut released = Vec::new();
        for (index, &down) in states.iter().enumerate() {
            if self.pressed[index] && !down {
                if let Ok(key) = u8::try_from(index) {
                    released.push(key);
                }
            }
            self.pressed[index] = down;
        }
        released
    }
}
