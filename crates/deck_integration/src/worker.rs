//! Single-owner device thread. The thread alternates between applying queued
//! writes and a bounded blocking read, so callers never wait on device I/O.

use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, error};

use crate::{DeckBackend, DeckError, DeckInput, DeckInputSink, KeySize, KeyUpDetector, Rgb};

/// A write the device thread performs on behalf of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckWrite {
    Clear(u8),
    ClearAll,
    Color(u8, Rgb),
    /// Raw RGB bytes covering one key.
    Image(u8, Vec<u8>),
    Brightness(u8),
}

/// Blocking device I/O, driven only from the device thread.
pub trait DeckDevice: Send + 'static {
    fn apply(&mut self, write: DeckWrite) -> Result<(), DeckError>;
    /// Waits at most `timeout` for a button report; `None` when nothing arrived.
    fn read_buttons(&mut self, timeout: Duration) -> Result<Option<Vec<bool>>, DeckError>;
}

enum Command {
    Write(DeckWrite),
    Subscribe(DeckInputSink),
}

/// [`DeckBackend`] whose calls only enqueue work for the device thread.
///
/// Device failures surface as [`DeckInput::Error`] on the subscribed sink, and
/// every call after the thread stopped fails with [`DeckError::Io`].
pub struct ThreadedDeck {
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    key_count: usize,
    key_size: KeySize,
}

impl ThreadedDeck {
    pub fn spawn<D: DeckDevice>(
        device: D,
        key_count: usize,
        key_size: KeySize,
        read_timeout: Duration,
    ) -> Result<Self, DeckError> {
        let (commands, queue) = unbounded();
        let worker = thread::Builder::new()
            .name("deck-io".to_string())
            .spawn(move || run_device(device, queue, key_count, read_timeout))
            .map_err(|err| DeckError::Io(err.to_string()))?;

        Ok(Self {
            commands: Some(commands),
            worker: Some(worker),
            key_count,
            key_size,
        })
    }

    fn check_key(&self, key: u8) -> Result<(), DeckError> {
        if usize::from(key) >= self.key_count {
            return Err(DeckError::KeyOutOfRange {
                key,
                key_count: self.key_count,
            });
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), DeckError> {
        self.commands
            .as_ref()
            .ok_or(DeckError::NotFound)?
            .send(command)
            .map_err(|_| DeckError::Io("deck thread stopped".to_string()))
    }

    fn write(&self, write: DeckWrite) -> Result<(), DeckError> {
        self.send(Command::Write(write))
    }
}

impl Drop for ThreadedDeck {
    /// Lets the device thread finish queued writes, then waits for it.
    fn drop(&mut self) {
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl DeckBackend for ThreadedDeck {
    fn key_count(&self) -> usize {
        self.key_count
    }

    fn key_size(&self) -> KeySize {
        self.key_size
    }

    fn clear_key(&mut self, key: u8) -> Result<(), DeckError> {
        self.check_key(key)?;
        self.write(DeckWrite::Clear(key))
    }

    fn clear_all_keys(&mut self) -> Result<(), DeckError> {
        self.write(DeckWrite::ClearAll)
    }

    fn fill_color(&mut self, key: u8, color: Rgb) -> Result<(), DeckError> {
        self.check_key(key)?;
        self.write(DeckWrite::Color(key, color))
    }

    fn fill_image(&mut self, key: u8, rgb: &[u8]) -> Result<(), DeckError> {
        self.check_key(key)?;
        let expected = self.key_size.rgb_len();
        if rgb.len() != expected {
            return Err(DeckError::ImageSize {
                key,
                expected,
                actual: rgb.len(),
            });
        }
        self.write(DeckWrite::Image(key, rgb.to_vec()))
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), DeckError> {
        self.write(DeckWrite::Brightness(percent.min(100)))
    }

    fn subscribe(&mut self, sink: DeckInputSink) -> Result<(), DeckError> {
        self.send(Command::Subscribe(sink))
    }
}

fn run_device<D: DeckDevice>(
    mut device: D,
    queue: Receiver<Command>,
    key_count: usize,
    read_timeout: Duration,
) {
    let mut sink: Option<DeckInputSink> = None;
    let mut detector = KeyUpDetector::new(key_count);

    loop {
        loop {
            match queue.try_recv() {
                Ok(Command::Write(write)) => {
                    if let Err(err) = device.apply(write) {
                        report_failure(sink.as_ref(), &err);
                        return;
                    }
                }
                Ok(Command::Subscribe(next)) => sink = Some(next),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("deck: handle dropped, device thread stopping");
                    return;
                }
            }
        }

        match device.read_buttons(read_timeout) {
            Ok(Some(states)) => {
                let released = detector.update(&states);
                if let Some(sink) = &sink {
                    for key in released {
                        sink(DeckInput::KeyUp(key));
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                report_failure(sink.as_ref(), &err);
                return;
            }
        }
    }
}

fn report_failure(sink: Option<&DeckInputSink>, err: &DeckError) {
    error!(error = %err, "deck: device i/o failed, device thread stopping");
    if let Some(sink) = sink {
        sink(DeckInput::Error(err.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/worker_tests.rs"]
mod tests;
