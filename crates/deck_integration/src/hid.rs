//! USB Stream Deck backend.

use std::time::Duration;

use elgato_streamdeck::{list_devices, new_hidapi, StreamDeck, StreamDeckInput};
use image::{DynamicImage, RgbImage};
use tracing::info;

use crate::{
    worker::{DeckDevice, DeckWrite, ThreadedDeck},
    DeckError, KeySize,
};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(20);

/// Owned by the device thread; nothing else touches the HID handle.
struct UsbDeck {
    deck: StreamDeck,
    key_size: KeySize,
}

fn io_error(err: impl std::fmt::Debug) -> DeckError {
    DeckError::Io(format!("{err:?}"))
}

/// Opens the first Stream Deck found on the USB bus.
pub fn open_first() -> Result<ThreadedDeck, DeckError> {
    let hid = new_hidapi().map_err(io_error)?;
    let (kind, serial) = list_devices(&hid)
        .into_iter()
        .next()
        .ok_or(DeckError::NotFound)?;
    let deck = StreamDeck::connect(&hid, kind, &serial).map_err(io_error)?;
    let (width, height) = kind.key_image_format().size;
    let key_size = KeySize::new(width as u32, height as u32);
    info!(serial = %serial, kind = ?kind, "deck: connected");

    ThreadedDeck::spawn(
        UsbDeck { deck, key_size },
        usize::from(kind.key_count()),
        key_size,
        INPUT_POLL_TIMEOUT,
    )
}

impl UsbDeck {
    fn key_image(&self, rgb: Vec<u8>) -> Result<DynamicImage, DeckError> {
        RgbImage::from_raw(self.key_size.width, self.key_size.height, rgb)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| DeckError::Io("key image has the wrong size".to_string()))
    }
}

impl DeckDevice for UsbDeck {
    fn apply(&mut self, write: DeckWrite) -> Result<(), DeckError> {
        match write {
            DeckWrite::Brightness(percent) => {
                return self.deck.set_brightness(percent).map_err(io_error);
            }
            DeckWrite::Clear(key) => self.deck.clear_button_image(key).map_err(io_error)?,
            DeckWrite::ClearAll => self.deck.clear_all_button_images().map_err(io_error)?,
            DeckWrite::Color(key, color) => {
                let image = RgbImage::from_pixel(
                    self.key_size.width,
                    self.key_size.height,
                    image::Rgb(color.to_array()),
                );
                self.deck
                    .set_button_image(key, DynamicImage::ImageRgb8(image))
                    .map_err(io_error)?
            }
            DeckWrite::Image(key, rgb) => {
                let image = self.key_image(rgb)?;
                self.deck.set_button_image(key, image).map_err(io_error)?
            }
        }
        self.deck.flush().map_err(io_error)
    }

    fn read_buttons(&mut self, timeout: Duration) -> Result<Option<Vec<bool>>, DeckError> {
        match self.deck.read_input(Some(timeout)).map_err(io_error)? {
            StreamDeckInput::ButtonStateChange(states) => Ok(Some(states)),
            _ => Ok(None),
        }
    }
}
