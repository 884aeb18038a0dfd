//! Event sync, slot assignment and deck rendering for the trigger launcher.

pub mod api;
pub mod artwork;
pub mod catalog;
pub mod device;
pub mod error;
pub mod launcher;
pub mod slots;
pub mod source;

pub use api::{EventLauncher, TriggerApi};
pub use catalog::{Catalog, QueuedEvent};
pub use device::{DeviceController, KeyPalette};
pub use error::{LauncherError, Result};
pub use launcher::{LauncherInput, LauncherOptions, LauncherPhase, TriggerLauncher};
pub use slots::SlotTable;
pub use source::{EventSource, EventSourceConfig, EventSourceHandle};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
