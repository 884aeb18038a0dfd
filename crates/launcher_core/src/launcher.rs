//! Coordinator wiring catalogs into the slot table and key presses into launches.

use std::{future::Future, sync::Arc, time::Duration};

use image::DynamicImage;
use reqwest::Client;
use shared::domain::DocumentId;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    api::EventLauncher,
    artwork::ArtworkCache,
    catalog::Catalog,
    device::{plan_render, DeviceController, KeyPalette},
    slots::SlotTable,
    source::{EventSource, EventSourceHandle},
};

pub const DEFAULT_SLOT_COUNT: usize = 15;
pub const DEFAULT_BRIGHTNESS: u8 = 70;

/// Everything the coordinator reacts to, delivered through one ordered queue.
#[derive(Debug)]
pub enum LauncherInput {
    Polled(Catalog),
    Pushed(Catalog),
    KeyUp(u8),
    DeviceError(String),
    /// A preview download finished; `None` when it failed.
    ArtworkLoaded {
        url: String,
        image: Option<Arc<DynamicImage>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherPhase {
    Initializing,
    Syncing,
    Steady,
}

#[derive(Debug, Clone)]
pub struct LauncherOptions {
    pub document_id: DocumentId,
    pub brightness: u8,
    pub palette: KeyPalette,
    /// Slot count used when no deck is attached.
    pub fallback_slot_count: usize,
}

impl LauncherOptions {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            brightness: DEFAULT_BRIGHTNESS,
            palette: KeyPalette::default(),
            fallback_slot_count: DEFAULT_SLOT_COUNT,
        }
    }
}

pub struct TriggerLauncher {
    inputs: mpsc::UnboundedSender<LauncherInput>,
    receiver: mpsc::UnboundedReceiver<LauncherInput>,
    launcher: Arc<dyn EventLauncher>,
    device: DeviceController,
    artwork: ArtworkCache,
    options: LauncherOptions,
    slots: SlotTable,
    last_catalog: Option<Catalog>,
    phase: LauncherPhase,
}

impl TriggerLauncher {
    pub fn new(
        launcher: Arc<dyn EventLauncher>,
        device: DeviceController,
        http: Client,
        options: LauncherOptions,
    ) -> Self {
        let slot_count = device.key_count().unwrap_or(options.fallback_slot_count);
        let (inputs, receiver) = mpsc::unbounded_channel();
        Self {
            inputs,
            receiver,
            launcher,
            device,
            artwork: ArtworkCache::new(http),
            options,
            slots: SlotTable::empty(slot_count),
            last_catalog: None,
            phase: LauncherPhase::Initializing,
        }
    }

    /// Bounds how long a single preview download may take.
    pub fn with_artwork_timeout(mut self, timeout: Duration) -> Self {
        self.artwork = self.artwork.with_timeout(timeout);
        self
    }

    pub fn phase(&self) -> LauncherPhase {
        self.phase
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn device(&self) -> &DeviceController {
        &self.device
    }

    /// Prepares the deck and routes its input into the launcher's queue.
    pub fn start(&mut self) {
        self.device.clear_all_keys();
        self.device.set_brightness(self.options.brightness);
        self.device.subscribe(self.inputs.clone());
        self.phase = LauncherPhase::Syncing;
        info!(
            document_id = %self.options.document_id,
            slots = self.slots.slot_count(),
            device = self.device.is_present(),
            "launcher: syncing"
        );
    }

    /// Runs until `shutdown` resolves, then clears the deck and closes both channels.
    pub async fn run<F>(mut self, source: EventSource, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start();
        let source = source.spawn(self.inputs.clone());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                input = self.receiver.recv() => match input {
                    Some(input) => {
                        self.handle_input(input);
                    }
                    None => break,
                },
            }
        }

        self.stop(source).await;
    }

    /// Applies one input. Never waits on the network; a launch runs as the returned task.
    pub fn handle_input(&mut self, input: LauncherInput) -> Option<JoinHandle<()>> {
        match input {
            LauncherInput::Polled(catalog) | LauncherInput::Pushed(catalog) => {
                self.apply_catalog(catalog);
                None
            }
            LauncherInput::ArtworkLoaded { url, image } => {
                if self.artwork.store(&url, image) {
                    self.render();
                }
                None
            }
            LauncherInput::KeyUp(key) => self.launch_slot(usize::from(key)),
            LauncherInput::DeviceError(message) => {
                self.device.disconnect(&message);
                None
            }
        }
    }

    /// Reconciles the slot table against `catalog` and re-renders the deck.
    pub fn apply_catalog(&mut self, catalog: Catalog) {
        if self.last_catalog.as_ref() == Some(&catalog) {
            debug!("launcher: catalog unchanged");
            return;
        }

        self.slots = self.slots.reconcile_catalog(&catalog);
        self.last_catalog = Some(catalog);
        if self.phase == LauncherPhase::Syncing {
            self.phase = LauncherPhase::Steady;
        }
        debug!(occupied = self.slots.occupied(), "launcher: slots reconciled");

        self.render();
    }

    /// Draws every key from what is cached; art still downloading shows as flat color.
    fn render(&mut self) {
        let Some(key_size) = self.device.key_size() else {
            return;
        };
        let artwork = self.artwork.resolve(&self.slots);
        for url in artwork.requested {
            self.spawn_artwork_fetch(url);
        }
        let visuals = plan_render(&self.slots, &artwork.images, self.options.palette, key_size);
        self.device.render(&visuals);
    }

    fn spawn_artwork_fetch(&self, url: String) {
        let fetcher = self.artwork.fetcher();
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            let image = fetcher.load(&url).await;
            let _ = inputs.send(LauncherInput::ArtworkLoaded { url, image });
        });
    }

    /// Requests the event in slot `index`; the next catalog reflects the outcome.
    pub fn launch_slot(&self, index: usize) -> Option<JoinHandle<()>> {
        let Some(entry) = self.slots.get(index) else {
            debug!(key = index, "launcher: ignoring press on empty key");
            return None;
        };

        let launcher = Arc::clone(&self.launcher);
        let document_id = self.options.document_id.clone();
        let event = entry.event.clone();
        info!(key = index, event_id = %event.id, "launcher: launching event");
        Some(tokio::spawn(async move {
            if let Err(err) = launcher.launch(&document_id, &event).await {
                warn!(event_id = %event.id, error = %err, "launcher: launch request failed");
            }
        }))
    }

    async fn stop(&mut self, source: EventSourceHandle) {
        info!("launcher: shutting down");
        self.device.clear_all_keys();
        source.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/launcher_tests.rs"]
mod tests;
