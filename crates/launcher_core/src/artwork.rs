//! Preview art for deck keys: download, cache, and composition onto a state color.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use deck_integration::{KeySize, Rgb};
use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{api::REQUEST_TIMEOUT, slots::SlotTable};

/// Width of the state-colored frame left visible around the preview.
const KEY_BORDER_PX: u32 = 6;

pub type ArtworkSet = HashMap<String, Arc<DynamicImage>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtworkError {
    #[error("preview image has no pixels")]
    EmptyPreview,
    #[error("key size {width}x{height} cannot hold an image")]
    EmptyKey { width: u32, height: u32 },
}

#[derive(Debug, Clone)]
enum Preview {
    Pending,
    Loaded(Arc<DynamicImage>),
    Missing,
}

/// What the deck can show right now, plus the URLs nobody has started fetching yet.
#[derive(Debug, Default)]
pub struct ResolvedArtwork {
    pub images: ArtworkSet,
    pub requested: Vec<String>,
}

/// Preview images keyed by URL. Lookups never wait on the network; downloads
/// are handed out as requests and their results stored back with [`ArtworkCache::store`].
/// Failed downloads are remembered as missing so a broken URL is not refetched
/// on every catalog.
pub struct ArtworkCache {
    fetcher: PreviewFetcher,
    images: HashMap<String, Preview>,
}

impl ArtworkCache {
    pub fn new(http: Client) -> Self {
        Self {
            fetcher: PreviewFetcher {
                http,
                timeout: REQUEST_TIMEOUT,
            },
            images: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher.timeout = timeout;
        self
    }

    pub fn fetcher(&self) -> PreviewFetcher {
        self.fetcher.clone()
    }

    pub fn cached_urls(&self) -> usize {
        self.images.len()
    }

    /// Returns loaded art for the occupied slots, marks unseen URLs as pending
    /// and forgets URLs no longer on the deck.
    pub fn resolve(&mut self, table: &SlotTable) -> ResolvedArtwork {
        let urls: HashSet<&String> = table
            .iter()
            .flatten()
            .filter_map(|entry| entry.event.preview_url.as_ref())
            .collect();
        self.images.retain(|url, _| urls.contains(url));

        let mut resolved = ResolvedArtwork::default();
        for url in urls {
            match self.images.get(url) {
                Some(Preview::Loaded(image)) => {
                    resolved.images.insert(url.clone(), Arc::clone(image));
                }
                Some(Preview::Pending | Preview::Missing) => {}
                None => {
                    self.images.insert(url.clone(), Preview::Pending);
                    resolved.requested.push(url.clone());
                }
            }
        }
        resolved
    }

    /// Records a finished download. Returns `false` when the URL left the deck
    /// while it was in flight.
    pub fn store(&mut self, url: &str, image: Option<Arc<DynamicImage>>) -> bool {
        match self.images.get_mut(url) {
            Some(preview) if matches!(preview, Preview::Pending) => {
                *preview = match image {
                    Some(image) => Preview::Loaded(image),
                    None => Preview::Missing,
                };
                true
            }
            _ => false,
        }
    }
}

/// Cloneable handle that downloads previews with a bounded wait.
#[derive(Debug, Clone)]
pub struct PreviewFetcher {
    http: Client,
    timeout: Duration,
}

impl PreviewFetcher {
    pub async fn load(&self, url: &str) -> Option<Arc<DynamicImage>> {
        match self.fetch(url).await {
            Ok(image) => {
                debug!(url, width = image.width(), height = image.height(), "artwork: loaded preview");
                Some(Arc::new(image))
            }
            Err(err) => {
                warn!(url, error = %format!("{err:#}"), "artwork: preview unavailable, using flat color");
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<DynamicImage> {
        let bytes = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("failed to request preview {url}"))?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("failed to read preview {url}"))?;
        image::load_from_memory(&bytes).context("failed to decode preview image")
    }
}

/// Fits `preview` inside a frame of `background` and returns raw RGB bytes for one key.
pub fn compose_key_image(
    preview: &DynamicImage,
    background: Rgb,
    size: KeySize,
) -> std::result::Result<Vec<u8>, ArtworkError> {
    if size.width == 0 || size.height == 0 {
        return Err(ArtworkError::EmptyKey {
            width: size.width,
            height: size.height,
        });
    }
    if preview.width() == 0 || preview.height() == 0 {
        return Err(ArtworkError::EmptyPreview);
    }

    let border = if size.width > KEY_BORDER_PX * 2 && size.height > KEY_BORDER_PX * 2 {
        KEY_BORDER_PX
    } else {
        0
    };
    let [r, g, b] = background.to_array();
    let mut canvas = RgbaImage::from_pixel(size.width, size.height, Rgba([r, g, b, 255]));

    let fitted = preview
        .resize(
            size.width - border * 2,
            size.height - border * 2,
            FilterType::Triangle,
        )
        .to_rgba8();
    let x = (size.width - fitted.width()) / 2;
    let y = (size.height - fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8().into_raw())
}

#[cfg(test)]
#[path = "tests/artwork_tests.rs"]
mod tests;
