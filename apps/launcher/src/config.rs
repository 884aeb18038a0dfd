use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use clap::Parser;
use deck_integration::Rgb;
use launcher_core::{
    device::{ACTIVE_COLOR, READY_COLOR},
    launcher::{DEFAULT_BRIGHTNESS, DEFAULT_SLOT_COUNT},
    source::DEFAULT_POLL_INTERVAL,
    EventSourceConfig, KeyPalette, LauncherOptions,
};
use serde::Deserialize;
use shared::domain::DocumentId;

const ENV_PREFIX: &str = "LAUNCHER__";

#[derive(Parser, Debug)]
#[command(about = "Fires trigger server events from a Stream Deck")]
pub struct Args {
    #[arg(long, default_value = "launcher.toml")]
    pub config: PathBuf,
    #[arg(long)]
    pub server_url: Option<String>,
    #[arg(long)]
    pub document_id: Option<String>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    /// Rely on polling only.
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: Option<String>,
    pub document_id: Option<String>,
    pub poll_interval_ms: u64,
    pub brightness: u8,
    pub push_enabled: bool,
    pub fallback_slot_count: usize,
    pub active_color: [u8; 3],
    pub ready_color: [u8; 3],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            document_id: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            brightness: DEFAULT_BRIGHTNESS,
            push_enabled: true,
            fallback_slot_count: DEFAULT_SLOT_COUNT,
            active_color: ACTIVE_COLOR.to_array(),
            ready_color: READY_COLOR.to_array(),
        }
    }
}

/// Validated settings split into what each runtime component needs.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub server_url: String,
    pub source: EventSourceConfig,
    pub launcher: LauncherOptions,
}

/// Reads `path` if it exists, then applies `LAUNCHER__*` environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    settings.apply_env(std::env::vars())?;
    Ok(settings)
}

impl Settings {
    pub fn apply_env<I>(&mut self, vars: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let invalid = || format!("invalid value {value:?} for {key}");
            match field {
                "SERVER_URL" => self.server_url = Some(value.clone()),
                "DOCUMENT_ID" => self.document_id = Some(value.clone()),
                "POLL_INTERVAL_MS" => self.poll_interval_ms = value.parse().with_context(invalid)?,
                "BRIGHTNESS" => self.brightness = value.parse().with_context(invalid)?,
                "PUSH_ENABLED" => self.push_enabled = value.parse().with_context(invalid)?,
                "FALLBACK_SLOT_COUNT" => {
                    self.fallback_slot_count = value.parse().with_context(invalid)?
                }
                "ACTIVE_COLOR" => self.active_color = parse_color(&value).with_context(invalid)?,
                "READY_COLOR" => self.ready_color = parse_color(&value).with_context(invalid)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(v) = &args.server_url {
            self.server_url = Some(v.clone());
        }
        if let Some(v) = &args.document_id {
            self.document_id = Some(v.clone());
        }
        if let Some(v) = args.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if args.no_push {
            self.push_enabled = false;
        }
    }

    pub fn into_plan(self) -> anyhow::Result<LaunchPlan> {
        let Some(server_url) = self.server_url.filter(|v| !v.trim().is_empty()) else {
            bail!("server_url is required (--server-url or {ENV_PREFIX}SERVER_URL)");
        };
        let Some(document_id) = self.document_id.filter(|v| !v.trim().is_empty()) else {
            bail!("document_id is required (--document-id or {ENV_PREFIX}DOCUMENT_ID)");
        };
        if self.fallback_slot_count == 0 {
            bail!("fallback_slot_count must be at least 1");
        }

        let document_id = DocumentId::new(document_id);
        let mut source = EventSourceConfig::new(document_id.clone());
        source.poll_interval = Duration::from_millis(self.poll_interval_ms);
        source.push_enabled = self.push_enabled;

        let mut launcher = LauncherOptions::new(document_id);
        launcher.brightness = self.brightness.min(100);
        launcher.fallback_slot_count = self.fallback_slot_count;
        launcher.palette = KeyPalette {
            active: rgb(self.active_color),
            ready: rgb(self.ready_color),
        };

        Ok(LaunchPlan {
            server_url,
            source,
            launcher,
        })
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Rgb {
    Rgb::new(r, g, b)
}

/// Accepts `r,g,b` or `#rrggbb`.
fn parse_color(raw: &str) -> anyhow::Result<[u8; 3]> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("expected six hex digits");
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16);
        return Ok([channel(0)?, channel(2)?, channel(4)?]);
    }

    let channels = raw
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()?;
    match channels.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => bail!("expected three comma separated channels"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
