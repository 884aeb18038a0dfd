//! Poll and push channels feeding catalogs into the launcher's input queue.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::{
    domain::{decode_events, DocumentId},
    protocol::{PushEvent, PushRequest},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    api::TriggerApi,
    catalog::Catalog,
    error::{LauncherError, Result},
    launcher::LauncherInput,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct EventSourceConfig {
    pub document_id: DocumentId,
    pub poll_interval: Duration,
    pub push_enabled: bool,
}

impl EventSourceConfig {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            push_enabled: true,
        }
    }
}

pub struct EventSource {
    api: TriggerApi,
    config: EventSourceConfig,
}

pub struct EventSourceHandle {
    poll: JoinHandle<()>,
    push: Option<JoinHandle<()>>,
    push_shutdown: Option<oneshot::Sender<()>>,
}

impl EventSource {
    pub fn new(api: TriggerApi, config: EventSourceConfig) -> Self {
        Self { api, config }
    }

    /// Starts both channels. Every catalog either channel produces is sent to
    /// `inputs` in receipt order.
    pub fn spawn(self, inputs: mpsc::UnboundedSender<LauncherInput>) -> EventSourceHandle {
        let poll = tokio::spawn(poll_events(
            self.api.clone(),
            self.config.document_id.clone(),
            self.config.poll_interval.max(MIN_POLL_INTERVAL),
            inputs.clone(),
        ));

        let (push, push_shutdown) = if self.config.push_enabled {
            let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
            let api = self.api;
            let document_id = self.config.document_id;
            let task = tokio::spawn(async move {
                match subscribe_push(&api, &document_id, &inputs, &mut shutdown_rx).await {
                    Ok(()) => info!(document_id = %document_id, "push: channel ended; polling continues"),
                    Err(err) => warn!(
                        document_id = %document_id,
                        error = %err,
                        "push: channel unavailable; polling continues"
                    ),
                }
            });
            (Some(task), Some(shutdown_tx))
        } else {
            info!("push: disabled, relying on polling");
            (None, None)
        };

        EventSourceHandle {
            poll,
            push,
            push_shutdown,
        }
    }
}

impl EventSourceHandle {
    /// Stops polling and closes the push connection.
    pub async fn shutdown(mut self) {
        self.poll.abort();
        if let Some(shutdown) = self.push_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(push) = self.push.take() {
            let _ = push.await;
        }
    }
}

async fn poll_events(
    api: TriggerApi,
    document_id: DocumentId,
    period: Duration,
    inputs: mpsc::UnboundedSender<LauncherInput>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!(document_id = %document_id, "poll: updating events");
        match api.fetch_catalog(&document_id).await {
            Ok(catalog) => {
                if inputs.send(LauncherInput::Polled(catalog)).is_err() {
                    break;
                }
            }
            Err(err) => warn!(
                document_id = %document_id,
                error = %err,
                "poll: could not fetch events"
            ),
        }
    }
}

/// Maps the configured `websocketService` base to the trigger endpoint.
pub fn push_url(websocket_service: &str) -> Result<Url> {
    let invalid = |reason: &str| LauncherError::InvalidUrl {
        url: websocket_service.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(websocket_service).map_err(|err| invalid(&err.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("websocketService must be an http(s) or ws(s) url")),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch to a websocket scheme"))?;
    let path = format!("{}/trigger", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Joins the document's push channel and forwards every `EVENTS` catalog.
///
/// `EVENTS` frames are applied as they arrive, even before the server's
/// `JOINED` acknowledgement; the ack is only logged. A socket that closes
/// without ever acknowledging is reported as [`LauncherError::PushClosedBeforeJoin`].
async fn subscribe_push(
    api: &TriggerApi,
    document_id: &DocumentId,
    inputs: &mpsc::UnboundedSender<LauncherInput>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Result<()> {
    let config = tokio::select! {
        config = api.fetch_configuration() => config?,
        _ = &mut *shutdown => return Ok(()),
    };
    let url = push_url(&config.websocket_service)?;

    let (ws_stream, _) = tokio::select! {
        connected = connect_async(url.as_str()) => connected?,
        _ = &mut *shutdown => return Ok(()),
    };
    info!(url = %url, "push: connected");
    let (mut writer, mut reader) = ws_stream.split();

    let join = serde_json::to_string(&PushRequest::Join(document_id.clone()))?;
    writer.send(Message::Text(join)).await?;

    let mut joined = false;
    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = writer.send(Message::Close(None)).await;
                info!(document_id = %document_id, "push: connection closed");
                return Ok(());
            }
            msg = reader.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(catalog) = handle_push_text(&text, document_id, &mut joined) {
                        if inputs.send(LauncherInput::Pushed(catalog)).is_err() {
                            return Ok(());
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
            },
        }
    }

    if !joined {
        return Err(LauncherError::PushClosedBeforeJoin);
    }
    Ok(())
}

fn handle_push_text(text: &str, document_id: &DocumentId, joined: &mut bool) -> Option<Catalog> {
    let event = match serde_json::from_str::<PushEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "push: ignoring unreadable message");
            return None;
        }
    };

    match event {
        PushEvent::Joined(joined_document) => {
            info!(document_id = %joined_document, "push: joined document channel");
            *joined = true;
            None
        }
        PushEvent::Events(payload) => match decode_events(payload.events) {
            Ok(events) => Some(Catalog::from_events(events)),
            Err(err) => {
                warn!(
                    document_id = %document_id,
                    error = %err,
                    "push: rejecting malformed catalog"
                );
                None
            }
        },
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
