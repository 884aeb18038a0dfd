use serde::{Deserialize, Serialize};

use crate::domain::{DocumentId, EventState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Duration,
    Time,
    String,
    Url,
    Const,
    Set,
    Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParameter {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub name: String,
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ParamOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Event record exactly as the trigger server serializes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_id: Option<String>,
    pub name: String,
    pub state: EventState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub parameters: Vec<EventParameter>,
    #[serde(default)]
    pub trigger: bool,
    #[serde(default)]
    pub modify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longdesc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
}

/// Subset of `GET /api/v1/configuration` the launcher relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfiguration {
    pub websocket_service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsPayload {
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushRequest {
    Join(DocumentId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushEvent {
    Joined(DocumentId),
    Events(EventsPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub parameter: String,
    pub value: String,
}

/// Body of `POST /api/v1/document/{documentId}/events/{eventId}/trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub parameters: Vec<ParameterValue>,
}

impl TriggerRequest {
    /// Carries every parameter that already has a value; the deck has no way to prompt for the rest.
    pub fn from_parameters(parameters: &[EventParameter]) -> Self {
        Self {
            parameters: parameters
                .iter()
                .filter_map(|param| {
                    param.value.as_ref().map(|value| ParameterValue {
                        parameter: param.parameter.clone(),
                        value: value.clone(),
                    })
                })
                .collect(),
        }
    }
}
