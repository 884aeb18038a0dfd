use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::EventDecodeError,
    protocol::{EventParameter, RawEvent},
};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(EventId);
id_newtype!(ProductionId);
id_newtype!(DocumentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Abstract,
    Ready,
    Active,
}

/// Lifecycle of an event. Only active events carry a production identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPhase {
    Abstract,
    Ready,
    Active {
        production_id: Option<ProductionId>,
    },
}

impl EventPhase {
    pub fn state(&self) -> EventState {
        match self {
            Self::Abstract => EventState::Abstract,
            Self::Ready => EventState::Ready,
            Self::Active { .. } => EventState::Active,
        }
    }
}

/// A cue as published by the trigger server, validated at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub phase: EventPhase,
    pub preview_url: Option<String>,
    pub parameters: Vec<EventParameter>,
    pub trigger: bool,
    pub modify: bool,
    pub longdesc: Option<String>,
    pub verb: Option<String>,
}

impl Event {
    pub fn state(&self) -> EventState {
        self.phase.state()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, EventPhase::Ready)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, EventPhase::Active { .. })
    }

    /// Whether this active event is a running instance of the ready template `template_id`.
    ///
    /// An explicit production id wins. Without one, the legacy naming scheme
    /// `<template-id>-<digits>` is used.
    pub fn is_instance_of(&self, template_id: &EventId) -> bool {
        match &self.phase {
            EventPhase::Active {
                production_id: Some(production_id),
            } => production_id.as_str() == template_id.as_str(),
            EventPhase::Active {
                production_id: None,
            } => has_numeric_instance_suffix(self.id.as_str(), template_id.as_str()),
            EventPhase::Abstract | EventPhase::Ready => false,
        }
    }
}

fn has_numeric_instance_suffix(instance_id: &str, template_id: &str) -> bool {
    instance_id
        .strip_prefix(template_id)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
}

impl TryFrom<RawEvent> for Event {
    type Error = EventDecodeError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(EventDecodeError::MissingId { name: raw.name });
        }

        let phase = match raw.state {
            EventState::Abstract => EventPhase::Abstract,
            EventState::Ready => EventPhase::Ready,
            EventState::Active => EventPhase::Active {
                production_id: raw
                    .production_id
                    .filter(|id| !id.trim().is_empty())
                    .map(ProductionId),
            },
        };

        Ok(Self {
            id: EventId(raw.id),
            name: raw.name,
            phase,
            preview_url: raw.preview_url.filter(|url| !url.trim().is_empty()),
            parameters: raw.parameters,
            trigger: raw.trigger,
            modify: raw.modify,
            longdesc: raw.longdesc,
            verb: raw.verb,
        })
    }
}

/// Decodes a full event list as returned by the events endpoint or carried by a push message.
///
/// A single malformed record rejects the whole list.
pub fn decode_events(raw: Vec<RawEvent>) -> Result<Vec<Event>, EventDecodeError> {
    raw.into_iter().map(Event::try_from).collect()
}

pub fn decode_events_json(body: &str) -> Result<Vec<Event>, EventDecodeError> {
    let raw: Vec<RawEvent> = serde_json::from_str(body)?;
    decode_events(raw)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
