//! Popup <-> background messages
//!
//! Requests are JSON objects tagged by `type`. Every request gets a
//! response, including ones that fail or cannot be parsed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RedirectStats;

/// Error string for requests that do not parse.
pub const UNKNOWN_MESSAGE: &str = "Unknown message";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetState,
    SetEnabled {
        #[serde(default)]
        enabled: bool,
    },
}

impl Request {
    /// Parse a raw message. Anything unrecognised is None.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<RedirectStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn state(enabled: bool, stats: RedirectStats) -> Self {
        Self {
            ok: true,
            enabled: Some(enabled),
            stats: Some(stats),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            enabled: None,
            stats: None,
            error: Some(message.into()),
        }
    }
}
