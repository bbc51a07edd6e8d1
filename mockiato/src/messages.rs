//! Messages crossing the boundary between the proxy and the authority.

use crate::{
    data::{Decision, InterceptedRequest, InterceptedResponseEvent},
    error::Error,
    toggle::Settings,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MessageKind {
    /// proxy -> authority, answered by `RequestChecked`
    RequestIntercepted,
    /// proxy -> authority, never answered
    ResponseIntercepted,
    /// authority -> proxy
    RequestChecked,
    /// authority -> proxy
    SettingsChanged,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::RequestIntercepted => "requestIntercepted",
            MessageKind::ResponseIntercepted => "responseIntercepted",
            MessageKind::RequestChecked => "requestChecked",
            MessageKind::SettingsChanged => "settingsChanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "requestIntercepted" => Some(MessageKind::RequestIntercepted),
            "responseIntercepted" => Some(MessageKind::ResponseIntercepted),
            "requestChecked" => Some(MessageKind::RequestChecked),
            "settingsChanged" => Some(MessageKind::SettingsChanged),
            _ => None,
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A frame on the wire is the JSON form of this enum, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    RequestIntercepted(InterceptedRequest),
    ResponseIntercepted { event: InterceptedResponseEvent },
    RequestChecked(Decision),
    SettingsChanged { settings: Settings },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::RequestIntercepted(_) => MessageKind::RequestIntercepted,
            Message::ResponseIntercepted { .. } => MessageKind::ResponseIntercepted,
            Message::RequestChecked(_) => MessageKind::RequestChecked,
            Message::SettingsChanged { .. } => MessageKind::SettingsChanged,
        }
    }

    pub fn to_frame(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_frame(frame: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(frame)?)
    }
}
