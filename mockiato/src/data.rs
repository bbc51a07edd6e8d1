use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the body of a mock or of an observed response should be read.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Json,
    None,
}

impl Default for ResponseType {
    fn default() -> Self {
        ResponseType::Text
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MockHeader {
    pub id: String,
    pub key: String,
    pub value: String,
}

impl MockHeader {
    pub fn new<S1: Into<String>, S2: Into<String>>(key: S1, value: S2) -> Self {
        Self {
            id: nanoid::nanoid!(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A canned response. Only the status, body, delay and headers are read by the
/// interceptor; the url and method are informational on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mock {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub http_method: String,
    pub http_status_code: u16,
    #[serde(default)]
    pub delay: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub response_headers: Vec<MockHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Description of an outgoing call, shipped to the authority.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    pub message_id: String,
    pub url: String,
    pub method: String,
}

/// The authority's answer for one intercepted request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock: Option<Mock>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Decision {
    pub fn pass_through<S: Into<String>>(message_id: S) -> Self {
        Self {
            message_id: message_id.into(),
            mock: None,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub body: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub headers: Vec<MockHeader>,
    pub http_status_code: u16,
}

/// A completed real exchange, as reported to the authority's log.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InterceptedResponseEvent {
    pub date: String,
    pub host: String,
    pub request: EventRequest,
    pub response: EventResponse,
}
