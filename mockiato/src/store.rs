//! Read-only mock store backing the reference decision-maker.

use crate::{
    authority::DecisionMaker,
    data::{Decision, InterceptedRequest, Mock},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderType {
    Request,
    Response,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileHeader {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub header_type: HeaderType,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
}

impl ProfileHeader {
    fn applies_to(&self, request: &InterceptedRequest) -> bool {
        self.is_active
            && self.header_type == HeaderType::Request
            && !self.key.trim().is_empty()
            && self.url.as_ref().map_or(true, |url| url.is_empty() || *url == request.url)
            && self
                .http_method
                .as_ref()
                .map_or(true, |method| method.eq_ignore_ascii_case(&request.method))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ProfileStatus,
    #[serde(default)]
    pub headers: Vec<ProfileHeader>,
}

/// `{ "mocks": [...], "headersProfiles": { "<id>": {...} } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockStore {
    #[serde(default)]
    pub mocks: Vec<Mock>,
    #[serde(default)]
    pub headers_profiles: HashMap<String, HeadersProfile>,
}

fn active_by_default() -> bool {
    true
}

impl MockStore {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// First active mock registered for this url and method.
    pub fn find_mock(&self, request: &InterceptedRequest) -> Option<&Mock> {
        self.mocks.iter().find(|mock| {
            mock.is_active
                && mock.url == request.url
                && mock.http_method.eq_ignore_ascii_case(&request.method)
        })
    }

    /// Request headers of every enabled profile that apply to `request`.
    /// Profiles are visited in id order; later ones win on a shared key.
    pub fn request_headers(&self, request: &InterceptedRequest) -> HashMap<String, String> {
        let mut ids: Vec<&String> = self.headers_profiles.keys().collect();
        ids.sort();

        ids.into_iter()
            .filter_map(|id| self.headers_profiles.get(id))
            .filter(|profile| profile.status == ProfileStatus::Enabled)
            .flat_map(|profile| profile.headers.iter())
            .filter(|header| header.applies_to(request))
            .map(|header| (header.key.trim().to_string(), header.value.clone()))
            .collect()
    }
}

impl DecisionMaker for MockStore {
    fn decide(&self, request: &InterceptedRequest) -> Decision {
        Decision {
            message_id: request.message_id.clone(),
            mock: self.find_mock(request).cloned(),
            headers: self.request_headers(request),
        }
    }
}
