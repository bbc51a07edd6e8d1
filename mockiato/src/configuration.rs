use crate::{
    alert::{AlertSink, AlertStack, DEFAULT_ALERT_CAPACITY},
    http_client::{HttpClient, HyperHttpClient},
    toggle::StatusIndicator,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};

pub const DEFAULT_LISTEN_PORT: u16 = 61417;
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct MockiatoConfiguration {
    listen_address: SocketAddr,
    upstream: Option<String>,
    decision_timeout: Option<Duration>,
    intercept_on_start: bool,
    alert_capacity: usize,
    alerts: Option<Arc<dyn AlertSink + Send + Sync>>,
    status_indicator: Option<Arc<dyn StatusIndicator + Send + Sync>>,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl MockiatoConfiguration {
    pub fn new() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_LISTEN_PORT)),
            upstream: None,
            decision_timeout: Some(DEFAULT_DECISION_TIMEOUT),
            intercept_on_start: true,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
            alerts: None,
            status_indicator: None,
            http_client: None,
        }
    }

    pub fn set_listen_address(&mut self, address: SocketAddr) {
        self.listen_address = address;
    }

    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Base URL that origin-form requests (`GET /path`) are resolved against.
    pub fn set_upstream<S: Into<String>>(&mut self, upstream: S) {
        self.upstream = Some(upstream.into().trim_end_matches('/').to_string());
    }

    pub fn upstream(&self) -> Option<&String> {
        self.upstream.as_ref()
    }

    /// `None` waits for a decision for as long as the call itself lives.
    pub fn set_decision_timeout(&mut self, timeout: Option<Duration>) {
        self.decision_timeout = timeout;
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout
    }

    pub fn set_intercept_on_start(&mut self, value: bool) {
        self.intercept_on_start = value;
    }

    pub fn intercept_on_start(&self) -> bool {
        self.intercept_on_start
    }

    pub fn set_alert_capacity(&mut self, capacity: usize) {
        self.alert_capacity = capacity;
    }

    pub fn alert_capacity(&self) -> usize {
        self.alert_capacity
    }

    pub fn set_alerts(&mut self, alerts: Arc<dyn AlertSink + Send + Sync>) {
        self.alerts = Some(alerts);
    }

    pub fn alerts(&self) -> Arc<dyn AlertSink + Send + Sync> {
        self.alerts
            .clone()
            .unwrap_or_else(|| Arc::new(AlertStack::new(self.alert_capacity)))
    }

    pub fn set_status_indicator(&mut self, indicator: Arc<dyn StatusIndicator + Send + Sync>) {
        self.status_indicator = Some(indicator);
    }

    pub fn status_indicator(&self) -> Option<Arc<dyn StatusIndicator + Send + Sync>> {
        self.status_indicator.clone()
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }
}

impl Default for MockiatoConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
