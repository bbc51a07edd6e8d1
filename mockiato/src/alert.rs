//! Notifications raised when a mock was actually served.

use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fmt::Debug,
    sync::{Mutex, PoisonError},
};

pub const DEFAULT_ALERT_CAPACITY: usize = 5;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockApplied {
    pub url: String,
    pub method: String,
    pub mock_id: String,
    pub http_status_code: u16,
    pub date: String,
    pub host: String,
}

pub trait AlertSink: Debug {
    fn mock_applied(&self, alert: MockApplied);
}

#[derive(Debug, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn mock_applied(&self, alert: MockApplied) {
        info!(
            "mocked {} {} with {} (mock {})",
            alert.method, alert.url, alert.http_status_code, alert.mock_id
        );
    }
}

/// Keeps the most recent alerts, oldest dropped first.
#[derive(Debug)]
pub struct AlertStack {
    capacity: usize,
    alerts: Mutex<VecDeque<MockApplied>>,
}

impl AlertStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn alerts(&self) -> Vec<MockApplied> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for AlertStack {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertSink for AlertStack {
    fn mock_applied(&self, alert: MockApplied) {
        LogAlerts.mock_applied(alert.clone());

        if self.capacity == 0 {
            return;
        }

        let mut alerts = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
        while alerts.len() >= self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(url: &str) -> MockApplied {
        MockApplied {
            url: url.into(),
            method: "GET".into(),
            mock_id: "m".into(),
            http_status_code: 200,
            date: "2024-01-01T00:00:00Z".into(),
            host: "localhost".into(),
        }
    }

    #[test]
    fn stack_drops_oldest_beyond_capacity() {
        let stack = AlertStack::new(2);

        stack.mock_applied(alert("/1"));
        stack.mock_applied(alert("/2"));
        stack.mock_applied(alert("/3"));

        let urls: Vec<String> = stack.alerts().into_iter().map(|a| a.url).collect();
        assert_eq!(urls, vec!["/2", "/3"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let stack = AlertStack::new(0);
        stack.mock_applied(alert("/1"));
        assert!(stack.alerts().is_empty());
    }
}
