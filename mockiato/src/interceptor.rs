//! Holds each outgoing call until the authority has decided what to do with it.

use crate::{
    alert::{AlertSink, MockApplied},
    data::{Decision, InterceptedRequest, Mock},
    error::Error,
    messages::Message,
    messenger::Messenger,
    registry::{CorrelationRegistry, PendingDecision},
    util,
};
use hyper::{Body, Request, Response, StatusCode};
use log::{debug, error, warn};
use nanoid::nanoid;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::time::{sleep, timeout};

/// Lifecycle of one intercepted call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallState {
    Observed,
    AwaitingDecision,
    Substituted,
    HeadersOnly,
    PassThrough,
}

/// What to do with a call once its decision is in.
#[derive(Debug)]
pub enum Verdict {
    /// Answer with a synthetic response; the real call never happens.
    Substituted(Substitution),
    /// Let the call proceed with injected headers.
    HeadersOnly(Request<Body>),
    /// Let the call proceed untouched.
    PassThrough(Request<Body>),
}

impl Verdict {
    pub fn state(&self) -> CallState {
        match self {
            Verdict::Substituted(_) => CallState::Substituted,
            Verdict::HeadersOnly(_) => CallState::HeadersOnly,
            Verdict::PassThrough(_) => CallState::PassThrough,
        }
    }
}

/// A synthetic response that has not been handed to the caller yet.
pub struct Substitution {
    response: Response<Body>,
    alert: MockApplied,
    alerts: Arc<dyn AlertSink + Send + Sync>,
}

impl Substitution {
    pub fn response(&self) -> &Response<Body> {
        &self.response
    }

    /// Hands the response to `deliver`, then raises the "mock applied" alert.
    pub fn apply<F, R>(self, deliver: F) -> R
    where
        F: FnOnce(Response<Body>) -> R,
    {
        let delivered = deliver(self.response);
        self.alerts.mock_applied(self.alert);
        delivered
    }
}

impl Debug for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Substitution")
            .field("response", &self.response)
            .field("alert", &self.alert)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    registry: CorrelationRegistry,
    messenger: Messenger,
    alerts: Arc<dyn AlertSink + Send + Sync>,
    decision_timeout: Option<Duration>,
}

impl RequestInterceptor {
    pub fn new(
        registry: CorrelationRegistry,
        messenger: Messenger,
        alerts: Arc<dyn AlertSink + Send + Sync>,
        decision_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            messenger,
            alerts,
            decision_timeout,
        }
    }

    /// Asks the authority about `request` and waits for the answer.
    ///
    /// Any failure to get a usable decision lets the call through untouched.
    pub async fn intercept(&self, mut request: Request<Body>) -> Verdict {
        let described = InterceptedRequest {
            message_id: nanoid!(),
            url: request.uri().to_string(),
            method: request.method().to_string(),
        };
        debug!(
            "{} {} {:?} as {}",
            described.method,
            described.url,
            CallState::Observed,
            described.message_id
        );

        let pending = self.registry.register(described.message_id.as_str());
        self.messenger
            .send(&Message::RequestIntercepted(described.clone()));
        debug!("{} {:?}", described.message_id, CallState::AwaitingDecision);

        let decision = match self.await_decision(pending).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "{} {}: {}, letting the request through",
                    described.method, described.url, e
                );
                return Verdict::PassThrough(request);
            }
        };

        let injected = util::merge_headers(request.headers_mut(), &decision.headers);
        let proceed = |request| {
            if injected > 0 {
                debug!("{} {:?} ({} headers)", described.message_id, CallState::HeadersOnly, injected);
                Verdict::HeadersOnly(request)
            } else {
                debug!("{} {:?}", described.message_id, CallState::PassThrough);
                Verdict::PassThrough(request)
            }
        };

        let mock = match decision.mock {
            Some(mock) => mock,
            None => return proceed(request),
        };

        let response = match build_response(&mock) {
            Ok(response) => response,
            Err(e) => {
                error!("mock {} for {} is unusable: {}", mock.id, described.url, e);
                return proceed(request);
            }
        };

        if mock.delay > 0 {
            sleep(Duration::from_millis(mock.delay)).await;
        }
        debug!("{} {:?}", described.message_id, CallState::Substituted);

        Verdict::Substituted(Substitution {
            response,
            alert: MockApplied {
                url: described.url,
                method: described.method,
                mock_id: mock.id,
                http_status_code: mock.http_status_code,
                date: util::timestamp(),
                host: util::page_host(&request),
            },
            alerts: self.alerts.clone(),
        })
    }

    async fn await_decision(&self, pending: PendingDecision) -> Result<Decision, Error> {
        match self.decision_timeout {
            Some(limit) => timeout(limit, pending)
                .await
                .map_err(|_| Error::DecisionTimedOut(limit))?,
            None => pending.await,
        }
    }
}

/// Builds the synthetic response for `mock`.
pub fn build_response(mock: &Mock) -> Result<Response<Body>, Error> {
    let status = StatusCode::from_u16(mock.http_status_code)
        .map_err(|_| Error::InvalidStatusCode(mock.http_status_code))?;
    let headers = util::collapse_headers(&mock.response_headers)?;

    let mut response = Response::builder()
        .status(status)
        .body(Body::from(mock.response.clone().unwrap_or_default()))?;
    *response.headers_mut() = headers;

    Ok(response)
}
