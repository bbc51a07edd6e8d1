//! Reports genuine network round-trips to the authority's log.

use crate::{
    data::{EventRequest, EventResponse, InterceptedResponseEvent, MockHeader, ResponseType},
    messages::Message,
    messenger::Messenger,
    util,
};
use hyper::{body::HttpBody, Body, Response};
use log::{debug, warn};

/// Lenient body classification: anything that parses as JSON is "json".
///
/// A plain-text body like `42` or `"quoted"` is reported as json too. That is
/// a known approximation and deliberately kept.
pub fn classify_body(body: &str) -> ResponseType {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(_) => ResponseType::Json,
        Err(_) => ResponseType::Text,
    }
}

#[derive(Debug, Clone)]
pub struct ResponseObserver {
    messenger: Messenger,
}

impl ResponseObserver {
    pub fn new(messenger: Messenger) -> Self {
        Self { messenger }
    }

    /// Returns a response equivalent to `response` right away and reports it
    /// once its body has been read to the end.
    ///
    /// Each chunk goes to the caller as it arrives, while a copy is kept for
    /// the report. The copy is read to the end even if the caller goes away.
    pub fn observe(&self, host: &str, request: EventRequest, response: Response<Body>) -> Response<Body> {
        let (parts, mut upstream) = response.into_parts();
        let (mut sender, body) = Body::channel();

        let messenger = self.messenger.clone();
        let host = host.to_string();
        let headers = util::harvest_headers(&parts.headers);
        let http_status_code = parts.status.as_u16();

        tokio::spawn(async move {
            let mut copy = Vec::new();
            let mut caller_gone = false;

            while let Some(chunk) = upstream.data().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("{} {}: body failed: {}", request.method, request.url, e);
                        sender.abort();
                        return;
                    }
                };
                copy.extend_from_slice(&chunk);

                if !caller_gone && sender.send_data(chunk).await.is_err() {
                    debug!("{} {}: caller stopped reading", request.method, request.url);
                    caller_gone = true;
                }
            }
            drop(sender);

            let event = build_event(host, request, headers, http_status_code, &copy);
            debug!(
                "observed {} {} -> {}",
                event.request.method, event.request.url, event.response.http_status_code
            );
            messenger.send(&Message::ResponseIntercepted { event });
        });

        Response::from_parts(parts, body)
    }
}

fn build_event(
    host: String,
    request: EventRequest,
    headers: Vec<MockHeader>,
    http_status_code: u16,
    body: &[u8],
) -> InterceptedResponseEvent {
    let text = String::from_utf8_lossy(body).into_owned();

    InterceptedResponseEvent {
        date: util::timestamp(),
        host,
        request,
        response: EventResponse {
            response_type: classify_body(&text),
            body: text,
            headers,
            http_status_code,
        },
    }
}
