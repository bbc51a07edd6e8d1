//! The HTTP front: every call routed through it passes the installed hooks.

use crate::{
    configuration::MockiatoConfiguration,
    context::MockiatoContext,
    data::EventRequest,
    error::Error,
    http_client::HttpClient,
    interceptor::Verdict,
    util,
};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode, Uri,
};
use log::{error, info, warn};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct MockiatoProxy {
    context: Arc<MockiatoContext>,
    http_client: Arc<dyn HttpClient + Send + Sync>,
    upstream: Option<String>,
}

impl MockiatoProxy {
    pub fn new(configuration: &MockiatoConfiguration, context: Arc<MockiatoContext>) -> Self {
        Self {
            context,
            http_client: configuration.http_client(),
            upstream: configuration.upstream().cloned(),
        }
    }

    pub fn context(&self) -> &Arc<MockiatoContext> {
        &self.context
    }

    /// Binds `address` and serves on a background task. Returns the bound
    /// address, which differs from `address` when port 0 was asked for.
    pub fn spawn(self: Arc<Self>, address: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>), Error> {
        let proxy = self;
        let make_service = make_service_fn(move |_| {
            let proxy = proxy.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let proxy = proxy.clone();
                    async move { Ok::<_, Infallible>(proxy.respond(request).await) }
                }))
            }
        });

        let server = Server::try_bind(&address)?.serve(make_service);
        let local_address = server.local_addr();
        info!("mockiato proxy listening on {}", local_address);

        let join_handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("Mockiato server error: {}", e);
            }
        });

        Ok((local_address, join_handle))
    }

    /// Like [`handle_request`](Self::handle_request), with errors turned into
    /// gateway responses.
    pub async fn respond(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        match self.handle_request(request).await {
            Ok(response) => response,
            Err(Error::TunnelNotSupported) => {
                warn!("refusing CONNECT {}", uri);
                error_response(StatusCode::NOT_IMPLEMENTED, &Error::TunnelNotSupported)
            }
            Err(e) => {
                error!("{} {} failed: {}", method, uri, e);
                error_response(StatusCode::BAD_GATEWAY, &e)
            }
        }
    }

    pub async fn handle_request(&self, mut request: Request<Body>) -> Result<Response<Body>, Error> {
        if request.method() == Method::CONNECT {
            return Err(Error::TunnelNotSupported);
        }
        *request.uri_mut() = self.resolve_uri(request.uri())?;

        let hooks = match self.context.hooks().current() {
            Some(hooks) => hooks,
            None => return self.http_client.forward(request).await,
        };

        let host = util::page_host(&request);

        match hooks.interceptor.intercept(request).await {
            Verdict::Substituted(substitution) => Ok(substitution.apply(|response| response)),
            Verdict::HeadersOnly(request) | Verdict::PassThrough(request) => {
                let line = EventRequest {
                    url: request.uri().to_string(),
                    method: request.method().to_string(),
                };
                let response = self.http_client.forward(request).await?;
                Ok(hooks.observer.observe(&host, line, response))
            }
        }
    }

    fn resolve_uri(&self, uri: &Uri) -> Result<Uri, Error> {
        if uri.scheme().is_some() {
            return Ok(uri.clone());
        }

        let upstream = self.upstream.as_ref().ok_or(Error::NotConfigured)?;
        let path = uri.path_and_query().map_or("/", |path| path.as_str());

        Ok(format!("{}{}", upstream, path).parse()?)
    }
}

fn error_response(status: StatusCode, error: &Error) -> Response<Body> {
    let mut response = Response::new(Body::from(error.to_string()));
    *response.status_mut() = status;
    response
}
