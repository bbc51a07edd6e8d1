use crate::error::Error;
use async_trait::async_trait;
use hyper::{client::HttpConnector, header, Body, Client, Request, Response};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

/// Performs the real network call for requests that are not mocked.
#[async_trait]
pub trait HttpClient: Debug {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, Error>;
}

#[derive(Debug, Clone)]
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn forward(&self, mut request: Request<Body>) -> Result<Response<Body>, Error> {
        // the client derives the host from the absolute URI
        let headers = request.headers_mut();
        headers.remove(header::HOST);
        headers.remove("proxy-connection");
        headers.remove(header::PROXY_AUTHORIZATION);

        Ok(self.client.request(request).await?)
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
