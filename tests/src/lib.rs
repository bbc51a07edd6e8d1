#[cfg(test)]
mod tests {
    use hyper::{
        service::{make_service_fn, service_fn},
        Body, Request, Response, Server,
    };
    use mockiato::{
        duplex, settings_changed, AlertStack, Authority, MemoryEventLog, MockStore,
        MockiatoConfiguration, MockiatoContext, MockiatoProxy, Messenger, ResponseType, Settings,
    };
    use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

    const STORE: &str = r#"{
        "mocks": [
            {"id": "created", "url": "http://api.example.com/x", "httpMethod": "GET",
             "httpStatusCode": 201, "response": "ok", "responseType": "text",
             "responseHeaders": [], "delay": 0, "isActive": true},
            {"id": "slow", "url": "http://api.example.com/slow", "httpMethod": "GET",
             "httpStatusCode": 200, "response": "{\"slow\":true}", "responseType": "json",
             "responseHeaders": [{"id": "1", "key": "X", "value": "1"},
                                 {"id": "2", "key": "X", "value": "2"}],
             "delay": 150, "isActive": true}
        ],
        "headersProfiles": {
            "auth": {"id": "auth", "name": "auth", "status": "enabled", "headers": [
                {"id": "1", "key": "X-Token", "value": "secret", "type": "request", "isActive": true}
            ]}
        }
    }"#;

    struct Running {
        proxy_address: SocketAddr,
        upstream_address: SocketAddr,
        context: Arc<MockiatoContext>,
        alerts: Arc<AlertStack>,
        events: Arc<MemoryEventLog>,
        authority_messenger: Messenger,
    }

    impl Running {
        fn client(&self) -> reqwest::Client {
            reqwest::Client::builder()
                .proxy(reqwest::Proxy::http(format!("http://{}", self.proxy_address)).unwrap())
                .build()
                .unwrap()
        }

        fn upstream_url(&self, path: &str) -> String {
            format!("http://{}{}", self.upstream_address, path)
        }

        async fn wait_until_active(&self, active: bool) {
            for _ in 0..100 {
                if self.context.is_active() == active {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("interception never became {}", if active { "active" } else { "inactive" });
        }

        /// Events are recorded on the authority's task, after the response left.
        async fn wait_for_events(&self, count: usize) -> Vec<mockiato::InterceptedResponseEvent> {
            for _ in 0..100 {
                let events = self.events.events();
                if events.len() >= count {
                    return events;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.events.events()
        }
    }

    /// Upstream that echoes the injected token back as JSON.
    async fn echo(request: Request<Body>) -> Result<Response<Body>, Infallible> {
        let token = request
            .headers()
            .get("x-token")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        Ok(Response::builder()
            .header("content-type", "application/json")
            .body(Body::from(format!("{{\"token\":\"{}\"}}", token)))
            .unwrap())
    }

    fn start() -> Running {
        let _ = env_logger::try_init();

        let upstream = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(echo)) }));
        let upstream_address = upstream.local_addr();
        tokio::spawn(upstream);

        let (page, authority) = duplex();
        let authority_messenger = Messenger::new(Arc::new(authority.transport.clone()));
        let events = Arc::new(MemoryEventLog::new());
        let store = MockStore::from_json(STORE).unwrap();
        tokio::spawn(Authority::new(Arc::new(store), events.clone()).serve(authority));

        let alerts = Arc::new(AlertStack::default());
        let mut configuration = MockiatoConfiguration::new();
        configuration.set_alerts(alerts.clone());
        configuration.set_decision_timeout(Some(Duration::from_secs(2)));

        let context = MockiatoContext::start(&configuration, page);
        let proxy = Arc::new(MockiatoProxy::new(&configuration, context.clone()));
        let (proxy_address, _) = proxy
            .spawn(SocketAddr::from(([127, 0, 0, 1], 0)))
            .unwrap();

        Running {
            proxy_address,
            upstream_address,
            context,
            alerts,
            events,
            authority_messenger,
        }
    }

    #[tokio::test]
    async fn mocked_request_is_answered_by_the_proxy() {
        let running = start();

        let response = running
            .client()
            .get("http://api.example.com/x")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 201);
        assert!(response.headers().get("x").is_none());
        assert_eq!(response.text().await.unwrap(), "ok");

        let alerts = running.alerts.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].mock_id, "created");
        // mocked calls are not reported as network events
        assert!(running.events.events().is_empty());
    }

    #[tokio::test]
    async fn delayed_mock_with_collapsed_headers() {
        let running = start();
        let started = std::time::Instant::now();

        let response = running
            .client()
            .get("http://api.example.com/slow")
            .send()
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(150));
        let values: Vec<_> = response.headers().get_all("x").iter().collect();
        assert_eq!(values, vec!["2"]);
        assert_eq!(response.text().await.unwrap(), "{\"slow\":true}");
    }

    #[tokio::test]
    async fn unmocked_request_gets_headers_and_is_logged() {
        let running = start();
        let url = running.upstream_url("/echo");

        let response = running.client().get(&url).send().await.unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), "{\"token\":\"secret\"}");

        let events = running.wait_for_events(1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request.url, url);
        assert_eq!(events[0].request.method, "GET");
        assert_eq!(events[0].response.response_type, ResponseType::Json);
        assert!(events[0]
            .response
            .headers
            .iter()
            .any(|header| header.key == "content-type" && header.value == "application/json"));
        assert!(running.alerts.alerts().is_empty());

        let wire = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(wire["host"], running.upstream_address.to_string());
        assert_eq!(wire["request"]["method"], "GET");
        assert_eq!(wire["response"]["type"], "json");
        assert_eq!(wire["response"]["httpStatusCode"], 200);
        assert_eq!(wire["response"]["body"], "{\"token\":\"secret\"}");
    }

    #[tokio::test]
    async fn toggling_off_bypasses_interception() {
        let running = start();
        let url = running.upstream_url("/echo");

        settings_changed(&running.authority_messenger, Settings { enabled: false });
        running.wait_until_active(false).await;

        let response = running.client().get(&url).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "{\"token\":\"\"}");
        assert!(running.events.events().is_empty());

        settings_changed(&running.authority_messenger, Settings { enabled: true });
        running.wait_until_active(true).await;

        let response = running.client().get(&url).send().await.unwrap();
        assert_eq!(response.text().await.unwrap(), "{\"token\":\"secret\"}");
        assert_eq!(running.wait_for_events(1).await.len(), 1);
    }
}
