use clap::{arg, value_parser, Command};
use log::{error, info};
use mockiato::{
    duplex, Authority, LogEventLog, LogStatusIndicator, MockStore, MockiatoConfiguration,
    MockiatoContext, MockiatoProxy,
};
use std::{net::SocketAddr, process, sync::Arc, time::Duration};

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = Command::new("mockiato-proxy")
        .version("0.1.0")
        .about("HTTP proxy that answers matching requests with mocks")
        .arg(arg!(--listen <ADDRESS>).default_value("127.0.0.1:61417").value_parser(value_parser!(SocketAddr)))
        .arg(arg!(--upstream <URL> "base URL for requests sent with a relative path"))
        .arg(arg!(--mocks <FILE> "JSON store with mocks and header profiles"))
        .arg(arg!(--timeout_ms <MILLISECONDS> "how long a request waits for its decision, 0 waits forever")
            .default_value("10000")
            .value_parser(value_parser!(u64)))
        .arg(arg!(--disabled "start with interception turned off"))
        .get_matches();

    let store = match matches.get_one::<String>("mocks") {
        Some(path) => match MockStore::load(path) {
            Ok(store) => store,
            Err(e) => {
                error!("could not load mocks from {}: {}", path, e);
                process::exit(1);
            }
        },
        None => MockStore::default(),
    };
    info!("{} mocks, {} header profiles", store.mocks.len(), store.headers_profiles.len());

    let mut configuration = MockiatoConfiguration::new();
    if let Some(address) = matches.get_one::<SocketAddr>("listen") {
        configuration.set_listen_address(*address);
    }
    if let Some(upstream) = matches.get_one::<String>("upstream") {
        configuration.set_upstream(upstream.as_str());
    }
    configuration.set_decision_timeout(match matches.get_one::<u64>("timeout_ms") {
        Some(0) => None,
        Some(millis) => Some(Duration::from_millis(*millis)),
        None => configuration.decision_timeout(),
    });
    configuration.set_intercept_on_start(!matches.get_flag("disabled"));
    configuration.set_status_indicator(Arc::new(LogStatusIndicator));

    let (page, authority) = duplex();
    tokio::spawn(Authority::new(Arc::new(store), Arc::new(LogEventLog)).serve(authority));

    let context = MockiatoContext::start(&configuration, page);
    let proxy = Arc::new(MockiatoProxy::new(&configuration, context));

    let server = match proxy.spawn(configuration.listen_address()) {
        Ok((_, server)) => server,
        Err(e) => {
            error!("could not start the proxy: {}", e);
            process::exit(1);
        }
    };

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
}
