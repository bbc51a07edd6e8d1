mod alert;
mod authority;
mod configuration;
mod context;
mod data;
mod error;
mod http_client;
mod interceptor;
mod messages;
mod messenger;
mod observer;
mod proxy;
mod registry;
mod store;
mod toggle;
mod util;

pub use alert::{AlertSink, AlertStack, LogAlerts, MockApplied, DEFAULT_ALERT_CAPACITY};
pub use authority::{settings_changed, Authority, DecisionMaker, EventLog, LogEventLog, MemoryEventLog};
pub use configuration::{MockiatoConfiguration, DEFAULT_DECISION_TIMEOUT, DEFAULT_LISTEN_PORT};
pub use context::MockiatoContext;
pub use data::{
    Decision, EventRequest, EventResponse, InterceptedRequest, InterceptedResponseEvent, Mock,
    MockHeader, ResponseType,
};
pub use error::Error;
pub use http_client::{HttpClient, HyperHttpClient};
pub use interceptor::{build_response, CallState, RequestInterceptor, Substitution, Verdict};
pub use messages::{Message, MessageKind};
pub use messenger::{duplex, AuthorityEnd, ChannelTransport, Messenger, PageEnd, Transport};
pub use observer::{classify_body, ResponseObserver};
pub use proxy::MockiatoProxy;
pub use registry::{CorrelationRegistry, PendingDecision};
pub use store::{HeaderType, HeadersProfile, MockStore, ProfileHeader, ProfileStatus};
pub use toggle::{Hooks, InstalledHooks, InterceptionToggle, LogStatusIndicator, Settings, StatusIndicator};
pub use util::harvest_headers;
