use crate::{
    alert::AlertSink,
    configuration::MockiatoConfiguration,
    interceptor::RequestInterceptor,
    messages::{Message, MessageKind},
    messenger::{Messenger, PageEnd, Transport},
    observer::ResponseObserver,
    registry::CorrelationRegistry,
    toggle::{Hooks, InstalledHooks, InterceptionToggle, Settings},
};
use log::debug;
use std::sync::Arc;

/// Everything the proxy side shares: one registry, one messenger and the
/// hook slot the toggle switches. Built once at startup.
#[derive(Debug)]
pub struct MockiatoContext {
    registry: CorrelationRegistry,
    messenger: Messenger,
    hooks: Arc<Hooks>,
    toggle: Arc<InterceptionToggle>,
}

impl MockiatoContext {
    pub fn new(
        configuration: &MockiatoConfiguration,
        transport: Arc<dyn Transport + Send + Sync>,
    ) -> Arc<Self> {
        let registry = CorrelationRegistry::new();
        let messenger = Messenger::new(transport);
        let hooks = Arc::new(Hooks::new());

        let factory = {
            let registry = registry.clone();
            let messenger = messenger.clone();
            let alerts: Arc<dyn AlertSink + Send + Sync> = configuration.alerts();
            let decision_timeout = configuration.decision_timeout();

            move || InstalledHooks {
                interceptor: RequestInterceptor::new(
                    registry.clone(),
                    messenger.clone(),
                    alerts.clone(),
                    decision_timeout,
                ),
                observer: ResponseObserver::new(messenger.clone()),
            }
        };
        let toggle = Arc::new(InterceptionToggle::new(
            hooks.clone(),
            factory,
            configuration.status_indicator(),
        ));

        let dispatcher = registry.clone();
        messenger.subscribe(MessageKind::RequestChecked, move |message| {
            if let Message::RequestChecked(decision) = message {
                let id = decision.message_id.clone();
                if !dispatcher.dispatch(&id, decision) {
                    debug!("decision {} arrived with nobody waiting", id);
                }
            }
        });

        let failer = registry.clone();
        messenger.on_rejected(MessageKind::RequestChecked, move |id| {
            failer.fail(id);
        });

        // The toggle's hooks hold the messenger, so the handler must not own the toggle.
        let weak_toggle = Arc::downgrade(&toggle);
        messenger.subscribe(MessageKind::SettingsChanged, move |message| {
            if let (Message::SettingsChanged { settings }, Some(toggle)) = (message, weak_toggle.upgrade()) {
                toggle.apply(&settings);
            }
        });

        let context = Arc::new(Self {
            registry,
            messenger,
            hooks,
            toggle,
        });

        if configuration.intercept_on_start() {
            context.init();
        }

        context
    }

    /// Builds the context on the proxy's end of a boundary and starts
    /// delivering inbound frames.
    pub fn start(configuration: &MockiatoConfiguration, page: PageEnd) -> Arc<Self> {
        let context = Self::new(configuration, Arc::new(page.transport));
        context.messenger.listen(page.inbound);
        context
    }

    /// Installs the hooks.
    pub fn init(&self) {
        self.toggle.apply(&Settings { enabled: true });
    }

    /// Removes the hooks; calls already waiting keep their own handle.
    pub fn teardown(&self) {
        self.toggle.apply(&Settings { enabled: false });
    }

    pub fn is_active(&self) -> bool {
        self.toggle.is_active()
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }
}
