//! Turns interception on and off at runtime.

use crate::{interceptor::RequestInterceptor, observer::ResponseObserver};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// The pair of hooks a call passes through while interception is on.
#[derive(Debug)]
pub struct InstalledHooks {
    pub interceptor: RequestInterceptor,
    pub observer: ResponseObserver,
}

/// Slot holding the currently installed hooks, if any.
///
/// Calls take their own handle with [`Hooks::current`], so removing the hooks
/// never affects a call that is already waiting for its decision.
#[derive(Debug, Default)]
pub struct Hooks {
    installed: RwLock<Option<Arc<InstalledHooks>>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<InstalledHooks>> {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_installed(&self) -> bool {
        self.current().is_some()
    }

    pub fn install(&self, hooks: InstalledHooks) {
        *self.installed.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hooks));
    }

    /// Returns whether hooks were installed.
    pub fn remove(&self) -> bool {
        self.installed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Installs hooks built by `build` unless some are already in place.
    /// Returns whether anything changed.
    fn ensure_installed<F: FnOnce() -> InstalledHooks>(&self, build: F) -> bool {
        let mut installed = self.installed.write().unwrap_or_else(PoisonError::into_inner);
        if installed.is_some() {
            return false;
        }
        *installed = Some(Arc::new(build()));
        true
    }
}

/// Something that shows whether interception is active.
pub trait StatusIndicator: Debug {
    fn show(&self, active: bool);
}

#[derive(Debug, Default)]
pub struct LogStatusIndicator;

impl StatusIndicator for LogStatusIndicator {
    fn show(&self, active: bool) {
        info!("interception {}", if active { "enabled" } else { "disabled" });
    }
}

type HookFactory = Box<dyn Fn() -> InstalledHooks + Send + Sync>;

pub struct InterceptionToggle {
    hooks: Arc<Hooks>,
    factory: HookFactory,
    indicator: Option<Arc<dyn StatusIndicator + Send + Sync>>,
}

impl InterceptionToggle {
    pub fn new<F>(
        hooks: Arc<Hooks>,
        factory: F,
        indicator: Option<Arc<dyn StatusIndicator + Send + Sync>>,
    ) -> Self
    where
        F: Fn() -> InstalledHooks + Send + Sync + 'static,
    {
        Self {
            hooks,
            factory: Box::new(factory),
            indicator,
        }
    }

    /// Applies a settings change and returns whether interception is now active.
    pub fn apply(&self, settings: &Settings) -> bool {
        let active = settings.enabled;

        let changed = if active {
            self.hooks.ensure_installed(|| (self.factory)())
        } else {
            self.hooks.remove()
        };

        if changed {
            info!("hooks {}", if active { "installed" } else { "removed" });
        }

        // No indicator is fine; there is just nothing to update.
        if let Some(indicator) = &self.indicator {
            indicator.show(active);
        }

        active
    }

    pub fn is_active(&self) -> bool {
        self.hooks.is_installed()
    }
}

impl Debug for InterceptionToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionToggle")
            .field("hooks", &self.hooks)
            .field("indicator", &self.indicator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alert::LogAlerts,
        messenger::{duplex, Messenger},
        registry::CorrelationRegistry,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    #[derive(Debug, Default)]
    struct RecordingIndicator {
        shown: Mutex<Vec<bool>>,
    }

    impl StatusIndicator for RecordingIndicator {
        fn show(&self, active: bool) {
            self.shown.lock().unwrap().push(active);
        }
    }

    fn toggle(
        indicator: Option<Arc<dyn StatusIndicator + Send + Sync>>,
    ) -> (InterceptionToggle, Arc<Hooks>, Arc<AtomicUsize>) {
        let (page, _authority) = duplex();
        let messenger = Messenger::new(Arc::new(page.transport));
        let hooks = Arc::new(Hooks::new());
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let toggle = InterceptionToggle::new(
            hooks.clone(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                InstalledHooks {
                    interceptor: RequestInterceptor::new(
                        CorrelationRegistry::new(),
                        messenger.clone(),
                        Arc::new(LogAlerts),
                        None,
                    ),
                    observer: ResponseObserver::new(messenger.clone()),
                }
            },
            indicator,
        );

        (toggle, hooks, built)
    }

    #[test]
    fn enable_then_disable() {
        let (toggle, hooks, built) = toggle(None);

        assert!(toggle.apply(&Settings { enabled: true }));
        assert!(hooks.is_installed());

        assert!(!toggle.apply(&Settings { enabled: false }));
        assert!(!hooks.is_installed());

        assert!(toggle.apply(&Settings::default()));
        assert!(hooks.is_installed());
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_enable_keeps_existing_hooks() {
        let (toggle, hooks, built) = toggle(None);

        toggle.apply(&Settings { enabled: true });
        let first = hooks.current().unwrap();
        toggle.apply(&Settings { enabled: true });

        assert!(Arc::ptr_eq(&first, &hooks.current().unwrap()));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn held_hooks_survive_removal() {
        let (toggle, hooks, _) = toggle(None);
        toggle.apply(&Settings { enabled: true });
        let held = hooks.current().unwrap();

        toggle.apply(&Settings { enabled: false });

        assert!(hooks.current().is_none());
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn indicator_tracks_every_change() {
        let indicator = Arc::new(RecordingIndicator::default());
        let (toggle, _, _) = toggle(Some(indicator.clone()));

        toggle.apply(&Settings { enabled: true });
        toggle.apply(&Settings { enabled: false });

        assert_eq!(*indicator.shown.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn settings_default_to_enabled() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.enabled);
    }
}
