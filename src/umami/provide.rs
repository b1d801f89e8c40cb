//! Application wiring: builds the service once at startup and makes it reachable afterwards.
//!
//! ```
//! use umami_rs_sdk::umami::{inject_umami, provide_umami, UmamiConfig};
//!
//! let app = provide_umami(UmamiConfig::new(
//!     "your-website-id",
//!     "https://analytics.example.com/script.js",
//! ))
//! .bootstrap()
//! .unwrap();
//!
//! assert!(inject_umami().is_some());
//! app.shutdown();
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use crate::umami::config::UmamiConfig;
use crate::umami::document::{default_document, ScriptDocument};
use crate::umami::error::UmamiResult;
use crate::umami::router::{RouterEvents, RouterTracker};
use crate::umami::service::{UmamiService, WeakService};
use crate::umami::tracker::{default_tracker_slot, TrackerSlot};

static REGISTERED: LazyLock<Mutex<Option<WeakService>>> = LazyLock::new(|| Mutex::new(None));

type ConfigFactory = Box<dyn FnOnce() -> UmamiResult<UmamiConfig> + Send>;

enum ConfigSource {
    Fixed(UmamiConfig),
    Factory(ConfigFactory),
}

impl ConfigSource {
    fn resolve(self) -> UmamiResult<UmamiConfig> {
        match self {
            ConfigSource::Fixed(config) => Ok(config),
            ConfigSource::Factory(factory) => factory(),
        }
    }
}

/// Collected providers, turned into a running [`UmamiApp`] by [`UmamiProviders::bootstrap`].
pub struct UmamiProviders {
    config: ConfigSource,
    document: Option<Arc<dyn ScriptDocument>>,
    trackers: Option<Arc<dyn TrackerSlot>>,
    router: Option<Arc<dyn RouterEvents>>,
}

impl fmt::Debug for UmamiProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmamiProviders")
            .field("factory", &matches!(self.config, ConfigSource::Factory(_)))
            .field("custom_document", &self.document.is_some())
            .field("custom_trackers", &self.trackers.is_some())
            .field("router_tracking", &self.router.is_some())
            .finish()
    }
}

/// Provides the tracker with a fixed configuration.
pub fn provide_umami(config: UmamiConfig) -> UmamiProviders {
    UmamiProviders::from_source(ConfigSource::Fixed(config))
}

/// Provides the tracker with a configuration computed at bootstrap, e.g.
/// `provide_umami_with_factory(UmamiConfig::from_env)`.
pub fn provide_umami_with_factory<F>(factory: F) -> UmamiProviders
where
    F: FnOnce() -> UmamiResult<UmamiConfig> + Send + 'static,
{
    UmamiProviders::from_source(ConfigSource::Factory(Box::new(factory)))
}

impl UmamiProviders {
    fn from_source(config: ConfigSource) -> Self {
        Self {
            config,
            document: None,
            trackers: None,
            router: None,
        }
    }

    pub fn with_document(mut self, document: Arc<dyn ScriptDocument>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_tracker_slot(mut self, trackers: Arc<dyn TrackerSlot>) -> Self {
        self.trackers = Some(trackers);
        self
    }

    /// Sends a page view for every completed navigation of `events`.
    pub fn with_router_tracking(mut self, events: Arc<dyn RouterEvents>) -> Self {
        self.router = Some(events);
        self
    }

    /// Resolves the configuration, starts the service and router tracking, then registers the
    /// service for [`inject_umami`].
    pub fn bootstrap(self) -> UmamiResult<UmamiApp> {
        let config = self.config.resolve()?;
        let service = UmamiService::with_capabilities(
            config,
            self.document.unwrap_or_else(default_document),
            self.trackers.unwrap_or_else(default_tracker_slot),
        );
        service.start();

        let router_tracker = self.router.map(|events| {
            let tracker = RouterTracker::new(service.clone(), events);
            tracker.start();
            tracker
        });

        *lock_registry() = Some(service.downgrade());

        Ok(UmamiApp {
            service,
            router_tracker,
        })
    }
}

/// A bootstrapped tracker.
#[derive(Debug)]
pub struct UmamiApp {
    service: UmamiService,
    router_tracker: Option<RouterTracker>,
}

impl UmamiApp {
    pub fn service(&self) -> &UmamiService {
        &self.service
    }

    pub fn router_tracker(&self) -> Option<&RouterTracker> {
        self.router_tracker.as_ref()
    }

    /// Stops router tracking, removes the script and unregisters the service.
    pub fn shutdown(self) {
        if let Some(tracker) = &self.router_tracker {
            tracker.stop();
        }
        self.service.stop();

        let mut registered = lock_registry();
        let is_current = registered
            .as_ref()
            .is_some_and(|weak| weak.ptr_eq(&self.service.downgrade()));
        if is_current {
            registered.take();
        }
    }
}

/// The service of the most recent bootstrap, while it is alive.
pub fn inject_umami() -> Option<UmamiService> {
    lock_registry().as_ref().and_then(UmamiService::upgrade)
}

fn lock_registry() -> MutexGuard<'static, Option<WeakService>> {
    REGISTERED.lock().unwrap_or_else(PoisonError::into_inner)
}
