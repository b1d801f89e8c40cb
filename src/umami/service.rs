use std::fmt;
use std::sync::{Arc, Weak};

use crate::logger::Logger;
use crate::umami::config::UmamiConfig;
use crate::umami::constants::LOGGER_NAME;
use crate::umami::document::{default_document, ScriptDocument};
use crate::umami::script::{LoadOutcome, ScriptLoader};
use crate::umami::tracker::{
    default_tracker_slot, IdentifyCall, PageViewProps, PageViewTransform, TrackCall, TrackerSlot,
    UmamiTracker,
};
use crate::umami::types::{EventData, IdentifyData, PageViewPayload, SessionIdentity};

/// Entry point for tracking. Cheap to clone; all clones share one script loader.
///
/// The script is removed when the last clone is dropped.
#[derive(Clone)]
pub struct UmamiService {
    inner: Arc<UmamiInner>,
}

pub(crate) struct UmamiInner {
    config: Arc<UmamiConfig>,
    loader: ScriptLoader,
    trackers: Arc<dyn TrackerSlot>,
    logger: Logger,
}

impl fmt::Debug for UmamiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmamiService")
            .field("site_id", &self.inner.config.site_id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl UmamiService {
    /// Creates a service bound to the platform document and tracker slot.
    pub fn new(config: UmamiConfig) -> Self {
        Self::with_capabilities(config, default_document(), default_tracker_slot())
    }

    pub fn with_capabilities(
        config: UmamiConfig,
        document: Arc<dyn ScriptDocument>,
        trackers: Arc<dyn TrackerSlot>,
    ) -> Self {
        let config = Arc::new(config);
        let logger = Logger::new(LOGGER_NAME);
        let loader = ScriptLoader::new(Arc::clone(&config), document, logger.clone());
        Self {
            inner: Arc::new(UmamiInner {
                config,
                loader,
                trackers,
                logger,
            }),
        }
    }

    pub fn config(&self) -> &UmamiConfig {
        &self.inner.config
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// Loads the tracker script. Repeated calls are no-ops once the script is in place.
    pub fn start(&self) -> LoadOutcome {
        self.inner.loader.init()
    }

    /// Removes the tracker script. Same as [`UmamiService::disable`].
    pub fn stop(&self) {
        self.disable();
    }

    /// Disables tracking at runtime, e.g. after the user opted out.
    pub fn disable(&self) {
        self.inner.loader.disable();
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.loader.is_initialized()
    }

    /// True when running in a browser, the script is loaded and the tracker has registered.
    pub fn is_available(&self) -> bool {
        self.inner.loader.document().is_browser()
            && self.is_initialized()
            && self.tracker().is_some()
    }

    /// Records a page view. `None` lets the tracker fill in the current page.
    pub fn track_page_view(&self, payload: Option<PageViewPayload>) {
        let Some(tracker) = self.tracker() else {
            return;
        };
        match payload {
            Some(payload) => tracker.track(TrackCall::PageViewWith(payload)),
            None => tracker.track(TrackCall::PageView),
        }
    }

    /// Records a page view whose properties are derived from the tracker's defaults, e.g. to
    /// strip personal data from the URL.
    pub fn track_page_view_with<F>(&self, transform: F)
    where
        F: Fn(PageViewProps) -> PageViewProps + Send + Sync + 'static,
    {
        if let Some(tracker) = self.tracker() {
            tracker.track(TrackCall::Transformed(PageViewTransform::new(transform)));
        }
    }

    pub fn track_event(&self, name: impl Into<String>, data: Option<EventData>) {
        let Some(tracker) = self.tracker() else {
            return;
        };
        let name = name.into();
        match data {
            Some(data) => tracker.track(TrackCall::EventWithData(name, data)),
            None => tracker.track(TrackCall::Event(name)),
        }
    }

    /// Identifies the current session.
    ///
    /// With a session id, `data` is forwarded alongside it. With a data map as first argument
    /// the second argument is ignored.
    pub fn identify(&self, session: impl Into<SessionIdentity>, data: Option<IdentifyData>) {
        let Some(tracker) = self.tracker() else {
            return;
        };
        let call = match (session.into(), data) {
            (SessionIdentity::Id(id), Some(data)) => IdentifyCall::IdWithData(id, data),
            (SessionIdentity::Id(id), None) => IdentifyCall::Id(id),
            (SessionIdentity::Data(data), _) => IdentifyCall::Data(data),
        };
        tracker.identify(call);
    }

    fn tracker(&self) -> Option<Arc<dyn UmamiTracker>> {
        if !self.inner.loader.document().is_browser() {
            return None;
        }
        self.inner.trackers.tracker()
    }

    pub(crate) fn downgrade(&self) -> Weak<UmamiInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<UmamiInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

pub(crate) type WeakService = Weak<UmamiInner>;
