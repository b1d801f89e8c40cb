//! Automatic page views for client-side navigation.
//!
//! The host router is reached through [`RouterEvents`]. Hosts that drive their own router can
//! publish into a [`RouterEventHub`], which is also what the tests use.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::umami::service::UmamiService;
use crate::umami::types::PageViewPayload;
use crate::util::subscribe::{PartialObserver, Unsubscribe};

/// A navigation that completed, possibly after redirects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEnd {
    pub id: u64,
    /// URL that was requested.
    pub url: String,
    /// URL that was finally rendered.
    pub url_after_redirects: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterEvent {
    NavigationStart { id: u64, url: String },
    NavigationEnd(NavigationEnd),
    NavigationCancel { id: u64, url: String, reason: String },
    NavigationError { id: u64, url: String, error: String },
}

/// Stream of router events.
pub trait RouterEvents: Send + Sync {
    fn subscribe(&self, observer: PartialObserver<RouterEvent>) -> Unsubscribe;
}

#[derive(Default)]
struct HubInner {
    observers: Mutex<Vec<(u64, PartialObserver<RouterEvent>)>>,
    next_observer: AtomicU64,
    next_navigation: AtomicU64,
}

impl HubInner {
    fn lock(&self) -> MutexGuard<'_, Vec<(u64, PartialObserver<RouterEvent>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process broadcaster of [`RouterEvent`]s.
#[derive(Clone, Default)]
pub struct RouterEventHub {
    inner: Arc<HubInner>,
}

impl fmt::Debug for RouterEventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterEventHub")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl RouterEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` synchronously to every current observer.
    pub fn emit(&self, event: RouterEvent) {
        let observers: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer.notify_next(&event);
        }
    }

    /// Emits a start/end pair for a navigation to `requested` that rendered `resolved`.
    pub fn navigate(&self, requested: impl Into<String>, resolved: impl Into<String>) -> u64 {
        let id = self.inner.next_navigation.fetch_add(1, Ordering::SeqCst) + 1;
        let url = requested.into();
        self.emit(RouterEvent::NavigationStart {
            id,
            url: url.clone(),
        });
        self.emit(RouterEvent::NavigationEnd(NavigationEnd {
            id,
            url,
            url_after_redirects: resolved.into(),
        }));
        id
    }

    /// Completes and drops every observer.
    pub fn complete(&self) {
        let observers = std::mem::take(&mut *self.inner.lock());
        for (_, observer) in observers {
            observer.notify_complete();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().len()
    }
}

impl RouterEvents for RouterEventHub {
    fn subscribe(&self, observer: PartialObserver<RouterEvent>) -> Unsubscribe {
        let id = self.inner.next_observer.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().push((id, observer));

        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.lock().retain(|(observer_id, _)| *observer_id != id);
            }
        })
    }
}

/// Sends a page view with the post-redirect URL for each completed navigation.
///
/// Nothing is subscribed until [`RouterTracker::start`]; the subscription ends on
/// [`RouterTracker::stop`] or drop.
pub struct RouterTracker {
    service: UmamiService,
    events: Arc<dyn RouterEvents>,
    subscription: Mutex<Option<Unsubscribe>>,
}

impl fmt::Debug for RouterTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterTracker")
            .field("active", &self.is_active())
            .finish()
    }
}

impl RouterTracker {
    pub fn new(service: UmamiService, events: Arc<dyn RouterEvents>) -> Self {
        Self {
            service,
            events,
            subscription: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut subscription = self.lock_subscription();
        if subscription.is_some() {
            return;
        }

        let service = self.service.clone();
        let observer = PartialObserver::new().with_next(move |event: &RouterEvent| {
            if let RouterEvent::NavigationEnd(end) = event {
                service.track_page_view(Some(PageViewPayload::with_url(
                    end.url_after_redirects.clone(),
                )));
            }
        });
        *subscription = Some(self.events.subscribe(observer));
    }

    pub fn stop(&self) {
        let unsubscribe = self.lock_subscription().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_subscription().is_some()
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<Unsubscribe>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RouterTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
