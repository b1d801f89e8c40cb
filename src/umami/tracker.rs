//! Access to the vendor tracker object (`window.umami` in the browser).
//!
//! The tracker is ambient and may only appear after the script finished loading, so the
//! service asks its [`TrackerSlot`] on every call instead of holding on to a tracker.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::umami::types::{EventData, IdentifyData, PageViewPayload};

/// Page view properties computed by the tracker (`website`, `hostname`, `url`, `title`, ...).
pub type PageViewProps = Map<String, Value>;

/// Rewrites the tracker's default page view properties before they are sent.
#[derive(Clone)]
pub struct PageViewTransform(Arc<dyn Fn(PageViewProps) -> PageViewProps + Send + Sync>);

impl PageViewTransform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(PageViewProps) -> PageViewProps + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    pub fn apply(&self, props: PageViewProps) -> PageViewProps {
        (self.0)(props)
    }
}

impl fmt::Debug for PageViewTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageViewTransform(..)")
    }
}

/// Two transforms are equal when they share the same function.
impl PartialEq for PageViewTransform {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The argument shapes accepted by `umami.track(...)`.
///
/// Omitting the argument and passing an empty payload are different calls for the tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackCall {
    /// `track()`: page view with the tracker's own defaults.
    PageView,
    /// `track(payload)`
    PageViewWith(PageViewPayload),
    /// `track(props => props)`: the tracker passes its default properties through the
    /// transform.
    Transformed(PageViewTransform),
    /// `track(name)`
    Event(String),
    /// `track(name, data)`
    EventWithData(String, EventData),
}

/// The argument shapes accepted by `umami.identify(...)`.
#[derive(Clone, Debug, PartialEq)]
pub enum IdentifyCall {
    /// `identify(id)`
    Id(String),
    /// `identify(id, data)`
    IdWithData(String, IdentifyData),
    /// `identify(data)`
    Data(IdentifyData),
}

pub trait UmamiTracker: Send + Sync {
    fn track(&self, call: TrackCall);

    fn identify(&self, call: IdentifyCall);
}

/// Looks up the currently registered tracker, if any.
pub trait TrackerSlot: Send + Sync {
    fn tracker(&self) -> Option<Arc<dyn UmamiTracker>>;
}

/// Slot that never yields a tracker.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyTrackerSlot;

impl TrackerSlot for EmptyTrackerSlot {
    fn tracker(&self) -> Option<Arc<dyn UmamiTracker>> {
        None
    }
}

/// Slot whose tracker can be installed and cleared at runtime.
#[derive(Clone, Default)]
pub struct SharedTrackerSlot {
    tracker: Arc<RwLock<Option<Arc<dyn UmamiTracker>>>>,
}

impl fmt::Debug for SharedTrackerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTrackerSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl SharedTrackerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, tracker: Arc<dyn UmamiTracker>) {
        *self
            .tracker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(tracker);
    }

    pub fn clear(&self) {
        self.tracker
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_installed(&self) -> bool {
        self.tracker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl TrackerSlot for SharedTrackerSlot {
    fn tracker(&self) -> Option<Arc<dyn UmamiTracker>> {
        self.tracker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Slot used when none is supplied: `window.umami` on `wasm-web` builds, otherwise an
/// [`EmptyTrackerSlot`].
pub fn default_tracker_slot() -> Arc<dyn TrackerSlot> {
    #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
    {
        Arc::new(crate::umami::web::WindowTrackerSlot)
    }

    #[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
    {
        Arc::new(EmptyTrackerSlot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTracker;

    #[test]
    fn empty_slot_has_no_tracker() {
        assert!(EmptyTrackerSlot.tracker().is_none());
    }

    #[test]
    fn shared_slot_install_and_clear() {
        let slot = SharedTrackerSlot::new();
        assert!(slot.tracker().is_none());

        let recorder = RecordingTracker::default();
        slot.install(Arc::new(recorder.clone()));
        assert!(slot.is_installed());

        let tracker = slot.tracker().unwrap();
        tracker.track(TrackCall::Event("clicked".into()));
        assert_eq!(
            recorder.track_calls(),
            vec![TrackCall::Event("clicked".into())]
        );

        slot.clear();
        assert!(slot.tracker().is_none());
    }

    #[test]
    fn transform_equality_follows_the_shared_function() {
        let transform = PageViewTransform::new(|mut props| {
            props.insert("url".into(), Value::from("/checkout"));
            props
        });
        let other = PageViewTransform::new(|props| props);

        assert_eq!(
            TrackCall::Transformed(transform.clone()),
            TrackCall::Transformed(transform.clone())
        );
        assert_ne!(transform, other);
        assert_eq!(format!("{transform:?}"), "PageViewTransform(..)");

        let rewritten = transform.apply(PageViewProps::from_iter([
            ("website".to_string(), Value::from("site")),
            ("url".to_string(), Value::from("/cart?step=2")),
        ]));
        assert_eq!(rewritten["url"], "/checkout");
        assert_eq!(rewritten["website"], "site");
    }

    #[test]
    fn clones_share_the_installed_tracker() {
        let slot = SharedTrackerSlot::new();
        let other = slot.clone();
        slot.install(Arc::new(RecordingTracker::default()));
        assert!(other.is_installed());
    }
}
