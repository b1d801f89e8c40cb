//! Declarative event tracking bound to DOM events.
//!
//! A [`TrackTrigger`] is usually built from element attributes:
//!
//! ```html
//! <button data-umami-track="signup_click">Sign Up</button>
//! <button data-umami-track="purchase"
//!         data-umami-track-data='{"product": "Premium", "price": 99}'>Buy Now</button>
//! <input data-umami-track="search_focus" data-umami-track-on="focus">
//! ```

use std::fmt;
use std::str::FromStr;

use crate::umami::constants::{TRACK_ATTRIBUTE, TRACK_DATA_ATTRIBUTE, TRACK_ON_ATTRIBUTE};
use crate::umami::error::{invalid_argument, UmamiError, UmamiResult};
use crate::umami::service::UmamiService;
use crate::umami::types::EventData;

/// DOM event types a trigger can listen for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    #[default]
    Click,
    Focus,
    Blur,
    MouseEnter,
    MouseLeave,
    Submit,
}

impl TriggerEvent {
    pub const ALL: [TriggerEvent; 6] = [
        TriggerEvent::Click,
        TriggerEvent::Focus,
        TriggerEvent::Blur,
        TriggerEvent::MouseEnter,
        TriggerEvent::MouseLeave,
        TriggerEvent::Submit,
    ];

    /// The DOM event type name.
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerEvent::Click => "click",
            TriggerEvent::Focus => "focus",
            TriggerEvent::Blur => "blur",
            TriggerEvent::MouseEnter => "mouseenter",
            TriggerEvent::MouseLeave => "mouseleave",
            TriggerEvent::Submit => "submit",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = UmamiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| {
                invalid_argument(format!(
                    "Unsupported trigger event \"{s}\"; expected one of click, focus, blur, \
                     mouseenter, mouseleave, submit"
                ))
            })
    }
}

/// Tracks a named event whenever the configured DOM event fires.
#[derive(Clone, Debug)]
pub struct TrackTrigger {
    service: UmamiService,
    event_name: String,
    data: Option<EventData>,
    on: TriggerEvent,
}

impl TrackTrigger {
    pub fn new(service: UmamiService, event_name: impl Into<String>) -> Self {
        Self {
            service,
            event_name: event_name.into(),
            data: None,
            on: TriggerEvent::default(),
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn on(mut self, event: TriggerEvent) -> Self {
        self.on = event;
        self
    }

    /// Reads `data-umami-track`, `data-umami-track-on` and `data-umami-track-data` through
    /// `lookup`.
    pub fn from_attributes<F>(service: UmamiService, lookup: F) -> UmamiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let event_name = lookup(TRACK_ATTRIBUTE)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid_argument(format!("{TRACK_ATTRIBUTE} must name an event")))?;

        let mut trigger = Self::new(service, event_name);

        if let Some(on) = lookup(TRACK_ON_ATTRIBUTE) {
            trigger.on = on.trim().parse()?;
        }

        if let Some(raw) = lookup(TRACK_DATA_ATTRIBUTE) {
            let data: EventData = serde_json::from_str(&raw).map_err(|err| {
                invalid_argument(format!("{TRACK_DATA_ATTRIBUTE} is not valid event data: {err}"))
            })?;
            trigger.data = Some(data);
        }

        Ok(trigger)
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn data(&self) -> Option<&EventData> {
        self.data.as_ref()
    }

    pub fn trigger_event(&self) -> TriggerEvent {
        self.on
    }

    /// Tracks the event if `dom_event` is the configured type. Returns whether it fired.
    pub fn handle(&self, dom_event: &str) -> bool {
        if dom_event != self.on.as_str() {
            return false;
        }
        self.fire();
        true
    }

    fn fire(&self) {
        self.service
            .track_event(self.event_name.clone(), self.data.clone());
    }
}
