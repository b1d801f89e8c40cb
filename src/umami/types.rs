use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single custom event property. Umami accepts strings, numbers and booleans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        EventValue::Text(value.to_string())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::Text(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        EventValue::Bool(value)
    }
}

impl From<f64> for EventValue {
    fn from(value: f64) -> Self {
        EventValue::Number(value)
    }
}

macro_rules! impl_number_event_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EventValue {
                fn from(value: $ty) -> Self {
                    EventValue::Number(value as f64)
                }
            }
        )*
    };
}

impl_number_event_value!(f32, i32, i64, u32, u64, usize);

/// Custom event properties.
pub type EventData = BTreeMap<String, EventValue>;

/// Session properties passed to `identify`.
pub type IdentifyData = BTreeMap<String, EventValue>;

/// Builds an [`EventData`] map from key/value pairs.
pub fn event_data<I, K, V>(entries: I) -> EventData
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<EventValue>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Overrides for a manual page view. Unset fields are left for the tracker to fill in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl PageViewPayload {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

/// First argument of `identify`: either a session id or a bag of session properties.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionIdentity {
    Id(String),
    Data(IdentifyData),
}

impl From<&str> for SessionIdentity {
    fn from(value: &str) -> Self {
        SessionIdentity::Id(value.to_string())
    }
}

impl From<String> for SessionIdentity {
    fn from(value: String) -> Self {
        SessionIdentity::Id(value)
    }
}

impl From<IdentifyData> for SessionIdentity {
    fn from(value: IdentifyData) -> Self {
        SessionIdentity::Data(value)
    }
}
