use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::platform::environment::default_config_json;
use crate::umami::error::{invalid_config, UmamiResult};

/// Tracker configuration, supplied once when the service is composed.
///
/// Serialized keys follow the Umami script attributes (`websiteId`, `src`, `doNotTrack`,
/// `domains`, `excludeSearch`, `excludeHash`, `hostUrl`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UmamiConfig {
    /// Website id from the Umami dashboard. Passed through untouched.
    #[serde(rename = "websiteId", alias = "siteId")]
    pub site_id: String,
    /// URL of the tracker script.
    #[serde(rename = "src", alias = "endpoint")]
    pub endpoint: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lets the tracker record page views on its own. Disable when routing is tracked manually.
    #[serde(default = "default_true")]
    pub auto_track: bool,
    /// Skip loading when the browser reports Do Not Track.
    #[serde(default, rename = "doNotTrack", alias = "respectDoNotTrack")]
    pub respect_do_not_track: bool,
    /// Hostnames tracking is restricted to. Empty means no restriction.
    #[serde(default, rename = "domains", alias = "allowedHosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, rename = "excludeSearch", alias = "excludeQuery")]
    pub exclude_query: bool,
    #[serde(default, rename = "excludeHash", alias = "excludeFragment")]
    pub exclude_fragment: bool,
    /// Collection endpoint override, typically a first-party proxy.
    #[serde(
        default,
        rename = "hostUrl",
        alias = "proxyHostUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy_host_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for UmamiConfig {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            endpoint: String::new(),
            enabled: true,
            auto_track: true,
            respect_do_not_track: false,
            allowed_hosts: Vec::new(),
            tag: None,
            exclude_query: false,
            exclude_fragment: false,
            proxy_host_url: None,
        }
    }
}

const BOOLEAN_KEYS: &[&str] = &[
    "enabled",
    "autoTrack",
    "doNotTrack",
    "respectDoNotTrack",
    "excludeSearch",
    "excludeQuery",
    "excludeHash",
    "excludeFragment",
];

const LIST_KEYS: &[&str] = &["domains", "allowedHosts"];

impl UmamiConfig {
    pub fn new(site_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Parses a JSON object using either the Umami attribute names or their aliases.
    pub fn from_json(raw: &str) -> UmamiResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| invalid_config(format!("Failed to parse tracker config: {err}")))?;
        match value {
            Value::Object(map) => Self::from_json_map(map),
            _ => Err(invalid_config("Tracker config must be a JSON object")),
        }
    }

    /// Builds a config from a JSON map. String values produced by the flat `key=value`
    /// format are coerced: booleans accept `true`/`false` and `domains` is split on `|`.
    pub fn from_json_map(map: Map<String, Value>) -> UmamiResult<Self> {
        let mut normalized = Map::new();
        for (key, value) in map {
            let value = coerce_flat_value(&key, value)?;
            normalized.insert(key, value);
        }
        serde_json::from_value(Value::Object(normalized))
            .map_err(|err| invalid_config(format!("Invalid tracker config: {err}")))
    }

    /// Loads the config from `__UMAMI_DEFAULTS__` or `UMAMI_CONFIG`.
    pub fn from_env() -> UmamiResult<Self> {
        let map = default_config_json().ok_or_else(|| {
            invalid_config("No tracker config found in __UMAMI_DEFAULTS__ or UMAMI_CONFIG")
        })?;
        Self::from_json_map(map)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|tag| !tag.is_empty())
    }

    pub fn proxy_host_url(&self) -> Option<&str> {
        self.proxy_host_url.as_deref().filter(|url| !url.is_empty())
    }
}

fn coerce_flat_value(key: &str, value: Value) -> UmamiResult<Value> {
    let Value::String(text) = value else {
        return Ok(value);
    };

    if BOOLEAN_KEYS.contains(&key) {
        return match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(invalid_config(format!(
                "Expected a boolean for \"{key}\", got \"{other}\""
            ))),
        };
    }

    if LIST_KEYS.contains(&key) {
        let hosts = text
            .split('|')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(|host| Value::String(host.to_string()))
            .collect();
        return Ok(Value::Array(hosts));
    }

    Ok(Value::String(text))
}
