//! Validation of the tracker script endpoint.

use std::fmt;

use url::Url;

use crate::logger::LogLevel;
use crate::umami::error::{UmamiError, UmamiErrorCode};

/// A script URL that passed [`validate_script_url`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptUrl(Url);

impl ScriptUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "https"
    }
}

impl fmt::Display for ScriptUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidScriptUrl {
    /// The value is not an absolute URL.
    Malformed { url: String, reason: String },
    /// Plain HTTP pointing somewhere other than a loopback development host.
    InsecureScheme { host: String },
    /// Anything that is neither `https` nor `http`, e.g. `javascript:` or `data:`.
    DisallowedScheme { scheme: String },
}

impl InvalidScriptUrl {
    /// Level at which the rejection is reported.
    pub fn log_level(&self) -> LogLevel {
        match self {
            InvalidScriptUrl::Malformed { .. } => LogLevel::Error,
            InvalidScriptUrl::InsecureScheme { .. } | InvalidScriptUrl::DisallowedScheme { .. } => {
                LogLevel::Warn
            }
        }
    }

    pub fn diagnostic(&self) -> String {
        match self {
            InvalidScriptUrl::Malformed { url, .. } => format!("Invalid script URL: \"{url}\""),
            InvalidScriptUrl::InsecureScheme { .. } => {
                "HTTP URLs are only allowed for localhost. Use HTTPS for production.".to_string()
            }
            InvalidScriptUrl::DisallowedScheme { scheme } => {
                format!("Invalid protocol \"{scheme}:\". Only HTTPS is allowed.")
            }
        }
    }
}

impl fmt::Display for InvalidScriptUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidScriptUrl::Malformed { url, reason } => {
                write!(f, "invalid script URL \"{url}\": {reason}")
            }
            InvalidScriptUrl::InsecureScheme { host } => {
                write!(f, "HTTP script URL is not allowed for host \"{host}\"")
            }
            InvalidScriptUrl::DisallowedScheme { scheme } => {
                write!(f, "script URL scheme \"{scheme}\" is not allowed")
            }
        }
    }
}

impl std::error::Error for InvalidScriptUrl {}

impl From<InvalidScriptUrl> for UmamiError {
    fn from(err: InvalidScriptUrl) -> Self {
        UmamiError::new(UmamiErrorCode::InvalidScriptUrl, err.to_string())
    }
}

/// Checks that `src` can be loaded as the tracker script.
///
/// HTTPS is always accepted. HTTP is accepted only for `localhost`, `127.0.0.1` and
/// `*.localhost`. Every other scheme is rejected. No network access happens here.
pub fn validate_script_url(src: &str) -> Result<ScriptUrl, InvalidScriptUrl> {
    let url = Url::parse(src).map_err(|err| InvalidScriptUrl::Malformed {
        url: src.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "https" => Ok(ScriptUrl(url)),
        "http" => {
            let host = url.host_str().unwrap_or_default();
            if is_local_host(host) {
                Ok(ScriptUrl(url))
            } else {
                Err(InvalidScriptUrl::InsecureScheme {
                    host: host.to_string(),
                })
            }
        }
        other => Err(InvalidScriptUrl::DisallowedScheme {
            scheme: other.to_string(),
        }),
    }
}

fn is_local_host(host: &str) -> bool {
    host == "localhost" || host == "127.0.0.1" || host.ends_with(".localhost")
}
