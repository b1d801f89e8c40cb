//! Runtime environment detection and default tracker configuration discovery.

use std::env;
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use serde_json::{Map, Value};

const DEFAULTS_VAR: &str = "__UMAMI_DEFAULTS__";
const DEFAULTS_PATH_VAR: &str = "__UMAMI_DEFAULTS_PATH";
const CONFIG_VAR: &str = "UMAMI_CONFIG";
const FORCE_ENVIRONMENT_VAR: &str = "UMAMI_ENV_FORCE";

/// Returns the parsed `__UMAMI_DEFAULTS__` object when available.
fn umami_defaults() -> Option<Value> {
    defaults_from_env()
        .or_else(defaults_from_path)
        .or_else(defaults_from_global)
}

fn defaults_from_env() -> Option<Value> {
    let raw = env::var(DEFAULTS_VAR).ok()?;
    parse_json_value(&raw)
}

fn defaults_from_path() -> Option<Value> {
    let path = env::var(DEFAULTS_PATH_VAR).ok()?;
    let content = fs::read_to_string(path).ok()?;
    parse_json_value(&content)
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn defaults_from_global() -> Option<Value> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str(DEFAULTS_VAR)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let serialized = js_sys::JSON::stringify(&value).ok()?.as_string()?;
    serde_json::from_str(&serialized).ok()
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn defaults_from_global() -> Option<Value> {
    None
}

fn parse_json_value(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw).ok()
}

/// Parses a configuration source that is either inline JSON, a path to a JSON file, or a
/// comma separated `key=value` list.
pub(crate) fn parse_config_source(raw: &str) -> Option<Value> {
    if let Some(json) = parse_json_value(raw).filter(Value::is_object) {
        return Some(json);
    }

    if let Some(path) = treat_as_path(raw) {
        if let Some(json) = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| parse_json_value(&contents))
            .filter(Value::is_object)
        {
            return Some(json);
        }
    }

    parse_key_value_config(raw)
}

#[cfg(not(target_arch = "wasm32"))]
fn treat_as_path(raw: &str) -> Option<String> {
    if raw.contains('=') {
        return None;
    }
    let trimmed = raw.trim();
    if Path::new(trimmed).exists() {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(target_arch = "wasm32")]
fn treat_as_path(_raw: &str) -> Option<String> {
    None
}

fn parse_key_value_config(raw: &str) -> Option<Value> {
    let mut map = Map::new();
    for entry in raw.split(',') {
        let mut parts = entry.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Retrieves the default tracker configuration as a JSON map when available.
///
/// The `config` member of `__UMAMI_DEFAULTS__` wins over the `UMAMI_CONFIG` variable.
pub fn default_config_json() -> Option<Map<String, Value>> {
    if let Some(defaults) = umami_defaults() {
        if let Some(config) = defaults.get("config").and_then(Value::as_object) {
            return Some(config.clone());
        }
    }

    let raw = env::var(CONFIG_VAR).ok()?;
    parse_config_source(&raw)?.as_object().cloned()
}

fn force_environment() -> Option<String> {
    umami_defaults()
        .and_then(|defaults| defaults.get("forceEnvironment").cloned())
        .or_else(|| env::var(FORCE_ENVIRONMENT_VAR).ok().map(Value::String))
        .and_then(|value| match value {
            Value::String(text) => Some(text.to_lowercase()),
            _ => None,
        })
}

/// Returns `true` if the runtime exposes a window with a document.
pub fn is_browser() -> bool {
    if let Some(forced) = force_environment() {
        return forced == "browser";
    }

    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        web_sys::window().and_then(|window| window.document()).is_some()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lock_env, temp_json_file};

    #[test]
    fn parses_key_value_configs() {
        let value = parse_key_value_config("websiteId=abc,src=https://a.example/script.js").unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("websiteId").unwrap().as_str(), Some("abc"));
        assert_eq!(
            map.get("src").unwrap().as_str(),
            Some("https://a.example/script.js")
        );
    }

    #[test]
    fn key_value_parser_skips_empty_entries() {
        assert!(parse_key_value_config("websiteId=,=x").is_none());
        assert!(parse_key_value_config("plain-text").is_none());
    }

    #[test]
    fn parse_config_source_accepts_files_and_json() {
        let json = parse_config_source("{\"websiteId\":\"inline\"}").unwrap();
        assert_eq!(json["websiteId"], "inline");

        let path = temp_json_file("source", "{\"websiteId\":\"from-file\"}");
        let path_str = path.to_string_lossy().to_string();
        let file_json = parse_config_source(&path_str).unwrap();
        assert_eq!(file_json["websiteId"], "from-file");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn json_arrays_are_not_config_objects() {
        assert!(parse_config_source("[1,2,3]").is_none());
    }

    #[test]
    fn no_source_yields_no_config() {
        let _env = lock_env();
        assert!(default_config_json().is_none());
        assert!(force_environment().is_none());
    }

    #[test]
    fn umami_config_variable_is_used_alone() {
        let env = lock_env();
        env.set(CONFIG_VAR, "websiteId=from-var,src=https://a.example/s.js");

        let config = default_config_json().unwrap();
        assert_eq!(config["websiteId"], "from-var");
        assert_eq!(config["src"], "https://a.example/s.js");
    }

    #[test]
    fn defaults_config_wins_over_umami_config() {
        let env = lock_env();
        env.set(CONFIG_VAR, "websiteId=from-var");
        env.set(DEFAULTS_VAR, r#"{"config": {"websiteId": "from-defaults"}}"#);

        let config = default_config_json().unwrap();
        assert_eq!(config["websiteId"], "from-defaults");
    }

    #[test]
    fn defaults_without_config_member_fall_back_to_umami_config() {
        let env = lock_env();
        env.set(DEFAULTS_VAR, r#"{"forceEnvironment": "node"}"#);
        env.set(CONFIG_VAR, r#"{"websiteId": "from-var"}"#);

        assert_eq!(default_config_json().unwrap()["websiteId"], "from-var");
    }

    #[test]
    fn defaults_are_read_from_path_variable() {
        let env = lock_env();
        let path = temp_json_file(
            "defaults",
            r#"{"config": {"websiteId": "from-path"}, "forceEnvironment": "Browser"}"#,
        );
        env.set(DEFAULTS_PATH_VAR, &path.to_string_lossy());

        assert_eq!(default_config_json().unwrap()["websiteId"], "from-path");
        assert!(is_browser());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn inline_defaults_shadow_the_path_variable() {
        let env = lock_env();
        let path = temp_json_file("shadowed", r#"{"config": {"websiteId": "from-path"}}"#);
        env.set(DEFAULTS_PATH_VAR, &path.to_string_lossy());
        env.set(DEFAULTS_VAR, r#"{"config": {"websiteId": "inline"}}"#);

        assert_eq!(default_config_json().unwrap()["websiteId"], "inline");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn forced_environment_variable_controls_browser_detection() {
        let env = lock_env();
        env.set(FORCE_ENVIRONMENT_VAR, "BROWSER");
        assert!(is_browser());

        env.set(FORCE_ENVIRONMENT_VAR, "node");
        assert!(!is_browser());
    }

    #[test]
    fn force_environment_in_defaults_beats_variable() {
        let env = lock_env();
        env.set(FORCE_ENVIRONMENT_VAR, "node");
        env.set(DEFAULTS_VAR, r#"{"forceEnvironment": "browser"}"#);
        assert_eq!(force_environment().as_deref(), Some("browser"));
        assert!(is_browser());
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    #[test]
    fn native_runtime_is_not_a_browser_unless_forced() {
        let _env = lock_env();
        assert!(!is_browser());
    }
}
