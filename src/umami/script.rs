//! Tracker script lifecycle: gatekeeping, tag construction, injection and removal.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::logger::Logger;
use crate::umami::config::UmamiConfig;
use crate::umami::document::{ScriptDocument, ScriptHandle};
use crate::umami::error::UmamiError;
use crate::umami::script_url::{validate_script_url, InvalidScriptUrl};

/// Description of the `<script>` element the loader asks the document to create.
///
/// `dataset` uses the camelCase keys of `HTMLElement.dataset`; [`ScriptTag::attributes`] yields
/// the matching `data-*` attribute names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
    pub dataset: BTreeMap<String, String>,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            is_async: true,
            defer: true,
            dataset: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dataset.insert(key.into(), value.into());
        self
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset.get(key).map(String::as_str)
    }

    /// `data-*` attributes, e.g. `websiteId` becomes `data-website-id`.
    pub fn attributes(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.dataset
            .iter()
            .map(|(key, value)| (data_attribute_name(key), value.as_str()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.dataset
            .iter()
            .find(|(key, _)| data_attribute_name(key) == name)
            .map(|(_, value)| value.as_str())
    }
}

fn data_attribute_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// Builds the tracker tag for `config`. Optional attributes are only present when set.
pub fn build_script_tag(config: &UmamiConfig) -> ScriptTag {
    let mut tag = ScriptTag::new(config.endpoint.clone()).with_data("websiteId", &config.site_id);

    if !config.auto_track {
        tag = tag.with_data("autoTrack", "false");
    }
    if config.respect_do_not_track {
        tag = tag.with_data("doNotTrack", "true");
    }
    if !config.allowed_hosts.is_empty() {
        tag = tag.with_data("domains", config.allowed_hosts.join(","));
    }
    if let Some(value) = config.tag() {
        tag = tag.with_data("tag", value);
    }
    if config.exclude_query {
        tag = tag.with_data("excludeSearch", "true");
    }
    if config.exclude_fragment {
        tag = tag.with_data("excludeHash", "true");
    }
    if let Some(host_url) = config.proxy_host_url() {
        tag = tag.with_data("hostUrl", host_url);
    }
    tag
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotBrowser,
    Disabled,
    DoNotTrack,
    DomainNotAllowed { hostname: String },
    InvalidUrl(InvalidScriptUrl),
    InjectionFailed(UmamiError),
}

/// Result of [`ScriptLoader::init`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ScriptHandle),
    AlreadyLoaded,
    Skipped(SkipReason),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_) | LoadOutcome::AlreadyLoaded)
    }
}

/// Owns the single tracker script of an application.
///
/// The loader is initialized exactly when it holds a handle, so the handle and the
/// initialized flag cannot drift apart.
pub struct ScriptLoader {
    config: Arc<UmamiConfig>,
    document: Arc<dyn ScriptDocument>,
    handle: Mutex<Option<ScriptHandle>>,
    logger: Logger,
}

impl ScriptLoader {
    pub fn new(config: Arc<UmamiConfig>, document: Arc<dyn ScriptDocument>, logger: Logger) -> Self {
        Self {
            config,
            document,
            handle: Mutex::new(None),
            logger,
        }
    }

    pub fn document(&self) -> &Arc<dyn ScriptDocument> {
        &self.document
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_handle().is_some()
    }

    pub fn handle(&self) -> Option<ScriptHandle> {
        *self.lock_handle()
    }

    /// Injects the tracker script unless a gate rejects it. Never fails; rejections are
    /// logged and reported through the returned outcome.
    ///
    /// The handle lock is not held while gates log or while the document runs.
    pub fn init(&self) -> LoadOutcome {
        if self.is_initialized() {
            return LoadOutcome::AlreadyLoaded;
        }

        if let Err(reason) = self.check_gates() {
            return LoadOutcome::Skipped(reason);
        }

        let tag = build_script_tag(&self.config);
        let inserted = match self.document.append_script(&tag) {
            Ok(inserted) => inserted,
            Err(err) => {
                self.logger
                    .error(format!("Failed to inject tracker script: {}", err.message()));
                return LoadOutcome::Skipped(SkipReason::InjectionFailed(err));
            }
        };

        let raced = {
            let mut handle = self.lock_handle();
            if handle.is_some() {
                true
            } else {
                *handle = Some(inserted);
                false
            }
        };
        if raced {
            // Another init stored its script first; keep that one.
            self.document.remove_script(inserted);
            return LoadOutcome::AlreadyLoaded;
        }
        LoadOutcome::Loaded(inserted)
    }

    /// Removes the injected script, if any. Safe to call repeatedly.
    pub fn disable(&self) {
        let handle = self.lock_handle().take();
        if let Some(handle) = handle {
            self.document.remove_script(handle);
        }
    }

    fn check_gates(&self) -> Result<(), SkipReason> {
        if !self.document.is_browser() {
            return Err(SkipReason::NotBrowser);
        }

        if !self.config.enabled {
            self.logger.debug("Tracking is disabled");
            return Err(SkipReason::Disabled);
        }

        if self.config.respect_do_not_track && self.document.do_not_track().as_deref() == Some("1")
        {
            self.logger
                .debug("Do Not Track is enabled, tracking disabled");
            return Err(SkipReason::DoNotTrack);
        }

        if !self.config.allowed_hosts.is_empty() {
            let hostname = self.document.hostname().unwrap_or_default();
            if !self.config.allowed_hosts.iter().any(|host| *host == hostname) {
                self.logger.debug(format!(
                    "Current domain \"{hostname}\" not in allowed domains"
                ));
                return Err(SkipReason::DomainNotAllowed { hostname });
            }
        }

        if let Err(invalid) = validate_script_url(&self.config.endpoint) {
            self.logger.emit(invalid.log_level(), invalid.diagnostic());
            self.logger
                .error("Script loading aborted due to invalid URL");
            return Err(SkipReason::InvalidUrl(invalid));
        }

        Ok(())
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<ScriptHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScriptLoader {
    fn drop(&mut self) {
        self.disable();
    }
}
