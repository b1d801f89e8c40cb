//! Document capability used by the script loader.
//!
//! The loader never touches a DOM directly. It asks a [`ScriptDocument`] whether it runs in a
//! browser, reads the Do Not Track flag and the hostname, and appends or removes script tags.
//! [`MemoryDocument`] is a browser-like stand-in for native hosts and tests, and
//! [`DetachedDocument`] represents server-side rendering where no document exists.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::umami::error::UmamiResult;
use crate::umami::script::ScriptTag;

/// Opaque reference to a script element appended by a [`ScriptDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptHandle(u64);

impl ScriptHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

pub trait ScriptDocument: Send + Sync {
    /// Whether a real document is available (false during server-side rendering).
    fn is_browser(&self) -> bool;

    /// Raw value of the browser's Do Not Track signal, if exposed.
    fn do_not_track(&self) -> Option<String>;

    /// Hostname of the current location.
    fn hostname(&self) -> Option<String>;

    /// Creates a script element from `tag` and appends it to the document head.
    fn append_script(&self, tag: &ScriptTag) -> UmamiResult<ScriptHandle>;

    /// Removes a previously appended script. Unknown handles are ignored.
    fn remove_script(&self, handle: ScriptHandle);
}

/// Document for contexts without a DOM. Reports `is_browser() == false`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedDocument;

impl ScriptDocument for DetachedDocument {
    fn is_browser(&self) -> bool {
        false
    }

    fn do_not_track(&self) -> Option<String> {
        None
    }

    fn hostname(&self) -> Option<String> {
        None
    }

    fn append_script(&self, _tag: &ScriptTag) -> UmamiResult<ScriptHandle> {
        Err(crate::umami::error::script_injection(
            "No document is available in this environment",
        ))
    }

    fn remove_script(&self, _handle: ScriptHandle) {}
}

#[derive(Debug, Default)]
struct MemoryDocumentState {
    browser: bool,
    do_not_track: Option<String>,
    hostname: Option<String>,
    head: BTreeMap<ScriptHandle, ScriptTag>,
    next_handle: u64,
}

/// In-memory document whose head can be inspected.
#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    state: Arc<Mutex<MemoryDocumentState>>,
}

impl MemoryDocument {
    /// A browser-like document served from `hostname`.
    pub fn browser(hostname: impl Into<String>) -> Self {
        let document = Self::default();
        {
            let mut state = document.lock();
            state.browser = true;
            state.hostname = Some(hostname.into());
        }
        document
    }

    /// A document that behaves like a server-side render pass.
    pub fn server() -> Self {
        Self::default()
    }

    pub fn with_do_not_track(self, value: impl Into<String>) -> Self {
        self.lock().do_not_track = Some(value.into());
        self
    }

    pub fn set_hostname(&self, hostname: Option<String>) {
        self.lock().hostname = hostname;
    }

    pub fn set_do_not_track(&self, value: Option<String>) {
        self.lock().do_not_track = value;
    }

    /// Script tags currently in the head, in insertion order.
    pub fn scripts(&self) -> Vec<ScriptTag> {
        self.lock().head.values().cloned().collect()
    }

    /// Scripts whose `data-website-id` equals `site_id`.
    pub fn scripts_for_site(&self, site_id: &str) -> Vec<ScriptTag> {
        self.lock()
            .head
            .values()
            .filter(|tag| tag.data("websiteId") == Some(site_id))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScriptDocument for MemoryDocument {
    fn is_browser(&self) -> bool {
        self.lock().browser
    }

    fn do_not_track(&self) -> Option<String> {
        self.lock().do_not_track.clone()
    }

    fn hostname(&self) -> Option<String> {
        self.lock().hostname.clone()
    }

    fn append_script(&self, tag: &ScriptTag) -> UmamiResult<ScriptHandle> {
        let mut state = self.lock();
        if !state.browser {
            return Err(crate::umami::error::script_injection(
                "No document is available in this environment",
            ));
        }
        state.next_handle += 1;
        let handle = ScriptHandle::new(state.next_handle);
        state.head.insert(handle, tag.clone());
        Ok(handle)
    }

    fn remove_script(&self, handle: ScriptHandle) {
        self.lock().head.remove(&handle);
    }
}

/// Document used when none is supplied: the live DOM on `wasm-web` builds, otherwise a
/// [`DetachedDocument`].
pub fn default_document() -> Arc<dyn ScriptDocument> {
    #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
    {
        Arc::new(crate::umami::web::WebDocument::new())
    }

    #[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
    {
        Arc::new(DetachedDocument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(site: &str) -> ScriptTag {
        ScriptTag::new("https://a.example/script.js").with_data("websiteId", site)
    }

    #[test]
    fn memory_document_tracks_head_contents() {
        let document = MemoryDocument::browser("example.com");
        let first = document.append_script(&tag("one")).unwrap();
        let second = document.append_script(&tag("two")).unwrap();
        assert_ne!(first, second);
        assert_eq!(document.scripts().len(), 2);
        assert_eq!(document.scripts_for_site("two").len(), 1);

        document.remove_script(first);
        assert_eq!(document.scripts().len(), 1);
        document.remove_script(first);
        assert_eq!(document.scripts().len(), 1);
    }

    #[test]
    fn server_documents_reject_scripts() {
        let document = MemoryDocument::server();
        assert!(!document.is_browser());
        let err = document.append_script(&tag("one")).unwrap_err();
        assert_eq!(err.code_str(), "umami/script-injection");

        assert!(!DetachedDocument.is_browser());
        assert!(DetachedDocument.append_script(&tag("one")).is_err());
    }

    #[test]
    fn environment_signals_are_settable() {
        let document = MemoryDocument::browser("example.com").with_do_not_track("1");
        assert_eq!(document.do_not_track().as_deref(), Some("1"));
        assert_eq!(document.hostname().as_deref(), Some("example.com"));
        document.set_hostname(None);
        document.set_do_not_track(None);
        assert_eq!(document.hostname(), None);
        assert_eq!(document.do_not_track(), None);
    }
}
