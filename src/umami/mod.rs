//! # Umami tracker integration
//!
//! Loads the Umami Analytics tracker script and forwards tracking calls to the `umami` object
//! it registers.
//!
//! ## Features
//!
//! - Script injection gated on environment, opt-out flags, allowed domains and URL safety
//! - Page view, custom event and session identification forwarding
//! - Declarative event tracking through `data-umami-track` attributes
//! - Automatic page views on completed router navigations
//! - Configuration from code, JSON or the environment
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use umami_rs_sdk::umami::{
//!     event_data, provide_umami, MemoryDocument, RouterEventHub, UmamiConfig,
//! };
//!
//! let router = RouterEventHub::new();
//! let app = provide_umami(UmamiConfig {
//!     allowed_hosts: vec!["example.com".into()],
//!     ..UmamiConfig::new("your-website-id", "https://analytics.example.com/script.js")
//! })
//! .with_document(Arc::new(MemoryDocument::browser("example.com")))
//! .with_router_tracking(Arc::new(router.clone()))
//! .bootstrap()
//! .unwrap();
//!
//! let umami = app.service();
//! assert!(umami.is_initialized());
//! umami.track_event("purchase", Some(event_data([("amount", 99.99)])));
//! router.navigate("/old-about", "/about");
//!
//! app.shutdown();
//! ```

mod config;
mod constants;
pub mod document;
pub mod error;
mod provide;
pub mod router;
pub mod script;
pub mod script_url;
mod service;
pub mod tracker;
pub mod trigger;
mod types;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub mod web;

pub use config::UmamiConfig;
pub use constants::{TRACK_ATTRIBUTE, TRACK_DATA_ATTRIBUTE, TRACK_ON_ATTRIBUTE};
pub use document::{DetachedDocument, MemoryDocument, ScriptDocument, ScriptHandle};
pub use error::{UmamiError, UmamiErrorCode, UmamiResult};
pub use provide::{
    inject_umami, provide_umami, provide_umami_with_factory, UmamiApp, UmamiProviders,
};
pub use router::{NavigationEnd, RouterEvent, RouterEventHub, RouterEvents, RouterTracker};
pub use script::{build_script_tag, LoadOutcome, ScriptLoader, ScriptTag, SkipReason};
pub use script_url::{validate_script_url, InvalidScriptUrl, ScriptUrl};
pub use service::UmamiService;
pub use tracker::{
    EmptyTrackerSlot, IdentifyCall, PageViewProps, PageViewTransform, SharedTrackerSlot,
    TrackCall, TrackerSlot, UmamiTracker,
};
pub use trigger::{TrackTrigger, TriggerEvent};
pub use types::{event_data, EventData, EventValue, IdentifyData, PageViewPayload, SessionIdentity};
