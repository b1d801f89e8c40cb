//! Tracks page views, events and a session identity against an in-memory document.
//! Swap `MemoryDocument` and the printing tracker for the defaults when building with the
//! `wasm-web` feature to talk to the real `window.umami`.

use std::sync::Arc;

use umami_rs_sdk::logger::{set_log_level, LogLevel};
use umami_rs_sdk::umami::{
    event_data, provide_umami, EventValue, IdentifyCall, MemoryDocument, PageViewPayload, SharedTrackerSlot,
    TrackCall, UmamiConfig, UmamiTracker,
};

struct PrintingTracker;

impl UmamiTracker for PrintingTracker {
    fn track(&self, call: TrackCall) {
        println!("umami.track {call:?}");
    }

    fn identify(&self, call: IdentifyCall) {
        println!("umami.identify {call:?}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    set_log_level(LogLevel::Debug)?;

    let document = MemoryDocument::browser("example.com");
    let trackers = SharedTrackerSlot::new();
    trackers.install(Arc::new(PrintingTracker));

    let app = provide_umami(UmamiConfig {
        auto_track: false,
        allowed_hosts: vec!["example.com".into()],
        tag: Some("demo".into()),
        ..UmamiConfig::new("your-website-id", "https://analytics.example.com/script.js")
    })
    .with_document(Arc::new(document.clone()))
    .with_tracker_slot(Arc::new(trackers))
    .bootstrap()?;

    for script in document.scripts() {
        println!("Injected <script src=\"{}\">", script.src);
        for (name, value) in script.attributes() {
            println!("  {name}=\"{value}\"");
        }
    }

    let umami = app.service();
    umami.track_page_view(None);
    umami.track_page_view(Some(
        PageViewPayload::with_url("/custom-page").title("Custom Page"),
    ));
    umami.track_page_view_with(|mut props| {
        props.remove("referrer");
        props
    });
    umami.track_event("signup_click", None);
    umami.track_event(
        "purchase",
        Some(event_data([("product", EventValue::from("Premium")), ("price", 99.into())])),
    );
    umami.identify("user-123", Some(event_data([("plan", "premium")])));

    // Opt-out: removes the script, later calls become no-ops.
    umami.disable();
    println!("Available after opt-out: {}", umami.is_available());

    app.shutdown();
    Ok(())
}
