//! Sends a page view for each completed navigation, including redirected ones.

use std::sync::Arc;

use umami_rs_sdk::umami::{
    provide_umami_with_factory, IdentifyCall, MemoryDocument, NavigationEnd, RouterEvent,
    RouterEventHub, SharedTrackerSlot, TrackCall, UmamiConfig, UmamiTracker,
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
    let router = RouterEventHub::new();
    let trackers = SharedTrackerSlot::new();
    trackers.install(Arc::new(PrintingTracker));

    // Reads UMAMI_CONFIG when set, e.g.
    // UMAMI_CONFIG="websiteId=abc,src=https://analytics.example.com/script.js,autoTrack=false"
    let app = provide_umami_with_factory(|| {
        UmamiConfig::from_env().or_else(|_| {
            Ok(UmamiConfig {
                auto_track: false,
                ..UmamiConfig::new("your-website-id", "https://analytics.example.com/script.js")
            })
        })
    })
    .with_document(Arc::new(MemoryDocument::browser("localhost")))
    .with_tracker_slot(Arc::new(trackers))
    .with_router_tracking(Arc::new(router.clone()))
    .bootstrap()?;

    router.navigate("/", "/");
    router.navigate("/old-about", "/about");
    router.emit(RouterEvent::NavigationCancel {
        id: 99,
        url: "/admin".into(),
        reason: "guard rejected".into(),
    });
    router.emit(RouterEvent::NavigationEnd(NavigationEnd {
        id: 100,
        url: "/search?q=rust".into(),
        url_after_redirects: "/search?q=rust".into(),
    }));

    app.shutdown();
    Ok(())
}
