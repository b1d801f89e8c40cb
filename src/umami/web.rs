//! Browser bindings for the document, the `window.umami` tracker and DOM triggers.
//!
//! JS objects are not `Send`, so appended script elements stay in a thread-local registry and
//! the capability types themselves are plain markers.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, EventTarget, HtmlScriptElement};

use crate::platform::environment;
use crate::umami::constants::TRACKER_GLOBAL;
use crate::umami::document::{ScriptDocument, ScriptHandle};
use crate::umami::error::{internal_error, script_injection, UmamiError, UmamiResult};
use crate::umami::script::ScriptTag;
use crate::umami::service::UmamiService;
use crate::umami::tracker::{
    IdentifyCall, PageViewProps, PageViewTransform, TrackCall, TrackerSlot, UmamiTracker,
};
use crate::umami::trigger::TrackTrigger;

/// Environment detection reads variables and the defaults file, so it runs once per process.
static IS_BROWSER: LazyLock<bool> = LazyLock::new(environment::is_browser);

thread_local! {
    static SCRIPTS: RefCell<HashMap<u64, HtmlScriptElement>> = RefCell::new(HashMap::new());
    static NEXT_HANDLE: Cell<u64> = const { Cell::new(0) };
}

fn js_error(context: &str, err: JsValue) -> UmamiError {
    script_injection(format!("{context}: {err:?}"))
}

/// The live DOM of the current window.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebDocument;

impl WebDocument {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptDocument for WebDocument {
    fn is_browser(&self) -> bool {
        *IS_BROWSER
    }

    fn do_not_track(&self) -> Option<String> {
        let navigator = web_sys::window()?.navigator();
        Reflect::get(&navigator, &JsValue::from_str("doNotTrack"))
            .ok()
            .and_then(|value| value.as_string())
    }

    fn hostname(&self) -> Option<String> {
        web_sys::window()?.location().hostname().ok()
    }

    fn append_script(&self, tag: &ScriptTag) -> UmamiResult<ScriptHandle> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| script_injection("Document not available"))?;

        let script = document
            .create_element("script")
            .map_err(|err| js_error("Failed to create script element", err))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| script_injection("Created element is not a script"))?;
        script.set_src(&tag.src);
        script.set_async(tag.is_async);
        script.set_defer(tag.defer);
        for (name, value) in tag.attributes() {
            script
                .set_attribute(&name, value)
                .map_err(|err| js_error("Failed to set script attribute", err))?;
        }

        document
            .head()
            .ok_or_else(|| script_injection("Document head not available"))?
            .append_child(&script)
            .map_err(|err| js_error("Failed to append script", err))?;

        let id = NEXT_HANDLE.with(|next| {
            let id = next.get() + 1;
            next.set(id);
            id
        });
        SCRIPTS.with(|scripts| scripts.borrow_mut().insert(id, script));
        Ok(ScriptHandle::new(id))
    }

    fn remove_script(&self, handle: ScriptHandle) {
        if let Some(script) = SCRIPTS.with(|scripts| scripts.borrow_mut().remove(&handle.id())) {
            script.remove();
        }
    }
}

/// Yields a tracker while `window.umami` is defined.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowTrackerSlot;

impl TrackerSlot for WindowTrackerSlot {
    fn tracker(&self) -> Option<Arc<dyn UmamiTracker>> {
        global_tracker().map(|_| Arc::new(WindowTracker) as Arc<dyn UmamiTracker>)
    }
}

/// Forwards calls to `window.umami`, looked up again on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowTracker;

impl UmamiTracker for WindowTracker {
    fn track(&self, call: TrackCall) {
        let args = match call {
            TrackCall::PageView => Some(Vec::new()),
            TrackCall::PageViewWith(payload) => to_js(&payload).map(|payload| vec![payload]),
            TrackCall::Transformed(transform) => {
                let callback = Closure::wrap(Box::new(move |props: JsValue| {
                    rewrite_props(&transform, props)
                }) as Box<dyn FnMut(JsValue) -> JsValue>);
                // umami.track calls the function synchronously, before the closure is dropped.
                invoke("track", &[callback.as_ref().clone()]);
                None
            }
            TrackCall::Event(name) => Some(vec![JsValue::from_str(&name)]),
            TrackCall::EventWithData(name, data) => {
                to_js(&data).map(|data| vec![JsValue::from_str(&name), data])
            }
        };
        if let Some(args) = args {
            invoke("track", &args);
        }
    }

    fn identify(&self, call: IdentifyCall) {
        let args = match call {
            IdentifyCall::Id(id) => Some(vec![JsValue::from_str(&id)]),
            IdentifyCall::IdWithData(id, data) => {
                to_js(&data).map(|data| vec![JsValue::from_str(&id), data])
            }
            IdentifyCall::Data(data) => to_js(&data).map(|data| vec![data]),
        };
        if let Some(args) = args {
            invoke("identify", &args);
        }
    }
}

fn global_tracker() -> Option<JsValue> {
    let window = web_sys::window()?;
    let tracker = Reflect::get(&window, &JsValue::from_str(TRACKER_GLOBAL)).ok()?;
    (tracker.is_object()).then_some(tracker)
}

fn invoke(method: &str, args: &[JsValue]) {
    let Some(tracker) = global_tracker() else {
        return;
    };
    let Some(function) = Reflect::get(&tracker, &JsValue::from_str(method))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
    else {
        log::debug!("umami.{method} is not a function");
        return;
    };

    let result = match args {
        [] => function.call0(&tracker),
        [first] => function.call1(&tracker, first),
        [first, second] => function.call2(&tracker, first, second),
        _ => return,
    };
    if let Err(err) = result {
        log::debug!("umami.{method} threw: {err:?}");
    }
}

/// Runs `transform` over the tracker's props. Props that do not round-trip through JSON are
/// returned unchanged.
fn rewrite_props(transform: &PageViewTransform, props: JsValue) -> JsValue {
    let parsed = js_sys::JSON::stringify(&props)
        .ok()
        .and_then(|json| json.as_string())
        .and_then(|json| serde_json::from_str::<PageViewProps>(&json).ok());
    match parsed {
        Some(parsed) => to_js(&transform.apply(parsed)).unwrap_or(props),
        None => {
            log::debug!("page view props are not a JSON object");
            props
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Option<JsValue> {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            log::debug!("failed to serialize tracker payload: {err}");
            return None;
        }
    };
    js_sys::JSON::parse(&json)
        .map_err(|err| log::debug!("failed to convert tracker payload: {err:?}"))
        .ok()
}

/// Keeps a DOM listener registered; dropping it removes the listener.
pub struct TriggerBinding {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl TriggerBinding {
    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl Drop for TriggerBinding {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            log::debug!("removeEventListener failed: {err:?}");
        }
    }
}

/// Listens on `target` for the trigger's configured event type.
pub fn bind_trigger(trigger: TrackTrigger, target: &EventTarget) -> UmamiResult<TriggerBinding> {
    let event = trigger.trigger_event().as_str();
    let callback = Closure::wrap(Box::new(move |dom_event: web_sys::Event| {
        trigger.handle(&dom_event.type_());
    }) as Box<dyn FnMut(web_sys::Event)>);

    target
        .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        .map_err(|err| internal_error(format!("Failed to add event listener: {err:?}")))?;

    Ok(TriggerBinding {
        target: target.clone(),
        event,
        callback,
    })
}

/// Builds a trigger from the `data-umami-track*` attributes of `element` and binds it.
pub fn bind_element(service: UmamiService, element: &Element) -> UmamiResult<TriggerBinding> {
    let trigger = TrackTrigger::from_attributes(service, |name| element.get_attribute(name))?;
    bind_trigger(trigger, element.as_ref())
}
