//! Event-name mapping for the event bridge.
//!
//! Native event names are lowercase (`mouseenter`, `keydown`); handler props
//! follow the camelCase `on*` convention (`onMouseEnter`, `onKeyDown`). The
//! bridge maps between the two here.

/// Compound native event names and their camelCase spellings. Single-word
/// events (`click`, `change`, ...) pass through unchanged.
const EVENT_NAME_MAP: &[(&str, &str)] = &[
    ("animationend", "animationEnd"),
    ("animationiteration", "animationIteration"),
    ("animationstart", "animationStart"),
    ("beforeinput", "beforeInput"),
    ("canplay", "canPlay"),
    ("canplaythrough", "canPlayThrough"),
    ("compositionend", "compositionEnd"),
    ("compositionstart", "compositionStart"),
    ("compositionupdate", "compositionUpdate"),
    ("contextmenu", "contextMenu"),
    ("doubleclick", "doubleClick"),
    ("dragend", "dragEnd"),
    ("dragenter", "dragEnter"),
    ("dragexit", "dragExit"),
    ("dragleave", "dragLeave"),
    ("dragover", "dragOver"),
    ("dragstart", "dragStart"),
    ("durationchange", "durationChange"),
    ("gotpointercapture", "gotPointerCapture"),
    ("keydown", "keyDown"),
    ("keypress", "keyPress"),
    ("keyup", "keyUp"),
    ("loadeddata", "loadedData"),
    ("loadedmetadata", "loadedMetadata"),
    ("loadstart", "loadStart"),
    ("lostpointercapture", "lostPointerCapture"),
    ("mousedown", "mouseDown"),
    ("mouseenter", "mouseEnter"),
    ("mouseleave", "mouseLeave"),
    ("mousemove", "mouseMove"),
    ("mouseout", "mouseOut"),
    ("mouseover", "mouseOver"),
    ("mouseup", "mouseUp"),
    ("pointercancel", "pointerCancel"),
    ("pointerdown", "pointerDown"),
    ("pointerenter", "pointerEnter"),
    ("pointerleave", "pointerLeave"),
    ("pointermove", "pointerMove"),
    ("pointerout", "pointerOut"),
    ("pointerover", "pointerOver"),
    ("pointerup", "pointerUp"),
    ("ratechange", "rateChange"),
    ("timeupdate", "timeUpdate"),
    ("touchcancel", "touchCancel"),
    ("touchend", "touchEnd"),
    ("touchmove", "touchMove"),
    ("touchstart", "touchStart"),
    ("transitionend", "transitionEnd"),
    ("volumechange", "volumeChange"),
];

/// Single-word events the native dispatcher simulates, in addition to every
/// entry of [`EVENT_NAME_MAP`].
const SIMPLE_EVENTS: &[&str] = &[
    "abort", "blur", "change", "click", "copy", "cut", "drag", "drop", "emptied", "ended",
    "error", "focus", "input", "invalid", "load", "paste", "pause", "play", "playing",
    "progress", "reset", "scroll", "seeked", "seeking", "select", "stalled", "submit",
    "suspend", "waiting", "wheel",
];

/// Map a native event name to its camelCase spelling. Names with no
/// compound-word entry pass through unchanged.
#[must_use]
pub fn map_native_event_name(event: &str) -> &str {
    EVENT_NAME_MAP
        .iter()
        .find(|(native, _)| *native == event)
        .map_or(event, |(_, mapped)| mapped)
}

/// Handler prop name for an event, per the `on*` convention:
/// `click` becomes `onClick`, `mouseenter` becomes `onMouseEnter`.
#[must_use]
pub fn prop_from_event(event: &str) -> String {
    let mapped = map_native_event_name(event);
    let mut prop = String::with_capacity(mapped.len() + 2);
    prop.push_str("on");
    let mut chars = mapped.chars();
    if let Some(first) = chars.next() {
        prop.extend(first.to_uppercase());
        prop.push_str(chars.as_str());
    }
    prop
}

/// Handler prop name for an event the native dispatcher knows how to
/// simulate; `None` for unrecognized event names.
#[must_use]
pub fn simulate_prop(event: &str) -> Option<String> {
    let known = SIMPLE_EVENTS.contains(&event)
        || EVENT_NAME_MAP.iter().any(|(native, _)| *native == event);
    known.then(|| prop_from_event(event))
}
