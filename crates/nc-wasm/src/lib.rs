//! WebAssembly bindings for NoCookie
//!
//! The extension's JS shell owns the browser APIs (storage, tabs, timers);
//! these bindings give it the classifier and the in-page monitor state
//! machine.

use std::time::Duration;

use nc_core::config::DEFAULT_SETTLE_DELAY_MS;
use nc_core::monitor::{MonitorMachine, MonitorState};
use nc_core::url::{classify, is_monitored_host, is_video_url};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

// =============================================================================
// Classifier
// =============================================================================

#[wasm_bindgen]
pub fn classify_url(url: &str) -> JsValue {
    let result = classify(url);
    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"isVideo".into(), &JsValue::from(result.is_video));
    let rewritten = match result.rewritten {
        Some(url) => JsValue::from_str(&url),
        None => JsValue::NULL,
    };
    let _ = js_sys::Reflect::set(&js_result, &"rewritten".into(), &rewritten);
    js_result.into()
}

#[wasm_bindgen]
pub fn convert_to_no_cookie(url: &str) -> Option<String> {
    classify(url).rewritten
}

#[wasm_bindgen]
pub fn is_video_url_js(url: &str) -> bool {
    is_video_url(url)
}

#[wasm_bindgen]
pub fn is_monitored_host_js(url: &str) -> bool {
    is_monitored_host(url)
}

// =============================================================================
// Page Monitor
// =============================================================================

fn to_offset(now_ms: f64) -> Duration {
    if now_ms.is_finite() && now_ms > 0.0 {
        Duration::from_micros((now_ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

fn to_ms(offset: Duration) -> f64 {
    offset.as_micros() as f64 / 1000.0
}

/// In-page monitor driven by the content script.
///
/// Timestamps are `performance.now()` milliseconds. The script feeds every
/// location reading in, arms a timer for `nextCheckAt()`, reads the enabled
/// flag from storage when it fires, then calls `runCheck`.
#[wasm_bindgen]
pub struct PageMonitor {
    machine: MonitorMachine,
}

#[wasm_bindgen]
impl PageMonitor {
    #[wasm_bindgen(constructor)]
    pub fn new(settle_delay_ms: Option<u32>) -> PageMonitor {
        let settle = settle_delay_ms.map(u64::from).unwrap_or(DEFAULT_SETTLE_DELAY_MS);
        PageMonitor {
            machine: MonitorMachine::new(Duration::from_millis(settle)),
        }
    }

    #[wasm_bindgen(js_name = pageLoaded)]
    pub fn page_loaded(&mut self, url: &str, now_ms: f64) -> bool {
        self.machine.page_loaded(url, to_offset(now_ms))
    }

    #[wasm_bindgen(js_name = urlObserved)]
    pub fn url_observed(&mut self, url: &str, now_ms: f64) -> bool {
        self.machine.url_observed(url, to_offset(now_ms))
    }

    /// Read `window.location.href` and feed it in.
    #[wasm_bindgen(js_name = observeLocation)]
    pub fn observe_location(&mut self, now_ms: f64) -> Result<bool, JsValue> {
        let href = current_location()?.href()?;
        Ok(self.machine.url_observed(&href, to_offset(now_ms)))
    }

    #[wasm_bindgen(js_name = nextCheckAt)]
    pub fn next_check_at(&self) -> Option<f64> {
        self.machine.deadline().map(to_ms)
    }

    /// Run the due check. Returns the redirect target, if any.
    #[wasm_bindgen(js_name = runCheck)]
    pub fn run_check(&mut self, now_ms: f64, enabled: bool) -> Option<String> {
        let ticket = self.machine.begin_check(to_offset(now_ms))?;
        let rewrite = if enabled { classify(&ticket.url).rewritten } else { None };
        self.machine.finish_check(ticket, rewrite)
    }

    /// `location.replace(target)`, then leave the redirecting state.
    #[wasm_bindgen(js_name = redirectPage)]
    pub fn redirect_page(&mut self, target: &str) -> Result<(), JsValue> {
        let result = current_location().and_then(|location| location.replace(target));
        if let Err(e) = &result {
            log::warn!("location.replace failed: {:?}", e);
        }
        self.machine.redirect_finished();
        result
    }

    #[wasm_bindgen(js_name = redirectFinished)]
    pub fn redirect_finished(&mut self) {
        self.machine.redirect_finished();
    }

    pub fn state(&self) -> String {
        match self.machine.state() {
            MonitorState::Idle => "idle",
            MonitorState::CheckPending { .. } => "check-pending",
            MonitorState::Redirecting { .. } => "redirecting",
        }
        .to_string()
    }
}

fn current_location() -> Result<web_sys::Location, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    Ok(window.location())
}
