//! # Visitor WASM
//!
//! Collects client-side signals about the current visitor and publishes
//! them as one immutable snapshot per page load.
//!
//! ## Architecture
//!
//! ```text
//! VisitorInfo (JS facade)
//!   ↓
//! VisitorCollector ── join ──> network / privacy / identifier detectors
//!   ↓                    └───> device & browser detector (sync)
//! VisitCounter (localStorage)
//! ```
//!
//! All browser access goes through [`EnvironmentProbe`] and all persistence
//! through [`KeyValueStore`], so the cycle runs the same against the live
//! window or an in-memory fixture.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { VisitorInfo } from './pkg/visitor_wasm.js';
//! await init();
//! const info = new VisitorInfo({ detectorTimeoutMs: 5000 });
//! info.onSettled(status => render(info.snapshot, info.loading, status));
//! ```

use wasm_bindgen::prelude::*;

pub mod collector;
pub mod config;
pub mod detect;
pub mod environment;
mod error;
pub mod snapshot;
pub mod storage;
pub mod timing;

pub use collector::{CollectionHandle, CollectionStatus, VisitorCollector};
pub use config::CollectorConfig;
pub use detect::{
    BrowserInfo, DeviceDetector, IdentifierGenerator, NetworkDetector, NetworkInfo,
    PrivacyDetector, UserAgentParser,
};
pub use environment::{BrowserEnvironment, EnvironmentProbe, FixedEnvironment};
pub use error::{ErrorCode, ErrorInfo, Result, VisitorError};
pub use snapshot::{DeviceInfo, Geolocation, OsInfo, RiskLevel, ScreenInfo, VisitorSnapshot};
pub use storage::{KeyValueStore, LocalStorageStore, MemoryStore, VisitCounter};

/// Initialize logging
#[wasm_bindgen(start)]
pub fn init() {
    // A host page may already have installed a logger
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Visitor WASM initialized");
    }
}

fn error_to_js(err: &VisitorError) -> JsValue {
    serde_wasm_bindgen::to_value(&ErrorInfo::from(err))
        .unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
}

fn snapshot_to_js(handle: &CollectionHandle) -> JsValue {
    match handle.snapshot() {
        Some(snapshot) => serde_wasm_bindgen::to_value(snapshot.as_ref()).unwrap_or_else(|e| {
            log::error!("Failed to convert snapshot: {}", e);
            JsValue::NULL
        }),
        None => JsValue::NULL,
    }
}

/// `{snapshot, loading}` for one mount of the dashboard.
///
/// Construction starts the collection cycle. `snapshot` stays `null` until
/// the cycle finishes; `loading === false && snapshot === null` means the
/// cycle failed.
#[wasm_bindgen]
pub struct VisitorInfo {
    handle: CollectionHandle,
}

#[wasm_bindgen]
impl VisitorInfo {
    /// Start collecting. `options` is an optional config object, e.g.
    /// `{ storageKey: "visitCount", detectorTimeoutMs: 5000 }`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> std::result::Result<VisitorInfo, JsValue> {
        let config = CollectorConfig::from_js(options);
        let collector = VisitorCollector::browser(config).map_err(|e| error_to_js(&e))?;
        Ok(Self {
            handle: collector.start(),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn loading(&self) -> bool {
        self.handle.is_loading()
    }

    #[wasm_bindgen(getter)]
    pub fn snapshot(&self) -> JsValue {
        snapshot_to_js(&self.handle)
    }

    /// `"loading"`, `"ready"` or `"failed"`
    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        match self.handle.status() {
            CollectionStatus::Loading => "loading",
            CollectionStatus::Ready => "ready",
            CollectionStatus::Failed => "failed",
        }
        .to_string()
    }

    /// Call `callback(status)` once the cycle settles.
    #[wasm_bindgen(js_name = onSettled)]
    pub fn on_settled(&self, callback: js_sys::Function) {
        self.handle.on_settled(move |status| {
            let status = serde_wasm_bindgen::to_value(&status).unwrap_or(JsValue::UNDEFINED);
            if let Err(e) = callback.call1(&JsValue::NULL, &status) {
                log::warn!("onSettled callback threw: {:?}", e);
            }
        });
    }

    /// Drop the result of a cycle still in flight.
    pub fn teardown(&self) {
        self.handle.teardown();
    }
}

/// Run one cycle and resolve with the snapshot, or `null` if it failed.
#[wasm_bindgen(js_name = collectVisitorInfo)]
pub async fn collect_visitor_info(options: JsValue) -> std::result::Result<JsValue, JsValue> {
    let config = CollectorConfig::from_js(options);
    let collector = VisitorCollector::browser(config).map_err(|e| error_to_js(&e))?;
    let handle = CollectionHandle::new();
    collector.run(&handle).await;
    Ok(snapshot_to_js(&handle))
}
