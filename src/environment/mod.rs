//! Read-only access to the browser surface being profiled.
//!
//! Detectors never touch `window`/`navigator` directly; they go through an
//! [`EnvironmentProbe`]. Every accessor is infallible: a value the runtime
//! cannot supply comes back as its documented default.

mod browser;
mod fixed;

pub use browser::BrowserEnvironment;
pub use fixed::FixedEnvironment;

use crate::snapshot::ScreenInfo;

pub trait EnvironmentProbe {
    fn user_agent(&self) -> String;

    /// Configured UI language, e.g. `en-US`
    fn language(&self) -> String;

    /// Installed plugin names in enumeration order
    fn plugins(&self) -> Vec<String>;

    fn screen(&self) -> ScreenInfo;

    /// Logical CPU count, when reported
    fn hardware_concurrency(&self) -> Option<u32>;

    /// Device memory hint in GiB, when reported
    fn device_memory(&self) -> Option<f64>;

    /// A brand-specific privacy browser marker is present on the navigator
    fn has_privacy_browser_marker(&self) -> bool;

    /// A mouse-hover handler slot exists on the global object
    fn has_hover_capability(&self) -> bool;

    /// Path of the current page
    fn page_path(&self) -> String;

    /// IANA timezone the browser resolves to; empty when unknown
    fn timezone(&self) -> String;

    /// `navigator.connection.effectiveType`, when exposed
    fn connection_type(&self) -> Option<String>;

    /// Current time as an ISO-8601 string
    fn now_iso(&self) -> String;

    /// Current time in milliseconds, used for latency measurement
    fn now_ms(&self) -> f64;
}
