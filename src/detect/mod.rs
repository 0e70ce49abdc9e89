//! Signal detectors.
//!
//! The device detector is synchronous. The network, privacy and identifier
//! detectors are asynchronous and run concurrently inside a collection
//! cycle; each of them is allowed to fail, and the collector substitutes
//! its documented default when it does.

pub mod device;
pub mod identifier;
pub mod network;
pub mod privacy;
pub mod user_agent;

use async_trait::async_trait;

use crate::environment::EnvironmentProbe;
use crate::error::{Result, VisitorError};

pub use device::{BrowserInfo, DeviceDetector};
pub use identifier::FingerprintIdGenerator;
pub use network::{FetchNetworkDetector, NetworkInfo};
pub use privacy::StorageQuotaPrivacyDetector;
pub use user_agent::{ParsedUserAgent, UserAgentParser, WootheeUaParser};

#[async_trait(?Send)]
pub trait NetworkDetector {
    async fn detect(&self, env: &dyn EnvironmentProbe) -> Result<NetworkInfo>;
}

#[async_trait(?Send)]
pub trait PrivacyDetector {
    /// `true` when the session looks private/incognito
    async fn detect(&self, env: &dyn EnvironmentProbe) -> Result<bool>;
}

#[async_trait(?Send)]
pub trait IdentifierGenerator {
    /// Non-empty opaque visitor identifier
    async fn generate(&self, env: &dyn EnvironmentProbe) -> Result<String>;
}

/// The page window, for detectors that call browser APIs directly.
///
/// Workers and non-browser hosts have none; that is a detector failure the
/// collector falls back from, not a reason to abort the cycle.
pub(crate) fn detector_window(detector: &str) -> Result<web_sys::Window> {
    web_sys::window().ok_or_else(|| no_window(detector))
}

fn no_window(detector: &str) -> VisitorError {
    VisitorError::detector(detector, "no window object")
}
