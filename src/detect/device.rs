//! Browser identity, device identity and device anomaly heuristics.
//!
//! All three queries are synchronous and cannot fail; anything the parser
//! or the environment cannot answer becomes "Unknown" (or "desktop" for the
//! device type).

use super::user_agent::{UserAgentParser, WootheeUaParser};
use crate::environment::EnvironmentProbe;
use crate::snapshot::{DeviceInfo, OsInfo};

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_DEVICE_TYPE: &str = "desktop";

pub const ANOMALY_ASPECT_RATIO: &str = "Unusual screen aspect ratio";
pub const ANOMALY_SINGLE_CORE: &str = "Possible virtual environment";
pub const ANOMALY_MOBILE_MOUSE: &str = "Mobile device with mouse detection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserInfo {
    pub browser_type: String,
    pub version: String,
    pub is_suspicious: bool,
}

pub struct DeviceDetector {
    parser: Box<dyn UserAgentParser>,
}

impl Default for DeviceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDetector {
    pub fn new() -> Self {
        Self::with_parser(Box::new(WootheeUaParser::new()))
    }

    pub fn with_parser(parser: Box<dyn UserAgentParser>) -> Self {
        Self { parser }
    }

    pub fn detect_browser(&self, env: &dyn EnvironmentProbe) -> BrowserInfo {
        let ua = env.user_agent();
        let parsed = self.parser.parse(&ua);
        BrowserInfo {
            browser_type: parsed.browser.name.unwrap_or_else(unknown),
            version: parsed.browser.version.unwrap_or_else(unknown),
            is_suspicious: is_suspicious_browser(&ua, env.has_privacy_browser_marker()),
        }
    }

    pub fn detect_device(&self, env: &dyn EnvironmentProbe) -> DeviceInfo {
        let parsed = self.parser.parse(&env.user_agent());
        DeviceInfo {
            brand: parsed.device.vendor.unwrap_or_else(unknown),
            model: parsed.device.model.unwrap_or_else(unknown),
            device_type: parsed
                .device
                .device_type
                .unwrap_or_else(|| DEFAULT_DEVICE_TYPE.to_string()),
            os: OsInfo {
                name: parsed.os.name.unwrap_or_else(unknown),
                version: parsed.os.version.unwrap_or_else(unknown),
            },
        }
    }

    /// Every check runs; matches are reported in a fixed order.
    pub fn detect_device_anomalies(&self, env: &dyn EnvironmentProbe) -> Vec<String> {
        let mut anomalies = Vec::new();
        let screen = env.screen();
        let device = self.detect_device(env);

        if u64::from(screen.width) > u64::from(screen.height) * 3 {
            anomalies.push(ANOMALY_ASPECT_RATIO.to_string());
        }

        if env.hardware_concurrency() == Some(1) {
            anomalies.push(ANOMALY_SINGLE_CORE.to_string());
        }

        if device.device_type == "mobile" && env.has_hover_capability() {
            anomalies.push(ANOMALY_MOBILE_MOUSE.to_string());
        }

        if !anomalies.is_empty() {
            log::debug!("Device anomalies: {:?}", anomalies);
        }
        anomalies
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Crude: any "tor" substring in the UA, or a privacy-browser marker.
pub fn is_suspicious_browser(user_agent: &str, privacy_marker: bool) -> bool {
    user_agent.to_lowercase().contains("tor") || privacy_marker
}
