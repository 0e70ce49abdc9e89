//! The visitor snapshot record and its sub-records.
//!
//! One snapshot is produced per collection cycle and is shared read-only
//! afterwards. Field names serialize in camelCase so the JS side sees the
//! same shape the dashboard renders.

use serde::{Deserialize, Serialize};

/// Coarse geolocation reported by the network probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub country: String,
    pub city: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Geolocation {
    /// True when the probe produced nothing usable
    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.city.is_empty() && self.timezone.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub brand: String,
    pub model: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub os: OsInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub orientation: String,
    /// Device pixel ratio
    pub scaling: f64,
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            color_depth: 0,
            orientation: "unknown".to_string(),
            scaling: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Everything collected about the visitor in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSnapshot {
    // Identity
    pub id: String,

    // Network
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    #[serde(rename = "requestIP")]
    pub request_ip: String,
    pub connection_type: String,
    /// Round trip of the network probe in milliseconds
    pub latency: u32,
    pub geolocation: Geolocation,
    pub isp: String,
    pub vpn_detected: bool,
    pub proxy_detected: bool,

    // Browser
    pub user_agent: String,
    pub browser_type: String,
    pub browser_version: String,
    pub language: String,
    pub plugins: Vec<String>,
    pub is_private_mode: bool,
    pub is_suspicious_browser: bool,

    // Device
    pub device: DeviceInfo,
    pub screen: ScreenInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_concurrency: Option<u32>,

    // Session
    pub visit_count: u64,
    /// ISO-8601 timestamp of this cycle
    pub last_visit: String,
    /// Seconds; always 0 when the snapshot is built
    pub time_on_site: u64,
    pub pages_viewed: Vec<String>,

    // Risk
    pub risk_level: RiskLevel,
    pub anomalies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"low\"");
        assert_eq!(RiskLevel::default(), RiskLevel::Low);
        assert_eq!(RiskLevel::High.as_str(), "high");
    }

    #[test]
    fn device_type_uses_js_field_name() {
        let device = DeviceInfo {
            brand: "Apple".into(),
            model: "iPhone".into(),
            device_type: "mobile".into(),
            os: OsInfo {
                name: "iOS".into(),
                version: "17.1".into(),
            },
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["type"], "mobile");
        assert_eq!(json["os"]["name"], "iOS");
    }

    #[test]
    fn empty_geolocation() {
        assert!(Geolocation::default().is_empty());
        let geo = Geolocation {
            country: "France".into(),
            ..Default::default()
        };
        assert!(!geo.is_empty());
    }
}
