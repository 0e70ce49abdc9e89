//! Network context: address, connection type, probe latency, coarse
//! geolocation and VPN/proxy hints.
//!
//! The VPN and proxy flags are heuristics, not detection. A VPN is assumed
//! when the probe's timezone disagrees with the browser's own.

use async_trait::async_trait;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::{detector_window, NetworkDetector};
use crate::environment::EnvironmentProbe;
use crate::error::{Result, VisitorError};
use crate::snapshot::Geolocation;

pub const UNKNOWN_CONNECTION: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInfo {
    pub source_ip: String,
    pub connection_type: String,
    /// Probe round trip in milliseconds
    pub latency: u32,
    pub geolocation: Geolocation,
    /// ISP named by the probe, if any
    pub isp: Option<String>,
    pub vpn_detected: bool,
    pub proxy_detected: bool,
}

impl NetworkInfo {
    /// What the detector reports when the probe cannot be reached
    pub fn unavailable() -> Self {
        Self {
            source_ip: String::new(),
            connection_type: UNKNOWN_CONNECTION.to_string(),
            latency: 0,
            geolocation: Geolocation::default(),
            isp: None,
            vpn_detected: false,
            proxy_detected: false,
        }
    }

    /// Build from an IP-info response body.
    ///
    /// Accepts both the ipapi.co and the ip-api.com field layouts.
    pub fn from_probe(body: &str, latency: u32, env: &dyn EnvironmentProbe) -> Result<Self> {
        let probe: IpInfoResponse = serde_json::from_str(body)?;
        if probe.error.unwrap_or(false) || probe.status.as_deref() == Some("fail") {
            let reason = probe
                .reason
                .or(probe.message)
                .unwrap_or_else(|| "unspecified".into());
            return Err(VisitorError::Probe(format!("endpoint refused: {}", reason)));
        }

        let geolocation = Geolocation {
            country: probe.country_name.or(probe.country).unwrap_or_default(),
            city: probe.city.unwrap_or_default(),
            timezone: probe.timezone.unwrap_or_default(),
            latitude: probe.latitude.or(probe.lat).unwrap_or(0.0),
            longitude: probe.longitude.or(probe.lon).unwrap_or(0.0),
        };
        let vpn_detected = timezone_mismatch(&geolocation.timezone, &env.timezone());

        Ok(Self {
            source_ip: probe.ip.or(probe.query).unwrap_or_default(),
            connection_type: connection_type(env),
            latency,
            geolocation,
            isp: probe.isp.or(probe.org).filter(|s| !s.is_empty()),
            vpn_detected,
            proxy_detected: probe.proxy.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpInfoResponse {
    ip: Option<String>,
    query: Option<String>,
    country_name: Option<String>,
    country: Option<String>,
    city: Option<String>,
    timezone: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
    org: Option<String>,
    isp: Option<String>,
    proxy: Option<bool>,
    // Failure shapes
    error: Option<bool>,
    reason: Option<String>,
    status: Option<String>,
    message: Option<String>,
}

fn connection_type(env: &dyn EnvironmentProbe) -> String {
    env.connection_type()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_CONNECTION.to_string())
}

fn timezone_mismatch(geolocated: &str, browser: &str) -> bool {
    !geolocated.is_empty() && !browser.is_empty() && geolocated != browser
}

/// Queries an IP information endpoint with `fetch`
pub struct FetchNetworkDetector {
    url: String,
}

impl FetchNetworkDetector {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    async fn fetch_body(&self) -> Result<String> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);

        let request = Request::new_with_str_and_init(&self.url, &opts)
            .map_err(|e| VisitorError::Probe(format!("Failed to create request: {:?}", e)))?;
        request
            .headers()
            .set("Accept", "application/json")
            .map_err(|e| VisitorError::Probe(format!("set header failed: {:?}", e)))?;

        let window = detector_window("network")?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| VisitorError::Probe(format!("Fetch failed: {:?}", e)))?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| VisitorError::Probe("Failed to cast to Response".into()))?;

        if !resp.ok() {
            return Err(VisitorError::ProbeStatus(resp.status()));
        }

        let text = JsFuture::from(
            resp.text()
                .map_err(|e| VisitorError::Probe(format!("Failed to get text: {:?}", e)))?,
        )
        .await
        .map_err(|e| VisitorError::Probe(format!("Failed to read text: {:?}", e)))?;

        text.as_string()
            .ok_or_else(|| VisitorError::Malformed("Response is not a string".into()))
    }
}

#[async_trait(?Send)]
impl NetworkDetector for FetchNetworkDetector {
    async fn detect(&self, env: &dyn EnvironmentProbe) -> Result<NetworkInfo> {
        let started = env.now_ms();
        let body = self.fetch_body().await?;
        let latency = (env.now_ms() - started).max(0.0).round() as u32;

        log::debug!("IP probe answered in {} ms ({} bytes)", latency, body.len());
        NetworkInfo::from_probe(&body, latency, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::FixedEnvironment;

    const IPAPI_CO: &str = r#"{
        "ip": "203.0.113.7", "city": "Lyon", "country": "FR",
        "country_name": "France", "timezone": "Europe/Paris",
        "latitude": 45.75, "longitude": 4.85, "org": "Example Telecom"
    }"#;

    const IP_API_COM: &str = r#"{
        "status": "success", "query": "198.51.100.2", "country": "Japan",
        "city": "Tokyo", "timezone": "Asia/Tokyo", "lat": 35.68, "lon": 139.69,
        "isp": "Example KK", "proxy": true
    }"#;

    #[test]
    fn parses_ipapi_co_layout() {
        let env = FixedEnvironment {
            timezone: "Europe/Paris".into(),
            ..Default::default()
        };
        let info = NetworkInfo::from_probe(IPAPI_CO, 42, &env).unwrap();
        assert_eq!(info.source_ip, "203.0.113.7");
        assert_eq!(info.geolocation.country, "France");
        assert_eq!(info.geolocation.latitude, 45.75);
        assert_eq!(info.isp.as_deref(), Some("Example Telecom"));
        assert_eq!(info.latency, 42);
        assert_eq!(info.connection_type, "4g");
        assert!(!info.vpn_detected);
        assert!(!info.proxy_detected);
    }

    #[test]
    fn parses_ip_api_com_layout() {
        let env = FixedEnvironment {
            connection_type: None,
            ..Default::default()
        };
        let info = NetworkInfo::from_probe(IP_API_COM, 10, &env).unwrap();
        assert_eq!(info.source_ip, "198.51.100.2");
        assert_eq!(info.geolocation.country, "Japan");
        assert_eq!(info.geolocation.longitude, 139.69);
        assert_eq!(info.isp.as_deref(), Some("Example KK"));
        assert_eq!(info.connection_type, UNKNOWN_CONNECTION);
        assert!(info.proxy_detected);
        // Browser says UTC, probe says Tokyo
        assert!(info.vpn_detected);
    }

    #[test]
    fn endpoint_errors_are_probe_failures() {
        let env = FixedEnvironment::default();
        let err = NetworkInfo::from_probe(r#"{"error": true, "reason": "RateLimited"}"#, 5, &env)
            .unwrap_err();
        assert!(matches!(err, VisitorError::Probe(ref m) if m.contains("RateLimited")));

        let refused = r#"{"status": "fail", "message": "private range"}"#;
        let err = NetworkInfo::from_probe(refused, 5, &env).unwrap_err();
        assert!(err.is_soft());

        assert!(matches!(
            NetworkInfo::from_probe("<html>", 5, &env),
            Err(VisitorError::Malformed(_))
        ));
    }

    #[test]
    fn unavailable_is_empty() {
        let info = NetworkInfo::unavailable();
        assert!(info.source_ip.is_empty());
        assert_eq!(info.connection_type, UNKNOWN_CONNECTION);
        assert!(info.geolocation.is_empty());
        assert_eq!(info.latency, 0);
        assert!(!info.vpn_detected && !info.proxy_detected);
    }

    #[test]
    fn unknown_timezones_never_flag_vpn() {
        assert!(!timezone_mismatch("", "UTC"));
        assert!(!timezone_mismatch("Asia/Tokyo", ""));
        assert!(timezone_mismatch("Asia/Tokyo", "UTC"));
    }
}
