//! Collector configuration.
//!
//! Deserialized from an optional JS object. Missing fields take their
//! defaults; an unreadable object falls back to the defaults wholesale.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{Result, VisitorError};

/// Storage key holding the visit counter
pub const DEFAULT_STORAGE_KEY: &str = "visitCount";

/// IP information endpoint queried by the network detector
pub const DEFAULT_IP_INFO_URL: &str = "https://ipapi.co/json/";

/// ISP reported when the probe does not name one
pub const DEFAULT_FALLBACK_ISP: &str = "Local ISP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorConfig {
    pub storage_key: String,
    pub ip_info_url: String,
    /// Upper bound for each concurrent detector. `None` waits forever.
    pub detector_timeout_ms: Option<u32>,
    pub fallback_isp: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            ip_info_url: DEFAULT_IP_INFO_URL.to_string(),
            detector_timeout_ms: None,
            fallback_isp: DEFAULT_FALLBACK_ISP.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Read a config from JS, accepting `undefined`/`null` as "all defaults".
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }
        match serde_wasm_bindgen::from_value::<CollectorConfig>(options) {
            Ok(config) => match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    log::warn!("Ignoring collector options: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Unreadable collector options, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.detector_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() {
            return Err(VisitorError::Config("storageKey must not be empty".into()));
        }
        if !(self.ip_info_url.starts_with("https://") || self.ip_info_url.starts_with("http://")) {
            return Err(VisitorError::Config(format!(
                "ipInfoUrl must be an http(s) URL: {}",
                self.ip_info_url
            )));
        }
        if self.detector_timeout_ms == Some(0) {
            return Err(VisitorError::Config("detectorTimeoutMs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_behavior() {
        let config = CollectorConfig::default();
        assert_eq!(config.storage_key, "visitCount");
        assert_eq!(config.detector_timeout_ms, None);
        assert_eq!(config.fallback_isp, "Local ISP");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: CollectorConfig =
            serde_json::from_str(r#"{"detectorTimeoutMs": 3000}"#).unwrap();
        assert_eq!(config.detector_timeout_ms, Some(3000));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.ip_info_url, DEFAULT_IP_INFO_URL);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = CollectorConfig::default();
        config.storage_key.clear();
        assert!(config.validate().is_err());

        let config = CollectorConfig {
            ip_info_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(CollectorConfig::default().with_timeout(0).validate().is_err());
    }
}
