//! Private-browsing inference from the storage quota.
//!
//! Chromium and Firefox cap the quota of private sessions far below what a
//! normal profile gets. A small quota is read as "private"; every failure
//! along the way is reported as an error and the collector substitutes
//! `false`.

use async_trait::async_trait;
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::{detector_window, PrivacyDetector};
use crate::environment::EnvironmentProbe;
use crate::error::{Result, VisitorError};

/// Quotas under this many bytes are treated as a private session
pub const PRIVATE_QUOTA_LIMIT: f64 = 120.0 * 1024.0 * 1024.0;

#[derive(Debug, Default)]
pub struct StorageQuotaPrivacyDetector;

impl StorageQuotaPrivacyDetector {
    pub fn new() -> Self {
        Self
    }

    async fn estimate_quota(&self) -> Result<f64> {
        let window = detector_window("privacy")?;
        let storage = Reflect::get(&window.navigator(), &JsValue::from_str("storage"))
            .map_err(|e| VisitorError::detector("privacy", format!("{:?}", e)))?;
        if storage.is_undefined() || storage.is_null() {
            return Err(VisitorError::PropertyUnavailable("navigator.storage".into()));
        }

        let estimate: Function = Reflect::get(&storage, &JsValue::from_str("estimate"))
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| VisitorError::PropertyUnavailable("storage.estimate".into()))?;
        let promise: js_sys::Promise = estimate
            .call0(&storage)
            .map_err(|e| VisitorError::detector("privacy", format!("estimate threw: {:?}", e)))?
            .dyn_into()
            .map_err(|_| VisitorError::detector("privacy", "estimate did not return a promise"))?;

        let result = JsFuture::from(promise)
            .await
            .map_err(|e| VisitorError::detector("privacy", format!("estimate rejected: {:?}", e)))?;

        Reflect::get(&result, &JsValue::from_str("quota"))
            .ok()
            .and_then(|q| q.as_f64())
            .ok_or_else(|| VisitorError::PropertyUnavailable("estimate.quota".into()))
    }
}

pub fn quota_indicates_private(quota: f64) -> bool {
    quota.is_finite() && quota > 0.0 && quota < PRIVATE_QUOTA_LIMIT
}

#[async_trait(?Send)]
impl PrivacyDetector for StorageQuotaPrivacyDetector {
    async fn detect(&self, _env: &dyn EnvironmentProbe) -> Result<bool> {
        let quota = self.estimate_quota().await?;
        let private = quota_indicates_private(quota);
        log::debug!("Storage quota {:.0} bytes, private={}", quota, private);
        Ok(private)
    }
}
