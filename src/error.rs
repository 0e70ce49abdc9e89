//! Error types for visitor signal collection
//!
//! Two classes of fault exist:
//! - soft faults, which have a documented default and never end a cycle
//! - hard faults, which end the collection cycle with no snapshot
//!
//! Every variant carries an error code and a user-facing message.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, VisitorError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Environment errors (1xx)
    EnvironmentUnavailable = 100,
    PropertyUnavailable = 101,

    // Network probe errors (2xx)
    ProbeFailed = 200,
    ProbeStatus = 201,
    ProbeTimeout = 202,

    // Parse errors (3xx)
    ResponseMalformed = 300,

    // Storage errors (4xx)
    StorageUnavailable = 400,
    StorageWriteFailed = 401,

    // Detector errors (5xx)
    DetectorFailed = 500,

    // Configuration errors (8xx)
    ConfigError = 800,

    // Internal errors (9xx)
    InternalError = 900,
}

/// Main error type for visitor collection
#[derive(Error, Debug, Clone)]
pub enum VisitorError {
    // ===== Environment Errors =====
    #[error("Browser environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Property unavailable: {0}")]
    PropertyUnavailable(String),

    // ===== Network Probe Errors =====
    #[error("Network probe failed: {0}")]
    Probe(String),

    #[error("Network probe returned HTTP {0}")]
    ProbeStatus(u16),

    #[error("Detector timed out after {0} ms")]
    Timeout(u32),

    // ===== Parse Errors =====
    #[error("Malformed response: {0}")]
    Malformed(String),

    // ===== Storage Errors =====
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage write failed for key {0}")]
    StorageWrite(String),

    // ===== Detector Errors =====
    #[error("Detector {detector} failed: {reason}")]
    Detector { detector: String, reason: String },

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisitorError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            VisitorError::EnvironmentUnavailable(_) => ErrorCode::EnvironmentUnavailable,
            VisitorError::PropertyUnavailable(_) => ErrorCode::PropertyUnavailable,

            VisitorError::Probe(_) => ErrorCode::ProbeFailed,
            VisitorError::ProbeStatus(_) => ErrorCode::ProbeStatus,
            VisitorError::Timeout(_) => ErrorCode::ProbeTimeout,

            VisitorError::Malformed(_) => ErrorCode::ResponseMalformed,

            VisitorError::Storage(_) => ErrorCode::StorageUnavailable,
            VisitorError::StorageWrite(_) => ErrorCode::StorageWriteFailed,

            VisitorError::Detector { .. } => ErrorCode::DetectorFailed,

            VisitorError::Config(_) => ErrorCode::ConfigError,

            VisitorError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the fault has a documented default value.
    ///
    /// Soft faults are absorbed by the detector that raised them. Anything
    /// else reaching the collector ends the cycle.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            VisitorError::PropertyUnavailable(_)
                | VisitorError::Probe(_)
                | VisitorError::ProbeStatus(_)
                | VisitorError::Timeout(_)
                | VisitorError::Malformed(_)
                | VisitorError::Detector { .. }
        )
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            VisitorError::EnvironmentUnavailable(_) => {
                "Visitor information can only be collected inside a browser window.".into()
            }
            VisitorError::PropertyUnavailable(_) => {
                "Some browser details could not be read.".into()
            }
            VisitorError::Probe(_) | VisitorError::ProbeStatus(_) => {
                "Network details could not be determined.".into()
            }
            VisitorError::Timeout(_) => "Network details took too long to load.".into(),
            VisitorError::Malformed(_) => "Network details were not understood.".into(),
            VisitorError::Storage(_) | VisitorError::StorageWrite(_) => {
                "Failed to save/load visit data. Please check browser storage permissions.".into()
            }
            VisitorError::Detector { .. } => "A detection step failed.".into(),
            VisitorError::Config(_) => {
                "Invalid collector configuration. Please check your settings.".into()
            }
            VisitorError::Internal(_) => {
                "An internal error occurred. Please report this bug.".into()
            }
        }
    }

    /// Wrap a detector failure with the detector's name
    pub fn detector(detector: &str, reason: impl Into<String>) -> Self {
        VisitorError::Detector {
            detector: detector.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<VisitorError> for JsValue {
    fn from(err: VisitorError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for VisitorError {
    fn from(err: serde_json::Error) -> Self {
        VisitorError::Malformed(err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub is_soft: bool,
}

impl From<&VisitorError> for ErrorInfo {
    fn from(err: &VisitorError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
            is_soft: err.is_soft(),
        }
    }
}
