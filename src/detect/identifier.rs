//! Pseudo-stable visitor identifier.
//!
//! A SHA-256 over the environment signals least likely to change between
//! page loads. Two browsers with identical signals share an identifier;
//! this is a label, not a secret.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::IdentifierGenerator;
use crate::environment::EnvironmentProbe;
use crate::error::Result;

/// Hex characters kept from the digest
pub const ID_LENGTH: usize = 20;

#[derive(Debug, Default)]
pub struct FingerprintIdGenerator;

impl FingerprintIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

pub fn fingerprint_id(env: &dyn EnvironmentProbe) -> String {
    let screen = env.screen();
    let mut hasher = Sha256::new();

    let mut feed = |part: &str| {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    };
    feed(&env.user_agent());
    feed(&env.language());
    feed(&format!("{}x{}x{}", screen.width, screen.height, screen.color_depth));
    feed(&screen.scaling.to_string());
    feed(&env.hardware_concurrency().map(|c| c.to_string()).unwrap_or_default());
    feed(&env.device_memory().map(|m| m.to_string()).unwrap_or_default());
    feed(&env.timezone());
    for plugin in env.plugins() {
        feed(&plugin);
    }

    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LENGTH);
    id
}

#[async_trait(?Send)]
impl IdentifierGenerator for FingerprintIdGenerator {
    async fn generate(&self, env: &dyn EnvironmentProbe) -> Result<String> {
        Ok(fingerprint_id(env))
    }
}
