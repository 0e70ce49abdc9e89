//! In-memory environment with caller-chosen values.
//!
//! Used to replay a recorded environment and to drive detectors outside a
//! browser.

use std::cell::Cell;

use super::EnvironmentProbe;
use crate::snapshot::ScreenInfo;

pub const CHROME_WINDOWS_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FixedEnvironment {
    pub user_agent: String,
    pub language: String,
    pub plugins: Vec<String>,
    pub screen: ScreenInfo,
    pub hardware_concurrency: Option<u32>,
    pub device_memory: Option<f64>,
    pub privacy_browser_marker: bool,
    pub hover_capability: bool,
    pub page_path: String,
    pub timezone: String,
    pub connection_type: Option<String>,
    pub now_iso: String,
    /// Each `now_ms()` call advances the clock by this much
    pub clock_step_ms: f64,
    /// Current reading of the monotonic clock
    pub clock: Cell<f64>,
}

impl Default for FixedEnvironment {
    /// A desktop Chrome on Windows with a 1080p screen
    fn default() -> Self {
        Self {
            user_agent: CHROME_WINDOWS_UA.to_string(),
            language: "en-US".to_string(),
            plugins: vec!["PDF Viewer".to_string(), "Chrome PDF Viewer".to_string()],
            screen: ScreenInfo {
                width: 1920,
                height: 1080,
                color_depth: 24,
                orientation: "landscape-primary".to_string(),
                scaling: 1.0,
            },
            hardware_concurrency: Some(8),
            device_memory: Some(8.0),
            privacy_browser_marker: false,
            hover_capability: true,
            page_path: "/".to_string(),
            timezone: "UTC".to_string(),
            connection_type: Some("4g".to_string()),
            now_iso: "2024-01-01T00:00:00.000Z".to_string(),
            clock_step_ms: 0.0,
            clock: Cell::new(0.0),
        }
    }
}

impl FixedEnvironment {
    pub fn with_user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen.width = width;
        self.screen.height = height;
        self
    }
}

impl EnvironmentProbe for FixedEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn language(&self) -> String {
        self.language.clone()
    }

    fn plugins(&self) -> Vec<String> {
        self.plugins.clone()
    }

    fn screen(&self) -> ScreenInfo {
        self.screen.clone()
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        self.hardware_concurrency
    }

    fn device_memory(&self) -> Option<f64> {
        self.device_memory
    }

    fn has_privacy_browser_marker(&self) -> bool {
        self.privacy_browser_marker
    }

    fn has_hover_capability(&self) -> bool {
        self.hover_capability
    }

    fn page_path(&self) -> String {
        self.page_path.clone()
    }

    fn timezone(&self) -> String {
        self.timezone.clone()
    }

    fn connection_type(&self) -> Option<String> {
        self.connection_type.clone()
    }

    fn now_iso(&self) -> String {
        self.now_iso.clone()
    }

    fn now_ms(&self) -> f64 {
        let now = self.clock.get();
        self.clock.set(now + self.clock_step_ms);
        now
    }
}
