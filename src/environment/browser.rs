//! Environment probe backed by the live browser globals.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsValue;
use web_sys::{Navigator, Window};

use super::EnvironmentProbe;
use crate::error::{Result, VisitorError};
use crate::snapshot::ScreenInfo;

/// Reads `navigator`, `screen`, `location` and friends from the current window.
#[derive(Debug, Clone)]
pub struct BrowserEnvironment {
    window: Window,
    navigator: Navigator,
}

impl BrowserEnvironment {
    pub fn new() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| VisitorError::EnvironmentUnavailable("no window object".into()))?;
        let navigator = window.navigator();
        Ok(Self { window, navigator })
    }

    fn navigator_prop(&self, prop: &str) -> JsValue {
        Reflect::get(&self.navigator, &JsValue::from_str(prop)).unwrap_or(JsValue::UNDEFINED)
    }

    fn orientation(&self, screen: &web_sys::Screen, width: u32, height: u32) -> String {
        let reported = Reflect::get(screen, &JsValue::from_str("orientation"))
            .ok()
            .filter(|o| !o.is_undefined() && !o.is_null())
            .and_then(|o| Reflect::get(&o, &JsValue::from_str("type")).ok())
            .and_then(|t| t.as_string());

        // Safari before 16.4 has no ScreenOrientation
        reported.unwrap_or_else(|| {
            if width >= height {
                "landscape-primary".to_string()
            } else {
                "portrait-primary".to_string()
            }
        })
    }
}

fn dimension(value: std::result::Result<i32, JsValue>) -> u32 {
    value.ok().and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

impl EnvironmentProbe for BrowserEnvironment {
    fn user_agent(&self) -> String {
        self.navigator.user_agent().unwrap_or_default()
    }

    fn language(&self) -> String {
        self.navigator.language().unwrap_or_default()
    }

    fn plugins(&self) -> Vec<String> {
        let Ok(plugins) = self.navigator.plugins() else {
            return Vec::new();
        };
        (0..plugins.length())
            .filter_map(|i| plugins.item(i))
            .map(|p| p.name())
            .collect()
    }

    fn screen(&self) -> ScreenInfo {
        let Ok(screen) = self.window.screen() else {
            log::warn!("window.screen unavailable, reporting empty geometry");
            return ScreenInfo::default();
        };
        let width = dimension(screen.width());
        let height = dimension(screen.height());
        ScreenInfo {
            width,
            height,
            color_depth: dimension(screen.color_depth()),
            orientation: self.orientation(&screen, width, height),
            scaling: self.window.device_pixel_ratio(),
        }
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        let cores = self.navigator.hardware_concurrency();
        (cores.is_finite() && cores > 0.0).then_some(cores as u32)
    }

    fn device_memory(&self) -> Option<f64> {
        self.navigator_prop("deviceMemory").as_f64()
    }

    fn has_privacy_browser_marker(&self) -> bool {
        !self.navigator_prop("brave").is_undefined()
    }

    fn has_hover_capability(&self) -> bool {
        Reflect::has(&self.window, &JsValue::from_str("onmouseover")).unwrap_or(false)
    }

    fn page_path(&self) -> String {
        self.window
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string())
    }

    fn timezone(&self) -> String {
        let format = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new());
        Reflect::get(&format.resolved_options(), &JsValue::from_str("timeZone"))
            .ok()
            .and_then(|tz| tz.as_string())
            .unwrap_or_default()
    }

    fn connection_type(&self) -> Option<String> {
        let connection = self.navigator_prop("connection");
        if connection.is_undefined() || connection.is_null() {
            return None;
        }
        Reflect::get(&connection, &JsValue::from_str("effectiveType"))
            .ok()
            .and_then(|t| t.as_string())
    }

    fn now_iso(&self) -> String {
        js_sys::Date::new_0().to_iso_string().into()
    }

    fn now_ms(&self) -> f64 {
        self.window
            .performance()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}
