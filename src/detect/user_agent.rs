//! User-agent parsing.
//!
//! The detectors only depend on [`UserAgentParser`]. [`WootheeUaParser`]
//! adapts the `woothee` parser to it; anything woothee reports as unknown
//! is left unset here.

use woothee::parser::Parser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameVersion {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceParts {
    pub vendor: Option<String>,
    pub model: Option<String>,
    /// `mobile` or `tablet`; desktops leave it unset
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUserAgent {
    pub browser: NameVersion,
    pub os: NameVersion,
    pub device: DeviceParts,
}

pub trait UserAgentParser {
    fn parse(&self, user_agent: &str) -> ParsedUserAgent;
}

const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

// woothee names Apple handhelds by their OS field
const APPLE_HANDHELDS: &[&str] = &["iPhone", "iPad", "iPod"];

pub struct WootheeUaParser {
    parser: Parser,
}

impl Default for WootheeUaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WootheeUaParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl UserAgentParser for WootheeUaParser {
    fn parse(&self, user_agent: &str) -> ParsedUserAgent {
        let Some(result) = self.parser.parse(user_agent) else {
            return ParsedUserAgent::default();
        };

        let os = known(&result.os);
        let handheld = os
            .as_deref()
            .filter(|os| APPLE_HANDHELDS.contains(os))
            .map(str::to_string);
        let apple = handheld.is_some() || os.as_deref() == Some("Mac OSX");

        let device_type = match (handheld.as_deref(), known(&result.category).as_deref()) {
            (Some("iPad"), _) => Some("tablet"),
            (_, Some("smartphone" | "mobilephone")) => Some("mobile"),
            _ => None,
        };

        ParsedUserAgent {
            browser: NameVersion {
                name: known(&result.name),
                version: known(&result.version),
            },
            os: NameVersion {
                name: os,
                version: known(&result.os_version),
            },
            device: DeviceParts {
                vendor: apple.then(|| "Apple".to_string()),
                model: handheld,
                device_type: device_type.map(str::to_string),
            },
        }
    }
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != WOOTHEE_UNKNOWN).then(|| value.to_string())
}
