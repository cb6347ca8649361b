use std::time::Duration;

use url::Url;

use crate::error::TransportError;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const POLL_INTERVAL: Duration = Duration::from_millis(20_000);
pub const GATE_AURA_DURATION: Duration = Duration::from_millis(1_200);
pub const LED_BLINK_DURATION: Duration = Duration::from_millis(600);
pub const ERROR_BANNER_DURATION: Duration = Duration::from_millis(4_000);
pub const MIN_TRIALS: u32 = 1;
pub const MAX_TRIALS: u32 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundSettings {
    pub api_base: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub gate_aura: Duration,
    pub led_blink: Duration,
    pub error_banner: Duration,
}

impl Default for PlaygroundSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            request_timeout: REQUEST_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            gate_aura: GATE_AURA_DURATION,
            led_blink: LED_BLINK_DURATION,
            error_banner: ERROR_BANNER_DURATION,
        }
    }
}

impl PlaygroundSettings {
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }
}

/// Validates the API base and strips trailing slashes so request paths can
/// be appended verbatim.
pub fn normalize_api_base(raw: &str) -> Result<String, TransportError> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).map_err(|err| TransportError::InvalidBaseUrl(format!("{trimmed}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TransportError::InvalidBaseUrl(format!(
                "{trimmed}: unsupported scheme '{other}'"
            )))
        }
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(TransportError::InvalidBaseUrl(format!(
            "{trimmed}: query and fragment are not allowed"
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
