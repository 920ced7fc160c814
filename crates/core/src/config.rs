use crate::error::{AppError, Result};
use crate::geo::GeoPoint;
use crate::picker::DEFAULT_SAMPLE_STEP;
use crate::scene::{CameraFlight, CameraOrientation};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ANALYSIS_URL: &str = "http://localhost:8001/predict";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_ANALYSIS_URL: &str = "GEOSELECT_ANALYSIS_URL";
const ENV_TIMEOUT: &str = "GEOSELECT_REQUEST_TIMEOUT_SECS";
const ENV_SAMPLE_STEP: &str = "GEOSELECT_SAMPLE_STEP_PX";
const ENV_SCENARIO: &str = "GEOSELECT_SCENARIO_TEXT";

/// Camera move issued after a selection is committed.
#[derive(Clone, Debug, PartialEq)]
pub struct FlightSettings {
    pub altitude_m: f64,
    pub heading_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub duration_secs: f64,
}

impl Default for FlightSettings {
    fn default() -> Self {
        Self {
            altitude_m: 1_200.0,
            heading_deg: 0.0,
            pitch_deg: -35.0,
            roll_deg: 0.0,
            duration_secs: 1.5,
        }
    }
}

impl FlightSettings {
    pub fn flight_to(&self, target: GeoPoint) -> CameraFlight {
        CameraFlight {
            target,
            altitude_m: self.altitude_m,
            orientation: CameraOrientation {
                heading_deg: self.heading_deg,
                pitch_deg: self.pitch_deg,
                roll_deg: self.roll_deg,
            },
            duration_secs: self.duration_secs,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub analysis_url: Url,
    pub request_timeout: Duration,
    pub sample_step_px: f64,
    pub scenario_text: Option<String>,
    pub flight: FlightSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(url) = lookup(ENV_ANALYSIS_URL) {
            builder = builder.with_analysis_url(url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| AppError::Config(format!("{ENV_TIMEOUT} must be a whole number of seconds, got '{raw}'")))?;
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(ENV_SAMPLE_STEP) {
            let step = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Config(format!("{ENV_SAMPLE_STEP} must be a number, got '{raw}'")))?;
            builder = builder.with_sample_step(step);
        }
        if let Some(text) = lookup(ENV_SCENARIO).filter(|t| !t.trim().is_empty()) {
            builder = builder.with_scenario_text(text);
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis_url: Url::parse(DEFAULT_ANALYSIS_URL).expect("default analysis URL is valid"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sample_step_px: DEFAULT_SAMPLE_STEP,
            scenario_text: None,
            flight: FlightSettings::default(),
        }
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    analysis_url: Option<String>,
    request_timeout: Option<Duration>,
    sample_step_px: Option<f64>,
    scenario_text: Option<String>,
    flight: Option<FlightSettings>,
}

impl ConfigBuilder {
    pub fn with_analysis_url(mut self, url: impl Into<String>) -> Self {
        self.analysis_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_sample_step(mut self, step: f64) -> Self {
        self.sample_step_px = Some(step);
        self
    }

    pub fn with_scenario_text(mut self, text: impl Into<String>) -> Self {
        self.scenario_text = Some(text.into());
        self
    }

    pub fn with_flight(mut self, flight: FlightSettings) -> Self {
        self.flight = Some(flight);
        self
    }

    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let analysis_url = match self.analysis_url {
            Some(raw) => parse_endpoint(&raw)?,
            None => defaults.analysis_url,
        };

        let sample_step_px = self.sample_step_px.unwrap_or(defaults.sample_step_px);
        if !(sample_step_px.is_finite() && sample_step_px > 0.0) {
            return Err(AppError::config(format!("sample step must be positive, got {sample_step_px}")));
        }

        let request_timeout = self.request_timeout.unwrap_or(defaults.request_timeout);
        if request_timeout.is_zero() {
            return Err(AppError::config("request timeout must be non-zero"));
        }

        Ok(Config {
            analysis_url,
            request_timeout,
            sample_step_px,
            scenario_text: self.scenario_text,
            flight: self.flight.unwrap_or(defaults.flight),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
