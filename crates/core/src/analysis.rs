//! Air-quality analysis requests.
//!
//! Every newly committed selection is POSTed once to the analysis service.
//! Requests run on a background worker; results come back over a channel and
//! are tagged with the selection generation they were issued for, so a slow
//! response for an old selection can never overwrite a newer one.
//!
//! Failures are logged and absorbed: the request is not retried and the
//! dispatcher simply stays pending for that generation.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geo::GeoRectangle;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Body of the analysis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    #[serde(flatten)]
    pub bbox: GeoRectangle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_text: Option<String>,
}

impl AnalysisRequest {
    pub fn new(bbox: GeoRectangle, scenario_text: Option<String>) -> Self {
        Self { bbox, scenario_text }
    }
}

/// Mean pollutant concentrations over the selected area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantMeans {
    pub pm2_5: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub so2: f64,
    pub no: f64,
    pub nh3: f64,
    pub o3: f64,
}

/// AQI predicted by each model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    #[serde(rename = "Linear Regression")]
    pub linear_regression: f64,
    #[serde(rename = "Decision Tree")]
    pub decision_tree: f64,
    #[serde(rename = "Random Forest")]
    pub random_forest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub label: String,
    pub means: PollutantMeans,
    pub predictions: Predictions,
    pub average_aqi: f64,
    pub status: String,
}

impl ScenarioReport {
    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_aqi(self.average_aqi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenarios {
    pub current: ScenarioReport,
    pub future: ScenarioReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub city: String,
    pub bbox: GeoRectangle,
}

/// Structured report returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub scenarios: Scenarios,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_params: Option<serde_json::Value>,
    pub metadata: AnalysisMetadata,
}

/// Direction of the projected AQI change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Unchanged,
}

impl AnalysisResult {
    /// Future scenario AQI relative to the current one.
    pub fn trend(&self) -> Trend {
        let current = self.scenarios.current.average_aqi;
        let future = self.scenarios.future.average_aqi;
        if future > current {
            Trend::Increasing
        } else if future < current {
            Trend::Decreasing
        } else {
            Trend::Unchanged
        }
    }

    pub fn aqi_delta(&self) -> f64 {
        self.scenarios.future.average_aqi - self.scenarios.current.average_aqi
    }
}

/// National AQI bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl AqiCategory {
    pub fn from_aqi(aqi: f64) -> Self {
        match aqi {
            a if a <= 50.0 => Self::Good,
            a if a <= 100.0 => Self::Satisfactory,
            a if a <= 200.0 => Self::Moderate,
            a if a <= 300.0 => Self::Poor,
            a if a <= 400.0 => Self::VeryPoor,
            _ => Self::Severe,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
        }
    }
}

/// HTTP client for the analysis service.
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.analysis_url.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POSTs the bounding box and parses the report.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::transport(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AnalysisStatus {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(format!("reading response body: {}", e)))?;
        parse_response(&bytes)
    }
}

/// Parses a response body, treating `success: false` as a rejection.
pub fn parse_response(body: &[u8]) -> Result<AnalysisResult> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    // A rejection may carry no report at all.
    if value.get("success").and_then(serde_json::Value::as_bool) != Some(true) {
        return Err(AppError::AnalysisRejected);
    }
    Ok(serde_json::from_value(value)?)
}

/// Where the state machine sends committed selections.
pub trait AnalysisSink {
    /// Fire-and-forget request for the selection with the given generation.
    fn submit(&mut self, generation: u64, request: AnalysisRequest);

    /// The selection was cleared; anything older than `generation` is stale.
    fn discard(&mut self, generation: u64);
}

/// Analysis state as shown by the analysis panel.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    /// No selection, nothing to show.
    Idle,
    /// Waiting for (or failed to get) the report for this generation.
    Pending { generation: u64 },
    /// Report for this generation.
    Ready { generation: u64, result: Box<AnalysisResult> },
}

struct AnalysisOutcome {
    generation: u64,
    result: Result<AnalysisResult>,
}

/// Runs analysis requests on worker threads and keeps the latest result.
pub struct AnalysisDispatcher {
    config: Config,
    tx: Sender<AnalysisOutcome>,
    rx: Receiver<AnalysisOutcome>,
    latest: u64,
    state: AnalysisState,
}

impl AnalysisDispatcher {
    pub fn new(config: Config) -> Self {
        let (tx, rx) = channel();
        Self {
            config,
            tx,
            rx,
            latest: 0,
            state: AnalysisState::Idle,
        }
    }

    /// Applies every outcome received so far and returns the current state.
    pub fn poll(&mut self) -> &AnalysisState {
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome);
        }
        &self.state
    }

    /// Blocks until the latest generation resolves or `timeout` elapses.
    ///
    /// Returns the report if one arrived in time.
    pub fn wait_latest(&mut self, timeout: Duration) -> Option<&AnalysisResult> {
        let deadline = Instant::now() + timeout;
        while matches!(self.state, AnalysisState::Pending { .. }) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    let generation = outcome.generation;
                    let failed = outcome.result.is_err();
                    self.apply(outcome);
                    if failed && generation == self.latest {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.result()
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            AnalysisState::Ready { result, .. } => Some(result.as_ref()),
            _ => None,
        }
    }

    fn apply(&mut self, outcome: AnalysisOutcome) {
        if outcome.generation != self.latest {
            debug!(
                generation = outcome.generation,
                latest = self.latest,
                "discarding stale analysis response"
            );
            return;
        }

        match outcome.result {
            Ok(result) => {
                info!(
                    generation = outcome.generation,
                    city = %result.metadata.city,
                    current_aqi = result.scenarios.current.average_aqi,
                    future_aqi = result.scenarios.future.average_aqi,
                    "analysis result received"
                );
                self.state = AnalysisState::Ready {
                    generation: outcome.generation,
                    result: Box::new(result),
                };
            }
            Err(e) => {
                warn!(generation = outcome.generation, error = %e, "analysis request failed");
            }
        }
    }
}

impl AnalysisSink for AnalysisDispatcher {
    fn submit(&mut self, generation: u64, request: AnalysisRequest) {
        self.latest = generation;
        self.state = AnalysisState::Pending { generation };

        let tx = self.tx.clone();
        let config = self.config.clone();

        // Spawn background thread for async work
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();

            let result = match runtime {
                Ok(rt) => rt.block_on(async {
                    let client = AnalysisClient::new(&config)?;
                    client.analyze(&request).await
                }),
                Err(e) => Err(AppError::transport(format!("Failed to create runtime: {}", e))),
            };

            let _ = tx.send(AnalysisOutcome { generation, result });
        });
    }

    fn discard(&mut self, generation: u64) {
        self.latest = generation;
        self.state = AnalysisState::Idle;
    }
}
