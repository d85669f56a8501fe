//! HTTP client for the calibration backend.

use std::time::Instant;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::data::request::{CalibrationRequest, HEALTH_PATH, ZABR_MODEL_INFO_PATH};
use crate::domain::{CalibrationOutcome, CalibrationResponse, ModelInfo, ZabrModel};
use crate::error::AppError;

/// The calls the recompute pipeline needs from a backend.
///
/// `BackendClient` is the real implementation; tests substitute fakes.
pub trait CalibrationBackend: Send + Sync {
    /// Probe `GET /health`.
    fn health(&self) -> Result<serde_json::Value, AppError>;

    /// Send one calibration request and parse the response envelope.
    fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, AppError>;
}

/// Run `request` against `backend`, timing the round trip.
pub fn run_request<B: CalibrationBackend + ?Sized>(
    backend: &B,
    request: &CalibrationRequest,
) -> Result<CalibrationOutcome, AppError> {
    let started = Instant::now();
    let response = backend.calibrate(request)?;
    let response_time_ms = started.elapsed().as_millis() as u64;
    Ok(CalibrationOutcome {
        model: request.model,
        response,
        response_time_ms,
    })
}

pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch default parameters, ranges and description for a ZABR model.
    pub fn model_info(&self, model: ZabrModel) -> Result<ModelInfo, AppError> {
        let url = self.url(&format!("{ZABR_MODEL_INFO_PATH}/{}", model.as_str()));
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::backend(format!("Model info request failed: {e}")))?;
        let envelope: Envelope<ModelInfo> = read_json(resp)?;
        envelope
            .data
            .ok_or_else(|| AppError::backend(envelope.error.unwrap_or_else(|| "Model info response had no data.".to_string())))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl CalibrationBackend for BackendClient {
    fn health(&self) -> Result<serde_json::Value, AppError> {
        let url = self.url(HEALTH_PATH);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::backend(format!("Health check failed: {e}")))?;
        read_json(resp)
    }

    fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, AppError> {
        let url = self.url(request.path());
        let body = request.body()?;
        debug!(%url, model = %request.model, "posting calibration request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| AppError::backend(format!("Calibration request failed: {e}")))?;

        let response: CalibrationResponse = read_json(resp)?;
        if response.status.as_deref() == Some("error") {
            let message = response
                .error
                .clone()
                .or_else(|| response.message.clone())
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Calculation failed".to_string());
            warn!(model = %request.model, %message, "backend reported an error status");
            return Err(AppError::backend(message));
        }

        info!(
            model = %request.model,
            strikes = response.data.strikes.len(),
            cached = response.cached(),
            "calibration response received"
        );
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, AppError> {
    let status = resp.status();
    let text = resp
        .text()
        .map_err(|e| AppError::backend(format!("Failed to read backend response: {e}")))?;

    if !status.is_success() {
        return Err(AppError::backend(error_message(status.as_u16(), &text)));
    }

    serde_json::from_str(&text).map_err(|e| AppError::backend(format!("Failed to parse backend response: {e}")))
}

/// Message for a non-2xx response: the backend's `error` (or `message`) field
/// when the body carries one, otherwise the bare status.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {status}"))
}
