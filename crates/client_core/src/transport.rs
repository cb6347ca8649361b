use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{GateKind, MeasureScope, QubitId, SessionId},
    error::ApiErrorBody,
    protocol::{
        GateRequest, HardResetRequest, HealthResponse, MeasureRequest, MeasureResponse,
        NewSessionResponse, QuantumState, ResetRequest, StateResponse, TrialsRequest,
        TrialsResult,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    error::TransportError,
    settings::{normalize_api_base, PlaygroundSettings},
};

/// Request/response contract of the external simulation service.
#[async_trait]
pub trait SimulatorApi: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, TransportError>;
    async fn new_session(&self) -> Result<NewSessionResponse, TransportError>;
    async fn fetch_state(&self, session_id: &SessionId) -> Result<QuantumState, TransportError>;
    async fn apply_gate(
        &self,
        session_id: &SessionId,
        gate: GateKind,
    ) -> Result<QuantumState, TransportError>;
    async fn measure(
        &self,
        session_id: &SessionId,
        scope: MeasureScope,
    ) -> Result<MeasureResponse, TransportError>;
    async fn reset_qubit(
        &self,
        session_id: &SessionId,
        qubit: QubitId,
    ) -> Result<QuantumState, TransportError>;
    async fn hard_reset(&self, session_id: &SessionId) -> Result<QuantumState, TransportError>;
    async fn run_trials(
        &self,
        session_id: &SessionId,
        scope: MeasureScope,
        n: u32,
    ) -> Result<TrialsResult, TransportError>;
}

/// JSON-over-HTTP client for the simulator. Holds no session state.
#[derive(Debug, Clone)]
pub struct HttpSimulatorApi {
    http: Client,
    api_base: Url,
}

impl HttpSimulatorApi {
    pub fn new(settings: &PlaygroundSettings) -> Result<Self, TransportError> {
        let normalized = normalize_api_base(&settings.api_base)?;
        let api_base = Url::parse(&normalized)
            .map_err(|err| TransportError::InvalidBaseUrl(format!("{normalized}: {err}")))?;
        let http = Client::builder()
            .connect_timeout(settings.request_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Ok(Self { http, api_base })
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded,
    /// so an opaque id can never alter the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidBaseUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R, TransportError> {
        let url = self.endpoint(segments)?;
        debug!(path = url.path(), "simulator GET");
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    async fn post_json<B, R>(&self, segments: &[&str], body: Option<&B>) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!(path = url.path(), "simulator POST");
        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.message())
            .ok()
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()));
        return Err(TransportError::Status {
            status: status.as_u16(),
            detail,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| TransportError::Decode(err.to_string()))
}

#[async_trait]
impl SimulatorApi for HttpSimulatorApi {
    async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.get_json(&["health"]).await
    }

    async fn new_session(&self) -> Result<NewSessionResponse, TransportError> {
        self.post_json::<(), _>(&["session", "new"], None).await
    }

    async fn fetch_state(&self, session_id: &SessionId) -> Result<QuantumState, TransportError> {
        let response: StateResponse = self.get_json(&["state", session_id.as_str()]).await?;
        Ok(response.state)
    }

    async fn apply_gate(
        &self,
        session_id: &SessionId,
        gate: GateKind,
    ) -> Result<QuantumState, TransportError> {
        let request = GateRequest {
            session_id: session_id.clone(),
            gate,
        };
        let response: StateResponse = self.post_json(&["gate", "apply"], Some(&request)).await?;
        Ok(response.state)
    }

    async fn measure(
        &self,
        session_id: &SessionId,
        scope: MeasureScope,
    ) -> Result<MeasureResponse, TransportError> {
        let request = MeasureRequest {
            session_id: session_id.clone(),
            qubit: scope,
        };
        self.post_json(&["measure"], Some(&request)).await
    }

    async fn reset_qubit(
        &self,
        session_id: &SessionId,
        qubit: QubitId,
    ) -> Result<QuantumState, TransportError> {
        let request = ResetRequest {
            session_id: session_id.clone(),
            qubit,
        };
        let response: StateResponse = self.post_json(&["reset"], Some(&request)).await?;
        Ok(response.state)
    }

    async fn hard_reset(&self, session_id: &SessionId) -> Result<QuantumState, TransportError> {
        let request = HardResetRequest {
            session_id: session_id.clone(),
        };
        let response: StateResponse = self.post_json(&["reset", "hard"], Some(&request)).await?;
        Ok(response.state)
    }

    async fn run_trials(
        &self,
        session_id: &SessionId,
        scope: MeasureScope,
        n: u32,
    ) -> Result<TrialsResult, TransportError> {
        let request = TrialsRequest {
            session_id: session_id.clone(),
            qubit: scope,
            n,
        };
        self.post_json(&["trials"], Some(&request)).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
