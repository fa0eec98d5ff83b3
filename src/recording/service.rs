use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use super::messages::{
    StartRecordingRequest, StartRecordingResponse, StopRecordingRequest, StopRecordingResponse,
};
use crate::config::RecordingServiceConfig;
use crate::error::{Result, SessionError};

/// External recording orchestration pipeline
#[async_trait::async_trait]
pub trait RecordingService: Send + Sync {
    async fn start(&self, request: StartRecordingRequest) -> Result<StartRecordingResponse>;

    async fn stop(&self, request: StopRecordingRequest) -> Result<StopRecordingResponse>;
}

/// Recording service over HTTP
pub struct HttpRecordingService {
    client: Client,
    base_url: String,
}

impl HttpRecordingService {
    pub fn new(config: &RecordingServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SessionError::RecordingService {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", url, status, body);
            return Err(SessionError::RecordingService {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| SessionError::RecordingService {
            status: status.as_u16(),
            body: format!("malformed response: {}", e),
        })
    }
}

#[async_trait::async_trait]
impl RecordingService for HttpRecordingService {
    async fn start(&self, request: StartRecordingRequest) -> Result<StartRecordingResponse> {
        info!("Requesting recording start for room {}", request.room_ref);
        self.post("/recording/start", &request).await
    }

    async fn stop(&self, request: StopRecordingRequest) -> Result<StopRecordingResponse> {
        info!("Requesting recording stop for {}", request.recording_ref);
        self.post("/recording/stop", &request).await
    }
}
