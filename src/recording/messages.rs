use serde::{Deserialize, Serialize};

/// `POST recording/start` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingRequest {
    pub room_ref: String,
    pub identity: String,
    pub appointment_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingResponse {
    pub composition_ref: String,
    pub recording_ref: String,
    pub status: String,
    pub room_ref: Option<String>,
}

/// `POST recording/stop` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecordingRequest {
    pub composition_ref: String,
    pub recording_ref: String,
    pub room_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecordingResponse {
    pub status: String,
    /// Remaining service-specific fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
