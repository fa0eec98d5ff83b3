use serde::{Deserialize, Serialize};

/// Request body sent to the token issuing service
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub identity: String,
    pub room_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Successful token service response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub identity: String,
    pub room_name: String,
    pub expires_at: Option<String>,
}

/// Body of a non-2xx token service response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
}
