pub mod client;
pub mod messages;

pub use client::{Credential, HttpTokenClient, TokenClient};
pub use messages::{TokenErrorBody, TokenRequest, TokenResponse};
