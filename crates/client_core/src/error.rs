use reqwest::StatusCode;
use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {route} failed: {source}")]
    Transport {
        route: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{route} responded with {status}{}", describe(.api_error))]
    Status {
        route: String,
        status: StatusCode,
        api_error: Option<ApiError>,
    },
    #[error("failed to decode response from {route}: {source}")]
    Decode {
        route: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("submission task aborted: {0}")]
    TaskAborted(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe(api_error: &Option<ApiError>) -> String {
    match api_error {
        Some(err) => format!(": {}", err.message),
        None => String::new(),
    }
}
