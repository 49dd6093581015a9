use super::types::{LogGroup, LogStream, PutLogEventsRequest, PutLogEventsResponse};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout: {0}")]
    RequestTimeout(String),
    #[error("Service error: {status} {code} - {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl ClientError {
    /// Service error code, e.g. `InvalidSequenceTokenException`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Operations the hook needs from the remote log service.
///
/// Implementations perform exactly one remote call per method; retries, if
/// any, belong to the implementation.
pub trait LogServiceClient: Send + Sync + 'static {
    fn create_log_group(
        &self,
        group_name: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn describe_log_groups(
        &self,
        name_prefix: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<LogGroup>, ClientError>> + Send;

    fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> impl Future<Output = Result<Vec<LogStream>, ClientError>> + Send;

    fn create_log_stream(
        &self,
        group_name: &str,
        stream_name: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> impl Future<Output = Result<PutLogEventsResponse, ClientError>> + Send;
}
