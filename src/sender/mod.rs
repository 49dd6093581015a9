//! Remote log service: the client capability the hook needs, the wire
//! types it exchanges, and a CloudWatch Logs implementation over HTTP.

pub mod client;
pub mod cloudwatch;
pub mod signing;
pub mod types;

pub use client::{ClientError, LogServiceClient};
pub use cloudwatch::{ClientConfig, CloudWatchLogsClient, ConnectionStats};
pub use signing::Credentials;
pub use types::{InputLogEvent, LogGroup, LogStream, PutLogEventsRequest, PutLogEventsResponse};
