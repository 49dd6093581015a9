use super::client::{ClientError, LogServiceClient};
use super::signing::{self, Credentials, SigningRequest};
use super::types::{LogGroup, LogStream, PutLogEventsRequest, PutLogEventsResponse};
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

const TARGET_PREFIX: &str = "Logs_20140328";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SERVICE_NAME: &str = "logs";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Overrides the regional endpoint, e.g. for a local emulator.
    pub endpoint: Option<String>,
    /// Requests are sent unsigned when absent.
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            credentials: None,
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: concat!("cloudwatch-hook/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn endpoint_url(&self) -> Result<Url, ClientError> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://logs.{}.amazonaws.com", self.region),
        };
        endpoint
            .parse()
            .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid endpoint URL: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupInput<'a> {
    log_group_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamInput<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsInput<'a> {
    log_group_name_prefix: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsOutput {
    #[serde(default)]
    log_groups: Vec<LogGroup>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsInput<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsOutput {
    #[serde(default)]
    log_streams: Vec<LogStream>,
}

#[derive(Deserialize)]
struct EmptyOutput {}

#[derive(Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

fn service_error(status: StatusCode, body: &[u8]) -> ClientError {
    let parsed: Option<ServiceErrorBody> = serde_json::from_slice(body).ok();
    let (error_type, message) = match parsed {
        Some(parsed) => (parsed.error_type, parsed.message),
        None => (None, None),
    };

    // "__type" may be namespaced: "com.amazonaws.logs#InvalidSequenceTokenException"
    let code = error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    ClientError::Service {
        status: status.as_u16(),
        code,
        message: message.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
    }
}

/// CloudWatch Logs over the AWS JSON 1.1 protocol.
#[derive(Debug, Clone)]
pub struct CloudWatchLogsClient {
    client: Client,
    config: ClientConfig,
    endpoint_url: Url,
    host: String,
    stats: Arc<ClientStats>,
}

impl CloudWatchLogsClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint_url = config.endpoint_url()?;
        let host = match (endpoint_url.host_str(), endpoint_url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ClientError::InvalidConfiguration(format!(
                    "Endpoint URL has no host: {endpoint_url}"
                )));
            }
        };

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            endpoint_url,
            host,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }

    async fn call<I, O>(&self, operation: &str, input: &I) -> Result<O, ClientError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)?;
        let target = format!("{TARGET_PREFIX}.{operation}");

        let mut request = self
            .client
            .post(self.endpoint_url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("x-amz-target", target.as_str())
            .header(USER_AGENT, self.config.user_agent.as_str());

        if let Some(credentials) = &self.config.credentials {
            let signed = signing::sign(
                credentials,
                &self.config.region,
                SERVICE_NAME,
                &SigningRequest {
                    method: "POST",
                    host: &self.host,
                    path: self.endpoint_url.path(),
                    headers: &[("content-type", JSON_CONTENT_TYPE), ("x-amz-target", target.as_str())],
                    body: &body,
                },
                Utc::now(),
            )?;
            for (name, value) in signed {
                request = request.header(name, value);
            }
        }

        debug!("Calling {} ({} bytes)", target, body.len());
        let start = Instant::now();

        let response = timeout(self.config.timeout, request.body(body).send())
            .await
            .map_err(|_| ClientError::RequestTimeout(format!("{operation} timed out")))?
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::RequestTimeout(format!("{operation} timed out: {e}"))
                } else {
                    ClientError::NetworkError(e)
                }
            })?;

        let status = response.status();
        let payload = response.bytes().await?;
        self.stats.record_request(status.is_success(), start.elapsed());

        if !status.is_success() {
            return Err(service_error(status, &payload));
        }

        // Create* operations answer with an empty body
        let payload: &[u8] = if payload.is_empty() { b"{}" } else { &payload };
        Ok(serde_json::from_slice(payload)?)
    }
}

impl LogServiceClient for CloudWatchLogsClient {
    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError> {
        let _: EmptyOutput = self
            .call("CreateLogGroup", &CreateLogGroupInput { log_group_name: group_name })
            .await?;
        Ok(())
    }

    async fn describe_log_groups(
        &self,
        name_prefix: &str,
        limit: u32,
    ) -> Result<Vec<LogGroup>, ClientError> {
        let output: DescribeLogGroupsOutput = self
            .call(
                "DescribeLogGroups",
                &DescribeLogGroupsInput {
                    log_group_name_prefix: name_prefix,
                    limit,
                },
            )
            .await?;
        Ok(output.log_groups)
    }

    async fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ClientError> {
        let output: DescribeLogStreamsOutput = self
            .call(
                "DescribeLogStreams",
                &DescribeLogStreamsInput {
                    log_group_name: group_name,
                    log_stream_name_prefix: name_prefix,
                },
            )
            .await?;
        Ok(output.log_streams)
    }

    async fn create_log_stream(&self, group_name: &str, stream_name: &str) -> Result<(), ClientError> {
        let _: EmptyOutput = self
            .call(
                "CreateLogStream",
                &CreateLogStreamInput {
                    log_group_name: group_name,
                    log_stream_name: stream_name,
                },
            )
            .await?;
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ClientError> {
        self.call("PutLogEvents", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_regional() {
        let config = ClientConfig {
            region: "eu-west-1".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "https://logs.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = ClientConfig {
            endpoint: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            CloudWatchLogsClient::new(config),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_service_error_strips_namespace() {
        let err = service_error(
            StatusCode::BAD_REQUEST,
            br#"{"__type":"com.amazonaws.logs#InvalidSequenceTokenException","message":"bad token"}"#,
        );
        assert_eq!(err.code(), Some("InvalidSequenceTokenException"));
        assert!(err.to_string().contains("bad token"));
    }

    #[test]
    fn test_service_error_without_json_body() {
        let err = service_error(StatusCode::SERVICE_UNAVAILABLE, b"upstream down");
        assert_eq!(err.code(), Some("Service Unavailable"));
    }
}
