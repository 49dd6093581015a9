#![allow(dead_code)]

use cloudwatch_hook::sender::{
    ClientError, LogGroup, LogServiceClient, LogStream, PutLogEventsRequest, PutLogEventsResponse,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// In-memory stand-in for CloudWatch Logs.
///
/// Enforces the sequence-token contract: an append must carry the stream's
/// current token (none for a fresh stream) or it is rejected with
/// `InvalidSequenceTokenException`.
#[derive(Clone, Default)]
pub struct FakeLogService {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    groups: Vec<String>,
    /// (group, stream) -> current upload token
    streams: BTreeMap<(String, String), Option<String>>,
    calls: Vec<String>,
    accepted: Vec<PutLogEventsRequest>,
    rejected: Vec<PutLogEventsRequest>,
    fail_puts: usize,
    fail_operation: Option<&'static str>,
    put_delay: Option<Duration>,
    issued_tokens: u64,
}

fn service_error(code: &str, message: &str) -> ClientError {
    ClientError::Service {
        status: 400,
        code: code.to_string(),
        message: message.to_string(),
    }
}

impl FakeLogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str) -> Self {
        self.state.lock().groups.push(group.to_string());
        self
    }

    pub fn with_stream(self, group: &str, stream: &str, token: Option<&str>) -> Self {
        {
            let mut state = self.state.lock();
            if !state.groups.iter().any(|g| g == group) {
                state.groups.push(group.to_string());
            }
            state.streams.insert(
                (group.to_string(), stream.to_string()),
                token.map(str::to_string),
            );
        }
        self
    }

    /// Makes the given operation fail once it is next called.
    pub fn fail_operation(&self, operation: &'static str) {
        self.state.lock().fail_operation = Some(operation);
    }

    /// Rejects the next `count` appends with a throttling error.
    pub fn fail_next_puts(&self, count: usize) {
        self.state.lock().fail_puts = count;
    }

    pub fn set_put_delay(&self, delay: Duration) {
        self.state.lock().put_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn accepted(&self) -> Vec<PutLogEventsRequest> {
        self.state.lock().accepted.clone()
    }

    pub fn rejected(&self) -> Vec<PutLogEventsRequest> {
        self.state.lock().rejected.clone()
    }

    pub fn accepted_messages(&self) -> Vec<String> {
        self.state
            .lock()
            .accepted
            .iter()
            .flat_map(|r| r.log_events.iter().map(|e| e.message.clone()))
            .collect()
    }

    pub fn has_stream(&self, group: &str, stream: &str) -> bool {
        self.state
            .lock()
            .streams
            .contains_key(&(group.to_string(), stream.to_string()))
    }

    pub fn stream_token(&self, group: &str, stream: &str) -> Option<String> {
        self.state
            .lock()
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .cloned()
            .flatten()
    }

    fn record(&self, operation: &'static str) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(operation.to_string());
        if state.fail_operation == Some(operation) {
            state.fail_operation = None;
            return Err(service_error("ServiceUnavailableException", "injected failure"));
        }
        Ok(())
    }
}

/// Cloneable in-memory sink for a `WriterCore`.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Polls until `condition` holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

impl LogServiceClient for FakeLogService {
    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError> {
        self.record("CreateLogGroup")?;
        let mut state = self.state.lock();
        if state.groups.iter().any(|g| g == group_name) {
            return Err(service_error(
                "ResourceAlreadyExistsException",
                "The specified log group already exists",
            ));
        }
        state.groups.push(group_name.to_string());
        Ok(())
    }

    async fn describe_log_groups(
        &self,
        name_prefix: &str,
        limit: u32,
    ) -> Result<Vec<LogGroup>, ClientError> {
        self.record("DescribeLogGroups")?;
        let state = self.state.lock();
        let mut groups: Vec<&String> = state
            .groups
            .iter()
            .filter(|g| g.starts_with(name_prefix))
            .collect();
        groups.sort();
        Ok(groups
            .into_iter()
            .take(limit as usize)
            .map(|g| LogGroup {
                log_group_name: g.clone(),
                arn: None,
                creation_time: None,
            })
            .collect())
    }

    async fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ClientError> {
        self.record("DescribeLogStreams")?;
        let state = self.state.lock();
        if !state.groups.iter().any(|g| g == group_name) {
            return Err(service_error(
                "ResourceNotFoundException",
                "The specified log group does not exist",
            ));
        }
        Ok(state
            .streams
            .iter()
            .filter(|((group, stream), _)| group == group_name && stream.starts_with(name_prefix))
            .map(|((_, stream), token)| LogStream {
                log_stream_name: stream.clone(),
                upload_sequence_token: token.clone(),
                creation_time: None,
                last_event_timestamp: None,
            })
            .collect())
    }

    async fn create_log_stream(&self, group_name: &str, stream_name: &str) -> Result<(), ClientError> {
        self.record("CreateLogStream")?;
        let mut state = self.state.lock();
        if !state.groups.iter().any(|g| g == group_name) {
            return Err(service_error(
                "ResourceNotFoundException",
                "The specified log group does not exist",
            ));
        }
        let key = (group_name.to_string(), stream_name.to_string());
        if state.streams.contains_key(&key) {
            return Err(service_error(
                "ResourceAlreadyExistsException",
                "The specified log stream already exists",
            ));
        }
        state.streams.insert(key, None);
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ClientError> {
        let delay = self.state.lock().put_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.record("PutLogEvents")?;
        let mut state = self.state.lock();

        if state.fail_puts > 0 {
            state.fail_puts -= 1;
            state.rejected.push(request);
            return Err(service_error("ThrottlingException", "Rate exceeded"));
        }

        let key = (request.log_group_name.clone(), request.log_stream_name.clone());
        let Some(expected) = state.streams.get(&key).cloned() else {
            state.rejected.push(request);
            return Err(service_error(
                "ResourceNotFoundException",
                "The specified log stream does not exist",
            ));
        };

        if expected != request.sequence_token {
            state.rejected.push(request);
            return Err(service_error(
                "InvalidSequenceTokenException",
                "The given sequenceToken is invalid",
            ));
        }

        state.issued_tokens += 1;
        let next = format!("token-{}", state.issued_tokens);
        state.streams.insert(key, Some(next.clone()));
        state.accepted.push(request);

        Ok(PutLogEventsResponse {
            next_sequence_token: Some(next),
        })
    }
}
