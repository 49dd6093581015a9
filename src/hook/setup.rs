use crate::sender::{ClientError, LogServiceClient};
use thiserror::Error;
use tracing::debug;

/// Page size when listing groups; the target is matched by exact name
/// among the prefix matches.
const DESCRIBE_GROUPS_LIMIT: u32 = 50;

const ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Failed to connect to log service: {0}")]
    Connect(#[source] ClientError),
    #[error("Failed to describe log groups: {0}")]
    DescribeGroups(#[source] ClientError),
    #[error("Failed to create log group '{group}': {source}")]
    CreateGroup {
        group: String,
        #[source]
        source: ClientError,
    },
    #[error("Failed to describe log streams in '{group}': {source}")]
    DescribeStreams {
        group: String,
        #[source]
        source: ClientError,
    },
    #[error("Failed to create log stream '{stream}': {source}")]
    CreateStream {
        stream: String,
        #[source]
        source: ClientError,
    },
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Makes sure `group`/`stream` exist and returns the stream's current
/// sequence token (`None` for a fresh stream).
///
/// Nothing is created when both already exist, so calling this repeatedly
/// is safe. No step is retried.
pub async fn ensure_stream<C: LogServiceClient>(
    client: &C,
    group: &str,
    stream: &str,
) -> Result<Option<String>, InitializationError> {
    let groups = client
        .describe_log_groups(group, DESCRIBE_GROUPS_LIMIT)
        .await
        .map_err(InitializationError::DescribeGroups)?;

    if groups.iter().any(|g| g.log_group_name == group) {
        debug!("Log group {} exists", group);
    } else {
        debug!("Creating log group {}", group);
        match client.create_log_group(group).await {
            Ok(()) => {}
            // Listed past the first page, or created concurrently
            Err(e) if e.code() == Some(ALREADY_EXISTS) => {
                debug!("Log group {} already exists", group);
            }
            Err(source) => {
                return Err(InitializationError::CreateGroup {
                    group: group.to_string(),
                    source,
                });
            }
        }
    }

    let streams = client
        .describe_log_streams(group, stream)
        .await
        .map_err(|source| InitializationError::DescribeStreams {
            group: group.to_string(),
            source,
        })?;

    if let Some(existing) = streams.into_iter().find(|s| s.log_stream_name == stream) {
        debug!(
            "Log stream {}/{} exists (token present: {})",
            group,
            stream,
            existing.upload_sequence_token.is_some()
        );
        return Ok(existing.upload_sequence_token);
    }

    debug!("Creating log stream {}/{}", group, stream);
    client
        .create_log_stream(group, stream)
        .await
        .map_err(|source| InitializationError::CreateStream {
            stream: stream.to_string(),
            source,
        })?;

    Ok(None)
}
