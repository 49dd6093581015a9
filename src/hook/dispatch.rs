use super::setup::{InitializationError, ensure_stream};
use super::{DispatchMode, HookConfig};
use crate::buffer::EntryQueue;
use crate::domain::{Level, LevelFilter, LogEntry};
use crate::pipeline::{Core, EnrichingCore, Hook, HookError};
use crate::sender::{
    ClientConfig, ClientError, CloudWatchLogsClient, InputLogEvent, LogServiceClient,
    PutLogEventsRequest,
};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to append to {group}/{stream}: {source}")]
    Append {
        group: String,
        stream: String,
        #[source]
        source: ClientError,
    },
    #[error("Synchronous dispatch cannot block a current-thread runtime")]
    BlockingUnsupported,
}

/// Snapshot of the hook's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub appended: u64,
    pub failed: u64,
    /// Entries whose level the hook does not accept.
    pub filtered: u64,
    /// Accepted entries with no enriched counterpart in the queue.
    pub unmatched: u64,
    /// Appends started but not yet finished.
    pub in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    appended: AtomicU64,
    failed: AtomicU64,
    filtered: AtomicU64,
    unmatched: AtomicU64,
    in_flight: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            appended: self.appended.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Counts an append as in flight until dropped, including when the append
/// future itself is dropped mid-flight.
struct InFlight<'a>(&'a AtomicU64);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// State shared with detached append tasks.
struct Shared<C> {
    client: C,
    group_name: String,
    stream_name: String,
    next_sequence_token: Mutex<Option<String>>,
    counters: Counters,
}

impl<C: LogServiceClient> Shared<C> {
    /// One append per call. The token lock is held from read to store, so
    /// concurrent appends on this stream are serialized and every request
    /// carries the token returned by the one before it.
    async fn send_event(&self, event: InputLogEvent) -> Result<(), DispatchError> {
        let _in_flight = InFlight::enter(&self.counters.in_flight);
        let mut token = self.next_sequence_token.lock().await;

        let request = PutLogEventsRequest {
            log_group_name: self.group_name.clone(),
            log_stream_name: self.stream_name.clone(),
            log_events: vec![event],
            sequence_token: token.clone(),
        };

        match self.client.put_log_events(request).await {
            Ok(response) => {
                *token = response.next_sequence_token;
                self.counters.appended.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(source) => {
                // Token stays as it was
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(DispatchError::Append {
                    group: self.group_name.clone(),
                    stream: self.stream_name.clone(),
                    source,
                })
            }
        }
    }
}

/// Ships committed entries to one CloudWatch stream.
///
/// Register it on a [`crate::pipeline::HookedCore`] wrapping the core
/// returned by [`DispatchHook::enriching_core`] so both stages share the
/// same queue and accepted levels.
pub struct DispatchHook<C> {
    shared: Arc<Shared<C>>,
    accepted: LevelFilter,
    mode: DispatchMode,
    queue: Arc<EntryQueue>,
    runtime: Handle,
}

impl DispatchHook<CloudWatchLogsClient> {
    /// Builds an HTTP client from `client_config` and initializes against it.
    pub async fn connect(
        config: HookConfig,
        client_config: ClientConfig,
    ) -> Result<Self, InitializationError> {
        let client =
            CloudWatchLogsClient::new(client_config).map_err(InitializationError::Connect)?;
        Self::initialize(config, client).await
    }
}

impl<C: LogServiceClient> DispatchHook<C> {
    /// Ensures the group and stream exist and captures their sequence token.
    /// Uses the process-wide queue.
    pub async fn initialize(config: HookConfig, client: C) -> Result<Self, InitializationError> {
        Self::initialize_with_queue(config, client, EntryQueue::global()).await
    }

    pub async fn initialize_with_queue(
        config: HookConfig,
        client: C,
        queue: Arc<EntryQueue>,
    ) -> Result<Self, InitializationError> {
        let runtime =
            Handle::try_current().map_err(|e| InitializationError::NoRuntime(e.to_string()))?;

        let token = ensure_stream(&client, &config.group_name, &config.stream_name).await?;
        let accepted = config.level_filter();

        info!(
            group = %config.group_name,
            stream = %config.stream_name,
            mode = ?config.mode,
            has_token = token.is_some(),
            "CloudWatch stream ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                client,
                group_name: config.group_name,
                stream_name: config.stream_name,
                next_sequence_token: Mutex::new(token),
                counters: Counters::default(),
            }),
            accepted,
            mode: config.mode,
            queue,
            runtime,
        })
    }

    /// An enriching stage in front of `next` that feeds this hook's queue.
    pub fn enriching_core<N: Core>(&self, next: N) -> EnrichingCore<N> {
        EnrichingCore::new(next, self.accepted.clone(), Arc::clone(&self.queue))
    }

    pub fn levels(&self) -> &[Level] {
        self.accepted.levels()
    }

    pub fn accepts(&self, level: Level) -> bool {
        self.accepted.accepts(level)
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn group_name(&self) -> &str {
        &self.shared.group_name
    }

    pub fn stream_name(&self) -> &str {
        &self.shared.stream_name
    }

    pub fn queue(&self) -> &Arc<EntryQueue> {
        &self.queue
    }

    pub fn client(&self) -> &C {
        &self.shared.client
    }

    /// Waits for any append holding the token to finish.
    pub async fn sequence_token(&self) -> Option<String> {
        self.shared.next_sequence_token.lock().await.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        self.shared.counters.snapshot()
    }

    /// Async entry point. Detached mode still returns before the append
    /// completes.
    pub async fn dispatch(&self, entry: &LogEntry) -> Result<(), DispatchError> {
        let Some(event) = self.prepare(entry) else {
            return Ok(());
        };

        match self.mode {
            DispatchMode::Detached => {
                self.spawn_detached(event);
                Ok(())
            }
            DispatchMode::Synchronous => self.shared.send_event(event).await,
        }
    }

    /// Level check, queue correlation, and wire formatting. Entries below the
    /// accepted levels never touch the queue.
    fn prepare(&self, entry: &LogEntry) -> Option<InputLogEvent> {
        if !self.accepted.accepts(entry.level) {
            self.shared.counters.filtered.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let source = match self.queue.take(entry.id) {
            Some(enriched) => enriched,
            None => {
                self.shared.counters.unmatched.fetch_add(1, Ordering::Relaxed);
                entry.clone()
            }
        };

        Some(InputLogEvent {
            message: format!("[{}] {}", source.logger_name, source.message),
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    fn spawn_detached(&self, event: InputLogEvent) {
        let shared = Arc::clone(&self.shared);
        self.runtime.spawn(async move {
            let _ = shared.send_event(event).await;
        });
    }

    fn send_blocking(&self, event: InputLogEvent) -> Result<(), DispatchError> {
        let shared = Arc::clone(&self.shared);
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => tokio::task::block_in_place(move || {
                    handle.block_on(async move { shared.send_event(event).await })
                }),
                _ => Err(DispatchError::BlockingUnsupported),
            },
            Err(_) => self
                .runtime
                .block_on(async move { shared.send_event(event).await }),
        }
    }
}

impl<C: LogServiceClient> Hook for DispatchHook<C> {
    fn on_entry(&self, entry: &LogEntry) -> Result<(), HookError> {
        let Some(event) = self.prepare(entry) else {
            return Ok(());
        };

        match self.mode {
            DispatchMode::Detached => {
                self.spawn_detached(event);
                Ok(())
            }
            DispatchMode::Synchronous => self.send_blocking(event).map_err(Into::into),
        }
    }
}

impl<C> std::fmt::Debug for DispatchHook<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHook")
            .field("group_name", &self.shared.group_name)
            .field("stream_name", &self.shared.stream_name)
            .field("accepted", &self.accepted)
            .field("mode", &self.mode)
            .finish()
    }
}
