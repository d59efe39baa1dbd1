//! Long-running operation poller
//!
//! Turns an asynchronous provider operation into a synchronous result. Every
//! provider request and every sleep goes through the poller so a single
//! `CancellationToken` can abort the whole run.

use crate::backoff::ExponentialBackoff;
use crate::error::ControllerError;
use gcp_client::{
    ComputeOperation, ComputeOperationStatus, ContainerOperation, ContainerOperationStatus, GcpError,
    LongRunningOperation,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Poll timing for long-running operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay before the first status lookup
    pub initial_interval: Duration,
    /// Upper bound for the delay between lookups
    pub max_interval: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Give up (and leave the operation running) after this long
    pub max_elapsed: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            multiplier: 2,
            max_elapsed: Duration::from_secs(45 * 60),
        }
    }
}

/// A provider operation handle that can be polled to a terminal state
pub trait PollableOperation {
    /// Operation name as issued by the provider
    fn operation_name(&self) -> &str;
    /// True once the provider reports a terminal state
    fn is_done(&self) -> bool;
    /// Error reported by a finished operation, if any
    fn error_message(&self) -> Option<String>;
}

impl PollableOperation for ComputeOperation {
    fn operation_name(&self) -> &str {
        &self.name
    }

    fn is_done(&self) -> bool {
        self.status == ComputeOperationStatus::Done
    }

    fn error_message(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.errors.is_empty()) {
            let messages: Vec<&str> = error.errors.iter().map(|e| e.message.as_str()).collect();
            return Some(messages.join("; "));
        }
        self.http_error_message.clone()
    }
}

impl PollableOperation for ContainerOperation {
    fn operation_name(&self) -> &str {
        &self.name
    }

    fn is_done(&self) -> bool {
        self.status == ContainerOperationStatus::Done
    }

    fn error_message(&self) -> Option<String> {
        match &self.error {
            Some(status) => Some(status.message.clone()),
            None => self.status_message.clone().filter(|m| !m.is_empty()),
        }
    }
}

impl PollableOperation for LongRunningOperation {
    fn operation_name(&self) -> &str {
        &self.name
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|status| status.message.clone())
    }
}

/// Waits on provider operations, honouring cancellation
#[derive(Debug, Clone)]
pub struct OperationPoller {
    settings: PollSettings,
    cancel: CancellationToken,
}

impl OperationPoller {
    pub fn new(settings: PollSettings, cancel: CancellationToken) -> Self {
        Self { settings, cancel }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    async fn cancellable<T>(&self, future: impl Future<Output = T>) -> Result<T, ControllerError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            value = future => Ok(value),
        }
    }

    /// Run a single provider request
    ///
    /// A 404 here means something the request depends on is missing and
    /// becomes `PreconditionFailed`; everything else is `Transient`.
    pub async fn request<T>(
        &self,
        request: impl Future<Output = Result<T, GcpError>>,
    ) -> Result<T, ControllerError> {
        Ok(self.cancellable(request).await??)
    }

    /// Look a resource up, keeping `NotFound` for existence checks
    pub async fn lookup<T>(
        &self,
        request: impl Future<Output = Result<T, GcpError>>,
    ) -> Result<T, ControllerError> {
        self.cancellable(request).await?.map_err(ControllerError::from_lookup)
    }

    /// Sleep unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), ControllerError> {
        self.cancellable(tokio::time::sleep(duration)).await
    }

    /// Poll `operation` until it is done
    ///
    /// `fetch` looks up the current status. A failed lookup aborts the wait
    /// with `Transient`, even when the provider answered 404. A finished
    /// operation carrying an error becomes `OperationFailed`.
    pub async fn wait<Op, F, Fut>(&self, operation: Op, mut fetch: F) -> Result<Op, ControllerError>
    where
        Op: PollableOperation,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Op, GcpError>>,
    {
        let started = Instant::now();
        let mut backoff = ExponentialBackoff::new(
            self.settings.initial_interval,
            self.settings.max_interval,
            self.settings.multiplier,
        );
        let mut current = operation;

        loop {
            if current.is_done() {
                return match current.error_message() {
                    Some(message) => Err(ControllerError::OperationFailed {
                        operation: current.operation_name().to_string(),
                        message,
                    }),
                    None => {
                        debug!("Operation {} done after {:?}", current.operation_name(), started.elapsed());
                        Ok(current)
                    }
                };
            }

            let delay = backoff.next_backoff();
            let waited = started.elapsed();
            if waited + delay > self.settings.max_elapsed {
                warn!(
                    "Giving up on operation {} after {:?}; it is left running on the provider side",
                    current.operation_name(),
                    waited
                );
                return Err(ControllerError::Timeout {
                    operation: current.operation_name().to_string(),
                    waited,
                });
            }

            debug!("Operation {} still running, next poll in {:?}", current.operation_name(), delay);
            self.sleep(delay).await?;
            current = self.cancellable(fetch()).await?.map_err(ControllerError::Transient)?;
        }
    }
}
