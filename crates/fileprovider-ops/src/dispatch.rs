//! Completion delivery and event broadcast.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use fileprovider_core::{Completion, OperationError, OperationHandle, OperationKind, ProviderError};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error};

use crate::handle::LocalOperationHandle;

/// A unit of work run on the completion context.
pub type CompletionJob = Box<dyn FnOnce() + Send + 'static>;

/// Where completion callbacks and event broadcasts run.
///
/// Implementations must run jobs one at a time, in submission order.
pub trait CompletionContext: Send + Sync {
    fn execute(&self, job: CompletionJob);
}

/// Runs completion jobs one by one on a single Tokio task.
///
/// A panicking callback is logged and does not stop later jobs.
pub struct SerialContext {
    tx: mpsc::UnboundedSender<CompletionJob>,
}

impl SerialContext {
    /// Spawn the dispatcher task on `runtime`.
    pub fn new(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CompletionJob>();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("Completion callback panicked");
                }
            }
        });
        Self { tx }
    }
}

impl CompletionContext for SerialContext {
    fn execute(&self, job: CompletionJob) {
        if self.tx.send(job).is_err() {
            debug!("Completion context is gone, dropping job");
        }
    }
}

/// Broadcast after every completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationEvent {
    Succeeded {
        operation: OperationKind,
    },
    Failed {
        operation: OperationKind,
        error: OperationError,
    },
}

impl OperationEvent {
    pub fn operation(&self) -> &OperationKind {
        match self {
            Self::Succeeded { operation } | Self::Failed { operation, .. } => operation,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Routes outcomes to their callbacks and to event subscribers.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    context: Arc<dyn CompletionContext>,
    events: broadcast::Sender<OperationEvent>,
}

impl Dispatcher {
    pub fn new(context: Arc<dyn CompletionContext>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { context, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.events.subscribe()
    }

    /// Report `outcome` for the operation behind `handle`.
    pub fn deliver<T: Send + 'static>(
        &self,
        handle: LocalOperationHandle,
        outcome: Result<T, ProviderError>,
        completion: Completion<T>,
    ) {
        let events = self.events.clone();
        self.context.execute(Box::new(move || {
            handle.finish();

            let operation = handle.operation().clone();
            let event = match &outcome {
                Ok(_) => {
                    debug!(%operation, "Operation succeeded");
                    OperationEvent::Succeeded { operation }
                }
                Err(err) => {
                    debug!(%operation, %err, "Operation failed");
                    OperationEvent::Failed {
                        operation,
                        error: OperationError::from(err),
                    }
                }
            };

            completion(outcome);
            // No subscribers is fine
            let _ = events.send(event);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_event_serde() {
        let event = OperationEvent::Failed {
            operation: OperationKind::remove("/a"),
            error: OperationError::new(PathBuf::from("/a"), "gone"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"outcome\":\"failed\""));

        let back: OperationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(!back.is_success());
        assert_eq!(back.operation(), &OperationKind::remove("/a"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_serial_context_survives_panics() {
        let context = SerialContext::new(&Handle::current());
        let (tx, rx) = tokio::sync::oneshot::channel();

        context.execute(Box::new(|| panic!("callback bug")));
        context.execute(Box::new(move || {
            let _ = tx.send(42);
        }));

        assert_eq!(rx.await.unwrap(), 42);
    }
}
