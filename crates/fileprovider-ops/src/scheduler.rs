//! Concurrent read queue and serial write queue.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use fileprovider_core::{Completion, OperationKind, ProviderError};
use fileprovider_scan::ProgressEstimator;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::handle::{LocalOperationHandle, ProgressPaths};

type WriteJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Schedules filesystem work and reports outcomes.
///
/// Reads run on the blocking pool, at most `read_permits` at a time, in no
/// particular order. Mutations run one after another in submission order.
pub(crate) struct OperationScheduler {
    runtime: Handle,
    read_permits: Arc<Semaphore>,
    write_tx: mpsc::UnboundedSender<WriteJob>,
    dispatcher: Dispatcher,
    root: PathBuf,
    estimator: Arc<ProgressEstimator>,
}

impl OperationScheduler {
    pub fn new(
        runtime: Handle,
        read_permits: usize,
        dispatcher: Dispatcher,
        root: PathBuf,
        estimator: Arc<ProgressEstimator>,
    ) -> Self {
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<WriteJob>();
        runtime.spawn(async move {
            while let Some(job) = write_rx.recv().await {
                job.await;
            }
            debug!("Write queue closed");
        });

        Self {
            runtime,
            read_permits: Arc::new(Semaphore::new(read_permits.max(1))),
            write_tx,
            dispatcher,
            root,
            estimator,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Queue `work` and return its handle right away.
    ///
    /// The queue is chosen by [`OperationKind::is_mutation`].
    pub fn enqueue<T, F>(
        &self,
        operation: OperationKind,
        progress: ProgressPaths,
        work: F,
        completion: Completion<T>,
    ) -> LocalOperationHandle
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
    {
        let mutation = operation.is_mutation();
        let handle = LocalOperationHandle::new(
            operation,
            self.root.clone(),
            progress,
            Arc::clone(&self.estimator),
        );
        let reported = handle.clone();
        let dispatcher = self.dispatcher.clone();

        if mutation {
            let job: WriteJob = Box::pin(async move {
                let outcome = run_blocking(work).await;
                dispatcher.deliver(reported, outcome, completion);
            });
            if self.write_tx.send(job).is_err() {
                warn!("Write queue is gone, operation dropped");
            }
        } else {
            let permits = Arc::clone(&self.read_permits);
            self.runtime.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => run_blocking(work).await,
                    Err(_) => Err(ProviderError::Interrupted),
                };
                dispatcher.deliver(reported, outcome, completion);
            });
        }

        handle
    }

    /// Report `error` for an operation that never reached the filesystem.
    ///
    /// Still goes through the queue so mutations keep their order.
    pub fn reject<T: Send + 'static>(
        &self,
        operation: OperationKind,
        error: ProviderError,
        completion: Completion<T>,
    ) -> LocalOperationHandle {
        self.enqueue(operation, ProgressPaths::none(), move || Err(error), completion)
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.unwrap_or_else(|err| {
        warn!(%err, "Worker did not finish");
        Err(ProviderError::Interrupted)
    })
}
