//! Local operation engine for fileprovider.
//!
//! [`LocalEngine`] implements the [`FileProvider`](fileprovider_core::FileProvider)
//! and [`FileProviderMonitor`](fileprovider_core::FileProviderMonitor) contracts
//! on top of a directory on local disk:
//!
//! - reads run concurrently on Tokio's blocking pool, bounded by a semaphore
//! - mutations run one at a time, in the order they were requested
//! - completion callbacks run one at a time on a single completion context,
//!   each followed by an [`OperationEvent`] broadcast
//!
//! Recursive copy, move, remove and link consult an optional
//! [`ConflictResolver`] for every item.

mod conflict;
mod content;
mod copy;
mod create;
mod dispatch;
mod engine;
mod handle;
mod link;
mod listing;
mod move_op;
mod remove;
mod scheduler;

pub use conflict::{ConflictResolver, ContinueOnError};
pub use create::validate_filename;
pub use dispatch::{CompletionContext, CompletionJob, OperationEvent, SerialContext};
pub use engine::LocalEngine;
pub use handle::LocalOperationHandle;
