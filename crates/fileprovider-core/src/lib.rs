//! Core types and traits for fileprovider.
//!
//! This crate provides the contract shared by every storage backend: the
//! operation kinds, file descriptions, errors, configuration and the
//! [`FileProvider`] / [`FileProviderMonitor`] traits.

mod config;
mod error;
mod object;
mod operation;
mod path;
mod provider;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{OperationError, ProviderError};
pub use object::{FileKind, FileObject, Timestamps};
pub use operation::OperationKind;
pub use path::PathResolver;
pub use provider::{
    ChangeHandler, Completion, FileProvider, FileProviderMonitor, FoundHandler, OperationHandle,
    SearchPredicate,
};
