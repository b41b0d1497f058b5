//! Top-level error type composing every component's error taxonomy.
//!
//! Each component (integrity, sources, fetcher, lockfile, registry, resolver,
//! manager) declares its own small `thiserror` enum. This module wraps them
//! into one inspectable type so callers can match on `Error::Resolve(..)`
//! etc. without losing the component-level kind.

use std::path::PathBuf;

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::integrity::IntegrityError;
use crate::lockfile::LockfileError;
use crate::manager::ManagerError;
use crate::registry::RegistryError;
use crate::resolver::ResolveError;
use crate::sources::SourceError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("access denied: {0}")]
    AccessDenied(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
