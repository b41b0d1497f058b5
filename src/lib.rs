//! ovo — a decentralized package manager core for native-code projects.
//!
//! This crate is the package subsystem: dependency resolution across
//! heterogeneous source types (git, archive, path, registry, vcpkg, conan,
//! system), a deterministic lockfile, content-addressed integrity hashing,
//! and a multi-source fetcher with a persistent on-disk cache. Building or
//! compiling resolved packages, running package build scripts, and
//! operating a registry server are out of scope — those live above this
//! crate.

pub mod error;
pub mod fetcher;
pub mod integrity;

pub mod core;
pub mod lockfile;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod util;

#[cfg(test)]
pub mod test_support;

pub use core::{Dependency, DependencySource, ResolutionResult, ResolvedPackage};
pub use error::{Error, Result};
pub use fetcher::{FetchError, FetchResult, Fetcher};
pub use lockfile::{Lockfile, LockfileError};
pub use manager::{ManagerConfig, PackageManager};
pub use resolver::{ResolveError, Resolver, ResolverConfig};
pub use util::context::GlobalContext;
