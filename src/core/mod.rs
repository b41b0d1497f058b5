//! Core data types shared across the resolver, fetcher, and lockfile:
//! `Dependency` (a declared requirement), `ResolvedPackage` (an exact
//! resolution), and the thin `Manifest` stand-in the core consumes.

pub mod dependency;
pub mod manifest;
pub mod package;

pub use dependency::{Dependency, DependencySource, PlatformConstraint};
pub use manifest::Manifest;
pub use package::{BuildConfig, ResolutionResult, ResolveStats, ResolvedPackage, SourceType};
