//! Resolver error taxonomy, with `to_diagnostic` building an actionable
//! message the way `util::diagnostic` does for the rest of the crate.

use thiserror::Error;

use crate::sources::SourceError;
use crate::util::diagnostic::{suggestions, Diagnostic};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cyclic dependency detected: {0} depends on itself transitively")]
    CyclicDependency(String),

    #[error("version conflict for `{package}`: already resolved to {existing}, but also requires {requested}")]
    VersionConflict {
        package: String,
        existing: String,
        requested: String,
    },

    #[error("no version of `{package}` satisfies requirement `{requirement}`")]
    VersionNotFound { package: String, requirement: String },

    #[error("package `{0}` could not be found in any source")]
    PackageNotFound(String),

    /// Preserves the source adapter's own error kind (hash mismatch,
    /// symlink loop, missing vcpkg/conan/pkg-config, auth failure, ...)
    /// instead of collapsing every non-network adapter failure into
    /// `PackageNotFound`.
    #[error("resolving `{package}` failed: {source}")]
    SourceFailed {
        package: String,
        #[source]
        source: SourceError,
    },

    #[error("`{package}` is not available on the current platform")]
    PlatformMismatch { package: String },

    #[error("all sources for `{package}` failed; last error: {last_error}")]
    AllFallbacksFailed { package: String, last_error: String },

    #[error("resolving `{package}` requires network access, but offline mode is enabled")]
    NetworkError { package: String },
}

impl ResolveError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::CyclicDependency(pkg) => Diagnostic::error(format!(
                "cyclic dependency detected involving `{pkg}`"
            ))
            .with_context(format!("`{pkg}` was already being resolved when it was requested again"))
            .with_suggestion("Break the cycle by removing one of the circular dependency edges"),

            ResolveError::VersionConflict {
                package,
                existing,
                requested,
            } => Diagnostic::error(format!("version conflict for `{package}`"))
                .with_context(format!("already resolved to {existing}"))
                .with_context(format!("also required as {requested}"))
                .with_suggestion("Align the conflicting requirements or vendor one copy"),

            ResolveError::VersionNotFound { package, requirement } => {
                Diagnostic::error(format!("no version of `{package}` satisfies `{requirement}`"))
                    .with_suggestion(suggestions::MISSING_DEPENDENCY)
            }

            ResolveError::PackageNotFound(pkg) => {
                Diagnostic::error(format!("could not find `{pkg}` in any source"))
                    .with_suggestion(suggestions::PACKAGE_NOT_FOUND)
            }

            ResolveError::SourceFailed { package, source } => {
                Diagnostic::error(format!("resolving `{package}` failed"))
                    .with_context(source.to_string())
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            ResolveError::PlatformMismatch { package } => {
                Diagnostic::warning(format!("`{package}` skipped: not available on this platform"))
            }

            ResolveError::AllFallbacksFailed { package, last_error } => {
                Diagnostic::error(format!("could not resolve `{package}` from any configured source"))
                    .with_context(format!("last error: {last_error}"))
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            ResolveError::NetworkError { package } => {
                Diagnostic::error(format!("`{package}` requires network access while offline"))
                    .with_suggestion("Disable offline mode, or ensure a lockfile entry exists")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_diagnostic_mentions_package() {
        let err = ResolveError::CyclicDependency("a".to_string());
        let diag = err.to_diagnostic();
        assert!(diag.format(false).contains("`a`"));
    }
}
