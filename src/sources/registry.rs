//! Registry source adapter: thin wrapper delegating version resolution and
//! metadata lookup to `crate::registry::RegistryClient`.

use std::path::Path;

use crate::core::{BuildConfig, ResolvedPackage, SourceType};
use crate::registry::{RegistryClient, RegistryError};
use crate::sources::{AdapterFetchResult, SourceContext, SourceError};

impl From<RegistryError> for SourceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NetworkError(msg) => SourceError::NetworkError(msg),
            RegistryError::PackageNotFound(name) => SourceError::SourceUnavailable(name),
            other => SourceError::CommandFailed(other.to_string()),
        }
    }
}

pub fn resolve(
    name: &str,
    version_req: &str,
    registry_url: Option<&str>,
    ctx: &SourceContext,
) -> Result<ResolvedPackage, SourceError> {
    if ctx.offline {
        return Err(SourceError::NetworkError(format!("resolving `{name}` from registry requires network access")));
    }

    let client = RegistryClient::new(registry_url.unwrap_or_else(RegistryClient::default_url));
    let version = client.resolve_version(name, version_req)?;
    let version_meta = client.get_version(name, &version)?;

    let dependencies = version_meta.dependencies.into_iter().map(|d| d.name).collect();

    Ok(
        ResolvedPackage::new(name, version, SourceType::Registry, format!("registry:{name}"))
            .with_dependencies(dependencies)
            .with_build_config(BuildConfig::default()),
    )
}

pub fn fetch(pkg: &ResolvedPackage, dest: &Path, ctx: &SourceContext) -> Result<AdapterFetchResult, SourceError> {
    // Registry-distributed archives are fetched the same way as a plain
    // archive dependency once the download URL is known.
    crate::sources::archive::fetch(
        &ResolvedPackage::new(&pkg.name, &pkg.version, SourceType::Archive, registry_download_url(pkg)),
        dest,
        ctx,
    )
    .map_err(Into::into)
}

fn registry_download_url(pkg: &ResolvedPackage) -> String {
    format!("{}/packages/{}/{}/download", RegistryClient::default_url(), pkg.name, pkg.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_resolve_fails_fast() {
        let ctx = SourceContext {
            offline: true,
            ..SourceContext::new(std::sync::Arc::new(crate::util::process::RealCommandRunner))
        };
        let err = resolve("zlib", "*", None, &ctx).unwrap_err();
        assert!(matches!(err, SourceError::NetworkError(_)));
    }

    #[test]
    fn download_url_is_canonical() {
        let pkg = ResolvedPackage::new("zlib", "1.3.1", SourceType::Registry, "registry:zlib");
        assert_eq!(
            registry_download_url(&pkg),
            format!("{}/packages/zlib/1.3.1/download", RegistryClient::default_url())
        );
    }
}
