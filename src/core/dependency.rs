//! `Dependency`: a declared requirement as parsed from a manifest or a
//! dependency string (see `manager::depstring`).

use serde::{Deserialize, Serialize};

use crate::util::InternedString;

/// A tagged source specification. Mirrors the six source-adapter kinds plus
/// path, each carrying only the fields that kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencySource {
    Git {
        url: String,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
        #[serde(default)]
        subdir: Option<String>,
        #[serde(default)]
        submodules: bool,
        #[serde(default)]
        auth_token: Option<String>,
    },
    Archive {
        url: String,
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        strip_prefix: Option<String>,
    },
    Path {
        path: String,
    },
    Registry {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        registry_url: Option<String>,
    },
    Vcpkg {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        features: Vec<String>,
        #[serde(default)]
        triplet: Option<String>,
    },
    Conan {
        reference: String,
        #[serde(default)]
        options: Vec<String>,
    },
    System {
        #[serde(default)]
        pkg_config_name: Option<String>,
        #[serde(default)]
        include_paths: Vec<String>,
        #[serde(default)]
        library_paths: Vec<String>,
        #[serde(default)]
        libraries: Vec<String>,
    },
}

impl DependencySource {
    pub fn kind_str(&self) -> &'static str {
        match self {
            DependencySource::Git { .. } => "git",
            DependencySource::Archive { .. } => "archive",
            DependencySource::Path { .. } => "path",
            DependencySource::Registry { .. } => "registry",
            DependencySource::Vcpkg { .. } => "vcpkg",
            DependencySource::Conan { .. } => "conan",
            DependencySource::System { .. } => "system",
        }
    }

    /// Whether resolving this source requires network access.
    pub fn needs_network(&self) -> bool {
        matches!(
            self,
            DependencySource::Git { .. }
                | DependencySource::Archive { .. }
                | DependencySource::Registry { .. }
        )
    }
}

/// An OS/architecture/libc platform constraint. All fields are optional and
/// AND-matched; an unspecified field on either side acts as a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConstraint {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub libc: Option<String>,
}

impl PlatformConstraint {
    pub fn matches(&self, other: &PlatformConstraint) -> bool {
        field_matches(&self.os, &other.os)
            && field_matches(&self.arch, &other.arch)
            && field_matches(&self.libc, &other.libc)
    }
}

fn field_matches(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

/// A declared dependency requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: InternedString,
    /// A semver range, a tag, a branch, a commit id, or `*`.
    pub version_req: String,
    pub source: DependencySource,
    pub optional: bool,
    pub build_only: bool,
    pub dev_only: bool,
    pub platforms: Vec<PlatformConstraint>,
    pub fallbacks: Vec<DependencySource>,
}

impl Dependency {
    pub fn new(name: impl Into<InternedString>, source: DependencySource) -> Self {
        Dependency {
            name: name.into(),
            version_req: "*".to_string(),
            source,
            optional: false,
            build_only: false,
            dev_only: false,
            platforms: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_version_req(mut self, req: impl Into<String>) -> Self {
        self.version_req = req.into();
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<DependencySource>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Whether this dependency should be considered under the given target
    /// platform. Wildcard (no constraints, or no target configured) always
    /// matches.
    pub fn matches_platform(&self, target: Option<&PlatformConstraint>) -> bool {
        if self.platforms.is_empty() {
            return true;
        }
        let Some(target) = target else {
            return true;
        };
        self.platforms.iter().any(|p| p.matches(target))
    }
}
