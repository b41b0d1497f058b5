//! Hand-rolled version compatibility for the resolver.
//!
//! Deliberately does not delegate to `semver::VersionReq`: resolver versions
//! may be tags, branches, or commit ids, not only valid SemVer strings.
//! `crate::registry` reuses `matches` below for its own `^`/`~` requirement
//! resolution rather than duplicating the logic.

/// Whether `version` satisfies `requirement` under the resolver's three
/// constraint forms: exact, `*`, caret (`^`), and tilde (`~`).
pub fn matches(requirement: &str, version: &str) -> bool {
    if requirement == "*" {
        return true;
    }
    if let Some(rest) = requirement.strip_prefix('^') {
        return caret_matches(rest, version);
    }
    if let Some(rest) = requirement.strip_prefix('~') {
        return tilde_matches(rest, version);
    }
    requirement == version
}

#[derive(Debug, Clone, Copy, Default)]
struct PartialVersion {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
}

fn parse_partial(s: &str) -> Option<PartialVersion> {
    let mut parts = s.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok());
    let patch = parts.next().and_then(|p| p.parse().ok());
    Some(PartialVersion { major, minor, patch })
}

/// Parses a full `major.minor.patch` version; returns `None` (never
/// matches) if `version` is not a plain dotted numeric version — e.g. a
/// branch name or commit hash, which only satisfies an exact or `*`
/// requirement.
fn parse_full(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

fn caret_matches(constraint: &str, version: &str) -> bool {
    let Some(c) = parse_partial(constraint) else {
        return false;
    };
    let Some((vmaj, vmin, vpat)) = parse_full(version) else {
        return false;
    };
    if vmaj != c.major {
        return false;
    }
    let cmin = c.minor.unwrap_or(0);
    let cpat = c.patch.unwrap_or(0);
    if c.minor.is_none() {
        return true;
    }
    vmin > cmin || (vmin == cmin && vpat >= cpat)
}

fn tilde_matches(constraint: &str, version: &str) -> bool {
    let Some(c) = parse_partial(constraint) else {
        return false;
    };
    let Some((vmaj, vmin, vpat)) = parse_full(version) else {
        return false;
    };
    if vmaj != c.major {
        return false;
    }
    let Some(cmin) = c.minor else {
        return true;
    };
    if vmin != cmin {
        return false;
    }
    let cpat = c.patch.unwrap_or(0);
    vpat >= cpat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_anything() {
        assert!(matches("*", "1.2.3"));
        assert!(matches("*", "main"));
    }

    #[test]
    fn exact_requires_equality() {
        assert!(matches("v1.0.0", "v1.0.0"));
        assert!(!matches("v1.0.0", "v1.0.1"));
    }

    #[test]
    fn caret_matches_same_major_gte_minor_patch() {
        assert!(matches("^1.2.3", "1.2.3"));
        assert!(matches("^1.2.3", "1.2.4"));
        assert!(matches("^1.2.3", "1.3.0"));
        assert!(!matches("^1.2.3", "2.0.0"));
        assert!(!matches("^1.2.3", "1.2.2"));
    }

    #[test]
    fn tilde_matches_same_major_minor_gte_patch() {
        assert!(matches("~1.2.3", "1.2.3"));
        assert!(matches("~1.2.3", "1.2.4"));
        assert!(!matches("~1.2.3", "1.3.0"));
        assert!(!matches("~1.2.3", "2.0.0"));
    }

    #[test]
    fn caret_with_partial_constraint_defaults_trailing_to_zero() {
        assert!(matches("^1", "1.9.9"));
        assert!(!matches("^1", "2.0.0"));
        assert!(matches("^1.2", "1.2.0"));
        assert!(matches("^1.2", "1.5.0"));
    }

    #[test]
    fn non_numeric_version_only_satisfies_exact_or_wildcard() {
        assert!(matches("*", "main"));
        assert!(matches("main", "main"));
        assert!(!matches("^1.0.0", "main"));
    }
}
