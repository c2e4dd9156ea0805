//! Key normalization
//!
//! Every function here is pure and total: no I/O, no errors, and applying
//! it twice gives the same result as applying it once.

use crate::key::{NaturalKey, RawKey};
use url::Url;

/// Upper bound on re-normalization passes (stripping a suffix can turn an
/// unparseable string into a parseable URL once)
const MAX_PASSES: usize = 4;

/// Canonicalise a raw key
#[must_use]
pub fn normalize(raw: &RawKey) -> NaturalKey {
    match raw {
        RawKey::Scm { url, branch } => NaturalKey::Scm {
            url: normalize_url(url),
            branch: normalize_branch(branch.as_deref()),
        },
        RawKey::Named { name, scope } => NaturalKey::Named {
            name: normalize_name(name),
            scope: scope.as_deref().map(normalize_name).unwrap_or_default(),
        },
    }
}

/// Canonicalise a repository URL for comparison
///
/// - scheme and host are lower-cased, path case is preserved
/// - default ports (80 for http, 443 for https) are dropped
/// - user-info, query and fragment are dropped
/// - trailing `.git` and trailing slashes are stripped
///
/// Strings that are not host-bearing URLs (scp-like `git@host:org/repo.git`,
/// local paths) are only trimmed and suffix-stripped.
///
/// # Examples
/// - `https://GIT.example.com:443/Org/Repo.git/` → `https://git.example.com/Org/Repo`
/// - `git@github.com:org/repo.git` → `git@github.com:org/repo`
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let mut current = canonical_url(raw.trim());
    for _ in 0..MAX_PASSES {
        let next = canonical_url(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Canonicalise a display name (surrounding whitespace is not significant)
#[inline]
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Canonicalise an optional branch; absent and blank both become `""`
#[inline]
#[must_use]
pub fn normalize_branch(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

fn canonical_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return strip_suffixes(raw).to_string(),
    };
    let Some(host) = parsed.host_str() else {
        return strip_suffixes(raw).to_string();
    };

    let scheme = parsed.scheme().to_ascii_lowercase();
    let mut out = format!("{scheme}://{}", host.to_ascii_lowercase());
    if let Some(port) = parsed.port() {
        if !is_default_port(&scheme, port) {
            out.push(':');
            out.push_str(&port.to_string());
        }
    }
    out.push_str(strip_suffixes(parsed.path()));
    out
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

/// Strip trailing slashes and `.git` until neither remains
fn strip_suffixes(mut path: &str) -> &str {
    loop {
        let trimmed = path.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        if trimmed.len() == path.len() {
            return trimmed;
        }
        path = trimmed;
    }
}
