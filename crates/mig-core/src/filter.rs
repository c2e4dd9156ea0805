//! Include/exclude name filtering

use regex::Regex;

/// Regex name filter
///
/// Patterns match anywhere in the name (use `^`/`$` to anchor). A name is
/// allowed when it matches `include` (if set) and does not match `exclude`.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl NameFilter {
    /// Compile a filter
    ///
    /// # Errors
    /// Returns the regex error for an invalid pattern.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    /// Check a name
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(name) {
                return false;
            }
        }
        !self.exclude.as_ref().is_some_and(|exclude| exclude.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_then_exclude() {
        let filter = NameFilter::new(Some("^(Prod|Infra)-"), Some("legacy")).unwrap();
        assert!(filter.allows("Prod-web"));
        assert!(!filter.allows("Dev-web"));
        assert!(!filter.allows("Infra-legacy-db"));
    }

    #[test]
    fn empty_filter_allows_everything() {
        assert!(NameFilter::default().allows("anything"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(NameFilter::new(Some("(unclosed"), None).is_err());
    }
}
