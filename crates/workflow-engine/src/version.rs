//! Controller release comparison.

use crate::error::WorkflowError;
use std::cmp::Ordering;

/// Dotted numeric Controller release, e.g. `2.3.7.9`
///
/// Components compare numerically; a missing component counts as zero, so
/// `2.3.7` equals `2.3.7.0`.
#[derive(Debug, Clone, Eq)]
pub struct ControllerVersion(Vec<u32>);

impl ControllerVersion {
    /// Parse a release string; trailing non-numeric text in a component is ignored
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Option<Vec<u32>> = raw
            .trim()
            .split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .collect();
        parts.filter(|p| !p.is_empty()).map(Self)
    }

    fn component(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ControllerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for ControllerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ControllerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl std::fmt::Display for ControllerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Fail with `UnsupportedVersion` when `found` is below `required`
pub fn ensure_minimum(workflow: &'static str, required: &str, found: &str) -> Result<ControllerVersion, WorkflowError> {
    let unsupported = || WorkflowError::UnsupportedVersion {
        workflow,
        required: required.to_string(),
        found: found.to_string(),
    };
    let found_version = ControllerVersion::parse(found).ok_or_else(unsupported)?;
    let required_version = ControllerVersion::parse(required).ok_or_else(unsupported)?;
    if found_version < required_version {
        return Err(unsupported());
    }
    Ok(found_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> ControllerVersion {
        ControllerVersion::parse(raw).unwrap()
    }

    #[test]
    fn test_numeric_not_lexical_comparison() {
        assert!(v("2.3.10.1") > v("2.3.7.9"));
        assert!(v("2.3.7.6") < v("2.3.7.9"));
        assert_eq!(v("2.3.7"), v("2.3.7.0"));
        assert!(v("3.1.0") > v("2.3.7.9"));
    }

    #[test]
    fn test_parse_ignores_suffix() {
        assert_eq!(v("2.3.7.9-70301").to_string(), "2.3.7.9");
        assert!(ControllerVersion::parse("").is_none());
        assert!(ControllerVersion::parse("abc").is_none());
    }

    #[test]
    fn test_ensure_minimum() {
        assert!(ensure_minimum("tags", "2.3.7.9", "2.3.7.9").is_ok());
        let err = ensure_minimum("tags", "2.3.7.9", "2.3.7.6").unwrap_err();
        assert!(matches!(err, WorkflowError::UnsupportedVersion { .. }));
        assert!(err.is_fatal());
    }
}
