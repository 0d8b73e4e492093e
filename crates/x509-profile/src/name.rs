//! Subject and issuer names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The distinguished-name subset carried by certificate drafts.
///
/// Two names denote the same identity when every field matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    /// Common name (CN)
    pub common_name: String,
    /// Organization (O)
    #[serde(default)]
    pub organization: Vec<String>,
    /// Organizational unit (OU)
    #[serde(default)]
    pub organizational_unit: Vec<String>,
    /// Country (C)
    #[serde(default)]
    pub country: Vec<String>,
    /// State or province (ST)
    #[serde(default)]
    pub province: Vec<String>,
    /// Locality (L)
    #[serde(default)]
    pub locality: Vec<String>,
}

impl DistinguishedName {
    /// A name carrying only a common name.
    #[must_use]
    pub fn common_name(cn: impl Into<String>) -> Self {
        Self {
            common_name: cn.into(),
            ..Self::default()
        }
    }

    /// Whether no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.common_name.is_empty()
            && self.organization.is_empty()
            && self.organizational_unit.is_empty()
            && self.country.is_empty()
            && self.province.is_empty()
            && self.locality.is_empty()
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.common_name.is_empty() {
            parts.push(format!("CN={}", self.common_name));
        }
        let groups = [
            ("OU", &self.organizational_unit),
            ("O", &self.organization),
            ("L", &self.locality),
            ("ST", &self.province),
            ("C", &self.country),
        ];
        for (tag, values) in groups {
            parts.extend(values.iter().map(|v| format!("{tag}={v}")));
        }
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_name_only() {
        let name = DistinguishedName::common_name("svc");
        assert_eq!(name.to_string(), "CN=svc");
        assert!(!name.is_empty());
        assert!(DistinguishedName::default().is_empty());
    }

    #[test]
    fn test_display_order() {
        let name = DistinguishedName {
            common_name: "Test CA".to_string(),
            organization: vec!["i1.is".to_string()],
            country: vec!["IS".to_string()],
            ..DistinguishedName::default()
        };
        assert_eq!(name.to_string(), "CN=Test CA,O=i1.is,C=IS");
    }
}
