//! Object identifiers used by the default templates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProfileError;

/// All Issuance Policies (2.5.29.32.0)
pub const ANY_POLICY: &[u64] = &[2, 5, 29, 32, 0];
/// Certificate issued in compliance with the Extended Validation Guidelines (2.23.140.1.1)
pub const EV_GUIDELINES: &[u64] = &[2, 23, 140, 1, 1];
/// EV Code Signing certificate issued under the Code Signing Baseline Requirements (2.23.140.1.3)
pub const EV_CODE_SIGNING: &[u64] = &[2, 23, 140, 1, 3];

/// Smart Card Logon (1.3.6.1.4.1.311.20.2.2)
pub const SMART_CARD_LOGON: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 20, 2, 2];
/// Document Signing (1.3.6.1.4.1.311.10.3.12)
pub const DOCUMENT_SIGNING: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 10, 3, 12];
/// Document Encryption (1.3.6.1.4.1.311.80.1)
pub const DOCUMENT_ENCRYPTION: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 80, 1];

/// Extensions the signer derives from draft fields.
pub(crate) const SUBJECT_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 14];
pub(crate) const KEY_USAGE: &[u64] = &[2, 5, 29, 15];
pub(crate) const SUBJECT_ALT_NAME: &[u64] = &[2, 5, 29, 17];
pub(crate) const BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];
pub(crate) const CERTIFICATE_POLICIES: &[u64] = &[2, 5, 29, 32];
pub(crate) const AUTHORITY_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 35];
pub(crate) const EXTENDED_KEY_USAGE: &[u64] = &[2, 5, 29, 37];

/// An ASN.1 object identifier, kept as its arc list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(Vec<u64>);

impl Oid {
    /// Build an identifier from its arcs.
    ///
    /// # Errors
    ///
    /// Fails when fewer than two arcs are given or the leading arcs are out of range.
    pub fn new(arcs: impl Into<Vec<u64>>) -> Result<Self, ProfileError> {
        let arcs = arcs.into();
        if arcs.len() < 2 {
            return Err(ProfileError::Config(format!(
                "object identifier needs at least two arcs: {arcs:?}"
            )));
        }
        if arcs[0] > 2 || (arcs[0] < 2 && arcs[1] > 39) {
            return Err(ProfileError::Config(format!(
                "object identifier has invalid leading arcs: {arcs:?}"
            )));
        }
        Ok(Self(arcs))
    }

    pub(crate) fn from_static(arcs: &[u64]) -> Self {
        Self(arcs.to_vec())
    }

    /// The arc list.
    #[must_use]
    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// Whether this identifier equals the given arcs.
    #[must_use]
    pub fn is(&self, arcs: &[u64]) -> bool {
        self.0 == arcs
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&dotted.join("."))
    }
}

impl FromStr for Oid {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim()
            .split('.')
            .map(|arc| {
                arc.parse::<u64>().map_err(|_| {
                    ProfileError::Config(format!("invalid object identifier: {s}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(arcs)
    }
}

impl TryFrom<String> for Oid {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let oid: Oid = "1.3.6.1.4.1.311.20.2.2".parse().unwrap();
        assert_eq!(oid.arcs(), SMART_CARD_LOGON);
        assert_eq!(oid.to_string(), "1.3.6.1.4.1.311.20.2.2");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<Oid>().is_err());
        assert!("1".parse::<Oid>().is_err());
        assert!("1.x.3".parse::<Oid>().is_err());
        assert!("3.1".parse::<Oid>().is_err());
        assert!("1.40".parse::<Oid>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let oid = Oid::from_static(ANY_POLICY);
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, "\"2.5.29.32.0\"");
        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
    }
}
