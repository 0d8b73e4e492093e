//! Profile configuration: validity defaults and the per-role OID tables.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::oid::{self, Oid};
use crate::{KeyAlgorithm, ProfileError, Result, Role};

/// Default validity of a root certificate (10 years).
pub const DEFAULT_ROOT_VALIDITY_DAYS: i64 = 365 * 10;
/// Default validity of an intermediate certificate (10 years).
pub const DEFAULT_INTERMEDIATE_VALIDITY_DAYS: i64 = 365 * 10;
/// Default validity of a leaf certificate (24 hours).
pub const DEFAULT_LEAF_VALIDITY_HOURS: i64 = 24;
/// Longest validity any preset may ask for (100 years).
pub const MAX_VALIDITY_DAYS: i64 = 365 * 100;

/// Configuration shared by every profile a factory builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Validity presets per role.
    #[serde(default)]
    pub validity: ValidityConfig,

    /// Algorithm used when a profile needs a freshly generated key.
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,

    /// Object identifier tables.
    #[serde(default)]
    pub oids: OidTables,
}

/// Validity presets per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityConfig {
    /// Root certificate validity in days.
    #[serde(default = "default_root_days")]
    pub root_days: i64,

    /// Intermediate certificate validity in days.
    #[serde(default = "default_intermediate_days")]
    pub intermediate_days: i64,

    /// Leaf certificate validity in hours.
    #[serde(default = "default_leaf_hours")]
    pub leaf_hours: i64,
}

/// Object identifiers the templates stamp into drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidTables {
    /// Vendor extended key usages added to every role.
    #[serde(default = "default_vendor_ext_key_usage")]
    pub vendor_ext_key_usage: Vec<Oid>,

    /// Policy identifiers for intermediate certificates.
    #[serde(default = "default_policies")]
    pub intermediate_policies: Vec<Oid>,

    /// Policy identifiers for leaf certificates.
    #[serde(default = "default_policies")]
    pub leaf_policies: Vec<Oid>,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            root_days: default_root_days(),
            intermediate_days: default_intermediate_days(),
            leaf_hours: default_leaf_hours(),
        }
    }
}

impl Default for OidTables {
    fn default() -> Self {
        Self {
            vendor_ext_key_usage: default_vendor_ext_key_usage(),
            intermediate_policies: default_policies(),
            leaf_policies: default_policies(),
        }
    }
}

impl ProfileConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ProfileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject validity presets that are non-positive or beyond
    /// [`MAX_VALIDITY_DAYS`].
    pub fn validate(&self) -> Result<()> {
        let presets = [
            ("root_days", self.validity.root_days, MAX_VALIDITY_DAYS),
            ("intermediate_days", self.validity.intermediate_days, MAX_VALIDITY_DAYS),
            ("leaf_hours", self.validity.leaf_hours, MAX_VALIDITY_DAYS * 24),
        ];
        for (field, value, max) in presets {
            if value <= 0 {
                return Err(ProfileError::Config(format!(
                    "validity.{field} must be positive, got {value}"
                )));
            }
            if value > max {
                return Err(ProfileError::Config(format!(
                    "validity.{field} must be at most {max}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Default validity for `role`.
    ///
    /// Saturates at [`Duration::MAX`] for presets [`Self::validate`] would
    /// reject.
    #[must_use]
    pub fn default_duration(&self, role: Role) -> Duration {
        let duration = match role {
            Role::Root => Duration::try_days(self.validity.root_days),
            Role::Intermediate => Duration::try_days(self.validity.intermediate_days),
            Role::Leaf => Duration::try_hours(self.validity.leaf_hours),
        };
        duration.unwrap_or(Duration::MAX)
    }

    /// Policy identifiers stamped on drafts of `role`.
    #[must_use]
    pub fn policies(&self, role: Role) -> &[Oid] {
        match role {
            Role::Root => &[],
            Role::Intermediate => &self.oids.intermediate_policies,
            Role::Leaf => &self.oids.leaf_policies,
        }
    }
}

// Default value functions for serde.
const fn default_root_days() -> i64 {
    DEFAULT_ROOT_VALIDITY_DAYS
}

const fn default_intermediate_days() -> i64 {
    DEFAULT_INTERMEDIATE_VALIDITY_DAYS
}

const fn default_leaf_hours() -> i64 {
    DEFAULT_LEAF_VALIDITY_HOURS
}

fn default_vendor_ext_key_usage() -> Vec<Oid> {
    [
        oid::SMART_CARD_LOGON,
        oid::DOCUMENT_SIGNING,
        oid::DOCUMENT_ENCRYPTION,
    ]
    .into_iter()
    .map(Oid::from_static)
    .collect()
}

fn default_policies() -> Vec<Oid> {
    [oid::ANY_POLICY, oid::EV_GUIDELINES, oid::EV_CODE_SIGNING]
        .into_iter()
        .map(Oid::from_static)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProfileConfig::default();
        assert_eq!(config.default_duration(Role::Root), Duration::days(3650));
        assert_eq!(config.default_duration(Role::Intermediate), Duration::days(3650));
        assert_eq!(config.default_duration(Role::Leaf), Duration::hours(24));
        assert_eq!(config.key_algorithm, KeyAlgorithm::EcdsaP256);
        assert_eq!(config.oids.vendor_ext_key_usage.len(), 3);
        assert!(config.policies(Role::Root).is_empty());
        assert_eq!(config.policies(Role::Leaf)[0].to_string(), "2.5.29.32.0");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ProfileConfig::from_toml_str(
            r#"
            key_algorithm = "ed25519"

            [validity]
            leaf_hours = 72

            [oids]
            leaf_policies = ["2.5.29.32.0"]
            "#,
        )
        .unwrap();
        assert_eq!(config.key_algorithm, KeyAlgorithm::Ed25519);
        assert_eq!(config.validity.leaf_hours, 72);
        assert_eq!(config.validity.root_days, DEFAULT_ROOT_VALIDITY_DAYS);
        assert_eq!(config.oids.leaf_policies.len(), 1);
        assert_eq!(config.oids.intermediate_policies.len(), 3);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ProfileConfig::from_toml_str("[validity]\nleaf_hours = 0\n").is_err());
        assert!(ProfileConfig::from_toml_str("[oids]\nleaf_policies = [\"bogus\"]\n").is_err());
    }

    #[test]
    fn test_rejects_oversized_validity() {
        let err = ProfileConfig::from_toml_str("[validity]\nroot_days = 9223372036854775807\n")
            .unwrap_err();
        assert!(matches!(err, ProfileError::Config(msg) if msg.contains("root_days")));
        assert!(ProfileConfig::from_toml_str("[validity]\nleaf_hours = 876001\n").is_err());
        assert!(ProfileConfig::from_toml_str("[validity]\nintermediate_days = 36500\n").is_ok());
    }

    #[test]
    fn test_default_duration_saturates() {
        let mut config = ProfileConfig::default();
        config.validity.root_days = i64::MAX;
        config.validity.leaf_hours = i64::MAX;
        assert_eq!(config.default_duration(Role::Root), Duration::MAX);
        assert_eq!(config.default_duration(Role::Leaf), Duration::MAX);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProfileConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ProfileConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[validity]\nroot_days = 7300").unwrap();
        let config = ProfileConfig::load(file.path()).unwrap();
        assert_eq!(config.default_duration(Role::Root), Duration::days(7300));
    }
}
