use thiserror::Error;

use crate::{KeyAlgorithm, Role};

/// Result type alias for profile construction and signing.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Errors raised while building or signing a certificate profile.
///
/// Construction never returns a partial profile: the first failure is the
/// only thing the caller sees.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A request-derived leaf was built from a CSR that declares no public key
    #[error("certificate request does not carry a public key")]
    MissingPublicKey,

    /// A key that must be able to sign has no private half
    #[error("{role} profile requires a private key that was not provided")]
    MissingPrivateKey {
        /// Role of the profile being finalized
        role: Role,
    },

    /// An option in the pipeline failed
    #[error("option #{position} rejected: {source}")]
    OptionRejected {
        /// 1-based position of the option in the supplied sequence
        position: usize,
        /// What the option reported
        #[source]
        source: Box<ProfileError>,
    },

    /// Built-in option received input it cannot apply
    #[error("invalid option value: {0}")]
    InvalidOption(String),

    /// The key-generation collaborator failed
    #[error("key generation failed for {algorithm}: {reason}")]
    KeyGenerationFailed {
        /// Requested algorithm
        algorithm: KeyAlgorithm,
        /// Underlying failure
        reason: String,
    },

    /// The draft violates an invariant of its role
    #[error("invalid {role} template: {reason}")]
    InvalidTemplate {
        /// Role whose invariant was violated
        role: Role,
        /// Which invariant failed
        reason: String,
    },

    /// A certificate or certificate request could not be decoded
    #[error("failed to decode certificate or request: {0}")]
    Request(String),

    /// The signing collaborator failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfileError {
    /// Returns true if the error came out of the option pipeline
    #[must_use]
    pub const fn is_option_rejection(&self) -> bool {
        matches!(self, Self::OptionRejected { .. })
    }

    /// Returns the error an option reported, unwrapping the pipeline envelope
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::OptionRejected { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the role the error is attached to, if any
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::MissingPrivateKey { role } | Self::InvalidTemplate { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub(crate) fn invalid_template(role: Role, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            role,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_rejected_display() {
        let err = ProfileError::OptionRejected {
            position: 2,
            source: Box::new(ProfileError::InvalidOption("empty host".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "option #2 rejected: invalid option value: empty host"
        );
        assert!(err.is_option_rejection());
        assert!(matches!(err.root_cause(), ProfileError::InvalidOption(_)));
    }

    #[test]
    fn test_role_accessor() {
        let err = ProfileError::invalid_template(Role::Root, "not a CA");
        assert_eq!(err.role(), Some(Role::Root));
        assert_eq!(err.to_string(), "invalid root template: not a CA");
        assert_eq!(ProfileError::MissingPublicKey.role(), None);
    }

    #[test]
    fn test_decode_error_names_both_inputs() {
        let err = ProfileError::Request("truncated".to_string());
        assert_eq!(
            err.to_string(),
            "failed to decode certificate or request: truncated"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProfileError>();
    }
}
