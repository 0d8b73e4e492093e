//! The assembled profile: subject draft, issuer linkage and key material.

use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

use crate::draft::{CertificateDraft, KeyUsage};
use crate::issuer::Issuer;
use crate::key::{KeyAlgorithm, KeyGenerator, KeyMaterial, PublicKey};
use crate::signer::{CertificateSigner, IssuedCertificate};
use crate::{ProfileError, Result, Role};

/// Construction stage of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProfileState {
    /// The role's default draft is in place
    DefaultsApplied,
    /// Every caller option ran
    OptionsApplied,
    /// Keys resolved, self-signing done, invariants checked
    Finalized,
}

/// An unsigned certificate plus everything needed to sign it.
///
/// For self-signed profiles (roots and self-signed leaves) there is no
/// separate issuer draft: [`Profile::issuer_draft`] returns the subject draft
/// itself and the issuer key is the subject key.
#[derive(Debug)]
pub struct Profile {
    role: Role,
    state: ProfileState,
    default_duration: Duration,
    subject: CertificateDraft,
    issuer: Option<CertificateDraft>,
    issuer_certificate_der: Option<Vec<u8>>,
    subject_key: Option<Arc<KeyMaterial>>,
    issuer_key: Option<Arc<KeyMaterial>>,
}

impl Profile {
    /// A self-signed profile in the `DefaultsApplied` state.
    pub(crate) fn self_signed(role: Role, subject: CertificateDraft, default_duration: Duration) -> Self {
        Self {
            role,
            state: ProfileState::DefaultsApplied,
            default_duration,
            subject,
            issuer: None,
            issuer_certificate_der: None,
            subject_key: None,
            issuer_key: None,
        }
    }

    /// A profile signed by `issuer`, in the `DefaultsApplied` state.
    pub(crate) fn issued_by(
        role: Role,
        mut subject: CertificateDraft,
        issuer: &Issuer,
        default_duration: Duration,
    ) -> Result<Self> {
        if !issuer.key.has_private_key() {
            return Err(ProfileError::MissingPrivateKey { role });
        }
        subject.issuer = issuer.certificate.subject.clone();
        Ok(Self {
            role,
            state: ProfileState::DefaultsApplied,
            default_duration,
            subject,
            issuer: Some(issuer.certificate.clone()),
            issuer_certificate_der: issuer.certificate_der().map(<[u8]>::to_vec),
            subject_key: None,
            issuer_key: Some(Arc::clone(&issuer.key)),
        })
    }

    /// Certificate role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Construction stage.
    #[must_use]
    pub const fn state(&self) -> ProfileState {
        self.state
    }

    /// Whether issuer and subject are the same certificate.
    #[must_use]
    pub const fn is_self_signed(&self) -> bool {
        self.issuer.is_none()
    }

    /// Validity applied when no option overrides it.
    #[must_use]
    pub const fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// The certificate being built.
    #[must_use]
    pub const fn subject_draft(&self) -> &CertificateDraft {
        &self.subject
    }

    /// Mutable access for options.
    pub fn subject_draft_mut(&mut self) -> &mut CertificateDraft {
        &mut self.subject
    }

    /// The issuing certificate; the subject draft itself when self-signed.
    #[must_use]
    pub fn issuer_draft(&self) -> &CertificateDraft {
        self.issuer.as_ref().unwrap_or(&self.subject)
    }

    /// Encoded issuer certificate, when the issuer was loaded from one.
    pub(crate) fn issuer_certificate_der(&self) -> Option<&[u8]> {
        self.issuer_certificate_der.as_deref()
    }

    /// Subject key material; always present once the profile is finalized.
    #[must_use]
    pub const fn subject_key(&self) -> Option<&Arc<KeyMaterial>> {
        self.subject_key.as_ref()
    }

    /// Subject public key, if resolved.
    #[must_use]
    pub fn subject_public_key(&self) -> Option<&PublicKey> {
        self.subject_key.as_deref().map(KeyMaterial::public_key)
    }

    /// Replace the subject key material.
    pub fn set_subject_key(&mut self, key: impl Into<Arc<KeyMaterial>>) {
        self.subject_key = Some(key.into());
    }

    /// The signing key; always present once the profile is finalized.
    #[must_use]
    pub const fn issuer_key(&self) -> Option<&Arc<KeyMaterial>> {
        self.issuer_key.as_ref()
    }

    /// Replace the issuer key.
    ///
    /// Self-signed profiles overwrite this with the subject key during
    /// finalization.
    pub fn set_issuer_key(&mut self, key: impl Into<Arc<KeyMaterial>>) {
        self.issuer_key = Some(key.into());
    }

    pub(crate) fn mark_options_applied(&mut self) {
        self.state = ProfileState::OptionsApplied;
    }

    /// Resolve the subject key, self-sign, correct key usage and validate.
    pub(crate) fn finalize<G: KeyGenerator + ?Sized>(
        &mut self,
        generator: &G,
        algorithm: KeyAlgorithm,
    ) -> Result<()> {
        let subject_key = match &self.subject_key {
            Some(key) => Arc::clone(key),
            None => {
                let key = Arc::new(generator.generate(algorithm)?);
                self.subject_key = Some(Arc::clone(&key));
                key
            }
        };

        if self.is_self_signed() {
            if !subject_key.has_private_key() {
                return Err(ProfileError::MissingPrivateKey { role: self.role });
            }
            self.subject.issuer = self.subject.subject.clone();
            self.issuer_key = Some(Arc::clone(&subject_key));
        }

        if !subject_key.algorithm().is_rsa()
            && self.subject.key_usage.contains(KeyUsage::KEY_ENCIPHERMENT)
        {
            debug!(
                role = %self.role,
                algorithm = %subject_key.algorithm(),
                "dropping keyEncipherment for non-RSA key"
            );
            self.subject.key_usage.remove(KeyUsage::KEY_ENCIPHERMENT);
        }

        self.validate()?;
        self.state = ProfileState::Finalized;
        Ok(())
    }

    /// Check every invariant the signer relies on.
    pub fn validate(&self) -> Result<()> {
        let role = self.role;
        let draft = &self.subject;
        let (Some(subject_key), Some(issuer_key)) = (&self.subject_key, &self.issuer_key) else {
            return Err(ProfileError::invalid_template(role, "key material is not resolved"));
        };
        if !issuer_key.has_private_key() {
            return Err(ProfileError::MissingPrivateKey { role });
        }
        if draft.not_after <= draft.not_before {
            return Err(ProfileError::invalid_template(
                role,
                "not_after must be later than not_before",
            ));
        }
        if draft.key_usage.contains(KeyUsage::KEY_ENCIPHERMENT) && !subject_key.algorithm().is_rsa()
        {
            return Err(ProfileError::invalid_template(
                role,
                "keyEncipherment requires an RSA subject key",
            ));
        }

        if self.is_self_signed() {
            if draft.issuer != draft.subject {
                return Err(ProfileError::invalid_template(
                    role,
                    "self-signed issuer name differs from subject name",
                ));
            }
            if !Arc::ptr_eq(subject_key, issuer_key) {
                return Err(ProfileError::invalid_template(
                    role,
                    "self-signed issuer key is not the subject key",
                ));
            }
        } else if draft.issuer != self.issuer_draft().subject {
            return Err(ProfileError::invalid_template(
                role,
                "issuer name does not match the issuer certificate",
            ));
        }

        match role {
            Role::Root => {
                if !self.is_self_signed() {
                    return Err(ProfileError::invalid_template(role, "root must be self-signed"));
                }
                check_ca(role, draft, 1)
            }
            Role::Intermediate => {
                if self.is_self_signed() || subject_key.public_key() == issuer_key.public_key() {
                    return Err(ProfileError::invalid_template(
                        role,
                        "intermediate requires a distinct issuer key",
                    ));
                }
                check_ca(role, draft, 0)
            }
            Role::Leaf => {
                if draft.is_ca {
                    return Err(ProfileError::invalid_template(role, "leaf must not be a CA"));
                }
                if draft.max_path_len.is_some() {
                    return Err(ProfileError::invalid_template(
                        role,
                        "leaf must not carry a path-length constraint",
                    ));
                }
                if draft
                    .key_usage
                    .intersects(KeyUsage::CERT_SIGN | KeyUsage::CRL_SIGN)
                {
                    return Err(ProfileError::invalid_template(
                        role,
                        "leaf key usage must not include certificate or CRL signing",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Hand the profile to a signer. A profile signs exactly once.
    pub fn sign<S: CertificateSigner + ?Sized>(self, signer: &S) -> Result<IssuedCertificate> {
        signer.sign(self)
    }
}

fn check_ca(role: Role, draft: &CertificateDraft, path_len: u8) -> Result<()> {
    if !draft.is_ca || !draft.basic_constraints_valid {
        return Err(ProfileError::invalid_template(role, "template is not a CA"));
    }
    if draft.max_path_len != Some(path_len) {
        return Err(ProfileError::invalid_template(
            role,
            format!(
                "path length must be {path_len}, found {:?}",
                draft.max_path_len
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;
    use crate::key::RcgenKeyGenerator;
    use crate::template::{default_intermediate_template, default_leaf_template, default_root_template};
    use crate::DistinguishedName;
    use chrono::Utc;

    fn root() -> Profile {
        let config = ProfileConfig::default();
        let draft = default_root_template("root-ca", &config, Utc::now());
        let mut profile = Profile::self_signed(Role::Root, draft, config.default_duration(Role::Root));
        profile.mark_options_applied();
        profile.finalize(&RcgenKeyGenerator, KeyAlgorithm::EcdsaP256).unwrap();
        profile
    }

    fn root_issuer() -> Issuer {
        let root = root();
        Issuer::new(root.subject_draft().clone(), Arc::clone(root.subject_key().unwrap()))
    }

    #[test]
    fn test_finalize_self_signed_shares_key() {
        let profile = root();
        assert_eq!(profile.state(), ProfileState::Finalized);
        assert!(profile.is_self_signed());
        assert!(Arc::ptr_eq(
            profile.subject_key().unwrap(),
            profile.issuer_key().unwrap()
        ));
        assert!(std::ptr::eq(profile.issuer_draft(), profile.subject_draft()));
    }

    #[test]
    fn test_finalize_strips_key_encipherment_for_ec() {
        let profile = root();
        let usage = profile.subject_draft().key_usage;
        assert!(!usage.contains(KeyUsage::KEY_ENCIPHERMENT));
        assert!(usage.contains(KeyUsage::CERT_SIGN | KeyUsage::CRL_SIGN));
    }

    #[test]
    fn test_issued_by_links_issuer() {
        let issuer = root_issuer();
        let config = ProfileConfig::default();
        let draft = default_intermediate_template("issuing-ca", &config, Utc::now());
        let mut profile =
            Profile::issued_by(Role::Intermediate, draft, &issuer, Duration::days(1)).unwrap();
        profile.finalize(&RcgenKeyGenerator, KeyAlgorithm::EcdsaP256).unwrap();

        assert!(!profile.is_self_signed());
        assert_eq!(profile.issuer_draft(), &issuer.certificate);
        assert_eq!(profile.subject_draft().issuer, issuer.certificate.subject);
        assert!(!Arc::ptr_eq(
            profile.subject_key().unwrap(),
            profile.issuer_key().unwrap()
        ));
    }

    #[test]
    fn test_issuer_without_private_key_is_rejected() {
        let issuer = root_issuer();
        let public_only = KeyMaterial::public_only(issuer.key.public_key().clone());
        let issuer = Issuer::new(issuer.certificate, public_only);
        let draft = default_leaf_template(
            DistinguishedName::common_name("svc"),
            DistinguishedName::default(),
            &ProfileConfig::default(),
            Utc::now(),
        );
        let err = Profile::issued_by(Role::Leaf, draft, &issuer, Duration::hours(1)).unwrap_err();
        assert!(matches!(err, ProfileError::MissingPrivateKey { role: Role::Leaf }));
    }

    #[test]
    fn test_intermediate_rejects_copy_of_issuer_key() {
        let issuer = root_issuer();
        let config = ProfileConfig::default();
        let draft = default_intermediate_template("issuing-ca", &config, Utc::now());
        let mut profile =
            Profile::issued_by(Role::Intermediate, draft, &issuer, Duration::days(1)).unwrap();
        // same key, different allocation
        profile.set_subject_key((*issuer.key).clone());

        let err = profile
            .finalize(&RcgenKeyGenerator, KeyAlgorithm::EcdsaP256)
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidTemplate { role: Role::Intermediate, .. }));
    }

    #[test]
    fn test_validate_catches_later_mutation() {
        let mut profile = root();
        profile.subject_draft_mut().max_path_len = Some(3);
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, ProfileError::InvalidTemplate { role: Role::Root, .. }));

        let mut profile = root();
        let draft = profile.subject_draft_mut();
        draft.not_after = draft.not_before;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_self_signed_requires_private_key() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::EcdsaP256).unwrap();
        let config = ProfileConfig::default();
        let draft = default_root_template("root-ca", &config, Utc::now());
        let mut profile = Profile::self_signed(Role::Root, draft, Duration::days(1));
        profile.set_subject_key(KeyMaterial::public_only(key.public_key().clone()));

        let err = profile
            .finalize(&RcgenKeyGenerator, KeyAlgorithm::EcdsaP256)
            .unwrap_err();
        assert!(matches!(err, ProfileError::MissingPrivateKey { role: Role::Root }));
    }
}
