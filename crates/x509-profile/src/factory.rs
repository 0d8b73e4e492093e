//! Construction entry points, one per role and input source.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::ProfileConfig;
use crate::draft::CertificateDraft;
use crate::issuer::Issuer;
use crate::key::{KeyGenerator, RcgenKeyGenerator};
use crate::name::DistinguishedName;
use crate::options::{self, WithOption};
use crate::profile::Profile;
use crate::request::CertificateRequest;
use crate::template;
use crate::{ProfileError, Result, Role};

/// Builds profiles from role defaults, caller options and a key generator.
///
/// ```rust,ignore
/// use x509_profile::{ProfileFactory, RcgenSigner, options::with_hosts};
///
/// let factory = ProfileFactory::new();
/// let root = factory.root("Example Root CA", vec![])?.sign(&RcgenSigner)?;
/// let ca = factory
///     .intermediate("Example Issuing CA", &root.as_issuer(), vec![])?
///     .sign(&RcgenSigner)?;
/// let leaf = factory
///     .leaf("svc.example", &ca.as_issuer(), vec![with_hosts("svc.example,10.0.0.7")])?
///     .sign(&RcgenSigner)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProfileFactory<G = RcgenKeyGenerator> {
    config: ProfileConfig,
    key_generator: G,
}

impl ProfileFactory {
    /// A factory with default configuration and the rcgen key generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: KeyGenerator> ProfileFactory<G> {
    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProfileConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the key generator.
    #[must_use]
    pub fn with_key_generator<H: KeyGenerator>(self, key_generator: H) -> ProfileFactory<H> {
        ProfileFactory {
            config: self.config,
            key_generator,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Self-signed root CA named `cn`.
    pub fn root(&self, cn: &str, options: Vec<WithOption>) -> Result<Profile> {
        let draft = template::default_root_template(cn, &self.config, Utc::now());
        self.build(Role::Root, draft, None, options)
    }

    /// Self-signed root CA from a caller-supplied draft.
    ///
    /// The draft is taken as-is; if it is not a CA with path length 1 the
    /// construction fails with [`ProfileError::InvalidTemplate`].
    pub fn root_with_template(
        &self,
        draft: CertificateDraft,
        options: Vec<WithOption>,
    ) -> Result<Profile> {
        self.build(Role::Root, draft, None, options)
    }

    /// Intermediate CA named `cn`, signed by `issuer`.
    pub fn intermediate(
        &self,
        cn: &str,
        issuer: &Issuer,
        options: Vec<WithOption>,
    ) -> Result<Profile> {
        let draft = template::default_intermediate_template(cn, &self.config, Utc::now());
        self.build(Role::Intermediate, draft, Some(issuer), options)
    }

    /// Leaf named `cn`, signed by `issuer`.
    pub fn leaf(&self, cn: &str, issuer: &Issuer, options: Vec<WithOption>) -> Result<Profile> {
        let draft = template::default_leaf_template(
            DistinguishedName::common_name(cn),
            issuer.certificate.subject.clone(),
            &self.config,
            Utc::now(),
        );
        self.build(Role::Leaf, draft, Some(issuer), options)
    }

    /// Leaf from a caller-supplied draft, signed by `issuer`.
    ///
    /// The draft's public key, when present, is forced after the caller's
    /// options.
    pub fn leaf_with_template(
        &self,
        draft: CertificateDraft,
        issuer: &Issuer,
        mut options: Vec<WithOption>,
    ) -> Result<Profile> {
        if let Some(public_key) = draft.public_key.clone() {
            options.push(options::with_public_key(public_key));
        }
        self.build(Role::Leaf, draft, Some(issuer), options)
    }

    /// Self-signed leaf named `cn`.
    pub fn self_signed_leaf(&self, cn: &str, options: Vec<WithOption>) -> Result<Profile> {
        let name = DistinguishedName::common_name(cn);
        let draft = template::default_leaf_template(name.clone(), name, &self.config, Utc::now());
        self.build(Role::Leaf, draft, None, options)
    }

    /// Leaf derived from a certificate request, signed by `issuer`.
    ///
    /// The request's public key is forced after the caller's options.
    pub fn leaf_with_request(
        &self,
        request: &CertificateRequest,
        issuer: &Issuer,
        mut options: Vec<WithOption>,
    ) -> Result<Profile> {
        let public_key = request
            .public_key
            .clone()
            .ok_or(ProfileError::MissingPublicKey)?;
        let draft = template::leaf_template_from_request(
            request,
            issuer.certificate.subject.clone(),
            &self.config,
            Utc::now(),
        );
        options.push(options::with_public_key(public_key));
        self.build(Role::Leaf, draft, Some(issuer), options)
    }

    fn build(
        &self,
        role: Role,
        draft: CertificateDraft,
        issuer: Option<&Issuer>,
        options: Vec<WithOption>,
    ) -> Result<Profile> {
        self.config.validate()?;
        let default_duration = self.config.default_duration(role);
        let mut profile = match issuer {
            Some(issuer) => Profile::issued_by(role, draft, issuer, default_duration)?,
            None => Profile::self_signed(role, draft, default_duration),
        };
        debug!(%role, options = options.len(), "defaults applied");

        options::apply_options(&mut profile, options)?;
        debug!(%role, "options applied");

        profile.finalize(&self.key_generator, self.config.key_algorithm)?;
        info!(
            %role,
            cn = %profile.subject_draft().subject.common_name,
            self_signed = profile.is_self_signed(),
            "profile constructed"
        );
        Ok(profile)
    }
}

/// Self-signed root CA named `cn` with default configuration.
pub fn new_root_profile(cn: &str, options: Vec<WithOption>) -> Result<Profile> {
    ProfileFactory::new().root(cn, options)
}

/// Self-signed root CA from `draft` with default configuration.
pub fn new_root_profile_with_template(
    draft: CertificateDraft,
    options: Vec<WithOption>,
) -> Result<Profile> {
    ProfileFactory::new().root_with_template(draft, options)
}

/// Intermediate CA named `cn` signed by `issuer`, with default configuration.
pub fn new_intermediate_profile(
    cn: &str,
    issuer: &Issuer,
    options: Vec<WithOption>,
) -> Result<Profile> {
    ProfileFactory::new().intermediate(cn, issuer, options)
}

/// Leaf named `cn` signed by `issuer`, with default configuration.
pub fn new_leaf_profile(cn: &str, issuer: &Issuer, options: Vec<WithOption>) -> Result<Profile> {
    ProfileFactory::new().leaf(cn, issuer, options)
}

/// Leaf from `draft` signed by `issuer`, with default configuration.
pub fn new_leaf_profile_with_template(
    draft: CertificateDraft,
    issuer: &Issuer,
    options: Vec<WithOption>,
) -> Result<Profile> {
    ProfileFactory::new().leaf_with_template(draft, issuer, options)
}

/// Self-signed leaf named `cn` with default configuration.
pub fn new_self_signed_leaf_profile(cn: &str, options: Vec<WithOption>) -> Result<Profile> {
    ProfileFactory::new().self_signed_leaf(cn, options)
}

/// Leaf derived from `request` signed by `issuer`, with default configuration.
pub fn new_leaf_profile_with_csr(
    request: &CertificateRequest,
    issuer: &Issuer,
    options: Vec<WithOption>,
) -> Result<Profile> {
    ProfileFactory::new().leaf_with_request(request, issuer, options)
}
