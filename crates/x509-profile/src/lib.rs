//! # x509-profile
//!
//! X.509 certificate profile composition for a three-tier PKI.
//!
//! ## Architecture
//!
//! ```text
//! ROOT (self-signed, path length 1)
//!        │
//!        └── INTERMEDIATE (path length 0, signs leaves only)
//!               │
//!               ├── LEAF from name
//!               ├── LEAF from template
//!               └── LEAF from certificate request
//!
//! SELF-SIGNED LEAF (stands alone)
//! ```
//!
//! ## Construction
//!
//! Every entry point runs the same routine:
//!
//! - role default template (validity, key usage, EKU, policies, constraints)
//! - caller options, in order, last writer wins
//! - finalization: subject key resolved or generated, self-signed profiles
//!   take the subject key as issuer key, keyEncipherment dropped for
//!   non-RSA keys, role invariants checked
//!
//! The resulting [`Profile`] is handed to a [`CertificateSigner`] exactly once.
//!
//! ## Example
//!
//! ```rust,ignore
//! use x509_profile::{new_intermediate_profile, new_leaf_profile, new_root_profile, RcgenSigner};
//! use x509_profile::options::with_hosts;
//!
//! let root = new_root_profile("Example Root CA", vec![])?.sign(&RcgenSigner)?;
//! let ca = new_intermediate_profile("Example Issuing CA", &root.as_issuer(), vec![])?
//!     .sign(&RcgenSigner)?;
//! let leaf = new_leaf_profile("svc.example", &ca.as_issuer(), vec![with_hosts("svc.example")])?
//!     .sign(&RcgenSigner)?;
//! println!("{}", leaf.pem());
//! ```

mod config;
mod draft;
mod error;
mod factory;
mod issuer;
mod key;
mod name;
pub mod oid;
pub mod options;
mod profile;
mod request;
mod signer;
mod template;
mod x509;

pub use config::{
    OidTables, ProfileConfig, ValidityConfig, DEFAULT_INTERMEDIATE_VALIDITY_DAYS,
    DEFAULT_LEAF_VALIDITY_HOURS, DEFAULT_ROOT_VALIDITY_DAYS,
};
pub use draft::{CertificateDraft, ExtKeyUsage, Extension, KeyUsage};
pub use error::{ProfileError, Result};
pub use factory::{
    new_intermediate_profile, new_leaf_profile, new_leaf_profile_with_csr,
    new_leaf_profile_with_template, new_root_profile, new_root_profile_with_template,
    new_self_signed_leaf_profile, ProfileFactory,
};
pub use issuer::{parse_certificate_der, parse_certificate_pem, Issuer};
pub use key::{KeyAlgorithm, KeyGenerator, KeyMaterial, PrivateKey, PublicKey, RcgenKeyGenerator};
pub use name::DistinguishedName;
pub use oid::Oid;
pub use options::WithOption;
pub use profile::{Profile, ProfileState};
pub use request::CertificateRequest;
pub use signer::{CertificateSigner, IssuedCertificate, RcgenSigner};
pub use template::{
    default_intermediate_template, default_leaf_template, default_root_template,
    default_template, leaf_template_from_request,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a certificate in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Root CA - self-signed, signs only intermediates
    Root,
    /// Intermediate CA - signs end-entity certs
    Intermediate,
    /// End-entity certificate
    Leaf,
}

impl Role {
    /// Whether certificates of this role are CAs.
    #[must_use]
    pub const fn is_ca(self) -> bool {
        !matches!(self, Self::Leaf)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Intermediate => "intermediate",
            Self::Leaf => "leaf",
        })
    }
}
