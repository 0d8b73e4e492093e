//! Role-specific default drafts.
//!
//! Every function here is pure apart from the `not_before` instant the
//! caller captures once per construction.

use chrono::{DateTime, Utc};

use crate::config::ProfileConfig;
use crate::draft::{CertificateDraft, ExtKeyUsage, KeyUsage};
use crate::name::DistinguishedName;
use crate::request::CertificateRequest;
use crate::Role;

const SERVICE_EXT_KEY_USAGE: [ExtKeyUsage; 5] = [
    ExtKeyUsage::ServerAuth,
    ExtKeyUsage::ClientAuth,
    ExtKeyUsage::CodeSigning,
    ExtKeyUsage::EmailProtection,
    ExtKeyUsage::TimeStamping,
];

/// Default draft for `role`.
///
/// Root and intermediate drafts name `subject` as their own issuer; the
/// `issuer` argument only applies to leaves.
#[must_use]
pub fn default_template(
    role: Role,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    match role {
        Role::Root | Role::Intermediate => ca_template(role, subject, config, not_before),
        Role::Leaf => default_leaf_template(subject, issuer, config, not_before),
    }
}

/// Root CA defaults: ten years, may sign one layer of intermediates.
#[must_use]
pub fn default_root_template(
    cn: &str,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    ca_template(Role::Root, DistinguishedName::common_name(cn), config, not_before)
}

/// Intermediate CA defaults: may sign leaves only.
#[must_use]
pub fn default_intermediate_template(
    cn: &str,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    ca_template(
        Role::Intermediate,
        DistinguishedName::common_name(cn),
        config,
        not_before,
    )
}

fn ca_template(
    role: Role,
    name: DistinguishedName,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    let mut draft = CertificateDraft::new(not_before, config.default_duration(role));
    draft.is_ca = true;
    draft.basic_constraints_valid = true;
    draft.max_path_len = Some(if role == Role::Root { 1 } else { 0 });
    draft.key_usage = KeyUsage::DIGITAL_SIGNATURE
        | KeyUsage::KEY_ENCIPHERMENT
        | KeyUsage::CERT_SIGN
        | KeyUsage::CRL_SIGN;
    draft.ext_key_usage = std::iter::once(ExtKeyUsage::Any)
        .chain(SERVICE_EXT_KEY_USAGE)
        .collect();
    draft.unknown_ext_key_usage = config.oids.vendor_ext_key_usage.clone();
    draft.policy_identifiers = config.policies(role).to_vec();
    draft.issuer = name.clone();
    draft.subject = name;
    draft
}

/// Leaf defaults.
///
/// keyEncipherment is set here and stripped during finalization when the
/// subject key turns out not to be RSA.
#[must_use]
pub fn default_leaf_template(
    subject: DistinguishedName,
    issuer: DistinguishedName,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    let mut draft = CertificateDraft::new(not_before, config.default_duration(Role::Leaf));
    draft.is_ca = false;
    draft.basic_constraints_valid = false;
    draft.max_path_len = None;
    draft.key_usage = KeyUsage::DIGITAL_SIGNATURE | KeyUsage::KEY_ENCIPHERMENT;
    draft.ext_key_usage = SERVICE_EXT_KEY_USAGE.to_vec();
    draft.unknown_ext_key_usage = config.oids.vendor_ext_key_usage.clone();
    draft.policy_identifiers = config.policies(Role::Leaf).to_vec();
    draft.subject = subject;
    draft.issuer = issuer;
    draft
}

/// Leaf defaults populated from a certificate request.
///
/// The request's subject, alternative names and extensions are copied
/// verbatim, preserving order.
#[must_use]
pub fn leaf_template_from_request(
    request: &CertificateRequest,
    issuer: DistinguishedName,
    config: &ProfileConfig,
    not_before: DateTime<Utc>,
) -> CertificateDraft {
    let mut draft = default_leaf_template(request.subject.clone(), issuer, config, not_before);
    draft.extra_extensions = request.extensions.clone();
    draft.dns_names = request.dns_names.clone();
    draft.email_addresses = request.email_addresses.clone();
    draft.ip_addresses = request.ip_addresses.clone();
    draft.uris = request.uris.clone();
    draft
}
