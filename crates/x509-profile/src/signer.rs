//! The signing collaborator: maps a finalized profile onto rcgen and signs it.

use chrono::{DateTime, Utc};
use rcgen::string::Ia5String;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SanType, SerialNumber,
};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::Encode;
use x509_cert::ext::pkix::{certpolicy::PolicyInformation, CertificatePolicies};

use crate::draft::{CertificateDraft, ExtKeyUsage, KeyUsage};
use crate::issuer::Issuer;
use crate::key::KeyMaterial;
use crate::name::DistinguishedName;
use crate::oid::{self, Oid};
use crate::profile::Profile;
use crate::{ProfileError, Result};

/// Extensions rcgen derives from draft fields; opaque copies are dropped.
const MANAGED_EXTENSIONS: [&[u64]; 7] = [
    oid::SUBJECT_KEY_IDENTIFIER,
    oid::KEY_USAGE,
    oid::SUBJECT_ALT_NAME,
    oid::BASIC_CONSTRAINTS,
    oid::CERTIFICATE_POLICIES,
    oid::AUTHORITY_KEY_IDENTIFIER,
    oid::EXTENDED_KEY_USAGE,
];

/// Turns a finalized profile into a signed certificate.
///
/// The profile is consumed, so one profile produces at most one certificate.
pub trait CertificateSigner {
    /// Sign `profile` with its issuer key.
    ///
    /// # Errors
    ///
    /// Fails when the profile no longer satisfies its role invariants or the
    /// backend cannot encode or sign it.
    fn sign(&self, profile: Profile) -> Result<IssuedCertificate>;
}

/// A signed certificate with the draft and key it was built from.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    der: Vec<u8>,
    draft: CertificateDraft,
    key: Arc<KeyMaterial>,
}

impl IssuedCertificate {
    /// DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding (`CERTIFICATE` block).
    #[must_use]
    pub fn pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// The draft that was signed, with its public key filled in.
    #[must_use]
    pub const fn draft(&self) -> &CertificateDraft {
        &self.draft
    }

    /// Subject key material.
    #[must_use]
    pub const fn key(&self) -> &Arc<KeyMaterial> {
        &self.key
    }

    /// Use this certificate and its key to sign the next layer.
    #[must_use]
    pub fn as_issuer(&self) -> Issuer {
        Issuer::new(self.draft.clone(), Arc::clone(&self.key))
    }
}

/// Signs with rcgen over the ring provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct RcgenSigner;

impl CertificateSigner for RcgenSigner {
    fn sign(&self, profile: Profile) -> Result<IssuedCertificate> {
        profile.validate()?;

        let role = profile.role();
        let (Some(subject_key), Some(issuer_key)) = (profile.subject_key(), profile.issuer_key())
        else {
            return Err(ProfileError::invalid_template(role, "key material is not resolved"));
        };
        let signing_key = issuer_key
            .private_key()
            .ok_or(ProfileError::MissingPrivateKey { role })?
            .key_pair()?;

        let params = certificate_params(profile.subject_draft(), !profile.is_self_signed())?;
        let signed = if profile.is_self_signed() {
            params.self_signed(&signing_key)
        } else if let Some(der) = profile.issuer_certificate_der() {
            // loaded issuers sign with their encoded subject, byte for byte
            let ca_pem = pem::encode(&pem::Pem::new("CERTIFICATE", der.to_vec()));
            let issuer = rcgen::Issuer::from_ca_cert_pem(&ca_pem, &signing_key)
                .map_err(|e| ProfileError::Signing(format!("unusable issuer certificate: {e}")))?;
            params.signed_by(subject_key.public_key(), &issuer)
        } else {
            let issuer_params = certificate_params(profile.issuer_draft(), false)?;
            let issuer = rcgen::Issuer::from_params(&issuer_params, &signing_key);
            params.signed_by(subject_key.public_key(), &issuer)
        };
        let certificate = signed.map_err(|e| ProfileError::Signing(e.to_string()))?;

        let mut draft = profile.subject_draft().clone();
        draft.public_key = Some(subject_key.public_key().clone());
        info!(
            %role,
            cn = %draft.subject.common_name,
            issuer = %draft.issuer.common_name,
            serial = draft.serial_number,
            "certificate signed"
        );

        Ok(IssuedCertificate {
            der: certificate.der().to_vec(),
            draft,
            key: Arc::clone(subject_key),
        })
    }
}

fn certificate_params(draft: &CertificateDraft, with_authority_key_id: bool) -> Result<CertificateParams> {
    let mut params = CertificateParams::default();
    params.serial_number = Some(SerialNumber::from(draft.serial_number));
    params.not_before = offset_date_time(draft.not_before)?;
    params.not_after = offset_date_time(draft.not_after)?;
    params.distinguished_name = distinguished_name(&draft.subject)?;
    params.use_authority_key_identifier_extension = with_authority_key_id;

    params.is_ca = match (draft.basic_constraints_valid, draft.is_ca) {
        (true, true) => IsCa::Ca(draft.max_path_len.map_or(
            BasicConstraints::Unconstrained,
            BasicConstraints::Constrained,
        )),
        (true, false) => IsCa::ExplicitNoCa,
        (false, _) => IsCa::NoCa,
    };

    params.key_usages = draft.key_usage.iter().filter_map(key_usage_purpose).collect();
    params.extended_key_usages = draft
        .ext_key_usage
        .iter()
        .map(|usage| ext_key_usage_purpose(*usage))
        .chain(
            draft
                .unknown_ext_key_usage
                .iter()
                .map(|oid| ExtendedKeyUsagePurpose::Other(oid.arcs().to_vec())),
        )
        .collect();

    params.subject_alt_names = subject_alt_names(draft)?;

    if !draft.policy_identifiers.is_empty() {
        params
            .custom_extensions
            .push(policies_extension(&draft.policy_identifiers)?);
    }
    for ext in &draft.extra_extensions {
        if MANAGED_EXTENSIONS.iter().any(|managed| ext.oid.is(managed)) {
            debug!(oid = %ext.oid, "skipping extension derived from draft fields");
            continue;
        }
        let mut custom = CustomExtension::from_oid_content(ext.oid.arcs(), ext.value.clone());
        custom.set_criticality(ext.critical);
        params.custom_extensions.push(custom);
    }

    Ok(params)
}

// rcgen holds one value per attribute type; a second value would overwrite the first.
fn distinguished_name(name: &DistinguishedName) -> Result<rcgen::DistinguishedName> {
    let attributes = [
        (DnType::CountryName, &name.country),
        (DnType::StateOrProvinceName, &name.province),
        (DnType::LocalityName, &name.locality),
        (DnType::OrganizationName, &name.organization),
        (DnType::OrganizationalUnitName, &name.organizational_unit),
    ];
    let mut dn = rcgen::DistinguishedName::new();
    for (ty, values) in attributes {
        match values.as_slice() {
            [] => {}
            [value] => dn.push(ty.clone(), value.clone()),
            _ => {
                return Err(ProfileError::Signing(format!(
                    "{ty:?} has {} values; only one per attribute can be encoded",
                    values.len()
                )))
            }
        }
    }
    if !name.common_name.is_empty() {
        dn.push(DnType::CommonName, name.common_name.clone());
    }
    Ok(dn)
}

fn subject_alt_names(draft: &CertificateDraft) -> Result<Vec<SanType>> {
    let mut names = Vec::with_capacity(
        draft.dns_names.len() + draft.email_addresses.len() + draft.ip_addresses.len() + draft.uris.len(),
    );
    for dns in &draft.dns_names {
        names.push(SanType::DnsName(ia5(dns)?));
    }
    for email in &draft.email_addresses {
        names.push(SanType::Rfc822Name(ia5(email)?));
    }
    for ip in &draft.ip_addresses {
        names.push(SanType::IpAddress(*ip));
    }
    for uri in &draft.uris {
        names.push(SanType::URI(ia5(uri)?));
    }
    Ok(names)
}

fn ia5(value: &str) -> Result<Ia5String> {
    Ia5String::try_from(value.to_string())
        .map_err(|e| ProfileError::Signing(format!("{value:?} is not an IA5 string: {e}")))
}

fn policies_extension(policies: &[Oid]) -> Result<CustomExtension> {
    let policies = policies
        .iter()
        .map(|policy| {
            ObjectIdentifier::new(&policy.to_string())
                .map(|policy_identifier| PolicyInformation {
                    policy_identifier,
                    policy_qualifiers: None,
                })
                .map_err(|e| ProfileError::Signing(format!("invalid policy {policy}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    let der = CertificatePolicies(policies)
        .to_der()
        .map_err(|e| ProfileError::Signing(format!("failed to encode certificate policies: {e}")))?;
    Ok(CustomExtension::from_oid_content(oid::CERTIFICATE_POLICIES, der))
}

const fn key_usage_purpose(usage: KeyUsage) -> Option<KeyUsagePurpose> {
    Some(match usage {
        KeyUsage::DIGITAL_SIGNATURE => KeyUsagePurpose::DigitalSignature,
        KeyUsage::CONTENT_COMMITMENT => KeyUsagePurpose::ContentCommitment,
        KeyUsage::KEY_ENCIPHERMENT => KeyUsagePurpose::KeyEncipherment,
        KeyUsage::DATA_ENCIPHERMENT => KeyUsagePurpose::DataEncipherment,
        KeyUsage::KEY_AGREEMENT => KeyUsagePurpose::KeyAgreement,
        KeyUsage::CERT_SIGN => KeyUsagePurpose::KeyCertSign,
        KeyUsage::CRL_SIGN => KeyUsagePurpose::CrlSign,
        KeyUsage::ENCIPHER_ONLY => KeyUsagePurpose::EncipherOnly,
        KeyUsage::DECIPHER_ONLY => KeyUsagePurpose::DecipherOnly,
        _ => return None,
    })
}

const fn ext_key_usage_purpose(usage: ExtKeyUsage) -> ExtendedKeyUsagePurpose {
    match usage {
        ExtKeyUsage::Any => ExtendedKeyUsagePurpose::Any,
        ExtKeyUsage::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
        ExtKeyUsage::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
        ExtKeyUsage::CodeSigning => ExtendedKeyUsagePurpose::CodeSigning,
        ExtKeyUsage::EmailProtection => ExtendedKeyUsagePurpose::EmailProtection,
        ExtKeyUsage::TimeStamping => ExtendedKeyUsagePurpose::TimeStamping,
        ExtKeyUsage::OcspSigning => ExtendedKeyUsagePurpose::OcspSigning,
    }
}

fn offset_date_time(at: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| ProfileError::Signing(format!("timestamp {at} out of range: {e}")))
}
