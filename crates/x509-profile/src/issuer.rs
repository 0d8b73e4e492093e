//! Externally supplied issuer material.

use std::sync::Arc;

use crate::draft::{CertificateDraft, KeyUsage};
use crate::key::KeyMaterial;
use crate::x509::{self, AltNames};
use crate::{ProfileError, Result};

/// An issuer certificate plus the key that signs on its behalf.
///
/// Whether the certificate is really a CA with enough path length left is
/// not checked here.
#[derive(Debug, Clone)]
pub struct Issuer {
    /// The issuer's own certificate
    pub certificate: CertificateDraft,
    /// The issuer's signing key
    pub key: Arc<KeyMaterial>,
    certificate_der: Option<Vec<u8>>,
}

impl Issuer {
    /// Pair an issuer certificate with its key.
    #[must_use]
    pub fn new(certificate: CertificateDraft, key: impl Into<Arc<KeyMaterial>>) -> Self {
        Self {
            certificate,
            key: key.into(),
            certificate_der: None,
        }
    }

    /// Load an issuer from a DER certificate and its key.
    ///
    /// The encoded certificate is kept, so issued certificates name the
    /// issuer with its exact subject bytes.
    pub fn from_der(certificate_der: &[u8], key: impl Into<Arc<KeyMaterial>>) -> Result<Self> {
        let certificate = parse_certificate_der(certificate_der)?;
        Ok(Self {
            certificate,
            key: key.into(),
            certificate_der: Some(certificate_der.to_vec()),
        })
    }

    /// Load an issuer from a PEM certificate and a PKCS#8 PEM private key.
    pub fn from_pem(certificate_pem: &str, key_pem: &str) -> Result<Self> {
        let block = certificate_block(certificate_pem)?;
        let key = KeyMaterial::from_pkcs8_pem(key_pem)?;
        Self::from_der(block.contents(), key)
    }

    /// The encoded issuer certificate, when it was loaded from one.
    #[must_use]
    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.certificate_der.as_deref()
    }
}

/// Decode a DER certificate into a draft carrying its identity and constraints.
pub fn parse_certificate_der(der: &[u8]) -> Result<CertificateDraft> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| ProfileError::Request(format!("failed to parse certificate: {e}")))?;

    let not_before = x509::asn1_to_utc(cert.validity().not_before)?;
    let mut draft = CertificateDraft::new(not_before, chrono::Duration::zero());
    draft.not_after = x509::asn1_to_utc(cert.validity().not_after)?;
    draft.serial_number = serial_from_bytes(cert.raw_serial());
    draft.subject = x509::distinguished_name(cert.subject());
    draft.issuer = x509::distinguished_name(cert.issuer());
    draft.public_key = Some(x509::public_key(cert.public_key())?);

    let constraints = cert
        .basic_constraints()
        .map_err(|e| ProfileError::Request(e.to_string()))?;
    if let Some(constraints) = constraints {
        draft.basic_constraints_valid = true;
        draft.is_ca = constraints.value.ca;
        draft.max_path_len = constraints
            .value
            .path_len_constraint
            .map(|len| u8::try_from(len).unwrap_or(u8::MAX));
    }

    if let Some(usage) = cert
        .key_usage()
        .map_err(|e| ProfileError::Request(e.to_string()))?
    {
        draft.key_usage = KeyUsage::from_bits(usage.value.flags);
    }

    if let Some(san) = cert
        .subject_alternative_name()
        .map_err(|e| ProfileError::Request(e.to_string()))?
    {
        let mut names = AltNames::default();
        for name in &san.value.general_names {
            names.push(name)?;
        }
        draft.dns_names = names.dns_names;
        draft.email_addresses = names.email_addresses;
        draft.ip_addresses = names.ip_addresses;
        draft.uris = names.uris;
    }

    Ok(draft)
}

/// Decode a PEM certificate (`CERTIFICATE` block).
pub fn parse_certificate_pem(pem_str: &str) -> Result<CertificateDraft> {
    parse_certificate_der(certificate_block(pem_str)?.contents())
}

fn certificate_block(pem_str: &str) -> Result<pem::Pem> {
    let block =
        pem::parse(pem_str).map_err(|e| ProfileError::Request(format!("invalid PEM: {e}")))?;
    if block.tag() != "CERTIFICATE" {
        return Err(ProfileError::Request(format!(
            "expected CERTIFICATE block, found {}",
            block.tag()
        )));
    }
    Ok(block)
}

// Keeps the low 64 bits; longer serials are truncated.
fn serial_from_bytes(bytes: &[u8]) -> u64 {
    let start = bytes.len().saturating_sub(8);
    bytes[start..]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
