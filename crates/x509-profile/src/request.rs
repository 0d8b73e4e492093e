//! Certificate signing requests as consumed by the leaf-from-request entry point.

use std::net::IpAddr;
use tracing::debug;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::cri_attributes::ParsedCriAttribute;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;

use crate::draft::Extension;
use crate::key::PublicKey;
use crate::name::DistinguishedName;
use crate::x509::{self, AltNames};
use crate::{ProfileError, Result};

/// A read-only view of a certificate signing request.
///
/// Values are copied verbatim into the leaf draft; nothing here is
/// normalized or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Requested subject
    pub subject: DistinguishedName,
    /// Requested DNS names
    pub dns_names: Vec<String>,
    /// Requested email addresses
    pub email_addresses: Vec<String>,
    /// Requested IP addresses
    pub ip_addresses: Vec<IpAddr>,
    /// Requested URIs
    pub uris: Vec<String>,
    /// Declared public key
    pub public_key: Option<PublicKey>,
    /// Every requested extension, in request order
    pub extensions: Vec<Extension>,
}

impl CertificateRequest {
    /// Decode a DER-encoded PKCS#10 request.
    ///
    /// The request signature is verified before anything is copied out.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, csr) = X509CertificationRequest::from_der(der)
            .map_err(|e| ProfileError::Request(format!("failed to parse CSR: {e}")))?;
        csr.verify_signature()
            .map_err(|e| ProfileError::Request(format!("CSR signature verification failed: {e}")))?;

        let info = &csr.certification_request_info;
        let mut names = AltNames::default();
        let mut extensions = Vec::new();
        for attribute in info.attributes() {
            if let ParsedCriAttribute::ExtensionRequest(request) = attribute.parsed_attribute() {
                for ext in &request.extensions {
                    if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                        for name in &san.general_names {
                            names.push(name)?;
                        }
                    }
                    extensions.push(x509::extension(ext)?);
                }
            }
        }

        let request = Self {
            subject: x509::distinguished_name(&info.subject),
            dns_names: names.dns_names,
            email_addresses: names.email_addresses,
            ip_addresses: names.ip_addresses,
            uris: names.uris,
            public_key: Some(x509::public_key(&info.subject_pki)?),
            extensions,
        };
        debug!(
            subject = %request.subject,
            dns_names = request.dns_names.len(),
            extensions = request.extensions.len(),
            "decoded certificate request"
        );
        Ok(request)
    }

    /// Decode a PEM-encoded request (`CERTIFICATE REQUEST` block).
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str)
            .map_err(|e| ProfileError::Request(format!("invalid PEM: {e}")))?;
        if block.tag() != "CERTIFICATE REQUEST" && block.tag() != "NEW CERTIFICATE REQUEST" {
            return Err(ProfileError::Request(format!(
                "expected CERTIFICATE REQUEST block, found {}",
                block.tag()
            )));
        }
        Self::from_der(block.contents())
    }
}
