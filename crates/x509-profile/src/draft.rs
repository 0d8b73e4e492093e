//! Unsigned certificate drafts.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::net::IpAddr;
use std::ops::{BitOr, BitOrAssign};

use crate::key::PublicKey;
use crate::name::DistinguishedName;
use crate::oid::Oid;

/// Key usage bitset (RFC 5280 section 4.2.1.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyUsage(u16);

impl KeyUsage {
    /// No usage bits
    pub const NONE: Self = Self(0);
    /// digitalSignature
    pub const DIGITAL_SIGNATURE: Self = Self(1 << 0);
    /// contentCommitment (formerly nonRepudiation)
    pub const CONTENT_COMMITMENT: Self = Self(1 << 1);
    /// keyEncipherment
    pub const KEY_ENCIPHERMENT: Self = Self(1 << 2);
    /// dataEncipherment
    pub const DATA_ENCIPHERMENT: Self = Self(1 << 3);
    /// keyAgreement
    pub const KEY_AGREEMENT: Self = Self(1 << 4);
    /// keyCertSign
    pub const CERT_SIGN: Self = Self(1 << 5);
    /// cRLSign
    pub const CRL_SIGN: Self = Self(1 << 6);
    /// encipherOnly
    pub const ENCIPHER_ONLY: Self = Self(1 << 7);
    /// decipherOnly
    pub const DECIPHER_ONLY: Self = Self(1 << 8);

    const ALL: [(Self, &'static str); 9] = [
        (Self::DIGITAL_SIGNATURE, "digitalSignature"),
        (Self::CONTENT_COMMITMENT, "contentCommitment"),
        (Self::KEY_ENCIPHERMENT, "keyEncipherment"),
        (Self::DATA_ENCIPHERMENT, "dataEncipherment"),
        (Self::KEY_AGREEMENT, "keyAgreement"),
        (Self::CERT_SIGN, "keyCertSign"),
        (Self::CRL_SIGN, "cRLSign"),
        (Self::ENCIPHER_ONLY, "encipherOnly"),
        (Self::DECIPHER_ONLY, "decipherOnly"),
    ];

    pub(crate) const fn from_bits(bits: u16) -> Self {
        Self(bits & 0x01ff)
    }

    /// Raw bit representation; bit 0 is digitalSignature.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Clear every bit of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Whether no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the individual bits that are set.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .map(|(bit, _)| bit)
            .filter(move |bit| self.contains(*bit))
    }
}

impl BitOr for KeyUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for KeyUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::ALL
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

/// Standard extended key usage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtKeyUsage {
    /// anyExtendedKeyUsage
    Any,
    /// id-kp-serverAuth
    ServerAuth,
    /// id-kp-clientAuth
    ClientAuth,
    /// id-kp-codeSigning
    CodeSigning,
    /// id-kp-emailProtection
    EmailProtection,
    /// id-kp-timeStamping
    TimeStamping,
    /// id-kp-OCSPSigning
    OcspSigning,
}

/// An extension carried verbatim into the signed certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Extension identifier
    pub oid: Oid,
    /// Criticality flag
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

/// A mutable, unsigned certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDraft {
    /// Serial number
    pub serial_number: u64,
    /// Subject name
    pub subject: DistinguishedName,
    /// Issuer name
    pub issuer: DistinguishedName,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// Whether the basic-constraints extension is emitted
    pub basic_constraints_valid: bool,
    /// Basic-constraints CA flag
    pub is_ca: bool,
    /// Path-length constraint; `None` when absent
    pub max_path_len: Option<u8>,
    /// Key usage bits
    pub key_usage: KeyUsage,
    /// Extended key usages
    pub ext_key_usage: Vec<ExtKeyUsage>,
    /// Extended key usages without a standard name (vendor OIDs)
    pub unknown_ext_key_usage: Vec<Oid>,
    /// Certificate policy identifiers
    pub policy_identifiers: Vec<Oid>,
    /// DNS subject alternative names
    pub dns_names: Vec<String>,
    /// Email subject alternative names
    pub email_addresses: Vec<String>,
    /// IP subject alternative names
    pub ip_addresses: Vec<IpAddr>,
    /// URI subject alternative names
    pub uris: Vec<String>,
    /// Opaque extensions copied into the certificate
    pub extra_extensions: Vec<Extension>,
    /// Public key declared by a template or a parsed certificate
    pub public_key: Option<PublicKey>,
}

impl CertificateDraft {
    /// An empty draft valid from `not_before` for `duration`.
    ///
    /// `not_after` saturates at the latest representable instant.
    #[must_use]
    pub fn new(not_before: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            serial_number: random_serial(),
            subject: DistinguishedName::default(),
            issuer: DistinguishedName::default(),
            not_before,
            not_after: not_before
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            basic_constraints_valid: false,
            is_ca: false,
            max_path_len: None,
            key_usage: KeyUsage::NONE,
            ext_key_usage: Vec::new(),
            unknown_ext_key_usage: Vec::new(),
            policy_identifiers: Vec::new(),
            dns_names: Vec::new(),
            email_addresses: Vec::new(),
            ip_addresses: Vec::new(),
            uris: Vec::new(),
            extra_extensions: Vec::new(),
            public_key: None,
        }
    }

    /// Length of the validity window.
    #[must_use]
    pub fn validity(&self) -> Duration {
        self.not_after - self.not_before
    }

    /// Whether `other` carries the same subject and issuer names.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.subject == other.subject && self.issuer == other.issuer
    }

    /// Whether any subject alternative name is set.
    #[must_use]
    pub fn has_alt_names(&self) -> bool {
        !(self.dns_names.is_empty()
            && self.email_addresses.is_empty()
            && self.ip_addresses.is_empty()
            && self.uris.is_empty())
    }
}

/// Random positive 63-bit serial, derived the way the CA derives serials.
pub(crate) fn random_serial() -> u64 {
    let serial = uuid::Uuid::new_v4().as_u128() as u64;
    (serial >> 1).max(1)
}
