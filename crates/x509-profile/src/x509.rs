//! Conversions from parsed x509-parser structures.

use chrono::{DateTime, TimeZone, Utc};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::extensions::{GeneralName, X509Extension};
use x509_parser::oid_registry::asn1_rs::oid;
use x509_parser::time::ASN1Time;
use x509_parser::x509::{AttributeTypeAndValue, SubjectPublicKeyInfo, X509Name};

use crate::draft::Extension;
use crate::key::{KeyAlgorithm, PublicKey};
use crate::name::DistinguishedName;
use crate::oid::Oid;
use crate::{ProfileError, Result};

/// Subject alternative names split by kind.
#[derive(Debug, Default)]
pub(crate) struct AltNames {
    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
}

impl AltNames {
    pub fn push(&mut self, name: &GeneralName<'_>) -> Result<()> {
        match name {
            GeneralName::DNSName(dns) => self.dns_names.push((*dns).to_string()),
            GeneralName::RFC822Name(email) => self.email_addresses.push((*email).to_string()),
            GeneralName::URI(uri) => self.uris.push((*uri).to_string()),
            GeneralName::IPAddress(bytes) => self.ip_addresses.push(ip_from_bytes(bytes)?),
            // other name forms have no draft field
            _ => {}
        }
        Ok(())
    }
}

pub(crate) fn distinguished_name(name: &X509Name<'_>) -> DistinguishedName {
    DistinguishedName {
        common_name: values(name.iter_common_name())
            .into_iter()
            .next()
            .unwrap_or_default(),
        organization: values(name.iter_organization()),
        organizational_unit: values(name.iter_organizational_unit()),
        country: values(name.iter_country()),
        province: values(name.iter_state_or_province()),
        locality: values(name.iter_locality()),
    }
}

fn values<'a, 'b: 'a>(iter: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>) -> Vec<String> {
    iter.filter_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .collect()
}

/// Public key from a SubjectPublicKeyInfo, classifying the algorithm.
pub(crate) fn public_key(spki: &SubjectPublicKeyInfo<'_>) -> Result<PublicKey> {
    let algorithm = detect_algorithm(spki).ok_or_else(|| {
        ProfileError::Request(format!(
            "unsupported public key algorithm {}",
            spki.algorithm.algorithm.to_id_string()
        ))
    })?;
    Ok(PublicKey::new(
        algorithm,
        spki.subject_public_key.data.to_vec(),
    ))
}

fn detect_algorithm(spki: &SubjectPublicKeyInfo<'_>) -> Option<KeyAlgorithm> {
    let rsa_oid = oid!(1.2.840 .113549 .1 .1 .1); // RSA encryption
    let ec_oid = oid!(1.2.840 .10045 .2 .1); // id-ecPublicKey
    let ed25519_oid = oid!(1.3.101 .112); // Ed25519
    let secp256r1_oid = oid!(1.2.840 .10045 .3 .1 .7); // secp256r1/prime256v1
    let secp384r1_oid = oid!(1.3.132 .0 .34); // secp384r1

    let alg = &spki.algorithm;
    if alg.algorithm == ed25519_oid {
        return Some(KeyAlgorithm::Ed25519);
    }
    if alg.algorithm == rsa_oid {
        return Some(KeyAlgorithm::Rsa);
    }
    if alg.algorithm == ec_oid {
        let curve = alg.parameters.as_ref()?.as_oid().ok()?;
        if curve == secp256r1_oid {
            return Some(KeyAlgorithm::EcdsaP256);
        }
        if curve == secp384r1_oid {
            return Some(KeyAlgorithm::EcdsaP384);
        }
    }
    None
}

/// Copy an extension verbatim.
pub(crate) fn extension(ext: &X509Extension<'_>) -> Result<Extension> {
    let arcs: Vec<u64> = ext
        .oid
        .iter()
        .ok_or_else(|| {
            ProfileError::Request(format!(
                "extension identifier {} has oversized arcs",
                ext.oid.to_id_string()
            ))
        })?
        .collect();
    Ok(Extension {
        oid: Oid::new(arcs).map_err(|e| ProfileError::Request(e.to_string()))?,
        critical: ext.critical,
        value: ext.value.to_vec(),
    })
}

/// Convert an ASN.1 `GeneralizedTime` / `UTCTime` to `DateTime<Utc>`.
pub(crate) fn asn1_to_utc(t: ASN1Time) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .ok_or_else(|| ProfileError::Request(format!("time out of range: {t}")))
}

fn ip_from_bytes(bytes: &[u8]) -> Result<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    Err(ProfileError::Request(format!(
        "IP address SAN has invalid length {}",
        bytes.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_from_bytes() {
        assert_eq!(
            ip_from_bytes(&[10, 0, 0, 1]).unwrap(),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
        let v6 = ip_from_bytes(&[0u8; 16]).unwrap();
        assert!(v6.is_ipv6());
        assert!(ip_from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_alt_names_split_by_kind() {
        let mut names = AltNames::default();
        names.push(&GeneralName::DNSName("a.example")).unwrap();
        names.push(&GeneralName::RFC822Name("ops@a.example")).unwrap();
        names.push(&GeneralName::URI("spiffe://a/b")).unwrap();
        names.push(&GeneralName::IPAddress(&[127, 0, 0, 1])).unwrap();

        assert_eq!(names.dns_names, vec!["a.example"]);
        assert_eq!(names.email_addresses, vec!["ops@a.example"]);
        assert_eq!(names.uris, vec!["spiffe://a/b"]);
        assert_eq!(names.ip_addresses.len(), 1);
    }
}
