//! Root → intermediate → leaf chains, signed and parsed back.

use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, PublicKeyData,
};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

use x509_profile::options::{with_common_name, with_duration, with_hosts};
use x509_profile::{
    new_intermediate_profile, new_leaf_profile, new_leaf_profile_with_csr, new_root_profile,
    new_self_signed_leaf_profile, CertificateRequest, CertificateSigner, IssuedCertificate, Issuer,
    KeyAlgorithm, ProfileError, RcgenSigner,
};

fn parse(issued: &IssuedCertificate) -> X509Certificate<'_> {
    let (rest, cert) = X509Certificate::from_der(issued.der()).expect("valid DER");
    assert!(rest.is_empty());
    cert
}

fn chain() -> (IssuedCertificate, IssuedCertificate) {
    let root = new_root_profile("Example Root CA", vec![])
        .unwrap()
        .sign(&RcgenSigner)
        .unwrap();
    let intermediate = new_intermediate_profile("Example Issuing CA", &root.as_issuer(), vec![])
        .unwrap()
        .sign(&RcgenSigner)
        .unwrap();
    (root, intermediate)
}

fn dns_names(cert: &X509Certificate<'_>) -> Vec<String> {
    cert.subject_alternative_name()
        .unwrap()
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_root_and_intermediate_constraints() {
    let (root, intermediate) = chain();
    let root_cert = parse(&root);
    let ca_cert = parse(&intermediate);

    let root_bc = root_cert.basic_constraints().unwrap().unwrap().value;
    assert!(root_bc.ca);
    assert_eq!(root_bc.path_len_constraint, Some(1));
    assert_eq!(root_cert.subject(), root_cert.issuer());
    root_cert.verify_signature(None).unwrap();

    let ca_bc = ca_cert.basic_constraints().unwrap().unwrap().value;
    assert!(ca_bc.ca);
    assert_eq!(ca_bc.path_len_constraint, Some(0));
    assert_eq!(ca_cert.issuer(), root_cert.subject());
    ca_cert
        .verify_signature(Some(root_cert.public_key()))
        .unwrap();

    let usage = ca_cert.key_usage().unwrap().unwrap().value;
    assert!(usage.key_cert_sign());
    assert!(usage.crl_sign());
    assert!(!usage.key_encipherment());

    let eku = ca_cert.extended_key_usage().unwrap().unwrap().value;
    assert!(eku.any);
    assert!(eku.server_auth);
    assert_eq!(eku.other.len(), 3);

    let has_policies = ca_cert
        .extensions()
        .iter()
        .any(|ext| ext.oid.to_id_string() == "2.5.29.32");
    assert!(has_policies);
}

#[test]
fn test_leaf_signed_by_intermediate() {
    let (_, intermediate) = chain();
    let leaf = new_leaf_profile(
        "svc.example",
        &intermediate.as_issuer(),
        vec![with_hosts("svc.example,api.example,10.0.0.7")],
    )
    .unwrap()
    .sign(&RcgenSigner)
    .unwrap();

    let ca_cert = parse(&intermediate);
    let leaf_cert = parse(&leaf);
    leaf_cert
        .verify_signature(Some(ca_cert.public_key()))
        .unwrap();

    assert_eq!(leaf_cert.issuer(), ca_cert.subject());
    assert!(leaf_cert.basic_constraints().unwrap().is_none());
    assert_eq!(dns_names(&leaf_cert), vec!["svc.example", "api.example"]);

    let usage = leaf_cert.key_usage().unwrap().unwrap().value;
    assert!(usage.digital_signature());
    assert!(!usage.key_encipherment());
    assert!(!usage.key_cert_sign());

    let validity = leaf_cert.validity().not_after.timestamp()
        - leaf_cert.validity().not_before.timestamp();
    assert_eq!(validity, 24 * 60 * 60);
}

#[test]
fn test_leaf_from_csr() {
    let (_, intermediate) = chain();
    let requester = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params =
        CertificateParams::new(vec!["a.example".to_string(), "b.example".to_string()]).unwrap();
    params.distinguished_name.push(DnType::CommonName, "svc");
    let csr_pem = params.serialize_request(&requester).unwrap().pem().unwrap();

    let request = CertificateRequest::from_pem(&csr_pem).unwrap();
    let profile = new_leaf_profile_with_csr(&request, &intermediate.as_issuer(), vec![]).unwrap();
    assert_eq!(profile.subject_draft().dns_names, vec!["a.example", "b.example"]);

    let leaf = RcgenSigner.sign(profile).unwrap();
    let leaf_cert = parse(&leaf);
    assert_eq!(dns_names(&leaf_cert), vec!["a.example", "b.example"]);
    assert_eq!(
        leaf_cert.public_key().subject_public_key.data.as_ref(),
        requester.der_bytes()
    );
    assert!(!leaf.key().has_private_key());
}

#[test]
fn test_issuer_loaded_from_pem() {
    let (root, _) = chain();
    let key_pem = root.key().private_key().unwrap().to_pem().to_string();
    let issuer = Issuer::from_pem(&root.pem(), &key_pem).unwrap();
    assert_eq!(issuer.certificate.subject.common_name, "Example Root CA");
    assert!(issuer.certificate.is_ca);
    assert_eq!(issuer.key.algorithm(), KeyAlgorithm::EcdsaP256);

    let intermediate = new_intermediate_profile("Reloaded CA", &issuer, vec![])
        .unwrap()
        .sign(&RcgenSigner)
        .unwrap();
    parse(&intermediate)
        .verify_signature(Some(parse(&root).public_key()))
        .unwrap();
}

#[test]
fn test_external_issuer_name_is_copied_verbatim() {
    let ca_key = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::default();
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    // CN ahead of O, the reverse of how drafts are encoded
    params.distinguished_name.push(DnType::CommonName, "Ext CA");
    params.distinguished_name.push(DnType::OrganizationName, "Acme");
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
    let ca = params.self_signed(&ca_key).unwrap();

    let issuer = Issuer::from_pem(&ca.pem(), &ca_key.serialize_pem()).unwrap();
    assert_eq!(issuer.certificate_der(), Some(&ca.der()[..]));
    let leaf = new_leaf_profile("svc.example", &issuer, vec![])
        .unwrap()
        .sign(&RcgenSigner)
        .unwrap();

    let (_, ca_cert) = X509Certificate::from_der(ca.der()).unwrap();
    let leaf_cert = parse(&leaf);
    assert_eq!(leaf_cert.issuer().as_raw(), ca_cert.subject().as_raw());
    leaf_cert
        .verify_signature(Some(ca_cert.public_key()))
        .unwrap();
}

#[test]
fn test_self_signed_leaf_signs() {
    let leaf = new_self_signed_leaf_profile(
        "svc",
        vec![with_common_name("svc.internal"), with_duration(chrono::Duration::hours(1))],
    )
    .unwrap()
    .sign(&RcgenSigner)
    .unwrap();

    let cert = parse(&leaf);
    cert.verify_signature(None).unwrap();
    assert_eq!(cert.subject(), cert.issuer());
    assert_eq!(leaf.draft().subject.common_name, "svc.internal");
}

#[test]
fn test_issuer_capability_is_not_checked() {
    let (_, intermediate) = chain();
    let leaf = new_leaf_profile("svc.example", &intermediate.as_issuer(), vec![])
        .unwrap()
        .sign(&RcgenSigner)
        .unwrap();

    // the issuer's own CA flag is not inspected, only its private key
    let profile = new_intermediate_profile("rogue", &leaf.as_issuer(), vec![]).unwrap();
    assert_eq!(profile.subject_draft().max_path_len, Some(0));

    let public_only = Issuer::new(
        leaf.draft().clone(),
        x509_profile::KeyMaterial::public_only(leaf.key().public_key().clone()),
    );
    let err = new_leaf_profile("x", &public_only, vec![]).unwrap_err();
    assert!(matches!(err, ProfileError::MissingPrivateKey { .. }));
}
