//! Key material and the key-generation collaborator.

use rcgen::{KeyPair, PublicKeyData, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{ProfileError, Result};

/// Key algorithm choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    /// ECDSA with P-256 curve (recommended for speed)
    #[default]
    EcdsaP256,
    /// ECDSA with P-384 curve (higher security)
    EcdsaP384,
    /// Ed25519
    Ed25519,
    /// RSA of any modulus size (legacy compatibility)
    Rsa,
}

impl KeyAlgorithm {
    /// Whether this is an RSA key; only RSA keys may carry keyEncipherment.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rsa)
    }

    /// The signature algorithm rcgen uses for keys of this kind.
    #[must_use]
    pub fn signature_algorithm(self) -> &'static SignatureAlgorithm {
        match self {
            Self::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            Self::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
            Self::Ed25519 => &rcgen::PKCS_ED25519,
            Self::Rsa => &rcgen::PKCS_RSA_SHA256,
        }
    }

    fn from_signature_algorithm(alg: &SignatureAlgorithm) -> Option<Self> {
        if alg == &rcgen::PKCS_ECDSA_P256_SHA256 {
            Some(Self::EcdsaP256)
        } else if alg == &rcgen::PKCS_ECDSA_P384_SHA384 {
            Some(Self::EcdsaP384)
        } else if alg == &rcgen::PKCS_ED25519 {
            Some(Self::Ed25519)
        } else if alg == &rcgen::PKCS_RSA_SHA256
            || alg == &rcgen::PKCS_RSA_SHA384
            || alg == &rcgen::PKCS_RSA_SHA512
        {
            Some(Self::Rsa)
        } else {
            None
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EcdsaP256 => "ECDSA P-256",
            Self::EcdsaP384 => "ECDSA P-384",
            Self::Ed25519 => "Ed25519",
            Self::Rsa => "RSA",
        })
    }
}

/// A subject public key: the algorithm plus the raw `subjectPublicKey` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Key algorithm
    pub algorithm: KeyAlgorithm,
    /// Contents of the SPKI `subjectPublicKey` bit string
    pub bytes: Vec<u8>,
}

impl PublicKey {
    /// Build a public key from its algorithm and raw bytes.
    #[must_use]
    pub fn new(algorithm: KeyAlgorithm, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            bytes: bytes.into(),
        }
    }
}

impl PublicKeyData for PublicKey {
    fn der_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn algorithm(&self) -> &'static SignatureAlgorithm {
        self.algorithm.signature_algorithm()
    }
}

/// A PKCS#8 private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    algorithm: KeyAlgorithm,
    pkcs8_pem: String,
}

impl PrivateKey {
    /// Key algorithm
    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// PKCS#8 PEM encoding
    #[must_use]
    pub fn to_pem(&self) -> &str {
        &self.pkcs8_pem
    }

    pub(crate) fn key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_pem(&self.pkcs8_pem)
            .map_err(|e| ProfileError::Signing(format!("failed to load private key: {e}")))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A public key with, optionally, its private half.
///
/// Public-only material is what a leaf built from a CSR or a caller-supplied
/// public key carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl KeyMaterial {
    /// Public-only key material.
    #[must_use]
    pub const fn public_only(public: PublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    /// Load a key pair from a PKCS#8 PEM document.
    ///
    /// # Errors
    ///
    /// Fails when the document is not a supported PKCS#8 key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let key_pair = KeyPair::from_pem(pem)
            .map_err(|e| ProfileError::InvalidOption(format!("invalid private key: {e}")))?;
        Self::from_key_pair(&key_pair)
    }

    pub(crate) fn from_key_pair(key_pair: &KeyPair) -> Result<Self> {
        let algorithm = KeyAlgorithm::from_signature_algorithm(PublicKeyData::algorithm(key_pair))
            .ok_or_else(|| {
                ProfileError::InvalidOption("unsupported private key algorithm".to_string())
            })?;
        Ok(Self {
            public: PublicKey::new(algorithm, key_pair.der_bytes()),
            private: Some(PrivateKey {
                algorithm,
                pkcs8_pem: key_pair.serialize_pem(),
            }),
        })
    }

    /// The public half.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The private half, if present.
    #[must_use]
    pub const fn private_key(&self) -> Option<&PrivateKey> {
        self.private.as_ref()
    }

    /// Whether this material can sign.
    #[must_use]
    pub const fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Algorithm of the public half.
    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.public.algorithm
    }
}

/// The key-generation collaborator.
pub trait KeyGenerator {
    /// Generate fresh key material for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::KeyGenerationFailed`] when the algorithm is
    /// unsupported or the backend fails.
    fn generate(&self, algorithm: KeyAlgorithm) -> Result<KeyMaterial>;
}

impl<G: KeyGenerator + ?Sized> KeyGenerator for &G {
    fn generate(&self, algorithm: KeyAlgorithm) -> Result<KeyMaterial> {
        (**self).generate(algorithm)
    }
}

/// Key generation backed by rcgen's ring provider.
///
/// RSA generation is not available through this backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct RcgenKeyGenerator;

impl KeyGenerator for RcgenKeyGenerator {
    fn generate(&self, algorithm: KeyAlgorithm) -> Result<KeyMaterial> {
        if algorithm.is_rsa() {
            return Err(ProfileError::KeyGenerationFailed {
                algorithm,
                reason: "RSA key generation is not supported".to_string(),
            });
        }
        debug!(%algorithm, "generating key pair");
        let key_pair = KeyPair::generate_for(algorithm.signature_algorithm()).map_err(|e| {
            ProfileError::KeyGenerationFailed {
                algorithm,
                reason: e.to_string(),
            }
        })?;
        KeyMaterial::from_key_pair(&key_pair).map_err(|e| ProfileError::KeyGenerationFailed {
            algorithm,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ecdsa() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::EcdsaP256).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaP256);
        assert!(key.has_private_key());
        // uncompressed point
        assert_eq!(key.public_key().bytes.len(), 65);
        assert!(key.private_key().unwrap().to_pem().contains("PRIVATE KEY"));
    }

    #[test]
    fn test_generate_ed25519() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::Ed25519).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Ed25519);
        assert_eq!(key.public_key().bytes.len(), 32);
    }

    #[test]
    fn test_rsa_generation_unsupported() {
        let err = RcgenKeyGenerator.generate(KeyAlgorithm::Rsa).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::KeyGenerationFailed {
                algorithm: KeyAlgorithm::Rsa,
                ..
            }
        ));
    }

    #[test]
    fn test_pem_round_trip_keeps_public_key() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::EcdsaP384).unwrap();
        let pem = key.private_key().unwrap().to_pem().to_string();
        let loaded = KeyMaterial::from_pkcs8_pem(&pem).unwrap();
        assert_eq!(loaded.public_key(), key.public_key());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::EcdsaP256).unwrap();
        let debug = format!("{:?}", key.private_key().unwrap());
        assert!(!debug.contains("BEGIN"));
    }

    #[test]
    fn test_public_only_material() {
        let key = RcgenKeyGenerator.generate(KeyAlgorithm::EcdsaP256).unwrap();
        let public = KeyMaterial::public_only(key.public_key().clone());
        assert!(!public.has_private_key());
        assert_eq!(public.algorithm(), KeyAlgorithm::EcdsaP256);
    }
}
