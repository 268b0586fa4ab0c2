pub mod decode;
pub mod matching;

use core::fmt;
use core::str::FromStr;

use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912;
use der::{Decode, Encode};
use pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand_core::CryptoRngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CertBundleError, Result};

/// Smallest RSA modulus the generator accepts, in bits.
pub const MIN_RSA_BITS: usize = 512;

/// The asymmetric key families the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Dsa,
    Ec,
}

/// Named curves supported for EC keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256, a.k.a. secp256r1 / prime256v1.
    P256,
    /// NIST P-384, a.k.a. secp384r1.
    P384,
    /// NIST P-521, a.k.a. secp521r1.
    P521,
}

impl EcCurve {
    /// The SEC name of the curve.
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "secp256r1",
            EcCurve::P384 => "secp384r1",
            EcCurve::P521 => "secp521r1",
        }
    }

    /// The named-curve object identifier used in SPKI and SEC1 parameters.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            EcCurve::P256 => rfc5912::SECP_256_R_1,
            EcCurve::P384 => rfc5912::SECP_384_R_1,
            EcCurve::P521 => rfc5912::SECP_521_R_1,
        }
    }

    /// Looks a curve up by its named-curve object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            rfc5912::SECP_256_R_1 => Ok(EcCurve::P256),
            rfc5912::SECP_384_R_1 => Ok(EcCurve::P384),
            rfc5912::SECP_521_R_1 => Ok(EcCurve::P521),
            other => Err(CertBundleError::UnsupportedKeyError(format!(
                "elliptic curve {other}"
            ))),
        }
    }
}

impl FromStr for EcCurve {
    type Err = CertBundleError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "secp256r1" | "prime256v1" | "p-256" | "p256" | "nistp256" => Ok(EcCurve::P256),
            "secp384r1" | "p-384" | "p384" | "nistp384" => Ok(EcCurve::P384),
            "secp521r1" | "p-521" | "p521" | "nistp521" => Ok(EcCurve::P521),
            _ => Err(CertBundleError::UnknownCurveError(name.to_string())),
        }
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selects the kind of key pair generated for a new certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// RSA with the given modulus size in bits.
    Rsa { bits: usize },
    /// EC on the given named curve.
    Ec(EcCurve),
}

impl Default for KeySpec {
    fn default() -> Self {
        KeySpec::Rsa { bits: 2048 }
    }
}

/// An asymmetric key pair.
///
/// The public half is always derivable from the private half, so only what is
/// needed to rebuild both is stored.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    Dsa {
        signing_key: Box<dsa::SigningKey>,
    },
    EcP256 {
        secret_key: p256::SecretKey,
    },
    EcP384 {
        secret_key: p384::SecretKey,
    },
    EcP521 {
        secret_key: p521::SecretKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        match self.curve() {
            Some(curve) => write!(f, "KeyPair::Ec({curve})"),
            None => write!(f, "KeyPair::{:?}", self.family()),
        }
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa<R: CryptoRngCore + ?Sized>(rng: &mut R, bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(CertBundleError::KeyGenerationError(format!(
                "RSA key size {bits} is below the minimum of {MIN_RSA_BITS} bits"
            )));
        }
        let private = RsaPrivateKey::new(rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an EC key pair on the given curve.
    pub fn generate_ec<R: CryptoRngCore + ?Sized>(rng: &mut R, curve: EcCurve) -> Self {
        // `SecretKey::random` wants a sized RNG; `&mut R` is one.
        let rng = &mut &mut *rng;
        match curve {
            EcCurve::P256 => KeyPair::EcP256 {
                secret_key: p256::SecretKey::random(rng),
            },
            EcCurve::P384 => KeyPair::EcP384 {
                secret_key: p384::SecretKey::random(rng),
            },
            EcCurve::P521 => KeyPair::EcP521 {
                secret_key: p521::SecretKey::random(rng),
            },
        }
    }

    /// Generate an EC key pair on a curve given by name, e.g. `"secp256r1"`.
    pub fn generate_ec_named<R: CryptoRngCore + ?Sized>(rng: &mut R, name: &str) -> Result<Self> {
        let curve = name.parse::<EcCurve>()?;
        Ok(Self::generate_ec(rng, curve))
    }

    /// Generate a key pair as described by `key_spec`.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R, key_spec: KeySpec) -> Result<Self> {
        debug!(?key_spec, "generating key pair");
        match key_spec {
            KeySpec::Rsa { bits } => Self::generate_rsa(rng, bits),
            KeySpec::Ec(curve) => Ok(Self::generate_ec(rng, curve)),
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            KeyPair::Rsa { .. } => KeyFamily::Rsa,
            KeyPair::Dsa { .. } => KeyFamily::Dsa,
            KeyPair::EcP256 { .. } | KeyPair::EcP384 { .. } | KeyPair::EcP521 { .. } => {
                KeyFamily::Ec
            }
        }
    }

    /// The curve of an EC key pair, `None` for other families.
    pub fn curve(&self) -> Option<EcCurve> {
        match self {
            KeyPair::EcP256 { .. } => Some(EcCurve::P256),
            KeyPair::EcP384 { .. } => Some(EcCurve::P384),
            KeyPair::EcP521 { .. } => Some(EcCurve::P521),
            _ => None,
        }
    }

    /// The public half of the key pair.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::Dsa { signing_key } => PublicKey::Dsa(signing_key.verifying_key().clone()),
            KeyPair::EcP256 { secret_key } => PublicKey::EcP256(secret_key.public_key()),
            KeyPair::EcP384 { secret_key } => PublicKey::EcP384(secret_key.public_key()),
            KeyPair::EcP521 { secret_key } => PublicKey::EcP521(secret_key.public_key()),
        }
    }

    /// Encodes the private key as PKCS#8 DER.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der(),
            KeyPair::Dsa { signing_key } => signing_key.to_pkcs8_der(),
            KeyPair::EcP256 { secret_key } => secret_key.to_pkcs8_der(),
            KeyPair::EcP384 { secret_key } => secret_key.to_pkcs8_der(),
            KeyPair::EcP521 { secret_key } => secret_key.to_pkcs8_der(),
        }
        .map_err(|e| CertBundleError::EncodingError(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Encodes the private key as a PKCS#8 `PRIVATE KEY` PEM block.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let der = self.to_pkcs8_der()?;
        Ok(crate::pem_utils::der_to_pem(
            &der,
            crate::pem_utils::PRIVATE_KEY_TAG,
        ))
    }
}

/// A public key of one of the supported families.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Dsa(dsa::VerifyingKey),
    EcP256(p256::PublicKey),
    EcP384(p384::PublicKey),
    EcP521(p521::PublicKey),
}

impl PublicKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            PublicKey::Rsa(_) => KeyFamily::Rsa,
            PublicKey::Dsa(_) => KeyFamily::Dsa,
            PublicKey::EcP256(_) | PublicKey::EcP384(_) | PublicKey::EcP521(_) => KeyFamily::Ec,
        }
    }

    /// Encodes the key as an X.509 `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let der = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::Dsa(key) => key.to_public_key_der(),
            PublicKey::EcP256(key) => key.to_public_key_der(),
            PublicKey::EcP384(key) => key.to_public_key_der(),
            PublicKey::EcP521(key) => key.to_public_key_der(),
        }
        .map_err(|e| CertBundleError::EncodingError(e.to_string()))?;
        Ok(SubjectPublicKeyInfoOwned::from_der(der.as_bytes())?)
    }

    /// Decodes a key from an X.509 `SubjectPublicKeyInfo`.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?)),
            rfc5912::ID_DSA => Ok(PublicKey::Dsa(dsa::VerifyingKey::from_public_key_der(&der)?)),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve_oid = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())
                    .ok_or_else(|| {
                        CertBundleError::DecodingError(
                            "EC public key without a named curve".to_string(),
                        )
                    })?;
                match EcCurve::from_oid(curve_oid)? {
                    EcCurve::P256 => Ok(PublicKey::EcP256(p256::PublicKey::from_public_key_der(
                        &der,
                    )?)),
                    EcCurve::P384 => Ok(PublicKey::EcP384(p384::PublicKey::from_public_key_der(
                        &der,
                    )?)),
                    EcCurve::P521 => Ok(PublicKey::EcP521(p521::PublicKey::from_public_key_der(
                        &der,
                    )?)),
                }
            }
            other => Err(CertBundleError::UnsupportedKeyError(format!(
                "public key algorithm {other}"
            ))),
        }
    }

    /// SHA-1 over the `subjectPublicKey` bits, the RFC 5280 key identifier.
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        use sha1::Digest;
        let spki = self.to_spki()?;
        Ok(sha1::Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
    }
}
