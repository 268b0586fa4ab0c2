//! Private key decoding from the PKCS#8, PKCS#1 and SEC1 structures found in
//! PEM files and PKCS#12 containers.

use const_oid::db::rfc5912;
use der::Decode;
use pkcs8::{DecodePrivateKey, PrivateKeyInfo};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::{EcCurve, KeyPair};
use crate::error::{CertBundleError, Result};
use crate::pem_utils::{EC_PRIVATE_KEY_TAG, PRIVATE_KEY_TAG, RSA_PRIVATE_KEY_TAG};

impl KeyPair {
    /// Decodes a PKCS#8 `PrivateKeyInfo` holding an RSA, DSA or EC key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        match info.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => rsa_key_pair(RsaPrivateKey::from_pkcs8_der(der)?),
            rfc5912::ID_DSA => Ok(KeyPair::Dsa {
                signing_key: Box::new(dsa::SigningKey::from_pkcs8_der(der)?),
            }),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = EcCurve::from_oid(info.algorithm.parameters_oid()?)?;
                Ok(match curve {
                    EcCurve::P256 => KeyPair::EcP256 {
                        secret_key: p256::SecretKey::from_pkcs8_der(der)?,
                    },
                    EcCurve::P384 => KeyPair::EcP384 {
                        secret_key: p384::SecretKey::from_pkcs8_der(der)?,
                    },
                    EcCurve::P521 => KeyPair::EcP521 {
                        secret_key: p521::SecretKey::from_pkcs8_der(der)?,
                    },
                })
            }
            other => Err(CertBundleError::UnsupportedKeyError(format!(
                "private key algorithm {other}"
            ))),
        }
    }

    /// Decodes a PKCS#1 `RSAPrivateKey`.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        rsa_key_pair(RsaPrivateKey::from_pkcs1_der(der)?)
    }

    /// Decodes a SEC1 `ECPrivateKey`.
    ///
    /// The curve comes from the optional parameters, or else from the length
    /// of the private scalar.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        let parsed = sec1::EcPrivateKey::from_der(der)?;
        let curve = match parsed.parameters.and_then(|params| params.named_curve()) {
            Some(curve_oid) => EcCurve::from_oid(curve_oid)?,
            None => curve_for_scalar_len(parsed.private_key.len())?,
        };
        let sec1_error =
            |e: p256::elliptic_curve::Error| CertBundleError::DecodingError(e.to_string());
        Ok(match curve {
            EcCurve::P256 => KeyPair::EcP256 {
                secret_key: p256::SecretKey::from_sec1_der(der).map_err(sec1_error)?,
            },
            EcCurve::P384 => KeyPair::EcP384 {
                secret_key: p384::SecretKey::from_sec1_der(der).map_err(sec1_error)?,
            },
            EcCurve::P521 => KeyPair::EcP521 {
                secret_key: p521::SecretKey::from_sec1_der(der).map_err(sec1_error)?,
            },
        })
    }

    /// Decodes a private key from a PEM block.
    ///
    /// Returns `Ok(None)` when the block is not a private key at all, so callers
    /// scanning a mixed stream can skip it.
    pub fn from_pem_block(block: &pem::Pem) -> Result<Option<Self>> {
        let key = match block.tag() {
            PRIVATE_KEY_TAG => Self::from_pkcs8_der(block.contents())?,
            RSA_PRIVATE_KEY_TAG => Self::from_pkcs1_der(block.contents())?,
            EC_PRIVATE_KEY_TAG => Self::from_sec1_der(block.contents())?,
            _ => return Ok(None),
        };
        Ok(Some(key))
    }

    /// Decodes the first private key found in a PEM text.
    pub fn from_pem(input: &str) -> Result<Self> {
        for block in crate::pem_utils::parse_blocks(input.as_bytes())? {
            if let Some(key) = Self::from_pem_block(&block)? {
                return Ok(key);
            }
        }
        Err(CertBundleError::DecodingError(
            "no private key block found".to_string(),
        ))
    }
}

fn curve_for_scalar_len(len: usize) -> Result<EcCurve> {
    match len {
        32 => Ok(EcCurve::P256),
        48 => Ok(EcCurve::P384),
        66 => Ok(EcCurve::P521),
        _ => Err(CertBundleError::UnsupportedKeyError(format!(
            "EC private key of {len} bytes without curve parameters"
        ))),
    }
}

fn rsa_key_pair(private: RsaPrivateKey) -> Result<KeyPair> {
    let public = RsaPublicKey::from(&private);
    Ok(KeyPair::Rsa {
        private: Box::new(private),
        public,
    })
}
