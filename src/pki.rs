use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::{Digest, Sha256};

use crate::cert::SignatureAlgorithm;
use crate::error::{CertBundleError, Result};
use crate::key::{KeyPair, PublicKey};

/// Signs the provided data using the given key and signature algorithm.
///
/// ECDSA signatures are returned DER-encoded, as X.509 carries them.
pub fn sign_data(data: &[u8], key: &KeyPair, sig_alg: SignatureAlgorithm) -> Result<Vec<u8>> {
    match (sig_alg, key) {
        (SignatureAlgorithm::Sha256WithRSA, KeyPair::Rsa { private, .. }) => {
            let signing_key: RsaSigningKey<Sha256> = RsaSigningKey::new(*private.clone());
            let signature = signing_key
                .try_sign(data)
                .map_err(|e| CertBundleError::SigningError(e.to_string()))?;
            Ok(signature.to_vec())
        }
        (SignatureAlgorithm::Sha256WithECDSA, KeyPair::EcP256 { secret_key }) => {
            let signing_key = p256::ecdsa::SigningKey::from(secret_key);
            let signature: p256::ecdsa::Signature = signing_key
                .try_sign(data)
                .map_err(|e| CertBundleError::SigningError(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
        (SignatureAlgorithm::Sha256WithECDSA, KeyPair::EcP384 { secret_key }) => {
            // P-384 normally pairs with SHA-384; the digest is fixed to SHA-256 here.
            let signing_key = p384::ecdsa::SigningKey::from(secret_key);
            let signature: p384::ecdsa::Signature = signing_key
                .sign_prehash(&Sha256::digest(data))
                .map_err(|e| CertBundleError::SigningError(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
        (SignatureAlgorithm::Sha256WithECDSA, KeyPair::EcP521 { secret_key }) => {
            let signing_key =
                p521::ecdsa::SigningKey::from(ecdsa::SigningKey::<p521::NistP521>::from(secret_key));
            let signature: ecdsa::Signature<p521::NistP521> = signing_key
                .sign_prehash(&p521_prehash(data))
                .map_err(|e| CertBundleError::SigningError(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
        (alg, key) => Err(CertBundleError::SigningError(format!(
            "a {key:?} issuer key cannot sign with {alg:?}"
        ))),
    }
}

/// Verifies `signature` over `data` with the given public key.
///
/// Returns `Ok(false)` for a well-formed but wrong signature and an error for
/// algorithm/key combinations that cannot be checked.
pub fn verify_data(
    data: &[u8],
    signature: &[u8],
    key: &PublicKey,
    sig_alg: SignatureAlgorithm,
) -> Result<bool> {
    match (sig_alg, key) {
        (SignatureAlgorithm::Sha256WithRSA, PublicKey::Rsa(public)) => {
            let verifying_key: RsaVerifyingKey<Sha256> = RsaVerifyingKey::new(public.clone());
            let Ok(signature) = RsaSignature::try_from(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        (SignatureAlgorithm::Sha256WithECDSA, PublicKey::EcP256(public)) => {
            let verifying_key = p256::ecdsa::VerifyingKey::from(public);
            let Ok(signature) = p256::ecdsa::Signature::from_der(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        (SignatureAlgorithm::Sha256WithECDSA, PublicKey::EcP384(public)) => {
            let verifying_key = p384::ecdsa::VerifyingKey::from(public);
            let Ok(signature) = p384::ecdsa::Signature::from_der(signature) else {
                return Ok(false);
            };
            Ok(verifying_key
                .verify_prehash(&Sha256::digest(data), &signature)
                .is_ok())
        }
        (SignatureAlgorithm::Sha256WithECDSA, PublicKey::EcP521(public)) => {
            let verifying_key = ecdsa::VerifyingKey::<p521::NistP521>::from(public);
            let Ok(signature) = ecdsa::Signature::<p521::NistP521>::from_der(signature) else {
                return Ok(false);
            };
            Ok(verifying_key
                .verify_prehash(&p521_prehash(data), &signature)
                .is_ok())
        }
        (SignatureAlgorithm::Sha256WithRSA, _) | (SignatureAlgorithm::Sha256WithECDSA, _) => {
            Err(CertBundleError::UnsupportedKeyError(format!(
                "cannot verify {sig_alg:?} with a {:?} key",
                key.family()
            )))
        }
    }
}

/// SHA-256 digest left-padded to the 66-byte P-521 field size. The integer
/// value is unchanged, and `ecdsa` refuses prehashes under half the field.
fn p521_prehash(data: &[u8]) -> [u8; 66] {
    let mut prehash = [0u8; 66];
    prehash[66 - 32..].copy_from_slice(&Sha256::digest(data));
    prehash
}
