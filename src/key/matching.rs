//! Deciding whether a private key belongs to a certificate.
//!
//! Each family compares the certificate's public key against the public
//! component recomputed from the private key. Mixing families never matches.

use p256::elliptic_curve::{CurveArithmetic, PublicKey as EcPublicKey, SecretKey as EcSecretKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use super::{KeyPair, PublicKey};
use crate::cert::Certificate;

/// Returns true if the certificate carries the public key matching `key`.
///
/// Supports RSA, DSA and EC keys. A certificate whose public key cannot be
/// decoded, or whose family differs from the key's, does not match.
pub fn does_key_match_certificate(cert: &Certificate, key: &KeyPair) -> bool {
    let public = match cert.public_key() {
        Ok(public) => public,
        Err(e) => {
            debug!(subject = %cert.subject_name(), error = %e, "certificate key not decodable");
            return false;
        }
    };
    public_key_matches(&public, key)
}

/// Family dispatch shared by certificates and bare public keys.
pub fn public_key_matches(public: &PublicKey, key: &KeyPair) -> bool {
    match (public, key) {
        (PublicKey::Rsa(public), KeyPair::Rsa { private, .. }) => rsa_matches(public, private),
        (PublicKey::Dsa(public), KeyPair::Dsa { signing_key }) => dsa_matches(public, signing_key),
        (PublicKey::EcP256(public), KeyPair::EcP256 { secret_key }) => {
            ec_matches(public, secret_key)
        }
        (PublicKey::EcP384(public), KeyPair::EcP384 { secret_key }) => {
            ec_matches(public, secret_key)
        }
        (PublicKey::EcP521(public), KeyPair::EcP521 { secret_key }) => {
            ec_matches(public, secret_key)
        }
        _ => false,
    }
}

/// Public exponent and modulus must both agree.
fn rsa_matches(public: &RsaPublicKey, private: &RsaPrivateKey) -> bool {
    public.e() == private.e() && public.n() == private.n()
}

/// `y == g^x mod p` under the private key's domain parameters.
fn dsa_matches(public: &dsa::VerifyingKey, private: &dsa::SigningKey) -> bool {
    let components = private.verifying_key().components();
    let expected = components.g().modpow(private.x(), components.p());
    *public.y() == expected
}

/// `Q == d·G` on the private key's curve.
fn ec_matches<C: CurveArithmetic>(public: &EcPublicKey<C>, private: &EcSecretKey<C>) -> bool {
    *public == private.public_key()
}
