use der::Encode;
use rand_core::CryptoRngCore;
use tracing::debug;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificateRequest, ExtensionParam};
use crate::error::{CertBundleError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::pki::sign_data;
use crate::tbs_certificate::TbsCertificate;

/// Length of generated serial numbers, in bytes.
const SERIAL_NUMBER_LEN: usize = 16;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name written into issued certificates.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the issuer's public key, used for the Authority Key Identifier.
    ///
    /// `None` for self-issued certificates, which then carry no AKI.
    fn issuer_public_key(&self) -> Option<PublicKey>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> Result<&KeyPair>;

    /// Issues a certificate for `subject_public_key` described by `request`.
    fn issue<R: CryptoRngCore + ?Sized>(
        &self,
        rng: &mut R,
        request: &CertificateRequest,
        subject_public_key: &PublicKey,
    ) -> Result<Certificate> {
        let issuer_public_key = self.issuer_public_key();
        build_certificate(
            rng,
            request,
            subject_public_key,
            &self.issuer_name()?,
            issuer_public_key.as_ref(),
            self.signing_key()?,
        )
    }
}

/// Issuer for self-signed certificates: the subject signs with its own key.
pub struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl<'a> SelfIssuer<'a> {
    /// The issuer name is the subject name derived from `request`.
    pub fn new(request: &CertificateRequest, key: &'a KeyPair) -> Result<Self> {
        Ok(Self {
            name: request.subject_name()?,
            key,
        })
    }
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn issuer_public_key(&self) -> Option<PublicKey> {
        None
    }

    fn signing_key(&self) -> Result<&KeyPair> {
        Ok(self.key)
    }
}

/// Builds and signs an X.509 v3 certificate.
///
/// Extensions are emitted in this order, when applicable:
/// Authority Key Identifier (only with `issuer_public_key`), Subject Key
/// Identifier, Subject Alternative Name (non-CA, or CA with several domains),
/// Key Usage (critical, non-empty flags only), Extended Key Usage (non-empty
/// list only) and Basic Constraints (critical, always).
///
/// The signature algorithm follows the family of `issuer_key`, never the
/// subject key.
pub fn build_certificate<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    request: &CertificateRequest,
    subject_public_key: &PublicKey,
    issuer_name: &Name,
    issuer_public_key: Option<&PublicKey>,
    issuer_key: &KeyPair,
) -> Result<Certificate> {
    request.validate()?;

    let subject = request.subject_name()?;
    let signature_algorithm = SignatureAlgorithm::for_issuer_key(issuer_key);

    let mut extensions: Vec<ExtensionParam> = Vec::with_capacity(6);

    if let Some(issuer_public_key) = issuer_public_key {
        let authority_key_id = AuthorityKeyIdentifier(issuer_public_key.key_identifier()?);
        extensions.push(ExtensionParam::from_extension(&authority_key_id, false)?);
    }

    let subject_key_id = SubjectKeyIdentifier(subject_public_key.key_identifier()?);
    extensions.push(ExtensionParam::from_extension(&subject_key_id, false)?);

    if request.includes_subject_alt_name() {
        let san = SubjectAltName {
            dns_names: request.domains.clone(),
        };
        extensions.push(ExtensionParam::from_extension(&san, false)?);
    }

    if !request.key_usage.is_empty() {
        extensions.push(ExtensionParam::from_extension(
            &KeyUsage(request.key_usage),
            true,
        )?);
    }

    if !request.extended_key_usage.is_empty() {
        let extended_key_usage = ExtendedKeyUsage(request.extended_key_usage.clone());
        extensions.push(ExtensionParam::from_extension(&extended_key_usage, false)?);
    }

    let basic_constraints = BasicConstraints {
        ca: request.is_ca(),
        path_len: None,
    };
    extensions.push(ExtensionParam::from_extension(&basic_constraints, true)?);

    let tbs_cert = TbsCertificate {
        serial_number: random_serial_number(rng),
        signature_algorithm,
        issuer: issuer_name.clone(),
        not_before: request.validity.not_before,
        not_after: request.validity.not_after,
        subject,
        subject_public_key: subject_public_key.clone(),
        extensions,
    };

    let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
    let tbs_der = tbs_cert_inner
        .to_der()
        .map_err(|e| CertBundleError::EncodingError(e.to_string()))?;
    let signature = sign_data(&tbs_der, issuer_key, signature_algorithm)?;

    debug!(
        subject = %tbs_cert.subject,
        issuer = %tbs_cert.issuer,
        subject_key = ?subject_public_key.family(),
        ?signature_algorithm,
        is_ca = request.is_ca(),
        "issued certificate"
    );

    let cert_inner = CertificateInner {
        tbs_certificate: tbs_cert_inner,
        signature_algorithm: signature_algorithm.into(),
        signature: der::asn1::BitString::from_bytes(&signature)?,
    };

    Ok(Certificate { inner: cert_inner })
}

/// A positive serial with the top bit clear and the next one set, so the DER
/// INTEGER always spans the full length.
fn random_serial_number<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut bytes = vec![0u8; SERIAL_NUMBER_LEN];
    rng.fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    bytes
}
