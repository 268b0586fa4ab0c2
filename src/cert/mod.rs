pub mod extensions;
pub mod params;

use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912;
use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use der::{Any, Decode, Encode, Tag, Tagged};
use extensions::{BasicConstraints, ToAndFromX509Extension};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{CertBundleError, Result};
use crate::key::{KeyFamily, KeyPair, PublicKey};
use crate::pem_utils::{self, CERTIFICATE_TAG};
use crate::tbs_certificate::from_x509_time;

/// Represents the supported signature algorithms for certificates.
///
/// The digest is always SHA-256; the algorithm family follows the issuer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
}

impl SignatureAlgorithm {
    /// Picks the algorithm an issuer key signs with.
    ///
    /// EC issuers use ECDSA; every other family is treated as RSA, which
    /// makes a DSA issuer fail at signing time.
    pub fn for_issuer_key(key: &KeyPair) -> Self {
        match key.family() {
            KeyFamily::Ec => SignatureAlgorithm::Sha256WithECDSA,
            KeyFamily::Rsa | KeyFamily::Dsa => SignatureAlgorithm::Sha256WithRSA,
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => rfc5912::ECDSA_WITH_SHA_256,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            rfc5912::SHA_256_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::Sha256WithRSA),
            rfc5912::ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::Sha256WithECDSA),
            other => Err(CertBundleError::UnsupportedKeyError(format!(
                "signature algorithm {other}"
            ))),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// RSA carries explicit NULL parameters (RFC 4055), ECDSA carries none (RFC 5758).
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRSA => Some(Any::null()),
            SignatureAlgorithm::Sha256WithECDSA => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM
/// formats and to inspect the fields the bundle operations rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertBundleError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into a `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, CERTIFICATE_TAG))
    }

    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    /// Parses the first `CERTIFICATE` block of a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let block = pem_utils::parse_blocks(pem.as_bytes())?
            .into_iter()
            .find(|block| block.tag() == CERTIFICATE_TAG)
            .ok_or_else(|| {
                CertBundleError::DecodingError("no CERTIFICATE block found".to_string())
            })?;
        Self::from_der(block.contents())
    }

    /// Human-readable subject: the common name when present, otherwise the
    /// subject DN with a leading `CN=` removed, or `"Unknown"` for an empty DN.
    pub fn subject_name(&self) -> String {
        if let Some(cn) = self.common_name() {
            return cn;
        }
        let subject = self.inner.tbs_certificate.subject.to_string();
        let subject = subject.strip_prefix("CN=").unwrap_or(&subject);
        if subject.is_empty() {
            "Unknown".to_string()
        } else {
            subject.to_string()
        }
    }

    /// The subject distinguished name, as RFC 4514 text.
    pub fn subject_dn(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// The issuer distinguished name, as RFC 4514 text.
    pub fn issuer_name(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// The first common-name attribute of the subject, if any.
    pub fn common_name(&self) -> Option<String> {
        self.inner
            .tbs_certificate
            .subject
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .find(|attr| attr.oid == const_oid::db::rfc4519::CN)
            .and_then(|attr| attribute_text(&attr.value))
    }

    /// Big-endian serial number bytes.
    pub fn serial_number(&self) -> Vec<u8> {
        self.inner
            .tbs_certificate
            .serial_number
            .as_bytes()
            .to_vec()
    }

    pub fn not_before(&self) -> OffsetDateTime {
        from_x509_time(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> OffsetDateTime {
        from_x509_time(&self.inner.tbs_certificate.validity.not_after)
    }

    /// Whether `at` falls inside the validity window, bounds included.
    pub fn is_valid_at(&self, at: OffsetDateTime) -> bool {
        self.not_before() <= at && at <= self.not_after()
    }

    /// Decodes the subject public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Decodes the extension `E`, if the certificate carries it.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Criticality of the extension with the given OID, `None` when absent.
    pub fn extension_criticality(&self, oid: ObjectIdentifier) -> Option<bool> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == oid)
            .map(|ext| ext.critical)
    }

    /// OIDs of all extensions, in certificate order.
    pub fn extension_oids(&self) -> Vec<ObjectIdentifier> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ext.extn_id)
            .collect()
    }

    /// True if Basic Constraints is present with the CA flag set.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Ok(Some(BasicConstraints { ca: true, .. }))
        )
    }

    /// Subject and issuer DNs are identical.
    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.subject == self.inner.tbs_certificate.issuer
    }

    /// The algorithm the certificate was signed with.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(self.inner.signature_algorithm.oid)
    }

    /// Checks the certificate signature against `issuer_key`.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<bool> {
        let algorithm = self.signature_algorithm()?;
        let tbs = self.inner.tbs_certificate.to_der()?;
        crate::pki::verify_data(
            &tbs,
            self.inner.signature.raw_bytes(),
            issuer_key,
            algorithm,
        )
    }

    /// Self-issued and verifiable with its own public key.
    pub fn is_self_signed(&self) -> bool {
        self.is_self_issued()
            && self
                .public_key()
                .and_then(|key| self.verify_signature(&key))
                .unwrap_or(false)
    }
}

fn attribute_text(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String => value
            .decode_as::<Utf8StringRef<'_>>()
            .ok()
            .map(|s| s.as_str().to_string()),
        Tag::PrintableString => value
            .decode_as::<PrintableStringRef<'_>>()
            .ok()
            .map(|s| s.as_str().to_string()),
        Tag::Ia5String => value
            .decode_as::<Ia5StringRef<'_>>()
            .ok()
            .map(|s| s.as_str().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::common_name;

    #[test]
    fn test_rsa_algorithm_identifier_has_null_parameters() {
        let rsa: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithRSA.into();
        assert_eq!(rsa.oid, rfc5912::SHA_256_WITH_RSA_ENCRYPTION);
        assert_eq!(rsa.parameters, Some(Any::null()));

        let ecdsa: AlgorithmIdentifierOwned = SignatureAlgorithm::Sha256WithECDSA.into();
        assert_eq!(ecdsa.oid, rfc5912::ECDSA_WITH_SHA_256);
        assert!(ecdsa.parameters.is_none());
    }

    #[test]
    fn test_unknown_signature_algorithm_is_unsupported() {
        assert!(matches!(
            SignatureAlgorithm::from_oid(rfc5912::ECDSA_WITH_SHA_384),
            Err(CertBundleError::UnsupportedKeyError(_))
        ));
    }

    #[test]
    fn test_attribute_text_reads_string_types() {
        let name = common_name("host.example").unwrap();
        let value = &name.0[0].0.as_slice()[0].value;
        assert_eq!(attribute_text(value).as_deref(), Some("host.example"));

        let printable = Any::encode_from(&PrintableStringRef::new("Printable").unwrap()).unwrap();
        assert_eq!(attribute_text(&printable).as_deref(), Some("Printable"));

        let integer = Any::encode_from(&5u8).unwrap();
        assert_eq!(attribute_text(&integer), None);
    }
}
