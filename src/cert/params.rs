use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Any;
use der::asn1::{SetOfVec, Utf8StringRef};
use der::flagset::FlagSet;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{CertBundleError, Result};
use crate::key::{KeySpec, MIN_RSA_BITS};

/// Parameters for issuing a certificate.
///
/// The first domain becomes the subject common name; every domain, the first
/// included, is listed in the Subject Alternative Name extension whenever that
/// extension is emitted.
#[derive(Clone, Debug, Builder)]
pub struct CertificateRequest {
    /// Primary name first. Must not be empty.
    pub domains: Vec<String>,
    /// Defaults to RSA 2048.
    #[builder(default)]
    pub key_spec: KeySpec,
    /// Defaults to one year from now.
    #[builder(default = Validity::for_days(365))]
    pub validity: Validity,
    /// Exactly `keyCertSign | cRLSign` marks a CA. Empty omits the extension.
    #[builder(default)]
    pub key_usage: FlagSet<KeyUsages>,
    #[builder(default)]
    pub extended_key_usage: Vec<ObjectIdentifier>,
}

impl CertificateRequest {
    /// Key usage that marks a request as a certificate authority.
    pub fn ca_key_usage() -> FlagSet<KeyUsages> {
        KeyUsages::KeyCertSign | KeyUsages::CRLSign
    }

    /// Whether the request describes a certificate authority.
    ///
    /// Only the exact flag combination `keyCertSign | cRLSign` counts; a CA
    /// asking for any further usage is issued as an end-entity certificate.
    pub fn is_ca(&self) -> bool {
        self.key_usage == Self::ca_key_usage()
    }

    /// Whether the Subject Alternative Name extension will be emitted.
    ///
    /// A CA with a single domain carries no SAN; callers wanting one on a CA
    /// have to supply at least two domains.
    pub fn includes_subject_alt_name(&self) -> bool {
        !self.is_ca() || self.domains.len() > 1
    }

    /// The primary name, i.e. the first domain.
    pub fn primary_name(&self) -> Result<&str> {
        self.domains
            .first()
            .map(String::as_str)
            .ok_or_else(|| CertBundleError::ValidationError("domain list is empty".to_string()))
    }

    /// The subject distinguished name, a single common-name attribute.
    pub fn subject_name(&self) -> Result<Name> {
        common_name(self.primary_name()?)
    }

    /// Checks the request before any key material is generated.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(CertBundleError::ValidationError(
                "domain list is empty".to_string(),
            ));
        }
        if let Some(blank) = self.domains.iter().position(|d| d.trim().is_empty()) {
            return Err(CertBundleError::ValidationError(format!(
                "domain entry {blank} is blank"
            )));
        }
        if self.includes_subject_alt_name() {
            if let Some(domain) = self.domains.iter().find(|d| !d.is_ascii()) {
                return Err(CertBundleError::ValidationError(format!(
                    "'{domain}' cannot be encoded as a DNS name"
                )));
            }
        }
        if let KeySpec::Rsa { bits } = self.key_spec {
            if bits < MIN_RSA_BITS {
                return Err(CertBundleError::ValidationError(format!(
                    "RSA key size {bits} is below the minimum of {MIN_RSA_BITS} bits"
                )));
            }
        }
        if self.validity.not_before >= self.validity.not_after {
            return Err(CertBundleError::ValidationError(format!(
                "validity window {} .. {} is empty",
                self.validity.not_before, self.validity.not_after
            )));
        }
        Ok(())
    }
}

/// Builds a distinguished name holding only a common name.
pub fn common_name(cn: &str) -> Result<Name> {
    let value = Any::encode_from(&Utf8StringRef::new(cn)?)?;
    let attribute = AttributeTypeAndValue {
        oid: const_oid::db::rfc4519::CN,
        value,
    };
    let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![attribute])?);
    Ok(RdnSequence(vec![rdn]))
}

/// `notBefore` .. `notAfter`, both inclusive.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// `days` days starting at the current time.
    pub fn for_days(days: i64) -> Self {
        Self::starting_at(OffsetDateTime::now_utc(), days)
    }

    pub fn starting_at(start: OffsetDateTime, days: i64) -> Self {
        Self {
            not_before: start,
            not_after: start + Duration::days(days),
        }
    }
}

/// An encoded extension waiting to be placed in a `TbsCertificate`.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// `extnValue` contents
    pub value: Vec<u8>,
}

impl ExtensionParam {
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(domains: &[&str]) -> CertificateRequest {
        CertificateRequest::builder()
            .domains(domains.iter().map(|d| d.to_string()).collect())
            .build()
    }

    #[test]
    fn test_ca_requires_exact_usage() {
        let mut ca = request(&["Root CA"]);
        ca.key_usage = CertificateRequest::ca_key_usage();
        assert!(ca.is_ca());
        assert!(!ca.includes_subject_alt_name());

        ca.key_usage |= KeyUsages::DigitalSignature;
        assert!(!ca.is_ca());
        assert!(ca.includes_subject_alt_name());

        let mut multi = request(&["Root CA", "root.example"]);
        multi.key_usage = CertificateRequest::ca_key_usage();
        assert!(multi.is_ca());
        assert!(multi.includes_subject_alt_name());
    }

    #[test]
    fn test_validate_rejects_malformed_requests() {
        assert!(matches!(
            request(&[]).validate(),
            Err(CertBundleError::ValidationError(_))
        ));
        assert!(matches!(
            request(&["ok.example", " "]).validate(),
            Err(CertBundleError::ValidationError(_))
        ));
        assert!(matches!(
            request(&["bücher.example"]).validate(),
            Err(CertBundleError::ValidationError(_))
        ));

        let mut small = request(&["small.example"]);
        small.key_spec = KeySpec::Rsa { bits: 128 };
        assert!(matches!(small.validate(), Err(CertBundleError::ValidationError(_))));

        let mut backwards = request(&["late.example"]);
        backwards.validity = Validity::starting_at(OffsetDateTime::UNIX_EPOCH, -1);
        assert!(matches!(backwards.validate(), Err(CertBundleError::ValidationError(_))));

        assert!(request(&["example.com", "www.example.com"]).validate().is_ok());
    }

    #[test]
    fn test_non_ascii_name_is_allowed_without_san() {
        let mut ca = request(&["Zertifizierungsstelle für Tests"]);
        ca.key_usage = CertificateRequest::ca_key_usage();
        assert!(ca.validate().is_ok());
    }

    #[test]
    fn test_subject_name_is_single_common_name() {
        let name = request(&["example.com", "www.example.com"]).subject_name().unwrap();
        assert_eq!(name.to_string(), "CN=example.com");
    }
}
