use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use der::DateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

use crate::cert::SignatureAlgorithm;
use crate::cert::params::ExtensionParam;
use crate::error::{CertBundleError, Result};
use crate::key::PublicKey;

/// Unsigned certificate body, filled in by `issuer::build_certificate` before
/// signing.
pub struct TbsCertificate {
    /// Big-endian, positive, at most 20 bytes.
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub not_before: time::OffsetDateTime,
    pub not_after: time::OffsetDateTime,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    /// Written in this order. An empty list omits the `extensions` field.
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let mut encoded_extensions = Vec::with_capacity(self.extensions.len());
        for param in &self.extensions {
            encoded_extensions.push(Extension {
                extn_id: param.oid,
                critical: param.critical,
                extn_value: OctetString::new(param.value.as_slice())?,
            });
        }

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&self.serial_number)?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity: Validity {
                not_before: to_x509_time(self.not_before)?,
                not_after: to_x509_time(self.not_after)?,
            },
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!encoded_extensions.is_empty()).then_some(encoded_extensions),
        })
    }
}

/// RFC 5280 §4.1.2.5: UTCTime through 2049, GeneralizedTime from 2050 on.
fn to_x509_time(at: time::OffsetDateTime) -> Result<Time> {
    let date_time = DateTime::from_system_time(at.into()).map_err(|e| {
        CertBundleError::ValidationError(format!("validity time {at} out of range: {e}"))
    })?;
    if date_time.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(date_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

/// Converts an X.509 time back into an `OffsetDateTime`.
pub fn from_x509_time(at: &Time) -> time::OffsetDateTime {
    time::OffsetDateTime::from(at.to_system_time())
}
