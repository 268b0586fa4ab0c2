use const_oid::AssociatedOid;
use const_oid::db::rfc5912::{
    ID_KP_CLIENT_AUTH, ID_KP_CODE_SIGNING, ID_KP_EMAIL_PROTECTION, ID_KP_OCSP_SIGNING,
    ID_KP_SERVER_AUTH, ID_KP_TIME_STAMPING,
};
use der::asn1::{Ia5String, OctetString};
use der::oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::ext::pkix;
use x509_cert::ext::pkix::name::GeneralName;

pub use der::flagset::FlagSet;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::error::{CertBundleError, Result};

/// An X.509 v3 extension value that can be written to and read from its DER
/// `extnValue` contents.
///
/// ```
/// use certbundle::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
///
/// let san = SubjectAltName { dns_names: vec!["example.com".to_string()] };
/// let der = san.to_x509_extension_value().unwrap();
/// let back = SubjectAltName::from_x509_extension_value(&der).unwrap();
/// assert_eq!(back.dns_names, san.dns_names);
/// ```
pub trait ToAndFromX509Extension: Sized {
    /// `extnID` of the extension.
    const OID: ObjectIdentifier;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    fn from_x509_extension_value(value: &[u8]) -> Result<Self>;
}

fn encode<T: Encode>(value: &T) -> Result<Vec<u8>> {
    value
        .to_der()
        .map_err(|e| CertBundleError::EncodingError(e.to_string()))
}

fn decode<'a, T: Decode<'a>>(value: &'a [u8]) -> Result<T> {
    Ok(T::from_der(value)?)
}

/// Subject Alternative Name restricted to DNS names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = pkix::SubjectAltName::OID;

    /// Names must be ASCII; anything else is a `ValidationError`.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let mut general_names = Vec::with_capacity(self.dns_names.len());
        for dns_name in &self.dns_names {
            let ia5 = Ia5String::new(dns_name).map_err(|e| {
                CertBundleError::ValidationError(format!("'{dns_name}' is not a DNS name: {e}"))
            })?;
            general_names.push(GeneralName::DnsName(ia5));
        }
        encode(&pkix::SubjectAltName(general_names))
    }

    /// Entries other than `dNSName` are dropped.
    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let pkix::SubjectAltName(general_names) = decode(value)?;
        let dns_names = general_names
            .into_iter()
            .filter_map(|general_name| match general_name {
                GeneralName::DnsName(dns_name) => Some(dns_name.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { dns_names })
    }
}

/// Basic Constraints: the CA flag and an optional path length limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        encode(&pkix::BasicConstraints {
            ca: self.ca,
            path_len_constraint: self.path_len,
        })
    }

    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let constraints: pkix::BasicConstraints = decode(value)?;
        Ok(Self {
            ca: constraints.ca,
            path_len: constraints.path_len_constraint,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <pkix::KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        encode(&pkix::KeyUsage(self.0))
    }

    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let pkix::KeyUsage(flags) = decode(value)?;
        Ok(Self(flags))
    }
}

/// Extended Key Usage as a list of purpose OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage(pub Vec<ObjectIdentifier>);

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        encode(&pkix::ExtendedKeyUsage(self.0.clone()))
    }

    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let pkix::ExtendedKeyUsage(purposes) = decode(value)?;
        Ok(Self(purposes))
    }
}

/// Common RFC 5280 key purposes, for building an EKU list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtendedKeyUsageOption {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            Self::ServerAuth => ID_KP_SERVER_AUTH,
            Self::ClientAuth => ID_KP_CLIENT_AUTH,
            Self::CodeSigning => ID_KP_CODE_SIGNING,
            Self::EmailProtection => ID_KP_EMAIL_PROTECTION,
            Self::TimeStamping => ID_KP_TIME_STAMPING,
            Self::OcspSigning => ID_KP_OCSP_SIGNING,
        }
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(option: ExtendedKeyUsageOption) -> Self {
        option.oid()
    }
}

/// Authority Key Identifier holding only the `keyIdentifier` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        encode(&pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.0.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        })
    }

    /// A missing `keyIdentifier` decodes as an empty identifier.
    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let aki: pkix::AuthorityKeyIdentifier = decode(value)?;
        Ok(Self(
            aki.key_identifier
                .map(OctetString::into_bytes)
                .unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        encode(&pkix::SubjectKeyIdentifier(OctetString::new(
            self.0.as_slice(),
        )?))
    }

    fn from_x509_extension_value(value: &[u8]) -> Result<Self> {
        let pkix::SubjectKeyIdentifier(id) = decode(value)?;
        Ok(Self(id.into_bytes()))
    }
}
