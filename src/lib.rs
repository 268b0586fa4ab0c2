//! # certbundle - TLS certificate bundles in pure Rust
//!
//! certbundle issues X.509 certificates for TLS, rebuilds issuer chains from
//! loose certificates and moves certificate bundles between PEM and PKCS#12
//! containers. It is built on the rustcrypto libraries; openssl is only used
//! by the test suite to cross-check the output.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any modulus of 512 bits or more (2048 by default)
//! - **EC**: P-256, P-384 and P-521
//! - **DSA**: loaded keys only, for matching against certificates
//!
//! Certificates are signed with SHA-256: ECDSA for EC issuers and PKCS#1 v1.5
//! for RSA issuers. DSA issuer keys cannot sign.
//!
//! ## Supported Formats
//!
//! - **PEM**: certificate chains and PKCS#8 private keys; PKCS#1 and SEC1 keys
//!   are accepted on input
//! - **PKCS#12**: one private-key entry per bundle, optionally password protected
//! - **DER**: the encoding under both of the above
//!
//! ## Quick Start
//!
//! ### Generating a Self-Signed Certificate
//!
//! ```rust,no_run
//! use certbundle::{bundle::CertificateBundle, cert::params::CertificateRequest};
//!
//! # fn main() -> Result<(), certbundle::error::CertBundleError> {
//! let request = CertificateRequest::builder()
//!     .domains(vec!["example.com".to_string(), "www.example.com".to_string()])
//!     .build();
//!
//! let bundle = CertificateBundle::generate_self_signed(&request)?;
//!
//! let chain_pem = bundle.export_public_chain_pem()?;
//! let key_pem = bundle.export_private_key_pem()?;
//! println!("{}", String::from_utf8_lossy(&chain_pem));
//! # let _ = key_pem;
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing from a CA
//!
//! A request is a CA request when its key usage is exactly
//! `keyCertSign | cRLSign`.
//!
//! ```rust,no_run
//! use certbundle::{
//!     bundle::CertificateBundle,
//!     cert::params::{CertificateRequest, ExtendedKeyUsageOption, Validity},
//!     key::{EcCurve, KeySpec},
//! };
//!
//! # fn main() -> Result<(), certbundle::error::CertBundleError> {
//! let ca_request = CertificateRequest::builder()
//!     .domains(vec!["Example Root CA".to_string()])
//!     .key_spec(KeySpec::Ec(EcCurve::P256))
//!     .validity(Validity::for_days(3650))
//!     .key_usage(CertificateRequest::ca_key_usage())
//!     .build();
//! let ca = CertificateBundle::generate_self_signed(&ca_request)?;
//!
//! let server_request = CertificateRequest::builder()
//!     .domains(vec!["server.example.com".to_string()])
//!     .extended_key_usage(vec![ExtendedKeyUsageOption::ServerAuth.into()])
//!     .build();
//! let server = CertificateBundle::generate_signed_by_ca(&server_request, &ca)?;
//!
//! // chain[0] is the CA certificate
//! assert_eq!(server.chain.len(), 1);
//! let pfx = server.export_pkcs12(Some("secret"))?;
//! # let _ = pfx;
//! # Ok(())
//! # }
//! ```
//!
//! ### Loading and Converting
//!
//! ```rust,no_run
//! use std::path::Path;
//! use certbundle::{bundle::CertificateBundle, convert::convert_file};
//!
//! # fn main() -> Result<(), certbundle::error::CertBundleError> {
//! let bundle = CertificateBundle::load_from_pem_pair(
//!     Some(Path::new("site.cer")),
//!     Some(Path::new("site.key")),
//! )?;
//! println!("loaded {} with {} issuer(s)", bundle.subject_name(), bundle.chain.len());
//!
//! // A missing file or a wrong password gives `None`, not an error.
//! if CertificateBundle::load_from_pkcs12(Path::new("site.pfx"), Some("secret"))?.is_none() {
//!     convert_file(Path::new("site.cer"), Path::new("site.pfx"), Some("secret"))?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use certbundle::{bundle::CertificateBundle, error::CertBundleError};
//!
//! match CertificateBundle::load_from_pem_sources(&[b"no pem here".as_slice()]) {
//!     Ok(bundle) => println!("loaded {}", bundle.subject_name()),
//!     Err(CertBundleError::MissingPrivateKeyError { sources }) => {
//!         println!("no private key in {sources}")
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bundle`]: Certificate bundles: generation, PEM and PKCS#12 export and loading
//! - [`cert`]: Certificate inspection, request parameters and X.509 extensions
//! - [`chain`]: Issuer chain reconstruction
//! - [`convert`]: Container conversion by file extension
//! - [`issuer`]: Certificate building and signing
//! - [`key`]: Key generation, decoding and key/certificate matching
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure manipulation

pub mod bundle;
pub mod cert;
pub mod chain;
pub mod convert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod pki;
pub mod tbs_certificate;
