//! use certbundle::error::CertBundleError;

use std::path::PathBuf;

use thiserror::Error;

/// Represents errors that can occur in the certbundle library.
///
/// This enum provides detailed error messages for various failure scenarios.
#[derive(Debug, Error)]
pub enum CertBundleError {
    /// The certificate request is malformed.
    #[error("Invalid request: {0}")]
    ValidationError(String),

    /// The named elliptic curve is not recognised.
    #[error("Unknown curve: {0}")]
    UnknownCurveError(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The issuer key could not produce a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// The bundle holds no private key.
    #[error("The certificate bundle has no private key")]
    NoPrivateKeyError,

    /// No private key object was found in the loaded inputs.
    #[error("Private key was not found in input {sources}")]
    MissingPrivateKeyError { sources: String },

    /// None of the loaded certificates corresponds to the private key.
    #[error("The public key matching the private key was not found in input {sources}")]
    NoMatchingCertificateError { sources: String },

    /// A PKCS#12 container could not be opened.
    #[error("Unreadable PKCS#12 container: {0}")]
    UnreadableContainerError(String),

    /// The key algorithm or curve is not supported.
    #[error("Unsupported key: {0}")]
    UnsupportedKeyError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CertBundleError>;

impl From<der::Error> for CertBundleError {
    /// Converts a `der::Error` into a `CertBundleError`.
    fn from(err: der::Error) -> Self {
        CertBundleError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertBundleError {
    fn from(err: rsa::Error) -> Self {
        CertBundleError::KeyGenerationError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertBundleError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertBundleError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertBundleError {
    fn from(err: pkcs8::Error) -> Self {
        CertBundleError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertBundleError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertBundleError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertBundleError {
    fn from(err: pem::PemError) -> Self {
        CertBundleError::DecodingError(err.to_string())
    }
}
