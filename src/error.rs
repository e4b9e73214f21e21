//! use certward::error::X509Error;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, X509Error>;

/// Represents errors that can occur in the certward library.
///
/// Validation variants are always returned before any key material is
/// generated or any record field is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum X509Error {
    /// Bad key length, digest name, validity ordering or other field value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Caller-supplied extensions are not a list of `{name, critical, value}` records.
    #[error("Extension format invalid: {0}")]
    ExtensionFormat(String),

    /// A private key was supplied without a certificate, or does not belong to it.
    #[error("Import pairing error: {0}")]
    ImportPairing(String),

    /// PEM material does not parse as a certificate or private key.
    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),

    /// Signing was requested from an authority without a private key.
    #[error("No signing key: the authority has no usable private key")]
    NoSigningKey,

    /// The record has no storage identifier yet.
    #[error("Not persisted: the record has no identifier")]
    NotPersisted,

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),
}

impl From<der::Error> for X509Error {
    /// Converts a `der::Error` into an `X509Error`.
    fn from(err: der::Error) -> Self {
        X509Error::EncodingError(err.to_string())
    }
}

impl From<x509_cert::spki::Error> for X509Error {
    fn from(err: x509_cert::spki::Error) -> Self {
        X509Error::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for X509Error {
    fn from(err: rsa::Error) -> Self {
        X509Error::RsaError(err.to_string())
    }
}

impl From<pkcs8::Error> for X509Error {
    fn from(err: pkcs8::Error) -> Self {
        X509Error::EncodingError(err.to_string())
    }
}
