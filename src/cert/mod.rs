pub mod custom;
pub mod extensions;
pub mod params;
pub mod text;

use core::fmt;
use core::str::FromStr;

use const_oid::ObjectIdentifier;
use der::asn1::Any;
use der::{Decode, DecodePem, Encode, EncodePem};
use rsa::BigUint;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{Result, X509Error};
use crate::issuer::Issuer;
use crate::key::{self, KeyPair};
use extensions::{SubjectKeyIdentifier, ToAndFromX509Extension};
use params::{DistinguishedName, ExtensionParam, Validity};

/// Digest algorithms usable for RSA PKCS#1 v1.5 signatures.
///
/// This enum provides a mapping to the corresponding signature algorithm OIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA224_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");
const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    /// Lower case name as stored on records, e.g. `"sha256"`.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// OpenSSL long name of the combined signature algorithm.
    pub fn signature_algorithm_name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1WithRSAEncryption",
            DigestAlgorithm::Sha224 => "sha224WithRSAEncryption",
            DigestAlgorithm::Sha256 => "sha256WithRSAEncryption",
            DigestAlgorithm::Sha384 => "sha384WithRSAEncryption",
            DigestAlgorithm::Sha512 => "sha512WithRSAEncryption",
        }
    }

    pub fn signature_oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => SHA1_WITH_RSA,
            DigestAlgorithm::Sha224 => SHA224_WITH_RSA,
            DigestAlgorithm::Sha256 => SHA256_WITH_RSA,
            DigestAlgorithm::Sha384 => SHA384_WITH_RSA,
            DigestAlgorithm::Sha512 => SHA512_WITH_RSA,
        }
    }

    /// Smallest RSA modulus, in bits, that fits a PKCS#1 v1.5 signature
    /// over this digest: DigestInfo plus 11 octets of padding.
    pub fn min_key_bits(self) -> usize {
        let digest_info = match self {
            DigestAlgorithm::Sha1 => 15 + 20,
            DigestAlgorithm::Sha224 => 19 + 28,
            DigestAlgorithm::Sha256 => 19 + 32,
            DigestAlgorithm::Sha384 => 19 + 48,
            DigestAlgorithm::Sha512 => 19 + 64,
        };
        (digest_info + 11) * 8
    }

    /// Maps a signature algorithm OID back to its digest.
    pub fn from_signature_oid(oid: &ObjectIdentifier) -> Option<Self> {
        DigestAlgorithm::ALL
            .into_iter()
            .find(|digest| digest.signature_oid() == *oid)
    }
}

impl FromStr for DigestAlgorithm {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        DigestAlgorithm::ALL
            .into_iter()
            .find(|digest| digest.name() == wanted)
            .ok_or_else(|| X509Error::InvalidParameter(format!("unsupported digest {s:?}")))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<DigestAlgorithm> for AlgorithmIdentifierOwned {
    /// RSA signature algorithm identifiers carry an explicit NULL parameter.
    fn from(value: DigestAlgorithm) -> Self {
        AlgorithmIdentifierOwned {
            oid: value.signature_oid(),
            parameters: Some(Any::null()),
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM
/// formats and to read back the fields stored on records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a PEM encoded certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = CertificateInner::from_pem(pem.trim().as_bytes())
            .map_err(|e| X509Error::MalformedCertificate(e.to_string()))?;
        Ok(Certificate { inner })
    }

    /// Parses a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| X509Error::MalformedCertificate(e.to_string()))?;
        Ok(Certificate { inner })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| X509Error::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| X509Error::EncodingError(e.to_string()))
    }

    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject_name())
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.issuer_name())
    }

    pub fn serial_number(&self) -> BigUint {
        BigUint::from_bytes_be(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    pub fn validity(&self) -> Validity {
        Validity::from_x509_validity(&self.inner.tbs_certificate.validity)
    }

    /// Returns the raw version number, `2` for X.509v3.
    pub fn version(&self) -> u8 {
        self.inner.tbs_certificate.version as u8
    }

    /// Digest of the signature algorithm, if it is an RSA one this crate knows.
    pub fn digest(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_signature_oid(&self.inner.signature_algorithm.oid)
    }

    /// Size in bits of the embedded RSA public key.
    pub fn key_bits(&self) -> Result<usize> {
        use rsa::traits::PublicKeyParts;
        let public = key::rsa_public_key(&self.inner.tbs_certificate.subject_public_key_info)?;
        Ok(public.n().bits())
    }

    /// Extensions in certificate order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Finds and decodes an extension by type.
    pub fn find_extension<E: ToAndFromX509Extension>(&self) -> Option<Result<E>> {
        self.extensions()
            .into_iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension())
    }

    /// Identifier of this certificate's key: the `subjectKeyIdentifier`
    /// extension when present, otherwise derived from the public key.
    pub fn key_identifier(&self) -> Vec<u8> {
        match self.find_extension::<SubjectKeyIdentifier>() {
            Some(Ok(ski)) => ski.0,
            _ => key::key_identifier(&self.inner.tbs_certificate.subject_public_key_info),
        }
    }

    /// Plain-text dump of the certificate structure.
    pub fn to_text(&self) -> String {
        text::dump(self)
    }
}

// Helper struct for self-signed certificates
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: Name,
    pub(crate) key: &'a KeyPair,
    pub(crate) serial_number: BigUint,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn key_identifier(&self) -> Result<Vec<u8>> {
        Ok(key::key_identifier(&self.key.as_spki()?))
    }

    fn authority_cert_issuer(&self) -> Name {
        self.name.clone()
    }

    fn serial_number(&self) -> BigUint {
        self.serial_number.clone()
    }
}

/// An authority certificate together with the key that can sign for it.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Pairs a certificate with its key, rejecting keys that do not belong to it.
    pub fn new(cert: Certificate, key: KeyPair) -> Result<Self> {
        if !key.matches(&cert.inner.tbs_certificate.subject_public_key_info) {
            return Err(X509Error::ImportPairing(
                "private key does not match the certificate".to_string(),
            ));
        }
        Ok(Self { cert, key })
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.subject_name().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn key_identifier(&self) -> Result<Vec<u8>> {
        Ok(self.cert.key_identifier())
    }

    fn authority_cert_issuer(&self) -> Name {
        self.cert.issuer_name().clone()
    }

    fn serial_number(&self) -> BigUint {
        self.cert.serial_number()
    }
}
