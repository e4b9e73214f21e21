//! Key generation and signing for new authorities and leaf certificates.

use bon::Builder;
use rsa::BigUint;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::custom::{self, CustomExtension};
use crate::cert::params::{CertificationRequestInfo, DistinguishedName, Validity};
use crate::cert::{Certificate, DigestAlgorithm, SelfIssuer};
use crate::config::X509Config;
use crate::error::{Result, X509Error};
use crate::issuer::Issuer;
use crate::key::{KeyLength, KeyPair};

/// Everything needed to generate one certificate.
///
/// # Example
/// ```
/// use certward::cert::DigestAlgorithm;
/// use certward::cert::params::DistinguishedName;
/// use certward::generator::CertificateParams;
/// use certward::key::KeyLength;
///
/// let params = CertificateParams::builder()
///     .key_length(KeyLength::Bits2048)
///     .digest(DigestAlgorithm::Sha256)
///     .subject(DistinguishedName::builder().common_name("openwisp.org").build())
///     .build();
/// assert!(params.extensions.is_empty());
/// ```
#[derive(Clone, Debug, Builder)]
pub struct CertificateParams {
    pub key_length: KeyLength,
    pub digest: DigestAlgorithm,
    pub subject: DistinguishedName,
    /// Defaults to the time of generation.
    pub validity_start: Option<OffsetDateTime>,
    /// Defaults to `validity_start` plus `default_validity_days`.
    pub validity_end: Option<OffsetDateTime>,
    #[builder(default)]
    pub extensions: Vec<CustomExtension>,
}

impl CertificateParams {
    pub fn validity(&self, config: &X509Config) -> Result<Validity> {
        Validity::starting_at(
            self.validity_start.unwrap_or_else(OffsetDateTime::now_utc),
            self.validity_end,
            config.default_validity_days,
        )
    }
}

/// Output of a generation: the signed certificate and its fresh key.
#[derive(Clone, Debug)]
pub struct GeneratedMaterial {
    pub certificate: Certificate,
    pub key: KeyPair,
    pub certificate_pem: String,
    /// PKCS#8 `PRIVATE KEY` PEM.
    pub private_key_pem: String,
    pub serial_number: BigUint,
    pub validity: Validity,
}

/// Generates a self-signed authority certificate with serial `serial_number`.
pub fn generate_authority(
    params: &CertificateParams,
    serial_number: &BigUint,
    config: &X509Config,
) -> Result<GeneratedMaterial> {
    generate::<SelfIssuer<'_>>(params, None, serial_number, config)
}

/// Generates a leaf certificate signed by `issuer`.
pub fn generate_leaf<I: Issuer + ?Sized>(
    params: &CertificateParams,
    issuer: &I,
    serial_number: &BigUint,
    config: &X509Config,
) -> Result<GeneratedMaterial> {
    generate(params, Some(issuer), serial_number, config)
}

fn generate<I: Issuer + ?Sized>(
    params: &CertificateParams,
    issuer: Option<&I>,
    serial_number: &BigUint,
    config: &X509Config,
) -> Result<GeneratedMaterial> {
    // everything that can be rejected is checked before the key exists
    let extensions = custom::encode_all(&params.extensions)?;
    let subject = params.subject.as_x509_name()?;
    let validity = params.validity(config)?;
    let signing_bits = match issuer {
        Some(issuer) => issuer.signing_key().bits(),
        None => params.key_length.bits(),
    };
    if signing_bits < params.digest.min_key_bits() {
        return Err(X509Error::InvalidParameter(format!(
            "{} signatures need an RSA key of at least {} bits, the signing key has {signing_bits}",
            params.digest,
            params.digest.min_key_bits()
        )));
    }

    let key = KeyPair::generate_rsa(params.key_length)?;

    let request = CertificationRequestInfo::builder()
        .subject(subject.clone())
        .subject_public_key(key.as_spki()?)
        .is_ca(issuer.is_none())
        .extensions(extensions)
        .build();

    let certificate = match issuer {
        Some(issuer) => {
            issuer.issue(&request, serial_number, &validity, params.digest, config)?
        }
        None => {
            let self_issuer = SelfIssuer {
                name: subject,
                key: &key,
                serial_number: serial_number.clone(),
            };
            self_issuer.issue(&request, serial_number, &validity, params.digest, config)?
        }
    };

    debug!(
        serial = %serial_number,
        bits = params.key_length.bits(),
        digest = %params.digest,
        ca = issuer.is_none(),
        "generated certificate"
    );

    Ok(GeneratedMaterial {
        certificate_pem: certificate.to_pem()?,
        private_key_pem: key.to_pkcs8_pem()?,
        certificate,
        key,
        serial_number: serial_number.clone(),
        validity,
    })
}
