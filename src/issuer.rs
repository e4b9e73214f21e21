use der::Encode;
use der::asn1::BitString;
use rsa::BigUint;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::DigestAlgorithm;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::{CertificationRequestInfo, ExtensionParam, Validity};
use crate::config::X509Config;
use crate::error::Result;
use crate::key::{self, KeyPair};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the identifier of the issuer's public key.
    fn key_identifier(&self) -> Result<Vec<u8>>;

    /// Returns the issuer name found on the issuer's own certificate.
    fn authority_cert_issuer(&self) -> Name;

    /// Returns the serial number of the issuer.
    fn serial_number(&self) -> BigUint;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// # Arguments
    /// * `cert_request` - The subject, its public key, its role and any caller extensions.
    /// * `serial_number` - The serial assigned to the new certificate.
    /// * `validity` - The validity window of the new certificate.
    /// * `digest` - The digest used for the PKCS#1 v1.5 signature.
    /// * `config` - Criticality and key usage settings for the composed extensions.
    ///
    /// # Returns
    /// A `Certificate` object representing the issued certificate.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        serial_number: &BigUint,
        validity: &Validity,
        digest: DigestAlgorithm,
        config: &X509Config,
    ) -> Result<Certificate> {
        let extensions = compose_extensions(self, cert_request, config)?;

        let tbs_cert = TbsCertificate {
            serial_number: serial_number.clone(),
            digest,
            issuer: self.issuer_name(),
            validity: *validity,
            subject: cert_request.subject.clone(),
            subject_public_key_info: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;

        let signature = self
            .signing_key()
            .sign_data(&tbs_cert_inner.to_der()?, digest)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: digest.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// Builds the ordered extension list of a generated certificate.
///
/// The list always starts with `basicConstraints`, `keyUsage`,
/// `subjectKeyIdentifier` and `authorityKeyIdentifier`, followed by the
/// caller extensions of `cert_request` in the order given.
pub fn compose_extensions<I: Issuer + ?Sized>(
    issuer: &I,
    cert_request: &CertificationRequestInfo,
    config: &X509Config,
) -> Result<Vec<ExtensionParam>> {
    let (basic_constraints, bc_critical, key_usage, ku_critical) = if cert_request.is_ca {
        (
            BasicConstraints {
                is_ca: true,
                max_path_length: config.ca_basic_constraints_pathlen.limit(),
            },
            config.ca_basic_constraints_critical,
            config.ca_keyusage_value.parse::<KeyUsage>()?,
            config.ca_keyusage_critical,
        )
    } else {
        (
            BasicConstraints {
                is_ca: false,
                max_path_length: None,
            },
            config.cert_basic_constraints_critical,
            config.cert_keyusage_value.parse::<KeyUsage>()?,
            config.cert_keyusage_critical,
        )
    };

    let subject_key_id =
        SubjectKeyIdentifier(key::key_identifier(&cert_request.subject_public_key));

    let authority_key_id = AuthorityKeyIdentifier {
        key_identifier: issuer.key_identifier()?,
        authority_cert_issuer: issuer.authority_cert_issuer(),
        authority_cert_serial_number: issuer.serial_number(),
    };

    let mut extensions: Vec<ExtensionParam> = vec![
        ExtensionParam::from_extension(basic_constraints, bc_critical)?,
        ExtensionParam::from_extension(key_usage, ku_critical)?,
        ExtensionParam::from_extension(subject_key_id, false)?,
        ExtensionParam::from_extension(authority_key_id, false)?,
    ];
    extensions.extend(cert_request.extensions.iter().cloned());

    Ok(extensions)
}
