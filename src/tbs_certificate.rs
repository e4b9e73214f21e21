use der::Encode;
use rsa::BigUint;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::DigestAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::{Result, X509Error};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `digest` - The digest of the RSA signature over this structure.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions in certificate order.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    /// Certificate serial number
    pub serial_number: BigUint,
    /// Digest of the signature algorithm
    pub digest: DigestAlgorithm,
    /// Certificate issuer distinguished name
    pub issuer: Name,
    pub validity: Validity,
    /// Certificate subject distinguished name
    pub subject: Name,
    /// Subject's public key
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    /// Certificate extensions
    pub extensions: Vec<ExtensionParam>,
}

/// Encodes an unsigned serial as an ASN.1 INTEGER serial number.
pub(crate) fn serial_number(serial: &BigUint) -> Result<SerialNumber> {
    SerialNumber::new(&serial.to_bytes_be()).map_err(|e| {
        X509Error::InvalidParameter(format!("serial number {serial} cannot be encoded: {e}"))
    })
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    ///
    /// # Returns
    /// A `TbsCertificateInner` object suitable for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: serial_number(&self.serial_number)?,
            signature: self.digest.into(),
            issuer: self.issuer.clone(),
            validity: self.validity.to_x509_validity()?,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    ///
    /// Fails with `MalformedCertificate` when the signature algorithm is not
    /// one of the supported RSA digests.
    pub fn from_tbs_certificate_inner(inner: &TbsCertificateInner) -> Result<Self> {
        let digest = DigestAlgorithm::from_signature_oid(&inner.signature.oid).ok_or_else(|| {
            X509Error::MalformedCertificate(format!(
                "unsupported signature algorithm {}",
                inner.signature.oid
            ))
        })?;

        let extensions = inner
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect::<Vec<_>>();

        Ok(Self {
            serial_number: BigUint::from_bytes_be(inner.serial_number.as_bytes()),
            digest,
            issuer: inner.issuer.clone(),
            validity: Validity::from_x509_validity(&inner.validity),
            subject: inner.subject.clone(),
            subject_public_key_info: inner.subject_public_key_info.clone(),
            extensions,
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }
}
