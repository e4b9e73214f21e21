//! Decodes externally supplied PEM material into record fields.

use rsa::BigUint;
use tracing::debug;

use crate::cert::params::{DistinguishedName, Validity};
use crate::cert::{Certificate, CertificateWithPrivateKey, DigestAlgorithm};
use crate::error::{Result, X509Error};
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// Fields read back from an imported certificate.
///
/// Subject attributes missing from the certificate are empty strings.
#[derive(Clone, Debug)]
pub struct ImportedMaterial {
    pub certificate: Certificate,
    /// `None` for an import-only record, which cannot sign.
    pub key: Option<KeyPair>,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub validity: Validity,
    pub key_length: usize,
    pub digest: DigestAlgorithm,
    pub serial_number: BigUint,
}

impl ImportedMaterial {
    /// Pairs certificate and key for signing, `None` when no key was imported.
    pub fn signer(&self) -> Option<CertificateWithPrivateKey> {
        self.key.clone().map(|key| CertificateWithPrivateKey {
            cert: self.certificate.clone(),
            key,
        })
    }
}

fn present(pem: Option<&str>) -> Option<&str> {
    pem.map(str::trim).filter(|pem| !pem.is_empty())
}

/// Parses a certificate and an optional private key.
///
/// A key without a certificate, or a key that does not belong to the
/// certificate, fails with [`X509Error::ImportPairing`]. Unparsable input fails
/// with [`X509Error::MalformedCertificate`].
pub fn import_material(
    certificate_pem: &str,
    private_key_pem: Option<&str>,
) -> Result<ImportedMaterial> {
    let private_key_pem = present(private_key_pem);
    let Some(certificate_pem) = present(Some(certificate_pem)) else {
        return Err(match private_key_pem {
            Some(_) => X509Error::ImportPairing(
                "a private key cannot be imported without its certificate".to_string(),
            ),
            None => X509Error::MalformedCertificate("certificate is empty".to_string()),
        });
    };

    let certificate = Certificate::from_pem(certificate_pem)?;
    let tbs = TbsCertificate::from_tbs_certificate_inner(&certificate.inner.tbs_certificate)?;

    let key = match private_key_pem {
        Some(pem) => {
            let key = KeyPair::import_from_pem(pem)?;
            if !key.matches(&tbs.subject_public_key_info) {
                return Err(X509Error::ImportPairing(
                    "private key does not match the certificate".to_string(),
                ));
            }
            Some(key)
        }
        None => None,
    };

    let imported = ImportedMaterial {
        subject: certificate.subject(),
        issuer: certificate.issuer(),
        validity: tbs.validity,
        key_length: certificate.key_bits()?,
        digest: tbs.digest,
        serial_number: tbs.serial_number,
        key,
        certificate,
    };

    debug!(
        serial = %imported.serial_number,
        bits = imported.key_length,
        digest = %imported.digest,
        with_key = imported.key.is_some(),
        "imported certificate"
    );

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::SelfIssuer;
    use crate::cert::params::CertificationRequestInfo;
    use crate::config::X509Config;
    use crate::issuer::Issuer;
    use crate::key::KeyLength;

    fn self_signed(key: &KeyPair) -> Certificate {
        let name = DistinguishedName::builder()
            .country("IT")
            .common_name("import.test")
            .build()
            .as_x509_name()
            .unwrap();
        let request = CertificationRequestInfo::builder()
            .subject(name.clone())
            .subject_public_key(key.as_spki().unwrap())
            .is_ca(true)
            .build();
        let issuer = SelfIssuer {
            name,
            key,
            serial_number: BigUint::from(99u32),
        };
        issuer
            .issue(
                &request,
                &BigUint::from(99u32),
                &Validity::for_days(30).unwrap(),
                DigestAlgorithm::Sha384,
                &X509Config::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_import_with_key() {
        let key = KeyPair::generate_rsa(KeyLength::Bits1024).unwrap();
        let cert = self_signed(&key);
        let imported = import_material(
            &cert.to_pem().unwrap(),
            Some(&key.to_pkcs8_pem().unwrap()),
        )
        .unwrap();
        assert_eq!(imported.subject.common_name, "import.test");
        assert_eq!(imported.subject.email, "");
        assert_eq!(imported.digest, DigestAlgorithm::Sha384);
        assert_eq!(imported.key_length, 1024);
        assert_eq!(imported.serial_number, BigUint::from(99u32));
        assert!(imported.signer().is_some());
    }

    #[test]
    fn test_import_only() {
        let key = KeyPair::generate_rsa(KeyLength::Bits1024).unwrap();
        let cert = self_signed(&key);
        let imported = import_material(&cert.to_pem().unwrap(), Some("  ")).unwrap();
        assert!(imported.key.is_none());
        assert!(imported.signer().is_none());
    }

    #[test]
    fn test_pairing_errors() {
        let key = KeyPair::generate_rsa(KeyLength::Bits1024).unwrap();
        let other = KeyPair::generate_rsa(KeyLength::Bits1024).unwrap();
        let cert = self_signed(&key);

        assert!(matches!(
            import_material("", Some(&key.to_pkcs8_pem().unwrap())),
            Err(X509Error::ImportPairing(_))
        ));
        assert!(matches!(
            import_material(&cert.to_pem().unwrap(), Some(&other.to_pkcs8_pem().unwrap())),
            Err(X509Error::ImportPairing(_))
        ));
        assert!(matches!(
            import_material("not a certificate", None),
            Err(X509Error::MalformedCertificate(_))
        ));
    }
}
