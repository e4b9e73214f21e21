//! Revocation state and certificate revocation lists.
//!
//! A certificate is listed on its authority's CRL when it is revoked and the
//! CRL's `thisUpdate` falls inside the certificate's validity window.

use der::asn1::{BitString, OctetString};
use der::{Decode, Encode};
use rsa::BigUint;
use time::OffsetDateTime;
use tracing::debug;
use x509_cert::Version;
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::Extension;
use x509_cert::ext::pkix::AuthorityKeyIdentifier;
use x509_cert::name::Name;

use crate::cert::DigestAlgorithm;
use crate::cert::extensions::ToAndFromX509Extension;
use crate::cert::params::{Validity, add_days, from_x509_time, to_x509_time};
use crate::config::X509Config;
use crate::error::{Result, X509Error};
use crate::issuer::Issuer;
use crate::pem_utils;
use crate::tbs_certificate;

pub const CRL_PEM_LABEL: &str = "X509 CRL";

/// Revocation state of a certificate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevocationStatus {
    #[default]
    Active,
    Revoked { at: OffsetDateTime },
}

impl RevocationStatus {
    pub fn is_revoked(&self) -> bool {
        matches!(self, RevocationStatus::Revoked { .. })
    }

    pub fn revoked_at(&self) -> Option<OffsetDateTime> {
        match self {
            RevocationStatus::Active => None,
            RevocationStatus::Revoked { at } => Some(*at),
        }
    }

    /// Moves to `Revoked { at }`. Returns false, leaving the first timestamp,
    /// when already revoked.
    pub fn revoke(&mut self, at: OffsetDateTime) -> bool {
        match self {
            RevocationStatus::Active => {
                *self = RevocationStatus::Revoked { at };
                true
            }
            RevocationStatus::Revoked { .. } => false,
        }
    }
}

/// Serial, validity and status of one certificate, read together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationSnapshot {
    pub serial_number: BigUint,
    pub validity: Validity,
    pub status: RevocationStatus,
}

impl RevocationSnapshot {
    /// Revoked and `at` lies within the validity window.
    pub fn is_effective(&self, at: OffsetDateTime) -> bool {
        self.status.is_revoked() && self.validity.contains(at)
    }
}

/// The snapshots that belong on a CRL produced at `at`.
pub fn effective_revocation_set(
    snapshots: &[RevocationSnapshot],
    at: OffsetDateTime,
) -> Vec<&RevocationSnapshot> {
    snapshots
        .iter()
        .filter(|snapshot| snapshot.is_effective(at))
        .collect()
}

/// Signed CRL and its read-back accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateRevocationList {
    pub inner: CertificateList,
}

impl CertificateRevocationList {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateList::from_der(der)
            .map_err(|e| X509Error::MalformedCertificate(format!("CRL: {e}")))?;
        Ok(Self { inner })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_utils::pem_to_der(pem, CRL_PEM_LABEL)?)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, CRL_PEM_LABEL))
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_cert_list.issuer
    }

    /// Serials of the listed certificates, in CRL order.
    pub fn revoked_serials(&self) -> Vec<BigUint> {
        self.inner
            .tbs_cert_list
            .revoked_certificates
            .iter()
            .flatten()
            .map(|revoked| BigUint::from_bytes_be(revoked.serial_number.as_bytes()))
            .collect()
    }

    pub fn this_update(&self) -> OffsetDateTime {
        from_x509_time(&self.inner.tbs_cert_list.this_update)
    }

    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.inner
            .tbs_cert_list
            .next_update
            .as_ref()
            .map(from_x509_time)
    }
}

/// Builds and signs the CRL of `issuer` as of `at`.
///
/// Every effective snapshot is listed with its revocation time. `nextUpdate`
/// lies `crl_next_update_days` after `at`.
pub fn build_crl<I: Issuer + ?Sized>(
    issuer: &I,
    digest: DigestAlgorithm,
    snapshots: &[RevocationSnapshot],
    at: OffsetDateTime,
    config: &X509Config,
) -> Result<CertificateRevocationList> {
    let revoked = effective_revocation_set(snapshots, at)
        .into_iter()
        .filter_map(|snapshot| {
            snapshot
                .status
                .revoked_at()
                .map(|revoked_at| (snapshot, revoked_at))
        })
        .map(|(snapshot, revoked_at)| -> Result<RevokedCert> {
            Ok(RevokedCert {
                serial_number: tbs_certificate::serial_number(&snapshot.serial_number)?,
                revocation_date: to_x509_time(revoked_at)?,
                crl_entry_extensions: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let entries = revoked.len();

    let authority_key_id = AuthorityKeyIdentifier {
        key_identifier: Some(OctetString::new(issuer.key_identifier()?)?),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    let crl_extensions = vec![Extension {
        extn_id: crate::cert::extensions::AuthorityKeyIdentifier::OID,
        critical: false,
        extn_value: OctetString::new(authority_key_id.to_der()?)?,
    }];

    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: digest.into(),
        issuer: issuer.issuer_name(),
        this_update: to_x509_time(at)?,
        next_update: Some(to_x509_time(add_days(at, config.crl_next_update_days)?)?),
        revoked_certificates: (!revoked.is_empty()).then_some(revoked),
        crl_extensions: Some(crl_extensions),
    };

    let signature = issuer
        .signing_key()
        .sign_data(&tbs_cert_list.to_der()?, digest)?;

    debug!(entries, digest = %digest, "built CRL");

    Ok(CertificateRevocationList {
        inner: CertificateList {
            tbs_cert_list,
            signature_algorithm: digest.into(),
            signature: BitString::from_bytes(&signature)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::SelfIssuer;
    use crate::cert::params::DistinguishedName;
    use crate::key::{KeyLength, KeyPair};
    use time::Duration;

    fn snapshot(serial: u32, validity: Validity, status: RevocationStatus) -> RevocationSnapshot {
        RevocationSnapshot {
            serial_number: BigUint::from(serial),
            validity,
            status,
        }
    }

    #[test]
    fn test_revoke_is_one_way() {
        let first = OffsetDateTime::now_utc();
        let mut status = RevocationStatus::default();
        assert!(status.revoke(first));
        assert!(!status.revoke(first + Duration::hours(1)));
        assert_eq!(status.revoked_at(), Some(first));
    }

    #[test]
    fn test_effective_set_respects_validity() {
        let now = OffsetDateTime::now_utc();
        let revoked = RevocationStatus::Revoked { at: now };
        let current = Validity::new(now - Duration::days(1), now + Duration::days(1)).unwrap();
        let expired = Validity::new(now - Duration::days(10), now - Duration::days(5)).unwrap();
        let future = Validity::new(now + Duration::days(5), now + Duration::days(10)).unwrap();

        let snapshots = vec![
            snapshot(1, current, revoked),
            snapshot(2, expired, revoked),
            snapshot(3, future, revoked),
            snapshot(4, current, RevocationStatus::Active),
        ];
        let effective = effective_revocation_set(&snapshots, now);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].serial_number, BigUint::from(1u32));
    }

    #[test]
    fn test_build_and_read_back() {
        let key = KeyPair::generate_rsa(KeyLength::Bits512).unwrap();
        let name = DistinguishedName::builder()
            .common_name("crl.test")
            .build()
            .as_x509_name()
            .unwrap();
        let issuer = SelfIssuer {
            name: name.clone(),
            key: &key,
            serial_number: BigUint::from(1u32),
        };
        let now = OffsetDateTime::now_utc();
        let current = Validity::new(now - Duration::days(1), now + Duration::days(1)).unwrap();

        let empty = build_crl(
            &issuer,
            DigestAlgorithm::Sha256,
            &[],
            now,
            &X509Config::default(),
        )
        .unwrap();
        assert!(empty.revoked_serials().is_empty());
        assert!(empty.inner.tbs_cert_list.revoked_certificates.is_none());

        let crl = build_crl(
            &issuer,
            DigestAlgorithm::Sha256,
            &[
                snapshot(5, current, RevocationStatus::Revoked { at: now }),
                snapshot(6, current, RevocationStatus::Active),
            ],
            now,
            &X509Config::default(),
        )
        .unwrap();
        let parsed = CertificateRevocationList::from_pem(&crl.to_pem().unwrap()).unwrap();
        assert_eq!(parsed, crl);
        assert_eq!(parsed.revoked_serials(), vec![BigUint::from(5u32)]);
        assert_eq!(parsed.issuer_name(), &name);
        assert_eq!(parsed.this_update(), now.replace_nanosecond(0).unwrap());
        assert_eq!(
            parsed.next_update(),
            Some(parsed.this_update() + Duration::days(1))
        );
    }

    #[test]
    fn test_next_update_out_of_range() {
        let key = KeyPair::generate_rsa(KeyLength::Bits512).unwrap();
        let issuer = SelfIssuer {
            name: DistinguishedName::builder()
                .common_name("crl.test")
                .build()
                .as_x509_name()
                .unwrap(),
            key: &key,
            serial_number: BigUint::from(1u32),
        };
        let config = X509Config::builder().crl_next_update_days(100_000_000).build();
        let result = build_crl(
            &issuer,
            DigestAlgorithm::Sha256,
            &[],
            OffsetDateTime::now_utc(),
            &config,
        );
        assert!(matches!(result, Err(X509Error::InvalidParameter(_))));
    }
}
