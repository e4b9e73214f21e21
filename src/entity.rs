//! Authority and leaf certificate records and their create/update flow.
//!
//! Records are plain data owned by the caller, who also stores them. A record
//! is materialized once: PEM supplied by the caller is imported, otherwise a
//! key and certificate are generated. Materialized records are never re-signed.

use bon::Builder;
use rsa::BigUint;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cert::custom::{self, CustomExtension};
use crate::cert::params::{DistinguishedName, Validity};
use crate::cert::{Certificate, CertificateWithPrivateKey, DigestAlgorithm};
use crate::config::X509Config;
use crate::crl::{self, RevocationSnapshot, RevocationStatus};
use crate::error::{Result, X509Error};
use crate::generator::{self, CertificateParams, GeneratedMaterial};
use crate::import::{self, ImportedMaterial};
use crate::key::{KeyLength, KeyPair};
use crate::serial::SerialNumberSource;

/// Content type under which CRL PEM is delivered.
pub const CRL_CONTENT_TYPE: &str = "application/x-pem-file";

/// Fields shared by authorities and leaf certificates.
///
/// `key_length` and `digest` hold raw record values and are checked when the
/// record is materialized. `extensions` holds the JSON list of caller
/// extensions as stored.
#[derive(Clone, Debug, Builder, PartialEq)]
pub struct EntityFields {
    #[builder(default, into)]
    pub name: String,
    #[builder(default, into)]
    pub notes: String,
    #[builder(default = 2048)]
    pub key_length: usize,
    #[builder(default = "sha256".to_string(), into)]
    pub digest: String,
    #[builder(default)]
    pub subject: DistinguishedName,
    pub validity_start: Option<OffsetDateTime>,
    pub validity_end: Option<OffsetDateTime>,
    #[builder(default = Value::Array(Vec::new()))]
    pub extensions: Value,
    /// Certificate PEM, empty until materialized unless imported.
    #[builder(default, into)]
    pub certificate: String,
    /// Private key PEM, empty for import-only records.
    #[builder(default, into)]
    pub private_key: String,
    pub serial_number: Option<BigUint>,
}

impl Default for EntityFields {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EntityFields {
    /// True once certificate and serial are stored.
    pub fn is_materialized(&self) -> bool {
        !self.certificate.trim().is_empty() && self.serial_number.is_some()
    }

    fn has_pem(&self) -> bool {
        !self.certificate.trim().is_empty() || !self.private_key.trim().is_empty()
    }

    pub fn custom_extensions(&self) -> Result<Vec<CustomExtension>> {
        CustomExtension::from_value(self.extensions.clone())
    }

    /// Validates every field used for generation and returns the generator input.
    pub fn certificate_params(&self, config: &X509Config) -> Result<CertificateParams> {
        let extensions = self.custom_extensions()?;
        custom::encode_all(&extensions)?;
        self.subject.validate()?;
        let params = CertificateParams::builder()
            .key_length(KeyLength::try_from(self.key_length)?)
            .digest(self.digest.parse::<DigestAlgorithm>()?)
            .subject(self.subject.clone())
            .maybe_validity_start(self.validity_start)
            .maybe_validity_end(self.validity_end)
            .extensions(extensions)
            .build();
        params.validity(config)?;
        Ok(params)
    }

    /// The stored validity window, once both ends are known.
    ///
    /// Stored values are taken as they are, without the ordering check applied
    /// to new records.
    pub fn validity(&self) -> Option<Validity> {
        Some(Validity {
            not_before: self.validity_start?,
            not_after: self.validity_end?,
        })
    }

    fn import(&self) -> Result<ImportedMaterial> {
        self.custom_extensions()?;
        import::import_material(&self.certificate, Some(&self.private_key))
    }

    fn apply_import(&mut self, imported: &ImportedMaterial) {
        self.subject = imported.subject.clone();
        self.validity_start = Some(imported.validity.not_before);
        self.validity_end = Some(imported.validity.not_after);
        self.key_length = imported.key_length;
        self.digest = imported.digest.name().to_string();
        self.serial_number = Some(imported.serial_number.clone());
        if self.name.is_empty() {
            self.name = imported.subject.common_name.clone();
        }
    }

    fn apply_generated(&mut self, generated: GeneratedMaterial) {
        self.validity_start = Some(generated.validity.not_before);
        self.validity_end = Some(generated.validity.not_after);
        self.certificate = generated.certificate_pem;
        self.private_key = generated.private_key_pem;
        self.serial_number = Some(generated.serial_number);
    }
}

/// Read accessors derived from the stored PEM. They never generate anything.
pub trait CertificateMaterial {
    fn fields(&self) -> &EntityFields;

    /// The parsed certificate, `None` when none is stored.
    fn x509(&self) -> Result<Option<Certificate>> {
        let pem = self.fields().certificate.trim();
        if pem.is_empty() {
            return Ok(None);
        }
        Certificate::from_pem(pem).map(Some)
    }

    /// The parsed private key, `None` when none is stored.
    fn pkey(&self) -> Result<Option<KeyPair>> {
        let pem = self.fields().private_key.trim();
        if pem.is_empty() {
            return Ok(None);
        }
        KeyPair::import_from_pem(pem).map(Some)
    }

    /// Plain-text dump of the stored certificate.
    fn x509_text(&self) -> Result<Option<String>> {
        Ok(self.x509()?.map(|cert| cert.to_text()))
    }
}

/// A certificate authority record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Authority {
    /// Storage identifier, reserved before generation. It becomes the serial
    /// number of a generated authority certificate.
    pub id: Option<u64>,
    pub fields: EntityFields,
}

impl CertificateMaterial for Authority {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }
}

impl Authority {
    pub fn new(id: Option<u64>, fields: EntityFields) -> Self {
        Self { id, fields }
    }

    /// Imports the stored PEM or generates a self-signed certificate.
    pub fn materialize(&mut self, config: &X509Config) -> Result<()> {
        if self.fields.is_materialized() {
            return Ok(());
        }

        if self.fields.has_pem() {
            let imported = self.fields.import()?;
            self.fields.apply_import(&imported);
            return Ok(());
        }

        let params = self.fields.certificate_params(config)?;
        let id = self.id.ok_or(X509Error::NotPersisted)?;
        let generated = generator::generate_authority(&params, &BigUint::from(id), config)?;
        self.fields.apply_generated(generated);
        Ok(())
    }

    /// Certificate and key for signing; [`X509Error::NoSigningKey`] for an
    /// import-only authority.
    pub fn signer(&self) -> Result<CertificateWithPrivateKey> {
        let cert = self.x509()?;
        let key = self.pkey()?;
        match (cert, key) {
            (Some(cert), Some(key)) => CertificateWithPrivateKey::new(cert, key),
            _ => Err(X509Error::NoSigningKey),
        }
    }

    fn issued<'a>(
        &self,
        certificates: &'a [LeafCertificate],
    ) -> impl Iterator<Item = &'a LeafCertificate> {
        let id = self.id;
        certificates
            .iter()
            .filter(move |cert| id == Some(cert.authority_id))
    }

    /// Certificates of this authority that belong on a CRL produced at `at`.
    pub fn revoked_certificates<'a>(
        &self,
        certificates: &'a [LeafCertificate],
        at: OffsetDateTime,
    ) -> Vec<&'a LeafCertificate> {
        self.issued(certificates)
            .filter(|cert| {
                cert.snapshot()
                    .is_some_and(|snapshot| snapshot.is_effective(at))
            })
            .collect()
    }

    /// Signed CRL PEM over the certificates issued by this authority.
    pub fn crl(&self, certificates: &[LeafCertificate], config: &X509Config) -> Result<String> {
        let signer = self.signer()?;
        let digest = self.fields.digest.parse::<DigestAlgorithm>()?;
        let snapshots: Vec<RevocationSnapshot> = self
            .issued(certificates)
            .filter_map(LeafCertificate::snapshot)
            .collect();
        let crl = crl::build_crl(
            &signer,
            digest,
            &snapshots,
            OffsetDateTime::now_utc(),
            config,
        )?;
        crl.to_pem()
    }

    /// CRL delivery gate. A protected CRL is not built for unauthenticated
    /// requesters.
    pub fn crl_for_request(
        &self,
        certificates: &[LeafCertificate],
        authenticated: bool,
        config: &X509Config,
    ) -> Result<Option<String>> {
        if config.crl_protected && !authenticated {
            return Ok(None);
        }
        self.crl(certificates, config).map(Some)
    }
}

/// A certificate issued under an [`Authority`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeafCertificate {
    pub id: Option<u64>,
    pub authority_id: u64,
    pub fields: EntityFields,
    pub status: RevocationStatus,
}

impl CertificateMaterial for LeafCertificate {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }
}

impl LeafCertificate {
    pub fn new(id: Option<u64>, authority_id: u64, fields: EntityFields) -> Self {
        Self {
            id,
            authority_id,
            fields,
            status: RevocationStatus::Active,
        }
    }

    /// Imports the stored PEM or generates a certificate signed by `authority`.
    pub fn materialize(
        &mut self,
        authority: &Authority,
        serials: &dyn SerialNumberSource,
        config: &X509Config,
    ) -> Result<()> {
        if self.fields.is_materialized() {
            return Ok(());
        }
        if authority.id != Some(self.authority_id) {
            return Err(X509Error::InvalidParameter(format!(
                "certificate belongs to authority {} but {:?} was given",
                self.authority_id, authority.id
            )));
        }

        if self.fields.has_pem() {
            let imported = self.fields.import()?;
            if let Some(authority_cert) = authority.x509()? {
                if imported.certificate.issuer_name() != authority_cert.subject_name() {
                    return Err(X509Error::ImportPairing(
                        "certificate was not issued by this authority".to_string(),
                    ));
                }
            }
            self.fields.apply_import(&imported);
            return Ok(());
        }

        let params = self.fields.certificate_params(config)?;
        let signer = authority.signer()?;
        let serial_number = serials.next_serial(self.authority_id)?;
        let generated = generator::generate_leaf(&params, &signer, &serial_number, config)?;
        self.fields.apply_generated(generated);
        Ok(())
    }

    /// Marks the certificate revoked now. Revoking twice keeps the first time.
    pub fn revoke(&mut self) -> Result<()> {
        if self.id.is_none() {
            return Err(X509Error::NotPersisted);
        }
        let now = OffsetDateTime::now_utc();
        if self.status.revoke(now) {
            debug!(serial = ?self.fields.serial_number, "revoked certificate");
        } else {
            warn!(serial = ?self.fields.serial_number, "certificate already revoked");
        }
        Ok(())
    }

    pub fn is_revoked(&self) -> bool {
        self.status.is_revoked()
    }

    /// Serial, validity and status read together, `None` before materialization.
    pub fn snapshot(&self) -> Option<RevocationSnapshot> {
        Some(RevocationSnapshot {
            serial_number: self.fields.serial_number.clone()?,
            validity: self.fields.validity()?,
            status: self.status,
        })
    }
}
