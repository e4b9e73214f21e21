mod util;

use botan::Certificate as BotanCertificate;

use certward::cert::params::DistinguishedName;
use certward::cert::{CertificateWithPrivateKey, DigestAlgorithm};
use certward::config::X509Config;
use certward::generator::{self, CertificateParams};
use certward::key::KeyLength;
use certward::serial::MonotonicSerials;
use rsa::BigUint;

fn params(key_length: KeyLength, digest: DigestAlgorithm) -> CertificateParams {
    CertificateParams::builder()
        .key_length(key_length)
        .digest(digest)
        .subject(
            DistinguishedName::builder()
                .common_name("crabs.crabs")
                .organization("Crab widgits SE")
                .build(),
        )
        .build()
}

fn check_cert(cert_der: &[u8]) {
    // Use botan crate to parse the DER and assert it succeeds
    BotanCertificate::load(cert_der).expect("Botan failed to parse certificate");
}

#[test]
#[ignore]
fn test_botan_rsa_authority() {
    let config = X509Config::default();
    for (key_length, digest) in [
        (KeyLength::Bits1024, DigestAlgorithm::Sha1),
        (KeyLength::Bits2048, DigestAlgorithm::Sha256),
        (KeyLength::Bits2048, DigestAlgorithm::Sha512),
    ] {
        let material =
            generator::generate_authority(&params(key_length, digest), &BigUint::from(1u32), &config)
                .unwrap();
        check_cert(&material.certificate.to_der().unwrap());
    }
}

#[test]
#[ignore]
fn test_botan_rsa_leaf() {
    let config = X509Config::default();
    let ca = generator::generate_authority(
        &params(KeyLength::Bits2048, DigestAlgorithm::Sha256),
        &BigUint::from(1u32),
        &config,
    )
    .unwrap();
    let issuer = CertificateWithPrivateKey::new(ca.certificate.clone(), ca.key).unwrap();
    let leaf = generator::generate_leaf(
        &params(KeyLength::Bits1024, DigestAlgorithm::Sha1),
        &issuer,
        &BigUint::from(2u32),
        &config,
    )
    .unwrap();
    check_cert(&leaf.certificate.to_der().unwrap());
}

#[test]
#[ignore]
fn test_botan_imported_authority() {
    let mut ca = certward::entity::Authority::new(
        Some(1),
        certward::entity::EntityFields::builder()
            .certificate(util::NO_EMAIL_CA_CERT)
            .private_key(util::NO_EMAIL_CA_KEY)
            .build(),
    );
    ca.materialize(&X509Config::default()).unwrap();
    let cert = util::create_cert(
        1,
        &ca,
        &MonotonicSerials::default(),
        util::cert_fields("botan.test.org"),
    );
    let x509 = certward::cert::Certificate::from_pem(&cert.fields.certificate).unwrap();
    check_cert(&x509.to_der().unwrap());
}
