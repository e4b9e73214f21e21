//! # certward - A Pure Rust Certificate Authority Engine
//!
//! certward issues, imports and revokes X.509 certificates for a certificate
//! authority and the certificates it signs, and produces CRLs signed by the
//! authority key. It is built on the RustCrypto crates, without ring or
//! openssl (except for testing).
//!
//! The crate is a library only. Storing records, serving CRLs over HTTP and
//! deciding who may call it are left to the caller.
//!
//! ## Supported Keys and Digests
//!
//! - **RSA**: 512, 1024, 2048 and 4096-bit keys
//! - **Digests**: sha1, sha224, sha256, sha384 and sha512 with PKCS#1 v1.5 signatures
//!
//! ## Key Features
//!
//! - **Self-Signed Authorities**: serial number taken from the record identifier
//! - **Leaf Certificates**: signed by an authority, serials from a [`serial::SerialNumberSource`]
//! - **Composed Extensions**: basic constraints, key usage, subject and authority key
//!   identifiers, then caller extensions in OpenSSL configuration syntax
//! - **Import**: certificate PEM with an optional PKCS#8 or PKCS#1 private key
//! - **Revocation**: one-way revocation and signed v2 CRLs
//!
//! ## Quick Start
//!
//! ### Creating an Authority and a Certificate
//!
//! ```rust,no_run
//! use certward::{
//!     cert::params::DistinguishedName,
//!     config::X509Config,
//!     entity::{Authority, EntityFields, LeafCertificate},
//!     serial::MonotonicSerials,
//! };
//!
//! # fn main() -> Result<(), certward::error::X509Error> {
//! let config = X509Config::default();
//! let serials = MonotonicSerials::default();
//!
//! // The identifier is reserved by storage first, it becomes the CA serial
//! let mut ca = Authority::new(
//!     Some(1),
//!     EntityFields::builder()
//!         .name("Example CA")
//!         .key_length(2048)
//!         .digest("sha256")
//!         .subject(DistinguishedName::builder().common_name("openwisp.org").build())
//!         .build(),
//! );
//! ca.materialize(&config)?;
//!
//! let mut cert = LeafCertificate::new(
//!     Some(1),
//!     1,
//!     EntityFields::builder()
//!         .key_length(1024)
//!         .digest("sha1")
//!         .subject(DistinguishedName::builder().common_name("test.org").build())
//!         .build(),
//! );
//! cert.materialize(&ca, &serials, &config)?;
//!
//! cert.revoke()?;
//! let crl_pem = ca.crl(&[cert], &config)?;
//! println!("CRL:\n{}", crl_pem);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing Directly from an Authority Key
//!
//! ```rust,no_run
//! use certward::{
//!     cert::{CertificateWithPrivateKey, DigestAlgorithm, params::DistinguishedName},
//!     config::X509Config,
//!     generator::{self, CertificateParams},
//!     key::KeyLength,
//! };
//! use rsa::BigUint;
//!
//! # fn main() -> Result<(), certward::error::X509Error> {
//! let config = X509Config::default();
//! let ca_params = CertificateParams::builder()
//!     .key_length(KeyLength::Bits2048)
//!     .digest(DigestAlgorithm::Sha256)
//!     .subject(DistinguishedName::builder().common_name("Example CA").build())
//!     .build();
//! let ca = generator::generate_authority(&ca_params, &BigUint::from(1u32), &config)?;
//! let issuer = CertificateWithPrivateKey::new(ca.certificate, ca.key)?;
//!
//! let server_params = CertificateParams::builder()
//!     .key_length(KeyLength::Bits2048)
//!     .digest(DigestAlgorithm::Sha256)
//!     .subject(DistinguishedName::builder().common_name("server.example.com").build())
//!     .build();
//! let server = generator::generate_leaf(&server_params, &issuer, &BigUint::from(2u32), &config)?;
//! println!("{}", server.certificate.to_text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`error::X509Error`]. Validation errors are returned
//! before any key is generated:
//!
//! ```rust
//! use certward::{cert::custom::CustomExtension, error::X509Error};
//!
//! match CustomExtension::parse_list(r#"[{"wrong": "wrong"}]"#) {
//!     Ok(_) => unreachable!(),
//!     Err(X509Error::ExtensionFormat(msg)) => println!("Bad extensions: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key generation, import/export and signing
//! - [`cert`]: Certificate encoding/decoding, extensions and text dumps
//! - [`issuer`]: Certificate issuing and extension composition
//! - [`generator`]: Authority and leaf certificate generation
//! - [`import`]: Parsing of externally supplied PEM material
//! - [`crl`]: Revocation state and certificate revocation lists
//! - [`entity`]: Authority and certificate records and their lifecycle
//! - [`serial`]: Serial number sources for leaf certificates
//! - [`config`]: Extension and CRL settings
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure manipulation

pub mod cert;
pub mod config;
pub mod crl;
pub mod entity;
pub mod error;
pub mod generator;
pub mod import;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod serial;
pub mod tbs_certificate;
