use core::str::FromStr;
use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{BitString, Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use rsa::BigUint;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;

use crate::error::{Result, X509Error};

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certward::cert::extensions::{AltName, SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec![AltName::Dns("example.com".to_string())] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Splits an OpenSSL style comma separated list.
pub(crate) fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// One entry of a Subject Alternative Name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Ip(IpAddr),
    Email(String),
    Uri(String),
}

impl FromStr for AltName {
    type Err = X509Error;

    /// Parses `DNS:`, `IP:`, `email:` and `URI:` prefixed entries.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| X509Error::InvalidParameter(format!("alt name {s:?} has no type")))?;
        let value = value.trim();
        match kind.trim() {
            "DNS" => Ok(AltName::Dns(value.to_string())),
            "IP" => value
                .parse()
                .map(AltName::Ip)
                .map_err(|_| X509Error::InvalidParameter(format!("bad IP address {value:?}"))),
            "email" => Ok(AltName::Email(value.to_string())),
            "URI" => Ok(AltName::Uri(value.to_string())),
            other => Err(X509Error::InvalidParameter(format!(
                "unsupported alt name type {other:?}"
            ))),
        }
    }
}

fn ia5(value: &str) -> Result<Ia5String> {
    Ia5String::try_from(value.to_string()).map_err(|e| X509Error::InvalidParameter(e.to_string()))
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// This extension specifies additional identities for the subject of the certificate.
///
/// # Fields
/// * `names` - DNS names, IP addresses, emails and URIs.
#[derive(Debug, Clone)]
pub struct SubjectAltName {
    pub names: Vec<AltName>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(|name| -> Result<GeneralName> {
                    Ok(match name {
                        AltName::Dns(dns) => GeneralName::DnsName(ia5(dns)?),
                        AltName::Email(email) => GeneralName::Rfc822Name(ia5(email)?),
                        AltName::Uri(uri) => GeneralName::UniformResourceIdentifier(ia5(uri)?),
                        AltName::Ip(IpAddr::V4(ip)) => {
                            GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?)
                        }
                        AltName::Ip(IpAddr::V6(ip)) => {
                            GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?)
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let names = san
            .0
            .iter()
            .map(|name| match name {
                GeneralName::DnsName(dns) => Ok(AltName::Dns(dns.to_string())),
                GeneralName::Rfc822Name(email) => Ok(AltName::Email(email.to_string())),
                GeneralName::UniformResourceIdentifier(uri) => Ok(AltName::Uri(uri.to_string())),
                GeneralName::IpAddress(ip) => match ip.as_bytes().len() {
                    4 => {
                        let mut octets = [0u8; 4];
                        octets.copy_from_slice(ip.as_bytes());
                        Ok(AltName::Ip(IpAddr::from(octets)))
                    }
                    16 => {
                        let mut octets = [0u8; 16];
                        octets.copy_from_slice(ip.as_bytes());
                        Ok(AltName::Ip(IpAddr::from(octets)))
                    }
                    _ => Err(X509Error::InvalidParameter(
                        "Invalid IP address length".to_string(),
                    )),
                },
                _ => Err(X509Error::InvalidParameter(
                    "Unsupported general name type".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed, `None` for no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl FromStr for BasicConstraints {
    type Err = X509Error;

    /// Parses `CA:TRUE, pathlen:N` or `CA:FALSE`.
    fn from_str(s: &str) -> Result<Self> {
        let mut constraints = BasicConstraints::default();
        for item in split_list(s) {
            let (key, value) = item.split_once(':').ok_or_else(|| {
                X509Error::InvalidParameter(format!("basicConstraints item {item:?}"))
            })?;
            match (key.trim(), value.trim()) {
                ("CA", v) if v.eq_ignore_ascii_case("true") => constraints.is_ca = true,
                ("CA", v) if v.eq_ignore_ascii_case("false") => constraints.is_ca = false,
                ("pathlen", v) => {
                    constraints.max_path_length = Some(v.parse().map_err(|_| {
                        X509Error::InvalidParameter(format!("pathlen {v:?} is not a number"))
                    })?)
                }
                _ => {
                    return Err(X509Error::InvalidParameter(format!(
                        "basicConstraints item {item:?}"
                    )));
                }
            }
        }
        Ok(constraints)
    }
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Key usage flags with their configuration name and display name.
const KEY_USAGE_NAMES: [(KeyUsages, &str, &str); 9] = [
    (KeyUsages::DigitalSignature, "digitalSignature", "Digital Signature"),
    (KeyUsages::NonRepudiation, "nonRepudiation", "Non Repudiation"),
    (KeyUsages::KeyEncipherment, "keyEncipherment", "Key Encipherment"),
    (KeyUsages::DataEncipherment, "dataEncipherment", "Data Encipherment"),
    (KeyUsages::KeyAgreement, "keyAgreement", "Key Agreement"),
    (KeyUsages::KeyCertSign, "keyCertSign", "Certificate Sign"),
    (KeyUsages::CRLSign, "cRLSign", "CRL Sign"),
    (KeyUsages::EncipherOnly, "encipherOnly", "Encipher Only"),
    (KeyUsages::DecipherOnly, "decipherOnly", "Decipher Only"),
];

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// Human readable flag names, in bit order.
    pub fn display_names(&self) -> Vec<&'static str> {
        KEY_USAGE_NAMES
            .iter()
            .filter(|(flag, _, _)| self.0.contains(*flag))
            .map(|(_, _, display)| *display)
            .collect()
    }
}

impl FromStr for KeyUsage {
    type Err = X509Error;

    /// Parses a list such as `"cRLSign, keyCertSign"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut flags: FlagSet<KeyUsages> = FlagSet::empty();
        for item in split_list(s) {
            let (flag, _, _) = KEY_USAGE_NAMES
                .iter()
                .find(|(_, name, _)| *name == item)
                .ok_or_else(|| X509Error::InvalidParameter(format!("unknown key usage {item:?}")))?;
            flags |= *flag;
        }
        if flags.is_empty() {
            return Err(X509Error::InvalidParameter(
                "key usage list is empty".to_string(),
            ));
        }
        Ok(KeyUsage(flags))
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ku = X509KeyUsage::from(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl FromStr for ExtendedKeyUsage {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        let usage = split_list(s)
            .map(ExtendedKeyUsageOption::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { usage })
    }
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku
            .0
            .iter()
            .map(|oid| {
                ExtendedKeyUsageOption::ALL
                    .into_iter()
                    .find(|option| ObjectIdentifier::from(*option) == *oid)
                    .ok_or_else(|| {
                        X509Error::InvalidParameter(format!("unsupported extended key usage {oid}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtendedKeyUsageOption {
    pub const ALL: [ExtendedKeyUsageOption; 6] = [
        ExtendedKeyUsageOption::ServerAuth,
        ExtendedKeyUsageOption::ClientAuth,
        ExtendedKeyUsageOption::CodeSigning,
        ExtendedKeyUsageOption::EmailProtection,
        ExtendedKeyUsageOption::TimeStamping,
        ExtendedKeyUsageOption::OcspSigning,
    ];

    /// OpenSSL short name, as accepted by `from_str`.
    pub fn name(self) -> &'static str {
        match self {
            ExtendedKeyUsageOption::ServerAuth => "serverAuth",
            ExtendedKeyUsageOption::ClientAuth => "clientAuth",
            ExtendedKeyUsageOption::CodeSigning => "codeSigning",
            ExtendedKeyUsageOption::EmailProtection => "emailProtection",
            ExtendedKeyUsageOption::TimeStamping => "timeStamping",
            ExtendedKeyUsageOption::OcspSigning => "OCSPSigning",
        }
    }
}

impl FromStr for ExtendedKeyUsageOption {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        ExtendedKeyUsageOption::ALL
            .into_iter()
            .find(|option| option.name() == s.trim())
            .ok_or_else(|| X509Error::InvalidParameter(format!("unknown extended key usage {s:?}")))
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
        }
    }
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.clone())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// This extension identifies the public key corresponding to the private key used to sign the certificate.
///
/// # Fields
/// * `key_identifier` - The key identifier.
/// * `authority_cert_issuer` - The issuer name of the authority's own certificate.
/// * `authority_cert_serial_number` - The serial number of the authority's certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
    pub authority_cert_issuer: Name,
    pub authority_cert_serial_number: BigUint,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let general_names = vec![GeneralName::DirectoryName(
            self.authority_cert_issuer.clone(),
        )];

        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: Some(general_names),
            authority_cert_serial_number: Some(crate::tbs_certificate::serial_number(
                &self.authority_cert_serial_number,
            )?),
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;

        let authority_cert_issuer = aki
            .authority_cert_issuer
            .as_ref()
            .and_then(|names| {
                names.iter().find_map(|name| match name {
                    GeneralName::DirectoryName(dn) => Some(dn.clone()),
                    _ => None,
                })
            })
            .unwrap_or_default();

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
            authority_cert_issuer,
            authority_cert_serial_number: aki
                .authority_cert_serial_number
                .map(|sn| BigUint::from_bytes_be(sn.as_bytes()))
                .unwrap_or_default(),
        })
    }
}

/// Represents the Netscape comment extension (`nsComment`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeComment(pub String);

impl ToAndFromX509Extension for NetscapeComment {
    const OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.13");

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        Ok(ia5(&self.0)?.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        Ok(Self(Ia5String::from_der(extension)?.to_string()))
    }
}

/// Represents an option for the Netscape certificate type extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetscapeCertTypeOption {
    Client,
    Server,
    Email,
    ObjectSigning,
    SslCa,
    EmailCa,
    ObjectSigningCa,
}

impl NetscapeCertTypeOption {
    const ALL: [NetscapeCertTypeOption; 7] = [
        NetscapeCertTypeOption::Client,
        NetscapeCertTypeOption::Server,
        NetscapeCertTypeOption::Email,
        NetscapeCertTypeOption::ObjectSigning,
        NetscapeCertTypeOption::SslCa,
        NetscapeCertTypeOption::EmailCa,
        NetscapeCertTypeOption::ObjectSigningCa,
    ];

    /// Bit inside the single byte of the encoded bit string.
    fn mask(self) -> u8 {
        match self {
            NetscapeCertTypeOption::Client => 0x80,
            NetscapeCertTypeOption::Server => 0x40,
            NetscapeCertTypeOption::Email => 0x20,
            NetscapeCertTypeOption::ObjectSigning => 0x10,
            NetscapeCertTypeOption::SslCa => 0x04,
            NetscapeCertTypeOption::EmailCa => 0x02,
            NetscapeCertTypeOption::ObjectSigningCa => 0x01,
        }
    }

    /// OpenSSL short name, as accepted by `from_str`.
    pub fn name(self) -> &'static str {
        match self {
            NetscapeCertTypeOption::Client => "client",
            NetscapeCertTypeOption::Server => "server",
            NetscapeCertTypeOption::Email => "email",
            NetscapeCertTypeOption::ObjectSigning => "objsign",
            NetscapeCertTypeOption::SslCa => "sslCA",
            NetscapeCertTypeOption::EmailCa => "emailCA",
            NetscapeCertTypeOption::ObjectSigningCa => "objCA",
        }
    }
}

impl FromStr for NetscapeCertTypeOption {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        NetscapeCertTypeOption::ALL
            .into_iter()
            .find(|option| option.name() == s.trim())
            .ok_or_else(|| X509Error::InvalidParameter(format!("unknown nsCertType {s:?}")))
    }
}

/// Represents the Netscape certificate type extension (`nsCertType`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCertType(pub Vec<NetscapeCertTypeOption>);

impl FromStr for NetscapeCertType {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        let options = split_list(s)
            .map(NetscapeCertTypeOption::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(options))
    }
}

impl ToAndFromX509Extension for NetscapeCertType {
    const OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.113730.1.1");

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let byte = self.0.iter().fold(0u8, |acc, option| acc | option.mask());
        let bits = if byte == 0 {
            BitString::new(0, Vec::new())?
        } else {
            BitString::new(byte.trailing_zeros() as u8, vec![byte])?
        };
        Ok(bits.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let bits = BitString::from_der(extension)?;
        let byte = bits.raw_bytes().first().copied().unwrap_or_default();
        Ok(Self(
            NetscapeCertTypeOption::ALL
                .into_iter()
                .filter(|option| byte & option.mask() != 0)
                .collect(),
        ))
    }
}
