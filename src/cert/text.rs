//! OpenSSL style plain-text rendering of a certificate.

use rsa::traits::PublicKeyParts;
use time::OffsetDateTime;
use x509_cert::name::Name;

use super::Certificate;
use super::extensions::{
    AltName, AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    NetscapeCertType, NetscapeComment, SubjectAltName, SubjectKeyIdentifier,
    ToAndFromX509Extension,
};
use super::params::{
    COMMON_NAME, COUNTRY_NAME, EMAIL_ADDRESS, ExtensionParam, LOCALITY_NAME, ORGANIZATION_NAME,
    STATE_OR_PROVINCE_NAME, attribute_string,
};
use crate::key;

struct Dump(String);

impl Dump {
    fn line(&mut self, indent: usize, text: impl AsRef<str>) {
        self.0.push_str(&" ".repeat(indent));
        self.0.push_str(text.as_ref());
        self.0.push('\n');
    }

    /// Colon separated hex, `per_line` octets on each line.
    fn hex_block(&mut self, indent: usize, bytes: &[u8], per_line: usize) {
        let mut chunks = bytes.chunks(per_line).peekable();
        while let Some(chunk) = chunks.next() {
            let mut text = colon_hex(chunk, false);
            if chunks.peek().is_some() {
                text.push(':');
            }
            self.line(indent, text);
        }
    }
}

fn colon_hex(bytes: &[u8], upper: bool) -> String {
    bytes
        .iter()
        .map(|b| {
            if upper {
                format!("{b:02X}")
            } else {
                format!("{b:02x}")
            }
        })
        .collect::<Vec<_>>()
        .join(":")
}

/// Leading zero octet when the high bit is set, as in an ASN.1 INTEGER.
fn integer_octets(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        bytes.insert(0, 0);
    }
    bytes
}

fn short_hex(bytes: &[u8]) -> String {
    let digits = hex::encode(bytes);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn name_to_string(name: &Name) -> String {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .map(|attr| {
            let label = match attr.oid {
                COUNTRY_NAME => "C".to_string(),
                STATE_OR_PROVINCE_NAME => "ST".to_string(),
                LOCALITY_NAME => "L".to_string(),
                ORGANIZATION_NAME => "O".to_string(),
                EMAIL_ADDRESS => "emailAddress".to_string(),
                COMMON_NAME => "CN".to_string(),
                oid => oid.to_string(),
            };
            let value = attribute_string(&attr.value)
                .unwrap_or_else(|| format!("#{}", hex::encode(attr.value.value())));
            format!("{label}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_time(at: OffsetDateTime) -> String {
    let month = at.month().to_string();
    format!(
        "{} {:>2} {:02}:{:02}:{:02} {} GMT",
        &month[..3],
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.year()
    )
}

/// Renders the certificate the way `openssl x509 -text -noout` lays it out.
pub(crate) fn dump(cert: &Certificate) -> String {
    let tbs = &cert.inner.tbs_certificate;
    let mut out = Dump(String::new());
    let signature_name = match cert.digest() {
        Some(digest) => digest.signature_algorithm_name().to_string(),
        None => cert.inner.signature_algorithm.oid.to_string(),
    };

    out.line(0, "Certificate:");
    out.line(4, "Data:");
    let version = cert.version();
    out.line(8, format!("Version: {} (0x{version:x})", u16::from(version) + 1));

    let serial = cert.serial_number();
    let serial_bytes = serial.to_bytes_be();
    if serial_bytes.len() <= 8 {
        out.line(8, format!("Serial Number: {serial} (0x{})", short_hex(&serial_bytes)));
    } else {
        out.line(8, "Serial Number:");
        out.line(12, colon_hex(&integer_octets(serial_bytes), false));
    }

    out.line(8, format!("Signature Algorithm: {signature_name}"));
    out.line(8, format!("Issuer: {}", name_to_string(&tbs.issuer)));
    let validity = cert.validity();
    out.line(8, "Validity");
    out.line(12, format!("Not Before: {}", format_time(validity.not_before)));
    out.line(12, format!("Not After : {}", format_time(validity.not_after)));
    out.line(8, format!("Subject: {}", name_to_string(&tbs.subject)));

    out.line(8, "Subject Public Key Info:");
    match key::rsa_public_key(&tbs.subject_public_key_info) {
        Ok(public) => {
            out.line(12, "Public Key Algorithm: rsaEncryption");
            out.line(16, format!("Public-Key: ({} bit)", public.n().bits()));
            out.line(16, "Modulus:");
            out.hex_block(20, &integer_octets(public.n().to_bytes_be()), 15);
            out.line(
                16,
                format!(
                    "Exponent: {} (0x{})",
                    public.e(),
                    short_hex(&public.e().to_bytes_be())
                ),
            );
        }
        Err(_) => {
            out.line(
                12,
                format!(
                    "Public Key Algorithm: {}",
                    tbs.subject_public_key_info.algorithm.oid
                ),
            );
        }
    }

    let extensions = cert.extensions();
    if !extensions.is_empty() {
        out.line(8, "X509v3 extensions:");
        for ext in &extensions {
            let (label, body) = describe_extension(ext);
            let critical = if ext.critical { " critical" } else { "" };
            out.line(12, format!("{label}:{critical}"));
            for body_line in body {
                out.line(16, body_line);
            }
        }
    }

    out.line(4, format!("Signature Algorithm: {signature_name}"));
    out.hex_block(9, cert.inner.signature.raw_bytes(), 18);
    out.0
}

/// Label and body lines of one extension, hex when it does not decode.
fn describe_extension(ext: &ExtensionParam) -> (String, Vec<String>) {
    let decoded = match ext.oid {
        BasicConstraints::OID => ext.to_extension::<BasicConstraints>().map(|bc| {
            let mut text = if bc.is_ca { "CA:TRUE" } else { "CA:FALSE" }.to_string();
            if let Some(pathlen) = bc.max_path_length {
                text.push_str(&format!(", pathlen:{pathlen}"));
            }
            ("X509v3 Basic Constraints", vec![text])
        }),
        KeyUsage::OID => ext
            .to_extension::<KeyUsage>()
            .map(|ku| ("X509v3 Key Usage", vec![ku.display_names().join(", ")])),
        ExtendedKeyUsage::OID => ext.to_extension::<ExtendedKeyUsage>().map(|eku| {
            let names: Vec<_> = eku.usage.iter().map(|u| u.name()).collect();
            ("X509v3 Extended Key Usage", vec![names.join(", ")])
        }),
        SubjectKeyIdentifier::OID => ext
            .to_extension::<SubjectKeyIdentifier>()
            .map(|ski| ("X509v3 Subject Key Identifier", vec![colon_hex(&ski.0, true)])),
        AuthorityKeyIdentifier::OID => ext.to_extension::<AuthorityKeyIdentifier>().map(|aki| {
            (
                "X509v3 Authority Key Identifier",
                vec![
                    format!("keyid:{}", colon_hex(&aki.key_identifier, true)),
                    format!("DirName:{}", name_to_string(&aki.authority_cert_issuer)),
                    format!(
                        "serial:{}",
                        colon_hex(&aki.authority_cert_serial_number.to_bytes_be(), true)
                    ),
                ],
            )
        }),
        SubjectAltName::OID => ext.to_extension::<SubjectAltName>().map(|san| {
            let names: Vec<_> = san
                .names
                .iter()
                .map(|name| match name {
                    AltName::Dns(dns) => format!("DNS:{dns}"),
                    AltName::Ip(ip) => format!("IP Address:{ip}"),
                    AltName::Email(email) => format!("email:{email}"),
                    AltName::Uri(uri) => format!("URI:{uri}"),
                })
                .collect();
            ("X509v3 Subject Alternative Name", vec![names.join(", ")])
        }),
        NetscapeComment::OID => ext
            .to_extension::<NetscapeComment>()
            .map(|comment| ("Netscape Comment", vec![comment.0])),
        NetscapeCertType::OID => ext.to_extension::<NetscapeCertType>().map(|cert_type| {
            let names: Vec<_> = cert_type.0.iter().map(|t| t.name()).collect();
            ("Netscape Cert Type", vec![names.join(", ")])
        }),
        _ => return (ext.oid.to_string(), vec![colon_hex(&ext.value, false)]),
    };

    match decoded {
        Ok((label, body)) => (label.to_string(), body),
        Err(_) => (ext.oid.to_string(), vec![colon_hex(&ext.value, false)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        let at = OffsetDateTime::from_unix_timestamp(1_474_416_000).unwrap(); // 2016-09-21T00:00:00Z
        assert_eq!(format_time(at), "Sep 21 00:00:00 2016 GMT");
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(colon_hex(&[0xab, 0x01], true), "AB:01");
        assert_eq!(short_hex(&[0x01, 0x00, 0x01]), "10001");
        assert_eq!(short_hex(&[]), "0");
        assert_eq!(integer_octets(vec![0x80]), vec![0x00, 0x80]);
    }

    #[test]
    fn test_hex_block_trailing_colons() {
        let mut out = Dump(String::new());
        out.hex_block(0, &[1, 2, 3, 4], 2);
        assert_eq!(out.0, "01:02:\n03:04\n");
    }
}
