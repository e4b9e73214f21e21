use crate::error::{Result, X509Error};

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let pem = pem::parse(pem_str.trim())
        .map_err(|e| X509Error::MalformedCertificate(format!("{label}: {e}")))?;
    if pem.tag() != label {
        return Err(X509Error::MalformedCertificate(format!(
            "expected a {label} PEM block, found {}",
            pem.tag()
        )));
    }
    Ok(pem.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_checked() {
        let pem = der_to_pem(&[0x30, 0x00], "X509 CRL");
        assert!(pem.starts_with("-----BEGIN X509 CRL-----\n"));
        assert!(!pem.contains('\r'));
        assert_eq!(pem_to_der(&pem, "X509 CRL").unwrap(), vec![0x30, 0x00]);
        assert!(matches!(
            pem_to_der(&pem, "CERTIFICATE"),
            Err(X509Error::MalformedCertificate(_))
        ));
    }
}
