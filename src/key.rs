use core::fmt;
use core::str::FromStr;

use const_oid::AssociatedOid;
use der::Encode;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::DigestAlgorithm;
use crate::error::{Result, X509Error};

/// RSA modulus sizes accepted for key generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyLength {
    Bits512,
    Bits1024,
    Bits2048,
    Bits4096,
}

impl KeyLength {
    /// Every accepted length, smallest first.
    pub const ALL: [KeyLength; 4] = [
        KeyLength::Bits512,
        KeyLength::Bits1024,
        KeyLength::Bits2048,
        KeyLength::Bits4096,
    ];

    /// Modulus size in bits.
    pub const fn bits(self) -> usize {
        match self {
            KeyLength::Bits512 => 512,
            KeyLength::Bits1024 => 1024,
            KeyLength::Bits2048 => 2048,
            KeyLength::Bits4096 => 4096,
        }
    }
}

impl TryFrom<usize> for KeyLength {
    type Error = X509Error;

    fn try_from(bits: usize) -> Result<Self> {
        KeyLength::ALL
            .into_iter()
            .find(|length| length.bits() == bits)
            .ok_or_else(|| {
                X509Error::InvalidParameter(format!(
                    "key length {bits} is not one of 512, 1024, 2048, 4096"
                ))
            })
    }
}

impl FromStr for KeyLength {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self> {
        let bits: usize = s
            .trim()
            .parse()
            .map_err(|_| X509Error::InvalidParameter(format!("key length {s:?} is not a number")))?;
        KeyLength::try_from(bits)
    }
}

impl fmt::Display for KeyLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// An RSA key pair used to sign certificates and CRLs.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl KeyPair {
    /// Generate an RSA key pair of the given length.
    pub fn generate_rsa(length: KeyLength) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, length.bits())?;
        Ok(Self::from_private(private))
    }

    fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair {
            private: Box::new(private),
            public,
        }
    }

    /// Imports a PEM private key, either PKCS#8 (`PRIVATE KEY`) or
    /// PKCS#1 (`RSA PRIVATE KEY`).
    pub fn import_from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| {
                X509Error::MalformedCertificate(format!("private key does not parse: {e}"))
            })?;
        Ok(Self::from_private(private))
    }

    /// Exports the private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = self.private.to_pkcs8_pem(pkcs8::LineEnding::LF)?;
        Ok(pem.to_string())
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }

    /// The public key as a `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned::from_key(self.public.clone())?)
    }

    /// Returns true when `spki` carries this pair's public key.
    pub fn matches(&self, spki: &SubjectPublicKeyInfoOwned) -> bool {
        rsa_public_key(spki).is_ok_and(|public| public == self.public)
    }

    /// Signs `data` with PKCS#1 v1.5 using the given digest.
    pub fn sign_data(&self, data: &[u8], digest: DigestAlgorithm) -> Result<Vec<u8>> {
        match digest {
            DigestAlgorithm::Sha1 => sign_with::<Sha1>(&self.private, data),
            DigestAlgorithm::Sha224 => sign_with::<Sha224>(&self.private, data),
            DigestAlgorithm::Sha256 => sign_with::<Sha256>(&self.private, data),
            DigestAlgorithm::Sha384 => sign_with::<Sha384>(&self.private, data),
            DigestAlgorithm::Sha512 => sign_with::<Sha512>(&self.private, data),
        }
    }
}

fn sign_with<D>(private: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>>
where
    D: Digest + AssociatedOid,
{
    let signing_key = SigningKey::<D>::new(private.clone());
    let signature = signing_key
        .try_sign(data)
        .map_err(|e| X509Error::RsaError(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Decodes the RSA public key carried by a `SubjectPublicKeyInfo`.
pub fn rsa_public_key(spki: &SubjectPublicKeyInfoOwned) -> Result<RsaPublicKey> {
    let der = spki.to_der()?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| {
        X509Error::MalformedCertificate(format!("unsupported or invalid public key: {e}"))
    })
}

/// Key identifier derived with the `hash` method: SHA-1 over the subject
/// public key bit string.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}
