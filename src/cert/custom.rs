//! Caller supplied extensions in OpenSSL configuration syntax.
//!
//! Records carry their extra extensions as a JSON list such as
//! `[{"name": "nsComment", "critical": false, "value": "CA - autogenerated Certificate"}]`.
//! The list is deserialized and encoded before any key is generated, so a bad
//! entry never costs a key generation.

use der::Decode;
use der::asn1::Any;
use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use super::extensions::{
    AltName, BasicConstraints, ExtendedKeyUsage, KeyUsage, NetscapeCertType, NetscapeComment,
    SubjectAltName, split_list,
};
use super::params::ExtensionParam;
use crate::error::{Result, X509Error};

/// One extra extension as stored on a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomExtension {
    pub name: String,
    pub critical: bool,
    pub value: String,
}

impl CustomExtension {
    /// Parses the JSON list stored on a record.
    ///
    /// Anything but a list of `{name, critical, value}` objects fails with
    /// [`X509Error::ExtensionFormat`].
    pub fn parse_list(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| X509Error::ExtensionFormat(e.to_string()))
    }

    /// Same as [`CustomExtension::parse_list`] for an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Vec<Self>> {
        serde_json::from_value(value).map_err(|e| X509Error::ExtensionFormat(e.to_string()))
    }

    /// Encodes the value into a DER extension.
    pub fn to_extension_param(&self) -> Result<ExtensionParam> {
        let critical = self.critical;
        let value = self.value.as_str();
        match self.name.as_str() {
            "nsComment" => {
                ExtensionParam::from_extension(NetscapeComment(value.to_string()), critical)
            }
            "nsCertType" => {
                ExtensionParam::from_extension(value.parse::<NetscapeCertType>()?, critical)
            }
            "keyUsage" => ExtensionParam::from_extension(value.parse::<KeyUsage>()?, critical),
            "extendedKeyUsage" => {
                ExtensionParam::from_extension(value.parse::<ExtendedKeyUsage>()?, critical)
            }
            "basicConstraints" => {
                ExtensionParam::from_extension(value.parse::<BasicConstraints>()?, critical)
            }
            "subjectAltName" => {
                let names = split_list(value)
                    .map(str::parse::<AltName>)
                    .collect::<Result<Vec<_>>>()?;
                ExtensionParam::from_extension(SubjectAltName { names }, critical)
            }
            name => {
                let oid = ObjectIdentifier::new(name).map_err(|_| {
                    X509Error::InvalidParameter(format!("unknown extension {name:?}"))
                })?;
                Ok(ExtensionParam {
                    oid,
                    critical,
                    value: raw_der(value)?,
                })
            }
        }
    }
}

/// Decodes a `DER:30:03:01:01:ff` style value and checks it is one DER element.
fn raw_der(value: &str) -> Result<Vec<u8>> {
    let hex_digits = value
        .strip_prefix("DER:")
        .ok_or_else(|| {
            X509Error::InvalidParameter(format!("raw extension value {value:?} must start with DER:"))
        })?
        .replace(':', "");
    let bytes = hex::decode(hex_digits.trim())
        .map_err(|e| X509Error::InvalidParameter(format!("raw extension value: {e}")))?;
    Any::from_der(&bytes)
        .map_err(|e| X509Error::InvalidParameter(format!("raw extension value: {e}")))?;
    Ok(bytes)
}

/// Encodes every extension, stopping at the first bad one.
pub fn encode_all(extensions: &[CustomExtension]) -> Result<Vec<ExtensionParam>> {
    extensions
        .iter()
        .map(CustomExtension::to_extension_param)
        .collect()
}
