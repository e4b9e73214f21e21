//! Explicit configuration for the extension composer, the generator and the
//! CRL builder.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, X509Error};

/// Upper bound of `crl_next_update_days` accepted from JSON, one century.
pub const MAX_CRL_NEXT_UPDATE_DAYS: i64 = 36_500;

/// Path length constraint of an authority's `basicConstraints` extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u8>", into = "Option<u8>")]
pub enum PathLength {
    /// No `pathlen` field is encoded.
    Unlimited,
    /// `pathlen:N`, including `pathlen:0`.
    Max(u8),
}

impl PathLength {
    /// The value to encode, `None` when unlimited.
    pub fn limit(self) -> Option<u8> {
        match self {
            PathLength::Unlimited => None,
            PathLength::Max(n) => Some(n),
        }
    }
}

impl Default for PathLength {
    fn default() -> Self {
        PathLength::Max(0)
    }
}

impl From<Option<u8>> for PathLength {
    fn from(value: Option<u8>) -> Self {
        value.map_or(PathLength::Unlimited, PathLength::Max)
    }
}

impl From<PathLength> for Option<u8> {
    fn from(value: PathLength) -> Self {
        value.limit()
    }
}

/// Settings consulted while composing extensions and building CRLs.
///
/// # Example
/// ```
/// use certward::config::{PathLength, X509Config};
///
/// let config = X509Config::builder()
///     .ca_basic_constraints_pathlen(PathLength::Unlimited)
///     .ca_keyusage_critical(false)
///     .build();
/// assert!(config.ca_basic_constraints_critical);
/// ```
#[derive(Clone, Debug, Builder, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct X509Config {
    /// Criticality of `basicConstraints` on authorities.
    #[builder(default = true)]
    pub ca_basic_constraints_critical: bool,
    #[builder(default)]
    pub ca_basic_constraints_pathlen: PathLength,
    #[builder(default = true)]
    pub ca_keyusage_critical: bool,
    /// Comma separated key usage names, e.g. `"cRLSign, keyCertSign"`.
    #[builder(default = "cRLSign, keyCertSign".to_string(), into)]
    pub ca_keyusage_value: String,
    #[builder(default = false)]
    pub cert_basic_constraints_critical: bool,
    #[builder(default = false)]
    pub cert_keyusage_critical: bool,
    #[builder(default = "digitalSignature, keyEncipherment".to_string(), into)]
    pub cert_keyusage_value: String,
    /// Used when a record has no validity end.
    #[builder(default = 3650)]
    pub default_validity_days: i64,
    /// Distance between `thisUpdate` and `nextUpdate` of generated CRLs.
    #[builder(default = 1)]
    pub crl_next_update_days: i64,
    /// Only consulted by the CRL delivery gate.
    #[builder(default = false)]
    pub crl_protected: bool,
}

impl Default for X509Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl X509Config {
    /// Loads a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| X509Error::InvalidParameter(format!("configuration: {e}")))?;
        if config.default_validity_days <= 0 {
            return Err(X509Error::InvalidParameter(
                "default_validity_days must be positive".to_string(),
            ));
        }
        if !(1..=MAX_CRL_NEXT_UPDATE_DAYS).contains(&config.crl_next_update_days) {
            return Err(X509Error::InvalidParameter(format!(
                "crl_next_update_days must be between 1 and {MAX_CRL_NEXT_UPDATE_DAYS}"
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = X509Config::default();
        assert!(config.ca_basic_constraints_critical);
        assert_eq!(config.ca_basic_constraints_pathlen, PathLength::Max(0));
        assert!(config.ca_keyusage_critical);
        assert_eq!(config.ca_keyusage_value, "cRLSign, keyCertSign");
        assert!(!config.crl_protected);
        assert_eq!(config.default_validity_days, 3650);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            X509Config::from_json(r#"{"ca_basic_constraints_pathlen": null, "crl_protected": true}"#)
                .unwrap();
        assert_eq!(config.ca_basic_constraints_pathlen, PathLength::Unlimited);
        assert!(config.crl_protected);
        assert_eq!(config.ca_keyusage_value, "cRLSign, keyCertSign");

        let config = X509Config::from_json(r#"{"ca_basic_constraints_pathlen": 2}"#).unwrap();
        assert_eq!(config.ca_basic_constraints_pathlen, PathLength::Max(2));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            X509Config::from_json("[1, 2]"),
            Err(X509Error::InvalidParameter(_))
        ));
        assert!(matches!(
            X509Config::from_json(r#"{"default_validity_days": 0}"#),
            Err(X509Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_json_bounds_crl_next_update() {
        for days in ["0", "-1", "36501", "100000000"] {
            let json = format!(r#"{{"crl_next_update_days": {days}}}"#);
            assert!(
                matches!(X509Config::from_json(&json), Err(X509Error::InvalidParameter(_))),
                "{days} accepted"
            );
        }
        let config = X509Config::from_json(r#"{"crl_next_update_days": 36500}"#).unwrap();
        assert_eq!(config.crl_next_update_days, MAX_CRL_NEXT_UPDATE_DAYS);
    }
}
