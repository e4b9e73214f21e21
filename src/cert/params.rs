use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, GeneralizedTime, Ia5StringRef, PrintableStringRef, SetOfVec, UtcTime};
use der::{DateTime, Tag, Tagged};
use time::{Duration, OffsetDateTime, UtcOffset};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;

use super::extensions::ToAndFromX509Extension;
use crate::error::{Result, X509Error};

pub(crate) const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub(crate) const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub(crate) const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub(crate) const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub(crate) const EMAIL_ADDRESS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");
pub(crate) const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Parameters handed to an [`Issuer`](crate::issuer::Issuer) for one certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `is_ca` - Selects the authority or leaf extension profile.
/// * `extensions` - Caller extensions, appended after the mandatory ones.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: Name,
    pub subject_public_key: SubjectPublicKeyInfoOwned,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name of an authority or certificate.
///
/// Empty fields are left out of the encoded name, and attributes missing
/// from a parsed name come back as empty strings.
///
/// # Fields
/// * `country` - The two letter country code (C).
/// * `state` - The state or province (ST).
/// * `city` - The locality (L).
/// * `organization` - The organization (O).
/// * `email` - The PKCS#9 email address.
/// * `common_name` - The common name (CN).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default, into)]
    pub country: String,
    #[builder(default, into)]
    pub state: String,
    #[builder(default, into)]
    pub city: String,
    #[builder(default, into)]
    pub organization: String,
    #[builder(default, into)]
    pub email: String,
    #[builder(default, into)]
    pub common_name: String,
}

impl DistinguishedName {
    /// Checks the field values without encoding anything.
    pub fn validate(&self) -> Result<()> {
        if !self.country.is_empty()
            && (self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(X509Error::InvalidParameter(format!(
                "country code {:?} must be two letters",
                self.country
            )));
        }
        PrintableStringRef::new(&self.country)
            .map_err(|e| X509Error::InvalidParameter(format!("country: {e}")))?;
        Ia5StringRef::new(&self.email)
            .map_err(|e| X509Error::InvalidParameter(format!("email: {e}")))?;
        Ok(())
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes are emitted as C, ST, L, O, emailAddress, CN.
    pub fn as_x509_name(&self) -> Result<Name> {
        self.validate()?;

        let attributes = [
            (COUNTRY_NAME, Tag::PrintableString, &self.country),
            (STATE_OR_PROVINCE_NAME, Tag::Utf8String, &self.state),
            (LOCALITY_NAME, Tag::Utf8String, &self.city),
            (ORGANIZATION_NAME, Tag::Utf8String, &self.organization),
            (EMAIL_ADDRESS, Tag::Ia5String, &self.email),
            (COMMON_NAME, Tag::Utf8String, &self.common_name),
        ];

        let mut rdns = Vec::new();
        for (oid, tag, value) in attributes {
            if value.is_empty() {
                continue;
            }
            let mut set = SetOfVec::new();
            set.insert(AttributeTypeAndValue {
                oid,
                value: Any::new(tag, value.as_bytes())?,
            })?;
            rdns.push(RelativeDistinguishedName(set));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes other than the six known ones are ignored.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = attribute_string(&attr.value) else {
                    continue;
                };
                let field = match attr.oid {
                    COUNTRY_NAME => &mut dn.country,
                    STATE_OR_PROVINCE_NAME => &mut dn.state,
                    LOCALITY_NAME => &mut dn.city,
                    ORGANIZATION_NAME => &mut dn.organization,
                    EMAIL_ADDRESS => &mut dn.email,
                    COMMON_NAME => &mut dn.common_name,
                    _ => continue,
                };
                *field = value;
            }
        }

        dn
    }
}

/// Decodes the directory string types found in real world names.
pub(crate) fn attribute_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            Some(String::from_utf8_lossy(value.value()).into_owned())
        }
        Tag::BmpString => {
            let units: Vec<u16> = value
                .value()
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => None,
    }
}

/// Certificate validity period.
///
/// Both ends are UTC and truncated to whole seconds, which is the resolution
/// of the encoded certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period, rejecting windows that do not end after they start.
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Result<Self> {
        let not_before = truncate(not_before);
        let not_after = truncate(not_after);
        if not_after <= not_before {
            return Err(X509Error::InvalidParameter(format!(
                "validity end {not_after} must be after validity start {not_before}"
            )));
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Validity starting at `not_before`, ending at `not_after` or
    /// `default_days` later when no end is given.
    pub fn starting_at(
        not_before: OffsetDateTime,
        not_after: Option<OffsetDateTime>,
        default_days: i64,
    ) -> Result<Self> {
        let not_after = match not_after {
            Some(not_after) => not_after,
            None => add_days(not_before, default_days)?,
        };
        Self::new(not_before, not_after)
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self> {
        Self::starting_at(OffsetDateTime::now_utc(), None, days)
    }

    /// Returns true when `at` lies inside the window, both ends included.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    pub(crate) fn to_x509_validity(self) -> Result<x509_cert::time::Validity> {
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }

    pub fn from_x509_validity(validity: &x509_cert::time::Validity) -> Self {
        Self {
            not_before: from_x509_time(&validity.not_before),
            not_after: from_x509_time(&validity.not_after),
        }
    }
}

/// `at` plus `days` whole days. Results past year 9999 cannot be encoded as
/// X.509 time and are rejected.
pub(crate) fn add_days(at: OffsetDateTime, days: i64) -> Result<OffsetDateTime> {
    days.checked_mul(86_400)
        .map(Duration::seconds)
        .and_then(|offset| at.checked_add(offset))
        .filter(|end| (1..=9999).contains(&end.year()))
        .ok_or_else(|| {
            X509Error::InvalidParameter(format!("{at} plus {days} days is out of range"))
        })
}

fn truncate(at: OffsetDateTime) -> OffsetDateTime {
    let at = at.to_offset(UtcOffset::UTC);
    at - Duration::nanoseconds(i64::from(at.nanosecond()))
}

/// UTCTime through 2049, GeneralizedTime from 2050 on.
pub(crate) fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let secs = u64::try_from(at.unix_timestamp()).map_err(|_| {
        X509Error::InvalidParameter(format!("{at} is before 1970 and cannot be encoded"))
    })?;
    let date_time = DateTime::from_unix_duration(std::time::Duration::from_secs(secs))?;
    if date_time.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(date_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

pub(crate) fn from_x509_time(time: &Time) -> OffsetDateTime {
    OffsetDateTime::from(time.to_system_time())
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    pub(crate) fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    fn sample() -> DistinguishedName {
        DistinguishedName::builder()
            .country("IT")
            .state("RM")
            .city("Rome")
            .organization("OpenWISP")
            .email("test@test.com")
            .common_name("openwisp.org")
            .build()
    }

    #[test]
    fn test_distinguished_name_round_trip() {
        let dn = sample();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 6);
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let dn = DistinguishedName::builder().common_name("only.cn").build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 1);
        let parsed = DistinguishedName::from_x509_name(&name);
        assert_eq!(parsed.email, "");
        assert_eq!(parsed.common_name, "only.cn");
    }

    #[test]
    fn test_bad_country_code() {
        let dn = DistinguishedName::builder().country("ITA").build();
        assert!(matches!(dn.as_x509_name(), Err(X509Error::InvalidParameter(_))));
        let dn = DistinguishedName::builder().country("1T").build();
        assert!(matches!(dn.validate(), Err(X509Error::InvalidParameter(_))));
    }

    #[test]
    fn test_validity_ordering() {
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            Validity::new(now, now),
            Err(X509Error::InvalidParameter(_))
        ));
        let validity = Validity::starting_at(now, None, 3650).unwrap();
        assert_eq!(validity.not_after - validity.not_before, Duration::days(3650));
        assert_eq!(validity.not_before.nanosecond(), 0);
        assert!(validity.contains(validity.not_before));
        assert!(validity.contains(validity.not_after));
        assert!(!validity.contains(validity.not_after + Duration::seconds(1)));
    }

    #[test]
    fn test_validity_past_year_9999() {
        let late = Date::from_calendar_date(9995, Month::January, 1)
            .unwrap()
            .midnight()
            .assume_utc();
        assert!(matches!(
            Validity::starting_at(late, None, 3650),
            Err(X509Error::InvalidParameter(_))
        ));
        let now = OffsetDateTime::now_utc();
        for days in [i64::MAX, i64::MIN, 100_000_000] {
            assert!(matches!(
                Validity::starting_at(now, None, days),
                Err(X509Error::InvalidParameter(_))
            ));
        }
        // an explicit end is used as given
        let end = late + Duration::days(365);
        let validity = Validity::starting_at(late, Some(end), i64::MAX).unwrap();
        assert_eq!(validity.not_after, end);
        assert_eq!(add_days(late, 1).unwrap(), late + Duration::days(1));
    }

    #[test]
    fn test_time_encoding_switches_at_2050() {
        let before = OffsetDateTime::from_unix_timestamp(2_524_607_999).unwrap(); // 2049-12-31T23:59:59Z
        let after = OffsetDateTime::from_unix_timestamp(2_524_608_000).unwrap(); // 2050-01-01T00:00:00Z
        assert!(matches!(to_x509_time(before).unwrap(), Time::UtcTime(_)));
        let encoded = to_x509_time(after).unwrap();
        assert!(matches!(encoded, Time::GeneralTime(_)));
        assert_eq!(from_x509_time(&encoded), after);
    }
}
