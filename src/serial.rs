//! Serial numbers for leaf certificates.
//!
//! Uniqueness per authority is the job of whoever stores the records. These
//! sources cover the two usual strategies: a counter per authority and large
//! random integers.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand_core::{OsRng, RngCore};
use rsa::BigUint;

use crate::error::{Result, X509Error};

/// Hands out serial numbers for certificates issued by one authority.
pub trait SerialNumberSource {
    fn next_serial(&self, authority_id: u64) -> Result<BigUint>;
}

/// Per-authority counter starting at 1.
///
/// # Example
/// ```
/// use certward::serial::{MonotonicSerials, SerialNumberSource};
///
/// let serials = MonotonicSerials::default();
/// assert_eq!(serials.next_serial(7).unwrap(), 1u32.into());
/// assert_eq!(serials.next_serial(7).unwrap(), 2u32.into());
/// assert_eq!(serials.next_serial(8).unwrap(), 1u32.into());
/// ```
#[derive(Debug, Default)]
pub struct MonotonicSerials {
    last: Mutex<HashMap<u64, u64>>,
}

impl MonotonicSerials {
    /// Resumes the counter of `authority_id` after `last_issued`.
    pub fn resume(&self, authority_id: u64, last_issued: u64) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = last.entry(authority_id).or_default();
        *entry = (*entry).max(last_issued);
    }
}

impl SerialNumberSource for MonotonicSerials {
    fn next_serial(&self, authority_id: u64) -> Result<BigUint> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = last.entry(authority_id).or_default();
        *entry = entry.checked_add(1).ok_or_else(|| {
            X509Error::InvalidParameter(format!(
                "serial numbers of authority {authority_id} are exhausted"
            ))
        })?;
        Ok(BigUint::from(*entry))
    }
}

/// Positive random serials of at most 127 bits from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSerials;

impl SerialNumberSource for RandomSerials {
    fn next_serial(&self, _authority_id: u64) -> Result<BigUint> {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        bytes[0] &= 0x7f;
        // never zero
        bytes[15] |= 0x01;
        Ok(BigUint::from_bytes_be(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_resume() {
        let serials = MonotonicSerials::default();
        serials.resume(1, 41);
        assert_eq!(serials.next_serial(1).unwrap(), BigUint::from(42u32));
        serials.resume(1, 10);
        assert_eq!(serials.next_serial(1).unwrap(), BigUint::from(43u32));
    }

    #[test]
    fn test_exhausted_counter_is_an_error() {
        let serials = MonotonicSerials::default();
        serials.resume(4, u64::MAX);
        assert!(matches!(
            serials.next_serial(4),
            Err(X509Error::InvalidParameter(_))
        ));
        // the counter is left where it was
        assert!(serials.next_serial(4).is_err());
        assert_eq!(serials.next_serial(5).unwrap(), BigUint::from(1u32));
    }

    #[test]
    fn test_concurrent_issue_never_repeats() {
        let serials = Arc::new(MonotonicSerials::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let serials = Arc::clone(&serials);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| serials.next_serial(3).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for serial in handle.join().unwrap() {
                assert!(seen.insert(serial));
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn test_random_serials_fit_in_20_octets() {
        let serial = RandomSerials.next_serial(0).unwrap();
        assert!(serial.bits() <= 127);
        assert!(serial > BigUint::from(0u32));
        assert_ne!(serial, RandomSerials.next_serial(0).unwrap());
    }
}
