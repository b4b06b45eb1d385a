//! Check digit (DV) arithmetic for Paraguayan taxpayer numbers (RUC).
//!
//! The DV is a weighted modulo-11 sum over the RUC digits, read right to
//! left with weights cycling 2, 3, ..., 11, 2, 3, ...
//!
//! # Example
//!
//! ```text
//! RUC "1":    total = 1*2 = 2, 2 % 11 = 2  -> DV = 11 - 2 = 9
//! RUC "19":   total = 9*2 + 1*3 = 21, 21 % 11 = 10 -> DV = 1
//! ```

use std::fmt;

use thiserror::Error;

/// First weight applied to the right-most digit.
const FIRST_FACTOR: u64 = 2;
/// Largest weight before the cycle restarts at [`FIRST_FACTOR`].
const MAX_FACTOR: u64 = 11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RucError {
    #[error("RUC is empty")]
    Empty,
    #[error("RUC must contain only digits: {0:?}")]
    NotNumeric(String),
    #[error("expected RUC formatted as <digits>-<dv>, got {0:?}")]
    Malformed(String),
    #[error("check digit mismatch for RUC {ruc}: expected {expected}, got {given}")]
    CheckDigitMismatch { ruc: String, expected: u8, given: u8 },
}

/// Compute the modulo-11 check digit of a RUC.
///
/// Returns `None` for empty input or when any character is not an ASCII
/// digit. The result is always in `0..=10`.
pub fn check_digit(ruc: &str) -> Option<u8> {
    if ruc.is_empty() || !ruc.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut total: u64 = 0;
    let mut factor = FIRST_FACTOR;
    for b in ruc.bytes().rev() {
        total += u64::from(b - b'0') * factor;
        factor += 1;
        if factor > MAX_FACTOR {
            factor = FIRST_FACTOR;
        }
    }

    let remainder = total % 11;
    let dv = if remainder > 1 { 11 - remainder } else { 0 };
    Some(dv as u8)
}

/// Render a RUC with its check digit, e.g. `"1234567"` → `"1234567-9"`.
pub fn format_ruc(ruc: &str) -> Option<String> {
    check_digit(ruc).map(|dv| format!("{ruc}-{dv}"))
}

/// A RUC whose check digit has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruc {
    digits: String,
    dv: u8,
}

impl Ruc {
    /// Build from bare digits, computing the check digit.
    pub fn from_digits(digits: &str) -> Result<Self, RucError> {
        if digits.is_empty() {
            return Err(RucError::Empty);
        }
        let dv = check_digit(digits).ok_or_else(|| RucError::NotNumeric(digits.to_string()))?;
        Ok(Self {
            digits: digits.to_string(),
            dv,
        })
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn dv(&self) -> u8 {
        self.dv
    }
}

impl fmt::Display for Ruc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.digits, self.dv)
    }
}

/// Parse and verify a formatted RUC (`"<digits>-<dv>"`).
///
/// Surrounding whitespace is ignored. The DV part must be a number in
/// `0..=10` that matches the computed check digit.
pub fn verify_ruc(formatted: &str) -> Result<Ruc, RucError> {
    let s = formatted.trim();
    if s.is_empty() {
        return Err(RucError::Empty);
    }
    let (digits, dv) = s
        .split_once('-')
        .ok_or_else(|| RucError::Malformed(s.to_string()))?;
    let given: u8 = Some(dv)
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|d| d.parse().ok())
        .filter(|d| *d <= 10)
        .ok_or_else(|| RucError::Malformed(s.to_string()))?;

    let ruc = Ruc::from_digits(digits)?;
    if ruc.dv != given {
        return Err(RucError::CheckDigitMismatch {
            ruc: digits.to_string(),
            expected: ruc.dv,
            given,
        });
    }
    Ok(ruc)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward reimplementation used to cross-check the table below.
    fn reference(ruc: &str) -> u8 {
        let weights = [2u64, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        let total: u64 = ruc
            .bytes()
            .rev()
            .enumerate()
            .map(|(i, b)| u64::from(b - b'0') * weights[i % weights.len()])
            .sum();
        match total % 11 {
            0 | 1 => 0,
            r => (11 - r) as u8,
        }
    }

    #[test]
    fn empty_and_non_numeric_yield_none() {
        assert_eq!(check_digit(""), None);
        assert_eq!(check_digit("abc"), None);
        assert_eq!(check_digit("8001234a"), None);
        assert_eq!(check_digit("a80012345"), None);
        assert_eq!(check_digit("800 12345"), None);
        assert_eq!(check_digit("80012345-6"), None);
    }

    #[test]
    fn non_ascii_digits_rejected() {
        // Arabic-Indic digits are numeric but not ASCII.
        assert_eq!(check_digit("١٢٣"), None);
    }

    #[test]
    fn result_always_in_range() {
        let dv = check_digit("1234567").unwrap();
        assert!(dv <= 10);
        for n in 0u32..5000 {
            let dv = check_digit(&n.to_string()).unwrap();
            assert!(dv <= 10, "dv {dv} out of range for {n}");
        }
    }

    #[test]
    fn deterministic_across_calls() {
        let first = check_digit("80012345");
        for _ in 0..100 {
            assert_eq!(check_digit("80012345"), first);
        }
    }

    #[test]
    fn hand_computed_table() {
        // "1": 1*2 = 2 -> 11 - 2 = 9
        assert_eq!(check_digit("1"), Some(9));
        // "5": 5*2 = 10 -> 11 - 10 = 1
        assert_eq!(check_digit("5"), Some(1));
        // "19": 9*2 + 1*3 = 21, 21 % 11 = 10 -> 1
        assert_eq!(check_digit("19"), Some(1));
        // "1234567": 7*2+6*3+5*4+4*5+3*6+2*7+1*8 = 112, 112 % 11 = 2 -> 9
        assert_eq!(check_digit("1234567"), Some(9));
        // "80012345": 5*2+4*3+3*4+2*5+1*6+0*7+0*8+8*9 = 122, 122 % 11 = 1 -> 0
        assert_eq!(check_digit("80012345"), Some(0));
        // "4000000": 4*8 = 32, 32 % 11 = 10 -> 1
        assert_eq!(check_digit("4000000"), Some(1));
        // "11": 1*2 + 1*3 = 5 -> 6
        assert_eq!(check_digit("11"), Some(6));
        // "1111111111": weights 2..11 sum to 65, 65 % 11 = 10 -> 1
        assert_eq!(check_digit("1111111111"), Some(1));
    }

    #[test]
    fn remainder_zero_maps_to_zero_not_eleven() {
        // "0": total 0
        assert_eq!(check_digit("0"), Some(0));
        assert_eq!(check_digit("000"), Some(0));
        // "11000": 1*5 + 1*6 = 11, 11 % 11 = 0 -> 0
        assert_eq!(check_digit("11000"), Some(0));
    }

    #[test]
    fn remainder_one_maps_to_zero() {
        // "6": 6*2 = 12, 12 % 11 = 1 -> 0 (not 10)
        assert_eq!(check_digit("6"), Some(0));
        // "80012345" also lands on remainder 1.
        assert_eq!(check_digit("80012345"), Some(0));
    }

    #[test]
    fn factor_wraps_after_eleven() {
        // 11 digits: the left-most digit is weighted 2 again.
        // "10000000000": 1*2 = 2 -> 9
        assert_eq!(check_digit("10000000000"), Some(9));
        // "1000000000": weight 11 -> 11 % 11 = 0 -> 0
        assert_eq!(check_digit("1000000000"), Some(0));
    }

    #[test]
    fn matches_reference_implementation() {
        for ruc in [
            "1",
            "80012345",
            "80000001",
            "4567890",
            "1234567890123",
            "99999999999999999999",
            "3",
            "1000000000",
        ] {
            assert_eq!(check_digit(ruc), Some(reference(ruc)), "ruc {ruc}");
        }
    }

    #[test]
    fn long_input_does_not_overflow() {
        let ruc = "9".repeat(10_000);
        assert_eq!(check_digit(&ruc), Some(reference(&ruc)));
    }

    #[test]
    fn format_appends_dv() {
        assert_eq!(format_ruc("1").as_deref(), Some("1-9"));
        assert_eq!(format_ruc("80012345").as_deref(), Some("80012345-0"));
        assert_eq!(format_ruc("12a"), None);
    }

    #[test]
    fn verify_accepts_correct_dv() {
        let ruc = verify_ruc(" 1234567-9 ").unwrap();
        assert_eq!(ruc.digits(), "1234567");
        assert_eq!(ruc.dv(), 9);
        assert_eq!(ruc.to_string(), "1234567-9");
    }

    #[test]
    fn verify_rejects_mismatch() {
        assert_eq!(
            verify_ruc("1234567-3"),
            Err(RucError::CheckDigitMismatch {
                ruc: "1234567".into(),
                expected: 9,
                given: 3,
            })
        );
    }

    #[test]
    fn verify_rejects_malformed() {
        assert_eq!(verify_ruc(""), Err(RucError::Empty));
        assert!(matches!(verify_ruc("1234567"), Err(RucError::Malformed(_))));
        assert!(matches!(verify_ruc("1234567-x"), Err(RucError::Malformed(_))));
        assert!(matches!(verify_ruc("1234567-11"), Err(RucError::Malformed(_))));
        assert!(matches!(verify_ruc("1234567-+9"), Err(RucError::Malformed(_))));
        assert!(matches!(verify_ruc("1234567-"), Err(RucError::Malformed(_))));
        assert!(matches!(verify_ruc("1234567- 9"), Err(RucError::Malformed(_))));
        assert_eq!(verify_ruc("-9"), Err(RucError::Empty));
        assert!(matches!(verify_ruc("12a4-9"), Err(RucError::NotNumeric(_))));
    }
}
