//! OTP generation utilities.

use carwash_auth_core::{AuthError, AuthResult};
use rand::Rng;
use rand::rngs::OsRng;
use std::ops::RangeInclusive;

/// Longest code whose numeric range still fits a `u64`.
pub const MAX_OTP_LENGTH: usize = 18;

/// Configuration for OTP generation.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Number of decimal digits in a code.
    pub length: usize,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl OtpConfig {
    /// Creates a numeric OTP config with the specified length.
    pub fn numeric(length: usize) -> Self {
        Self { length }
    }

    /// Checks the length is within `1..=MAX_OTP_LENGTH`.
    pub fn validate(&self) -> AuthResult<()> {
        if self.length == 0 || self.length > MAX_OTP_LENGTH {
            return Err(AuthError::config(format!(
                "otp length must be between 1 and {MAX_OTP_LENGTH}, got {}",
                self.length
            )));
        }
        Ok(())
    }

    /// The inclusive range codes are drawn from: `10^(len-1) ..= 10^len - 1`.
    ///
    /// The lower bound already has `len` digits, so codes never start with 0.
    /// Only valid after [`validate`](Self::validate) has passed.
    fn range(&self) -> RangeInclusive<u64> {
        let exp = self.length as u32;
        10u64.pow(exp - 1)..=10u64.pow(exp) - 1
    }
}

/// Numeric OTP generator backed by the operating system's CSPRNG.
#[derive(Debug, Clone)]
pub struct OtpGenerator {
    range: RangeInclusive<u64>,
}

impl OtpGenerator {
    /// Creates a new OTP generator, rejecting unusable lengths.
    pub fn new(config: OtpConfig) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            range: config.range(),
        })
    }

    /// Creates a 6-digit generator.
    pub fn default_numeric() -> Self {
        Self {
            range: OtpConfig::default().range(),
        }
    }

    /// Generates a new OTP code, uniform over the configured range.
    pub fn generate(&self) -> String {
        let mut rng = OsRng;
        rng.gen_range(self.range.clone()).to_string()
    }
}

impl Default for OtpGenerator {
    fn default() -> Self {
        Self::default_numeric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_otp() {
        let generator = OtpGenerator::new(OtpConfig::numeric(6)).unwrap();
        let otp = generator.generate();

        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
        assert!(!otp.starts_with('0'));
    }

    #[test]
    fn test_range_bounds() {
        assert_eq!(OtpConfig::numeric(1).range(), 1..=9);
        assert_eq!(OtpConfig::numeric(6).range(), 100_000..=999_999);
        assert_eq!(
            OtpConfig::numeric(MAX_OTP_LENGTH).range(),
            100_000_000_000_000_000..=999_999_999_999_999_999
        );
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let err = OtpGenerator::new(OtpConfig::numeric(0)).unwrap_err();
        assert!(matches!(err, AuthError::ConfigurationError { .. }));
        assert!(OtpGenerator::new(OtpConfig::numeric(MAX_OTP_LENGTH + 1)).is_err());
        assert!(OtpGenerator::new(OtpConfig::numeric(MAX_OTP_LENGTH)).is_ok());
    }

    #[test]
    fn test_uniqueness() {
        let generator = OtpGenerator::default_numeric();
        let codes: Vec<String> = (0..100).map(|_| generator.generate()).collect();

        let unique_count = codes.iter().collect::<std::collections::HashSet<_>>().len();
        assert!(unique_count > 90);
    }

    #[test]
    fn test_digit_positions_are_roughly_uniform() {
        const SAMPLES: usize = 10_000;
        let generator = OtpGenerator::default_numeric();
        let mut counts = [[0usize; 10]; 6];

        for _ in 0..SAMPLES {
            let code = generator.generate();
            assert_eq!(code.len(), 6);
            let value: u64 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));

            for (pos, digit) in code.bytes().enumerate() {
                counts[pos][(digit - b'0') as usize] += 1;
            }
        }

        // Leading position: 1..=9 only, ~1111 each.
        assert_eq!(counts[0][0], 0);
        for digit in 1..10 {
            let n = counts[0][digit];
            assert!((850..=1400).contains(&n), "position 0 digit {digit}: {n}");
        }

        // Other positions: 0..=9, ~1000 each.
        for (pos, position) in counts.iter().enumerate().skip(1) {
            for (digit, &n) in position.iter().enumerate() {
                assert!((750..=1250).contains(&n), "position {pos} digit {digit}: {n}");
            }
        }
    }
}
