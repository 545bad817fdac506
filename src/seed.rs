use std::fmt;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;

use crate::error::ConfigError;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 1099511628211;

/// A run seed together with the text it was parsed from.
///
/// `\x` prefixes a hexadecimal value, `\d` a decimal one. Any other text is
/// hashed, and empty text takes the current local date and time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seed {
    text: String,
    value: u64,
}

impl Seed {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let text = input.trim();
        if text.is_empty() {
            let now = chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string();
            return Ok(Self::hashed(now));
        }
        if let Some(hex) = text.strip_prefix("\\x") {
            let value = u64::from_str_radix(hex.trim(), 16).map_err(|err| seed_error(text, err))?;
            return Ok(Self::from_parts(text, value));
        }
        if let Some(decimal) = text.strip_prefix("\\d") {
            let value = decimal
                .trim()
                .parse::<u64>()
                .map_err(|err| seed_error(text, err))?;
            return Ok(Self::from_parts(text, value));
        }
        Ok(Self::hashed(text.to_string()))
    }

    pub fn from_value(value: u64) -> Self {
        Self::from_parts(&format!("\\d{value}"), value)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.value)
    }

    fn hashed(text: String) -> Self {
        let value = stable_hash(&text);
        info!("seed {text:?} hashed to {value:#018x}");
        Self { text, value }
    }

    fn from_parts(text: &str, value: u64) -> Self {
        Self {
            text: text.to_string(),
            value,
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#x})", self.text, self.value)
    }
}

/// FNV-1a over the UTF-8 bytes; identical on every platform and run.
fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

fn seed_error(input: &str, err: impl fmt::Display) -> ConfigError {
    ConfigError::Seed {
        input: input.to_string(),
        reason: err.to_string(),
    }
}
