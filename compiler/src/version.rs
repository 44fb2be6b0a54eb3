use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{error::NifError, utils::quote};

/// A dotted format version packed into 32 bits, one byte per component with the
/// most significant component first (`"10.0.1.0"` is `0x0A000100`).
///
/// Ordering is plain integer ordering. An absent bound is `Option::None`, which
/// is distinct from `VersionOrdinal(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VersionOrdinal(pub u32);

impl VersionOrdinal {
    /// Packs a dotted version string.
    ///
    /// Two components use the short form: the digits of the second component
    /// fill the low three bytes by position, so `"20.1"` is `0x14010000` and
    /// `"4.22"` is `0x04020200`. One, three or four components map one byte
    /// each and absent low components are zero.
    pub fn pack(text: &str) -> Result<Self, NifError> {
        let malformed = || NifError::MalformedVersion(quote(text));

        let parts: Vec<&str> = text.split('.').collect();
        if text.is_empty() || parts.len() > 4 {
            return Err(malformed());
        }
        if parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(malformed());
        }

        let byte = |part: &str| -> Result<u32, NifError> {
            part.parse::<u32>()
                .ok()
                .filter(|v| *v <= 0xFF)
                .ok_or_else(malformed)
        };

        let mut version = byte(parts[0])? << 24;
        if parts.len() == 2 {
            let digits = parts[1].as_bytes();
            version |= u32::from(digits[0] - b'0') << 16;
            if digits.len() >= 2 {
                version |= u32::from(digits[1] - b'0') << 8;
            }
            if digits.len() >= 3 {
                version |= byte(&parts[1][2..])?;
            }
        } else {
            for (i, part) in parts.iter().enumerate().skip(1) {
                version |= byte(*part)? << ((3 - i) * 8);
            }
        }
        Ok(VersionOrdinal(version))
    }

    /// Packs `text`, treating the empty string as "no bound".
    pub fn pack_optional(text: &str) -> Result<Option<Self>, NifError> {
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Self::pack(text.trim()).map(Some)
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The `0x%08X` literal used when a version appears inside an expression.
    pub fn hex_literal(self) -> String {
        format!("0x{:08X}", self.0)
    }
}

impl FromStr for VersionOrdinal {
    type Err = NifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionOrdinal::pack(s)
    }
}

/// Renders the four-component dotted form.
impl fmt::Display for VersionOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0.to_be_bytes();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
