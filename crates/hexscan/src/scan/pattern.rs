use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Array-of-bytes pattern with wildcard positions.
///
/// `mask[i] == false` marks position `i` as a wildcard. `bytes` and `mask`
/// always have the same, non-zero length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Pattern {
    /// Parse pattern text such as `"48 8B ?? 28"`.
    ///
    /// Tokens are whitespace-separated and are either two hex digits
    /// (any case) or a wildcard (`?` or `??`).
    pub fn parse(text: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for (index, token) in text.split_whitespace().enumerate() {
            if token == "??" || token == "?" {
                bytes.push(0);
                mask.push(false);
                continue;
            }

            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::PatternMalformed(format!(
                    "invalid token '{}' at position {}",
                    token, index
                )));
            }

            let value = u8::from_str_radix(token, 16).map_err(|e| {
                Error::PatternMalformed(format!("invalid token '{}': {}", token, e))
            })?;
            bytes.push(value);
            mask.push(true);
        }

        if bytes.is_empty() {
            return Err(Error::PatternMalformed("pattern is empty".to_string()));
        }

        Ok(Self { bytes, mask })
    }

    /// Exact pattern without wildcards.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::PatternMalformed("pattern is empty".to_string()));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
            mask: vec![true; bytes.len()],
        })
    }

    /// Little-endian encoding of an `i32` value.
    pub fn from_i32(value: i32) -> Self {
        Self {
            bytes: value.to_le_bytes().to_vec(),
            mask: vec![true; 4],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn wildcard_count(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }

    /// First concrete byte and its position, used to locate candidates.
    pub fn anchor(&self) -> Option<(usize, u8)> {
        self.mask
            .iter()
            .position(|&m| m)
            .map(|pos| (pos, self.bytes[pos]))
    }

    /// Test the pattern against a window of exactly `self.len()` bytes.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() == self.bytes.len()
            && window
                .iter()
                .zip(self.bytes.iter().zip(&self.mask))
                .all(|(actual, (expected, &care))| !care || actual == expected)
    }
}

/// Parse hex byte text such as `"90 90 EB"`; wildcards are rejected.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let pattern = Pattern::parse(text)?;
    if pattern.wildcard_count() > 0 {
        return Err(Error::PatternMalformed(format!(
            "wildcards are not allowed in byte values: '{}'",
            text.trim()
        )));
    }
    Ok(pattern.bytes)
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .bytes
            .iter()
            .zip(&self.mask)
            .map(|(b, &care)| {
                if care {
                    format!("{:02X}", b)
                } else {
                    "??".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}
