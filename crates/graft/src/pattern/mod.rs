//! Combo-pattern compilation.
//!
//! A combo pattern is the human-authored signature text: space-separated
//! tokens, each either a one-or-two-digit hex byte or a wildcard drawn from
//! `?`, `*`, `_` (single or doubled). Compilation produces the parallel
//! byte/mask pair the scanner consumes.
//!
//! ```text
//! "55 48 89 E5 48 C7 05 ?? ?? ?? ?? 69 00 00 00"
//! ```

use tracing::warn;

use crate::error::{Error, Result};

/// Default capacity bound, matching the scratch-buffer size signature
/// authors historically assumed.
pub const DEFAULT_MAX_PATTERN_LEN: usize = 256;

const WILDCARD_CHARS: [char; 3] = ['?', '*', '_'];

/// Mask tag for a byte that must match exactly.
pub const MASK_EXACT: u8 = b'x';
/// Mask tag for an unconstrained byte.
pub const MASK_ANY: u8 = b'?';

/// A compiled signature: byte values plus a parallel `x`/`?` mask.
///
/// Invariant: `bytes.len() == mask.len()` and both are non-empty. Wildcard
/// positions carry the byte value `0x00`; the scanner still compares the
/// first byte literally even when its mask is `?`, so a leading wildcard
/// constrains the match to a zero byte rather than degenerating the whole
/// pattern into match-anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: String,
}

impl Pattern {
    /// Compile combo text, bounded by [`DEFAULT_MAX_PATTERN_LEN`].
    pub fn parse(combo: &str) -> Result<Self> {
        Self::parse_with_limit(combo, DEFAULT_MAX_PATTERN_LEN)
    }

    /// Compile combo text, rejecting patterns longer than `max_len` bytes.
    ///
    /// Malformed tokens are rejected rather than zero-filled: a signature
    /// with a typo should fail loudly, not silently scan for different
    /// bytes.
    pub fn parse_with_limit(combo: &str, max_len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut mask = String::new();

        for token in combo.split_whitespace() {
            if is_wildcard_token(token) {
                bytes.push(0x00);
                mask.push(MASK_ANY as char);
            } else {
                let value = u8::from_str_radix(token, 16).map_err(|e| {
                    warn!("rejecting combo pattern, bad token '{token}': {e}");
                    Error::InvalidPattern(format!("bad token '{token}': {e}"))
                })?;
                bytes.push(value);
                mask.push(MASK_EXACT as char);
            }

            if bytes.len() > max_len {
                return Err(Error::PatternTooLong {
                    length: bytes.len(),
                    max: max_len,
                });
            }
        }

        if bytes.is_empty() {
            return Err(Error::EmptyPattern);
        }

        Ok(Self { bytes, mask })
    }

    /// Build a pattern from a raw byte/mask pair.
    pub fn from_parts(bytes: &[u8], mask: &str) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptyPattern);
        }
        if bytes.len() != mask.len() {
            return Err(Error::InvalidPattern(format!(
                "{} bytes but {} mask chars",
                bytes.len(),
                mask.len()
            )));
        }
        if let Some(bad) = mask
            .chars()
            .find(|&c| c != MASK_EXACT as char && c != MASK_ANY as char)
        {
            return Err(Error::InvalidPattern(format!("bad mask char '{bad}'")));
        }

        Ok(Self {
            bytes: bytes.to_vec(),
            mask: mask.to_string(),
        })
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

    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Whether index `i` constrains the scanned byte.
    pub fn is_exact(&self, i: usize) -> bool {
        self.mask.as_bytes()[i] == MASK_EXACT
    }

    /// Render the canonical combo text for this pattern.
    pub fn format(&self) -> String {
        self.bytes
            .iter()
            .zip(self.mask.bytes())
            .map(|(byte, tag)| {
                if tag == MASK_EXACT {
                    format!("{byte:02X}")
                } else {
                    "??".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One or two characters, all drawn from the wildcard alphabet. Mixed forms
/// like `?*` are accepted; anything longer is a malformed token.
fn is_wildcard_token(token: &str) -> bool {
    token.len() <= 2 && token.chars().all(|c| WILDCARD_CHARS.contains(&c))
}
