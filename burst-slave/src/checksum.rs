//! Trailing additive checksum carried by host messages.
//!
//! The last byte of a message is the sum of every preceding byte, modulo 256.
//! The drain engine cannot detect a lap it fell behind on, so this check is
//! the only place such corruption surfaces.

use crate::error::IntegrityError;

/// Integrity check applied to a completed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// Deliver messages as-is.
    Unchecked,
    /// Last byte is the 8-bit sum of the preceding bytes.
    TrailingSum8,
}

impl Integrity {
    /// Verify `message` according to this mode.
    pub fn verify(self, message: &[u8]) -> Result<(), IntegrityError> {
        match self {
            Integrity::Unchecked => Ok(()),
            Integrity::TrailingSum8 => verify_trailing(message),
        }
    }
}

/// 8-bit wrapping sum of `bytes`.
pub fn sum8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Check that the final byte of `message` equals [`sum8`] of the rest.
pub fn verify_trailing(message: &[u8]) -> Result<(), IntegrityError> {
    let (&received, body) = message.split_last().ok_or(IntegrityError::MissingChecksum)?;
    let computed = sum8(body);
    if computed == received {
        Ok(())
    } else {
        Err(IntegrityError::Mismatch { computed, received })
    }
}
