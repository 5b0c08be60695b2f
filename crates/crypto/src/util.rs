//! Small helpers shared by the key managers.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;

/// Fills a fresh buffer from the OS RNG.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// All key protos in this crate are at version 0.
pub(crate) fn validate_version(version: u32, max: u32) -> CryptoResult<()> {
    if version > max {
        return Err(CryptoError::InvalidKey(format!(
            "key version {} is not supported, max is {}",
            version, max
        )));
    }
    Ok(())
}

/// Converts a big-endian integer of arbitrary width to exactly `N` bytes.
///
/// Serialized EC coordinates and scalars may carry a leading zero byte or
/// be shorter than the field size.
pub(crate) fn fixed_width<const N: usize>(bytes: &[u8]) -> CryptoResult<[u8; N]> {
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[first_nonzero..];
    if trimmed.len() > N {
        return Err(CryptoError::InvalidKey(format!(
            "integer of {} bytes does not fit in {} bytes",
            trimmed.len(),
            N
        )));
    }
    let mut out = [0u8; N];
    out[N - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_strips_leading_zero() {
        let mut input = vec![0u8];
        input.extend_from_slice(&[0xffu8; 32]);
        let out: [u8; 32] = fixed_width(&input).unwrap();
        assert_eq!(out, [0xffu8; 32]);
    }

    #[test]
    fn test_fixed_width_pads_short_input() {
        let out: [u8; 4] = fixed_width(&[1, 2]).unwrap();
        assert_eq!(out, [0, 0, 1, 2]);
    }

    #[test]
    fn test_fixed_width_rejects_oversized() {
        assert!(fixed_width::<2>(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_version_check() {
        assert!(validate_version(0, 0).is_ok());
        assert!(validate_version(1, 0).is_err());
    }
}
