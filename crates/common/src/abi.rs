//! # Minimal ABI Word Codec
//!
//! Encodes calldata and decodes return data for the handful of static-type
//! governance queries the client issues. Only 32-byte static words are
//! supported: `uint256`, `address`, `bytes4`, `bool`.
//!
//! ## Layout
//!
//! ```text
//! calldata = selector(4) || word(32) || word(32) || ...
//! selector = keccak256("name(type,type)")[0..4]
//! ```
//!
//! Unsigned words wider than `u128` are rejected on decode instead of being
//! truncated.

use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::ledger::Address;

/// ABI word size in bytes.
pub const WORD_LEN: usize = 32;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// Return data shorter than the expected number of words.
    #[error("return data too short: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// Unsigned word does not fit into `u128`.
    #[error("word {index} overflows u128")]
    Overflow { index: usize },

    /// Word is not a canonical boolean.
    #[error("word {index} is not a boolean")]
    InvalidBool { index: usize },
}

// ════════════════════════════════════════════════════════════════════════════════
// TOKENS
// ════════════════════════════════════════════════════════════════════════════════

/// A static ABI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Bytes4([u8; 4]),
}

impl Token {
    fn encode_into(&self, out: &mut Vec<u8>) {
        let mut word = [0u8; WORD_LEN];
        match self {
            Token::Uint(v) => word[16..].copy_from_slice(&v.to_be_bytes()),
            Token::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
            // fixed bytes are left-aligned
            Token::Bytes4(b) => word[..4].copy_from_slice(b),
        }
        out.extend_from_slice(&word);
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// ENCODING
// ════════════════════════════════════════════════════════════════════════════════

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Builds calldata for `signature` with the given arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + args.len() * WORD_LEN);
    out.extend_from_slice(&selector(signature));
    for arg in args {
        arg.encode_into(&mut out);
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════════
// DECODING
// ════════════════════════════════════════════════════════════════════════════════

fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD_LEN;
    let end = start + WORD_LEN;
    if data.len() < end {
        return Err(AbiError::Truncated {
            expected: end,
            found: data.len(),
        });
    }
    Ok(&data[start..end])
}

/// Decodes the first `count` words of `data` as unsigned integers.
pub fn decode_uints(data: &[u8], count: usize) -> Result<Vec<u128>, AbiError> {
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let w = word(data, index)?;
        if w[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow { index });
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&w[16..]);
        out.push(u128::from_be_bytes(low));
    }
    Ok(out)
}

/// Decodes the first word of `data` as a boolean.
pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    match decode_uints(data, 1) {
        Ok(v) => match v.first() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(AbiError::InvalidBool { index: 0 }),
        },
        Err(AbiError::Overflow { .. }) => Err(AbiError::InvalidBool { index: 0 }),
        Err(e) => Err(e),
    }
}

/// Encodes unsigned values as consecutive words (mock return data).
pub fn encode_uints(values: &[u128]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * WORD_LEN);
    for v in values {
        Token::Uint(*v).encode_into(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_erc20_transfer() {
        // transfer(address,uint256) = 0xa9059cbb
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn encode_call_lays_out_words() {
        let addr = Address([0x22; 20]);
        let data = encode_call(
            "f(uint256,address,bytes4)",
            &[Token::Uint(7), Token::Address(addr), Token::Bytes4([1, 2, 3, 4])],
        );
        assert_eq!(data.len(), 4 + 3 * WORD_LEN);
        assert_eq!(data[4 + 31], 7);
        assert_eq!(&data[4 + WORD_LEN + 12..4 + 2 * WORD_LEN], &[0x22; 20]);
        assert_eq!(&data[4 + 2 * WORD_LEN..4 + 2 * WORD_LEN + 4], &[1, 2, 3, 4]);
    }

    #[test]
    fn decode_uints_reads_tuple() {
        let data = encode_uints(&[40, 100, 100]);
        assert_eq!(decode_uints(&data, 3), Ok(vec![40, 100, 100]));
    }

    #[test]
    fn decode_uints_rejects_short_data() {
        let data = encode_uints(&[1]);
        assert_eq!(
            decode_uints(&data, 2),
            Err(AbiError::Truncated { expected: 64, found: 32 })
        );
    }

    #[test]
    fn decode_uints_rejects_wide_values() {
        let mut data = encode_uints(&[0]);
        data[0] = 1;
        assert_eq!(decode_uints(&data, 1), Err(AbiError::Overflow { index: 0 }));
    }

    #[test]
    fn decode_bool_accepts_only_zero_and_one() {
        assert_eq!(decode_bool(&encode_uints(&[1])), Ok(true));
        assert_eq!(decode_bool(&encode_uints(&[0])), Ok(false));
        assert_eq!(decode_bool(&encode_uints(&[2])), Err(AbiError::InvalidBool { index: 0 }));
    }
}
