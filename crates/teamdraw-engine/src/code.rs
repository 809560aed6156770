use thiserror::Error;

use crate::util::random_bytes;

/// RFC 4648 base32 alphabet: uppercase letters and digits 2-7.
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

pub const DEFAULT_CODE_LEN: usize = 9;

#[derive(Debug, Error)]
#[error("entropy source unavailable: {0}")]
pub struct CodeError(#[from] getrandom::Error);

/// Produces short, human-typable invite codes.
///
/// Uniqueness is not guaranteed here; the store enforces it with a unique
/// index and callers retry on collision.
#[derive(Clone, Copy, Debug)]
pub struct CodeGenerator {
    len: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self { len: DEFAULT_CODE_LEN }
    }
}

impl CodeGenerator {
    pub fn with_len(len: usize) -> Self {
        Self { len: len.max(1) }
    }

    pub fn generate(&self) -> Result<String, CodeError> {
        // 5 bits per symbol.
        let bytes = random_bytes((self.len * 5).div_ceil(8))?;
        Ok(base32_encode(&bytes, self.len))
    }
}

fn base32_encode(bytes: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for b in bytes {
        buffer = (buffer << 8) | u32::from(*b);
        bits += 8;
        while bits >= 5 && out.len() < len {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 && out.len() < len {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}
