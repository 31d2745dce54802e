// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random identifiers for documents, session tokens and OAuth nonces.

use ring::rand::{SecureRandom, SystemRandom};

/// Bytes of entropy in a session token.
pub const TOKEN_BYTES: usize = 32;
/// Bytes of entropy in a document ID.
pub const DOC_ID_BYTES: usize = 12;

/// Generate `len` random bytes, hex-encoded.
pub fn random_hex(len: usize) -> anyhow::Result<String> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| anyhow::anyhow!("system RNG failure"))?;
    Ok(hex::encode(buf))
}

/// New document ID for the `ddays` and `connections` collections.
pub fn new_doc_id() -> anyhow::Result<String> {
    random_hex(DOC_ID_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_length_and_uniqueness() {
        let a = random_hex(TOKEN_BYTES).unwrap();
        let b = random_hex(TOKEN_BYTES).unwrap();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
