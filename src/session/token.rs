//! Opaque session token generation.

use rand::RngCore;

/// Token entropy in bytes. Hex encoding doubles the printed length.
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random session token.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..100).map(|_| generate()).collect();
        assert_eq!(tokens.len(), 100);
    }
}
