// src/utils/api_key.rs

use std::fmt::Write;
use std::sync::LazyLock;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use regex::Regex;

/// Every issued key starts with this prefix.
pub const API_KEY_PREFIX: &str = "pk_26466_";

/// Header carrying the key.
pub const API_KEY_HEADER: &str = "x-api-key";

static API_KEY_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}[0-9a-f]{{64}}$", regex::escape(API_KEY_PREFIX)))
        .expect("API key pattern is valid")
});

/// Generates a new key: the prefix followed by 32 random bytes in hex.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);

    let mut key = String::with_capacity(API_KEY_PREFIX.len() + 64);
    key.push_str(API_KEY_PREFIX);
    bytes.iter().fold(key, |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Whether `key` follows the issued-key format. Checked before any lookup.
pub fn is_well_formed(key: &str) -> bool {
    API_KEY_FORMAT.is_match(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_well_formed_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert!(a.starts_with(API_KEY_PREFIX));
        assert_eq!(a.len(), API_KEY_PREFIX.len() + 64);
        assert!(is_well_formed(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn foreign_keys_are_rejected() {
        assert!(!is_well_formed("sk_live_0123"));
        assert!(!is_well_formed(API_KEY_PREFIX));
        assert!(!is_well_formed(&format!("{API_KEY_PREFIX}{}", "G".repeat(64))));
    }
}
