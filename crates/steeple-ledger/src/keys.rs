/// Referral keys carry 16 bytes of entropy, hex-encoded.
pub const KEY_BYTES: usize = 16;

/// Draw a fresh candidate key from the thread-local CSPRNG.
///
/// Uniqueness is not guaranteed here; callers check the store and retry.
pub fn generate_referral_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Whether `key` could have been produced by [`generate_referral_key`].
pub fn is_well_formed(key: &str) -> bool {
    hex::decode(key).is_ok_and(|bytes| bytes.len() == KEY_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_hex_and_sized() {
        let key = generate_referral_key();
        assert_eq!(key.len(), KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_well_formed(&key));
    }

    #[test]
    fn keys_do_not_repeat() {
        let keys: HashSet<String> = (0..1_000).map(|_| generate_referral_key()).collect();
        assert_eq!(keys.len(), 1_000);
    }

    #[test]
    fn malformed_keys_rejected() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("not-a-key"));
        assert!(!is_well_formed("abcd"));
        assert!(!is_well_formed(&"g".repeat(KEY_BYTES * 2)));
    }
}
