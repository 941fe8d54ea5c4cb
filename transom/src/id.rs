use nanoid::nanoid;

use crate::types::PrimaryKey;

/// Alphabet for storage-assigned primary keys (no ambiguous glyphs).
const PRIMARY_KEY_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const PRIMARY_KEY_LENGTH: usize = 16;

/// Generates a fresh primary key for rows inserted without an explicit one.
pub fn generate_primary_key() -> PrimaryKey {
    PrimaryKey::new(nanoid!(PRIMARY_KEY_LENGTH, PRIMARY_KEY_ALPHABET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_has_expected_length_and_charset() {
        let pk = generate_primary_key();
        assert_eq!(pk.as_str().len(), PRIMARY_KEY_LENGTH);
        assert!(pk.as_str().chars().all(|c| PRIMARY_KEY_ALPHABET.contains(&c)));
    }
}
