use rand::RngExt;

use super::types::ROOM_CODE_LENGTH;

/// Generate a 6-character room code from `A-Z0-9`.
/// Uppercase letters and numbers for easy verbal sharing; uniqueness
/// among non-terminal rooms is enforced by the store, with the creation
/// path retrying on collision.
pub fn generate_room_code() -> String {
    const ALPHANUMERIC_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ALPHANUMERIC_CHARS.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = ALPHANUMERIC_CHARS[idx] as char;
            ch
        })
        .collect()
}

/// Normalize a user-supplied code for lookup.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_codes_have_the_fixed_length_and_alphabet() {
        for _ in 0..256 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn normalization_uppercases_and_trims() {
        assert_eq!(normalize_room_code("  ab12cd "), "AB12CD");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(code in "[a-zA-Z0-9 ]{0,12}") {
            let once = normalize_room_code(&code);
            prop_assert_eq!(normalize_room_code(&once), once);
        }
    }
}
