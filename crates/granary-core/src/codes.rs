// Id and code generation.
//
// Entity ids are v4 UUIDs. Device codes are long random alphanumerics; user
// codes draw from an unambiguous charset (no 0/O, 1/I) and carry a hyphen in
// the middle for readability.

use rand::Rng;

/// Charset for user codes: no characters that are easily confused when read
/// aloud or typed from a TV screen.
pub const USER_CODE_CHARSET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const DEVICE_CODE_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a unique entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate an unguessable device code of the given length.
pub fn new_device_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..DEVICE_CODE_CHARSET.len());
            DEVICE_CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Generate a short human-enterable user code.
///
/// Codes of length 4 or more get a hyphen in the middle, so the returned
/// string is one character longer than `length`.
pub fn new_user_code(length: usize) -> String {
    let charset = USER_CODE_CHARSET.as_bytes();
    let mut rng = rand::thread_rng();
    let code: String = (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..charset.len());
            charset[idx] as char
        })
        .collect();

    if length >= 4 {
        let mid = length / 2;
        format!("{}-{}", &code[..mid], &code[mid..])
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_device_code_length() {
        let code = new_device_code(40);
        assert_eq!(code.len(), 40);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_user_code_shape() {
        let code = new_user_code(8);
        assert_eq!(code.len(), 9);
        assert_eq!(&code[4..5], "-");
        for c in code.chars().filter(|c| *c != '-') {
            assert!(USER_CODE_CHARSET.contains(c), "unexpected char {c}");
        }
    }

    #[test]
    fn test_short_user_code_has_no_hyphen() {
        let code = new_user_code(3);
        assert_eq!(code.len(), 3);
        assert!(!code.contains('-'));
    }
}
