//! Short string hash used for cache file names

/// Hash a string into a short lower-case hex digest.
///
/// Multiplicative rolling hash over UTF-16 code units (`h * 31 + unit`),
/// wrapped to a signed 32-bit integer at every step, then made non-negative.
/// Not cryptographic: distinct inputs only usually give distinct digests.
pub fn string_hash(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));

    // i32::MIN has no positive i32 counterpart; unsigned_abs yields 2^31
    format!("{:x}", hash.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(string_hash(""), "0");
        assert_eq!(string_hash("a"), "61");
        assert_eq!(string_hash("abc"), "17862");
    }

    #[test]
    fn test_min_value_is_made_positive() {
        // Hashes to exactly i32::MIN
        assert_eq!(string_hash("polygenelubricants"), "80000000");
    }

    #[test]
    fn test_negative_hash_uses_absolute_value() {
        // "hello world!" wraps to a negative i32
        let raw = "hello world!"
            .encode_utf16()
            .fold(0i32, |h, u| h.wrapping_mul(31).wrapping_add(i32::from(u)));
        assert!(raw < 0);
        assert_eq!(
            string_hash("hello world!"),
            format!("{:x}", raw.unsigned_abs())
        );
    }

    #[test]
    fn test_deterministic_and_hex() {
        let url = "https://cdn.example.org/retreat/hall.png";
        let first = string_hash(url);
        let second = string_hash(url);

        assert_eq!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(first.len() <= 8);
    }

    #[test]
    fn test_non_ascii_uses_utf16_units() {
        // U+0950 is a single UTF-16 unit
        assert_eq!(string_hash("\u{0950}"), format!("{:x}", 0x0950));
    }
}
