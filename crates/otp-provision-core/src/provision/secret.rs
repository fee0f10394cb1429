//! Base32 secret validation and normalisation (RFC 4648).
//!
//! A secret is accepted as-is when it already matches the canonical
//! alphabet. Otherwise hyphens and spaces are stripped, the rest is
//! uppercased, and the result is validated exactly once more.

use lazy_static::lazy_static;
use regex::Regex;

use crate::provision::types::*;

lazy_static! {
    /// Uppercase A–Z, digits 2–7, then up to six `=` padding characters.
    static ref BASE32_PATTERN: Regex =
        Regex::new(r"^[A-Z2-7]*={0,6}$").expect("static Base32 pattern compiles");
}

/// A secret that passed validation, with its decoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSecret {
    /// Canonical Base32 text.
    pub encoded: String,
    /// RFC 4648 decode of `encoded`.
    pub bytes: Vec<u8>,
}

/// Normalise a raw secret.
///
/// Returns `Ok(None)` for empty input. A secret that still fails the
/// pattern after one clean-up pass is `InvalidSecretFormat`.
pub fn normalize_secret(input: &str) -> Result<Option<NormalizedSecret>, ProvisionError> {
    if input.is_empty() {
        return Ok(None);
    }

    if let Some(secret) = accept(input) {
        return Ok(Some(secret));
    }

    let cleaned = strip_separators(input);
    if let Some(secret) = accept(&cleaned) {
        log::debug!("Secret accepted after separator clean-up");
        return Ok(Some(secret));
    }

    Err(ProvisionError::new(
        ProvisionErrorKind::InvalidSecretFormat,
        "Secret is not valid Base32",
    )
    .with_detail(format!("{} characters after clean-up", cleaned.chars().count())))
}

/// Whether `input` is already in canonical Base32 form.
pub fn is_canonical(input: &str) -> bool {
    BASE32_PATTERN.is_match(input)
}

/// Drop hyphens and spaces and ASCII-uppercase the remainder.
pub fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect::<String>()
        .to_ascii_uppercase()
}

fn accept(candidate: &str) -> Option<NormalizedSecret> {
    if !is_canonical(candidate) {
        return None;
    }
    let bytes = decode_base32(candidate)?;
    Some(NormalizedSecret {
        encoded: candidate.to_string(),
        bytes,
    })
}

/// Decode canonical Base32; padding is optional and ignored.
fn decode_base32(canonical: &str) -> Option<Vec<u8>> {
    let unpadded = canonical.trim_end_matches('=');
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, unpadded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HELLO_BYTES: &[u8] = b"Hello!\xde\xad\xbe\xef";

    #[test]
    fn empty_input_is_a_no_op() {
        assert_eq!(normalize_secret("").unwrap(), None);
    }

    #[test]
    fn canonical_secret_is_accepted_unchanged() {
        let s = normalize_secret("JBSWY3DPEHPK3PXP").unwrap().unwrap();
        assert_eq!(s.encoded, "JBSWY3DPEHPK3PXP");
        assert_eq!(s.bytes, HELLO_BYTES);
    }

    #[test]
    fn padded_secret_is_accepted() {
        let s = normalize_secret("MZXW6===").unwrap().unwrap();
        assert_eq!(s.encoded, "MZXW6===");
        assert_eq!(s.bytes, b"foo");
    }

    #[test]
    fn separators_and_case_are_cleaned() {
        let s = normalize_secret("jbsw-y3dp ehpk-3pxp").unwrap().unwrap();
        assert_eq!(s.encoded, "JBSWY3DPEHPK3PXP");
        assert_eq!(s.bytes, HELLO_BYTES);
    }

    #[test]
    fn lowercase_only_is_cleaned() {
        let s = normalize_secret("mzxw6").unwrap().unwrap();
        assert_eq!(s.encoded, "MZXW6");
    }

    #[test]
    fn separators_only_do_not_loop() {
        // Cleans to the empty string, which matches the pattern.
        let s = normalize_secret(" - - ").unwrap().unwrap();
        assert_eq!(s.encoded, "");
        assert!(s.bytes.is_empty());
    }

    #[test]
    fn invalid_alphabet_fails_after_one_retry() {
        let err = normalize_secret("JBSWY3DP0189").unwrap_err();
        assert_eq!(err.kind, ProvisionErrorKind::InvalidSecretFormat);
    }

    #[test]
    fn too_much_padding_fails() {
        let err = normalize_secret("MZXW6=======").unwrap_err();
        assert_eq!(err.kind, ProvisionErrorKind::InvalidSecretFormat);
    }

    #[test]
    fn other_whitespace_is_not_stripped() {
        assert!(normalize_secret("JBSW\tY3DP").is_err());
    }

    #[test]
    fn non_ascii_letters_are_not_case_folded() {
        // Unicode uppercasing would turn these into valid Base32.
        for input in ["ß", "straße", "ı", "ﬀ", "mzxw6ı"] {
            let err = normalize_secret(input).unwrap_err();
            assert_eq!(err.kind, ProvisionErrorKind::InvalidSecretFormat, "{input}");
        }
        assert_eq!(strip_separators("ß-ı"), "ßı");
    }

    #[test]
    fn strip_separators_basic() {
        assert_eq!(strip_separators("ab-cd ef"), "ABCDEF");
    }

    proptest! {
        #[test]
        fn separated_secrets_decode_like_the_cleaned_string(
            bytes in proptest::collection::vec(any::<u8>(), 1..40),
            seps in proptest::collection::vec(prop_oneof![Just(""), Just(" "), Just("-")], 64),
            lower in any::<bool>(),
        ) {
            let canonical = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
            let mut noisy = String::new();
            for (i, c) in canonical.chars().enumerate() {
                noisy.push_str(seps[i % seps.len()]);
                noisy.push(if lower { c.to_ascii_lowercase() } else { c });
            }

            let s = normalize_secret(&noisy).unwrap().unwrap();
            prop_assert_eq!(&s.encoded, &canonical);
            prop_assert_eq!(s.bytes, bytes);
        }

        #[test]
        fn foreign_characters_are_rejected(
            prefix in "[A-Z2-7 -]{0,8}",
            bad in prop::sample::select(vec!['!', '#', '%', '&', '*', '+', '/', ':', '_', '.', '@', '\t', 'é', '€', 'ß', 'ﬀ', 'ı']),
            suffix in "[A-Z2-7 -]{0,8}",
        ) {
            let input = format!("{prefix}{bad}{suffix}");
            let err = normalize_secret(&input).unwrap_err();
            prop_assert_eq!(err.kind, ProvisionErrorKind::InvalidSecretFormat);
        }

        #[test]
        fn canonical_input_is_idempotent(bytes in proptest::collection::vec(any::<u8>(), 0..40)) {
            let canonical = base32::encode(base32::Alphabet::Rfc4648 { padding: true }, &bytes);
            prop_assume!(!canonical.is_empty());
            let first = normalize_secret(&canonical).unwrap().unwrap();
            let second = normalize_secret(&first.encoded).unwrap().unwrap();
            prop_assert_eq!(&first.encoded, &canonical);
            prop_assert_eq!(first, second);
        }
    }
}
