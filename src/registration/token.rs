//! Confirmation token values and links.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};

const TOKEN_BYTES: usize = 32;

/// Create a new confirmation token value.
///
/// 256 bits from the OS RNG, URL-safe base64 without padding.
///
/// # Errors
/// Returns an error if the OS RNG is unavailable.
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate confirmation token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Build the frontend confirmation link included in outbound notifications.
#[must_use]
pub fn confirm_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/confirm?token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_decodes_to_32_bytes() {
        let decoded_len = generate()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(TOKEN_BYTES));
    }

    #[test]
    fn generate_is_url_safe_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let token = generate().unwrap_or_default();
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(seen.insert(token));
        }
    }

    #[test]
    fn confirm_url_trims_trailing_slash() {
        let url = confirm_url("https://registrar.dev/", "abc");
        assert_eq!(url, "https://registrar.dev/confirm?token=abc");
    }
}
