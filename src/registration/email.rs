//! Email normalization and format validation.

use regex::Regex;
use std::sync::LazyLock;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

// Dot-atom local part (RFC 5322 atext) and a dotted hostname with LDH labels.
static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    )
    .ok()
});

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Format check. Pure and deterministic; expects already-normalized input
/// but does not depend on it.
#[must_use]
pub fn is_valid(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, _domain)) = email.split_once('@') else {
        return false;
    };

    if local.len() > MAX_LOCAL_LEN {
        return false;
    }

    EMAIL_RE
        .as_ref()
        .is_some_and(|regex| regex.is_match(email))
}
