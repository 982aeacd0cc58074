//! One-shot messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "board_flash";

/// Upper bound on the encoded cookie value. Browsers drop cookies over
/// 4096 bytes, name and attributes included.
pub const MAX_ENCODED_LEN: usize = 3800;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub error: String,
    /// Form input to put back in front of the user.
    #[serde(default)]
    pub draft: String,
    /// Set when only a prefix of the draft could be carried.
    #[serde(default)]
    pub truncated: bool,
}

impl Flash {
    /// Build a flash whose encoding fits in `MAX_ENCODED_LEN`. The error is
    /// kept whole when it fits on its own; the draft keeps the longest prefix
    /// that still fits.
    pub fn new(error: impl Into<String>, draft: &str) -> Self {
        let error = longest_fitting_prefix(&error.into(), |e| Self::sized(e, ""));
        let kept = longest_fitting_prefix(draft, |d| Self::sized(&error, d));
        Self {
            truncated: kept.len() < draft.len(),
            error,
            draft: kept,
        }
    }

    /// Encoded length, sized as if truncated so the flag never tips it over.
    fn sized(error: &str, draft: &str) -> usize {
        Self {
            error: error.to_string(),
            draft: draft.to_string(),
            truncated: true,
        }
        .encode()
        .len()
    }

    pub fn encode(&self) -> String {
        // serializing plain strings and a bool cannot fail
        B64.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(value: &str) -> Option<Self> {
        let bytes = B64.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Binary search over char counts; encoded size grows with the prefix.
fn longest_fitting_prefix(text: &str, encoded_len: impl Fn(&str) -> usize) -> String {
    if encoded_len(text) <= MAX_ENCODED_LEN {
        return text.to_string();
    }

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let (mut lo, mut hi) = (0, boundaries.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if encoded_len(&text[..boundaries[mid]]) <= MAX_ENCODED_LEN {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    text[..boundaries[lo]].to_string()
}

pub fn set(jar: CookieJar, flash: &Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Read and clear the pending flash, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(flash) = jar.get(FLASH_COOKIE).map(|c| Flash::decode(c.value())) else {
        return (jar, None);
    };
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
