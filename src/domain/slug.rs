//! Group slug derivation and validation.
//!
//! Slugs are derived from group titles with the `slug` crate, which
//! transliterates non-ASCII input (e.g. Cyrillic titles such as
//! “Лев Толстой” become `lev-tolstoi`). Supplied slugs must already be in
//! canonical form: lowercase ASCII letters, digits, `-` or `_`.

use slug::slugify;
use thiserror::Error;

const MAX_SLUG_LEN: usize = 50;
const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain lowercase letters, digits, `-` or `_`")]
    InvalidCharacters { slug: String },
    #[error("slug exceeds {MAX_SLUG_LEN} characters")]
    TooLong,
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Check that an operator-supplied slug is already canonical.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    let valid = slug
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if !valid {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Produce a slug that does not collide according to the supplied predicate.
///
/// `is_taken` returns `true` when the candidate already exists. Collisions are
/// retried with a monotonic suffix (`-2`, `-3`, …).
pub fn unique_slug<F>(input: &str, mut is_taken: F) -> Result<String, SlugError>
where
    F: FnMut(&str) -> bool,
{
    let base = derive_slug(input)?;

    if !is_taken(&base) {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted { base })
}
