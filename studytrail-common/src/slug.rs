//! URL-friendly slug generation
//!
//! Slugs identify subjects (per user) and chapters (per subject). Generation
//! is pure; uniqueness within the owning scope is resolved by probing with a
//! numeric suffix through a caller-supplied existence check.

/// Maximum slug length before suffixing
const MAX_SLUG_LEN: usize = 50;

/// Generate a URL-friendly slug from a title
///
/// Lowercases, trims, strips characters outside `[a-z0-9_ -]`, collapses
/// whitespace runs into single hyphens, collapses hyphen runs, and truncates
/// to 50 characters.
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim();

    let mut slug = String::with_capacity(trimmed.len());
    let mut last_was_hyphen = false;

    for c in trimmed.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '_' {
            Some(c)
        } else if c.is_whitespace() || c == '-' {
            Some('-')
        } else {
            None
        };

        if let Some(m) = mapped {
            if m == '-' {
                if !last_was_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                last_was_hyphen = true;
            } else {
                slug.push(m);
                last_was_hyphen = false;
            }
        }
    }

    // Strip a trailing hyphen left by trailing separators
    while slug.ends_with('-') {
        slug.pop();
    }

    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// Generate a slug unique within the caller's scope
///
/// Probes `slug`, `slug-1`, `slug-2`, ... until `exists` reports a free one.
/// The suffix counts up from a stable base so two collisions never produce
/// the same candidate twice.
pub async fn generate_unique_slug<F, Fut>(text: &str, exists: F) -> crate::Result<String>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = crate::Result<bool>>,
{
    let base = generate_slug(text);
    let base = if base.is_empty() {
        "untitled".to_string()
    } else {
        base
    };

    if !exists(base.clone()).await? {
        return Ok(base);
    }

    let mut counter = 1u32;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}
