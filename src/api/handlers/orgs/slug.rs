//! Slug normalization helpers used by the orgs API.
//!
//! Slugs are normalized to lowercase `a-z0-9-` with collapsing separators and
//! length bounds enforced by callers.

/// Normalizes user input into a URL-safe slug (`a-z0-9-`) within the provided length bounds.
/// Returns `None` when the normalized result is empty or outside `min..=max`.
/// Caller must still enforce uniqueness and any additional policy (reserved words, etc.).
pub(super) fn normalize_slug(input: &str, min: usize, max: usize) -> Option<String> {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in input.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-').to_string();
    if trimmed.is_empty() {
        return None;
    }
    let truncated: String = trimmed.chars().take(max).collect();
    let normalized = truncated.trim_matches('-').to_string();
    if normalized.len() < min || normalized.len() > max {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_replaces_separators() {
        assert_eq!(
            normalize_slug("Acme Corp", 3, 50),
            Some("acme-corp".to_string())
        );
        assert_eq!(
            normalize_slug("  Acme__Corp!  ", 3, 50),
            Some("acme-corp".to_string())
        );
    }

    #[test]
    fn collapses_repeated_separators() {
        assert_eq!(
            normalize_slug("a - - b - c", 3, 50),
            Some("a-b-c".to_string())
        );
    }

    #[test]
    fn rejects_empty_and_too_short() {
        assert_eq!(normalize_slug("!!!", 3, 50), None);
        assert_eq!(normalize_slug("ab", 3, 50), None);
    }

    #[test]
    fn truncates_to_max_without_trailing_dash() {
        let input = "abc-".repeat(20);
        let slug = normalize_slug(&input, 3, 10).expect("slug");
        assert!(slug.len() <= 10);
        assert!(!slug.ends_with('-'));
    }
}
