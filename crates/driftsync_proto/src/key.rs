//! Path-key conventions.
//!
//! Store keys are plain path strings. Directory keys end with a trailing
//! `/`; file keys do not. The trailing separator is the only thing that
//! distinguishes the two record kinds.

/// Returns true if `key` names a directory record.
pub fn is_directory_key(key: &str) -> bool {
    key.ends_with('/')
}

/// Returns the key of the directory that owns `key`, or `None` for a
/// top-level key.
///
/// The parent of `a/b/c.txt` is `a/b/`; the parent of `a/b/` is `a/`.
pub fn parent_key(key: &str) -> Option<String> {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    trimmed
        .rfind('/')
        .map(|idx| trimmed[..=idx].to_string())
        .filter(|parent| !parent.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_keys_have_trailing_separator() {
        assert!(is_directory_key("docs/"));
        assert!(is_directory_key("docs/sub/"));
        assert!(!is_directory_key("docs/readme.txt"));
    }

    #[test]
    fn parent_of_file_and_directory() {
        assert_eq!(parent_key("a/b/c.txt").as_deref(), Some("a/b/"));
        assert_eq!(parent_key("a/b/").as_deref(), Some("a/"));
        assert_eq!(parent_key("a/").as_deref(), None);
        assert_eq!(parent_key("top.txt"), None);
    }
}
