//! Helpers for folder-style object keys.

pub const SEPARATOR: char = '/';

/// Removes at most one separator from each end.
pub fn strip_edge_separators(path: &str) -> &str {
    let path = path.strip_prefix(SEPARATOR).unwrap_or(path);
    path.strip_suffix(SEPARATOR).unwrap_or(path)
}

pub fn strip_trailing_separators(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
}

pub fn strip_leading_separators(path: &str) -> &str {
    path.trim_start_matches(SEPARATOR)
}

/// Turns a folder path into a listing prefix: no leading separator and
/// exactly one trailing separator. An empty folder yields `"/"`.
pub fn format_folder_prefix(path: &str) -> String {
    let trimmed = strip_trailing_separators(strip_leading_separators(path));

    let mut prefix = String::with_capacity(trimmed.len() + 1);
    prefix.push_str(trimmed);
    prefix.push(SEPARATOR);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_edge_separators() {
        let cases = vec![
            ("", ""),
            ("/", ""),
            ("//", ""),
            ("///", "/"),
            ("/a/", "a"),
            ("//a//", "/a/"),
            ("a//b", "a//b"),
            ("/a/b", "a/b"),
        ];

        for (input, expected) in cases {
            assert_eq!(strip_edge_separators(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_strip_trailing_separators() {
        let cases = vec![("", ""), ("a///", "a"), ("/a/b//", "/a/b"), ("a//b", "a//b")];

        for (input, expected) in cases {
            assert_eq!(
                strip_trailing_separators(input),
                expected,
                "failed for case: {}",
                input
            );
        }
    }

    #[test]
    fn test_strip_leading_separators() {
        let cases = vec![("", ""), ("///a", "a"), ("//a/b/", "a/b/"), ("a//b", "a//b")];

        for (input, expected) in cases {
            assert_eq!(
                strip_leading_separators(input),
                expected,
                "failed for case: {}",
                input
            );
        }
    }

    #[test]
    fn test_format_folder_prefix() {
        let cases = vec![
            ("", "/"),
            ("/", "/"),
            ("/a/b/", "a/b/"),
            ("a/b", "a/b/"),
            ("//a", "a/"),
            ("a//", "a/"),
            ("a//b", "a//b/"),
        ];

        for (input, expected) in cases {
            assert_eq!(format_folder_prefix(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_format_folder_prefix_idempotent() {
        let inputs = vec!["", "/", "//", "a", "/a", "a/", "//a//b//", "reports/2024/", " x "];

        for input in inputs {
            let once = format_folder_prefix(input);
            let twice = format_folder_prefix(&once);

            assert_eq!(once, twice, "failed for case: {}", input);
            assert!(once.ends_with('/'), "failed for case: {}", input);
            assert!(!once.ends_with("//"), "failed for case: {}", input);
            assert!(
                once == "/" || !once.starts_with('/'),
                "failed for case: {}",
                input
            );
        }
    }
}
