//! Entry path hardening.

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Strip leading separators and `..`-style segments so that the path can only
/// ever resolve below the extraction root.
///
/// Removes the longest prefix made of repeated `<separators><dots><separators>`
/// groups, followed by any remaining separators. `../../etc/passwd` becomes
/// `etc/passwd` and `/abs/path` becomes `abs/path`.
pub fn sanitize_path(path: &str) -> &str {
    let mut rest = path;

    loop {
        let after_seps = rest.trim_start_matches(is_separator);
        let after_dots = after_seps.trim_start_matches('.');
        if after_dots.len() == after_seps.len() {
            break;
        }
        let after_group = after_dots.trim_start_matches(is_separator);
        if after_group.len() == after_dots.len() {
            break;
        }
        rest = after_group;
    }

    rest.trim_start_matches(is_separator)
}

/// Directory entries are empty and named with a trailing separator.
pub fn is_directory(path: &str, compressed_size: u64) -> bool {
    compressed_size == 0 && path.ends_with(is_separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_parent_segments() {
        assert_eq!(sanitize_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_path("..\\..\\windows\\win.ini"), "windows\\win.ini");
        assert_eq!(sanitize_path("./a/b"), "a/b");
        assert_eq!(sanitize_path(".../x"), "x");
        assert_eq!(sanitize_path("//..//../x"), "x");
    }

    #[test]
    fn strips_absolute_prefix() {
        assert_eq!(sanitize_path("/abs/path"), "abs/path");
        assert_eq!(sanitize_path("\\\\server\\share"), "server\\share");
    }

    #[test]
    fn leaves_inner_segments_and_dotfiles() {
        assert_eq!(sanitize_path("a/../b"), "a/../b");
        assert_eq!(sanitize_path(".hidden"), ".hidden");
        assert_eq!(sanitize_path("..foo/bar"), "..foo/bar");
        assert_eq!(sanitize_path("plain.txt"), "plain.txt");
        assert_eq!(sanitize_path(".."), "..");
    }

    #[test]
    fn directory_detection() {
        assert!(is_directory("dir/", 0));
        assert!(is_directory("dir\\", 0));
        assert!(!is_directory("dir/", 2));
        assert!(!is_directory("file", 0));
    }
}
