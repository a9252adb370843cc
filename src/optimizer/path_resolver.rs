//! # Path Resolution Module
//!
//! Centralizza il calcolo di path e URL delle renditions a partire
//! dall'originale: le size vivono nella stessa directory dell'originale.
//! Il nome di una rendition deve essere un semplice nome di file: path
//! assoluti, `..` o sottodirectory vengono rifiutati.

use std::path::{Component, Path, PathBuf};

/// Utility per calcolare path e URL delle renditions
pub struct PathResolver;

impl PathResolver {
    /// `<dir of original>/<file>`; `None` unless `file` is a plain file name
    pub fn rendition_path(original_path: &Path, file: &str) -> Option<PathBuf> {
        if !Self::is_plain_file_name(file) {
            return None;
        }

        Some(
            original_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(file),
        )
    }

    fn is_plain_file_name(file: &str) -> bool {
        let mut components = Path::new(file).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !file.contains('\\')
    }

    /// Replace the last URL segment of the original with `file`
    pub fn rendition_url(original_url: &str, file: &str) -> String {
        match original_url.rfind('/') {
            Some(idx) => format!("{}/{}", &original_url[..idx], file),
            None => file.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendition_path_uses_original_directory() {
        assert_eq!(
            PathResolver::rendition_path(Path::new("/up/2024/05/a.jpg"), "a-150x150.jpg"),
            Some(PathBuf::from("/up/2024/05/a-150x150.jpg"))
        );
        assert_eq!(
            PathResolver::rendition_path(Path::new("a.jpg"), "a-150x150.jpg"),
            Some(PathBuf::from("a-150x150.jpg"))
        );
    }

    #[test]
    fn test_rendition_path_rejects_escaping_names() {
        let original = Path::new("/up/2024/05/a.jpg");
        for file in ["../../x.jpg", "/etc/passwd", "sub/a.jpg", "..", ".", "", "..\\x.jpg"] {
            assert_eq!(PathResolver::rendition_path(original, file), None, "{}", file);
        }
    }

    #[test]
    fn test_rendition_url() {
        assert_eq!(
            PathResolver::rendition_url("https://example.com/up/2024/05/a.jpg", "a-300x200.jpg"),
            "https://example.com/up/2024/05/a-300x200.jpg"
        );
        assert_eq!(PathResolver::rendition_url("a.jpg", "b.jpg"), "b.jpg");
    }
}
