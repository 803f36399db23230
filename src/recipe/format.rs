// src/recipe/format.rs

//! Recipe record
//!
//! A recipe describes how to build one package from source: where the
//! sources live, what they must hash to, what the package depends on, and
//! optional Build/Install script bodies. Parsing lives in `parser`.

/// A parsed recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Package name; matches the recipe filename stem.
    pub name: String,

    /// Free-form version string, compared with the natural ordering.
    pub version: String,

    /// Source URLs, in declaration order. At least one.
    pub sources: Vec<String>,

    /// Expected SHA-256 hashes, positionally aligned with `sources`.
    /// Trailing entries may be absent (no verification for that source).
    pub hashes: Vec<Option<String>>,

    /// Direct dependencies, sorted and de-duplicated.
    pub depends: Vec<String>,

    /// Shell script body for the build stage; heuristic selection when absent.
    pub build_script: Option<String>,

    /// Shell script body for the install stage; heuristic fallbacks when absent.
    pub install_script: Option<String>,
}

impl Recipe {
    /// The expected hash for the nth source, if declared.
    pub fn hash_for(&self, index: usize) -> Option<&str> {
        self.hashes.get(index).and_then(|h| h.as_deref())
    }
}

/// The cache filename for a source URL: everything after the last `/`.
pub fn source_filename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_filename() {
        assert_eq!(
            source_filename("https://example.com/dl/foo-1.0.tar.gz"),
            "foo-1.0.tar.gz"
        );
        assert_eq!(source_filename("plain.tar.gz"), "plain.tar.gz");
    }

    #[test]
    fn test_hash_for_padding() {
        let recipe = Recipe {
            name: "x".to_string(),
            version: "1".to_string(),
            sources: vec!["a.tar.gz".to_string(), "b.tar.gz".to_string()],
            hashes: vec![Some("abc".to_string())],
            depends: Vec::new(),
            build_script: None,
            install_script: None,
        };
        assert_eq!(recipe.hash_for(0), Some("abc"));
        assert_eq!(recipe.hash_for(1), None);
        assert_eq!(recipe.hash_for(5), None);
    }
}
