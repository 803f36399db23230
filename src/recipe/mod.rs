// src/recipe/mod.rs

//! Recipes: the textual description of how to build one package
//!
//! A recipe tree is a flat directory of `<name>.pkg` files. Recipes are
//! re-read on each operation; there is no cross-operation cache, so edits to
//! the tree take effect immediately.

mod format;
mod parser;

pub use format::{source_filename, Recipe};
pub use parser::{parse_recipe, parse_recipe_file};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Read-only access to the recipe tree.
#[derive(Debug, Clone)]
pub struct RecipeStore {
    recipes_dir: PathBuf,
}

impl RecipeStore {
    pub fn new(recipes_dir: impl AsRef<Path>) -> Self {
        Self {
            recipes_dir: recipes_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the recipe file for a package name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.recipes_dir.join(format!("{name}.pkg"))
    }

    /// Whether a recipe file exists for this name.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Load and parse the recipe for a package name.
    pub fn load(&self, name: &str) -> Result<Recipe> {
        parse_recipe_file(&self.path_for(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_store_load() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("zlib.pkg"),
            "Name: zlib\nVersion: 1.3\nSource: zlib-1.3.tar.gz\n",
        )
        .unwrap();

        let store = RecipeStore::new(temp.path());
        assert!(store.exists("zlib"));
        assert!(!store.exists("openssl"));

        let recipe = store.load("zlib").unwrap();
        assert_eq!(recipe.version, "1.3");

        let err = store.load("openssl").unwrap_err();
        assert!(matches!(err, Error::RecipeNotFound(n) if n == "openssl"));
    }
}
