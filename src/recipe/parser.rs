// src/recipe/parser.rs

//! Recipe file parsing
//!
//! The format is line-oriented. Scalar lines are `Key: value` with
//! case-insensitive keys; `Source` and `Sha256` may repeat and accumulate in
//! order. `Key: |` opens a literal block terminated by `Key: end`, used for
//! `Build` and `Install`. Blank lines and `#` comments are ignored outside
//! blocks.

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use std::path::Path;

/// Parse a recipe from its file content. `name` is the expected package name
/// (the filename stem) and is used both for error reporting and to enforce
/// that the `Name` field matches it.
pub fn parse_recipe(name: &str, content: &str) -> Result<Recipe> {
    let malformed = |reason: String| Error::RecipeMalformed {
        name: name.to_string(),
        reason,
    };

    let mut parsed_name = String::new();
    let mut version = String::new();
    let mut sources: Vec<String> = Vec::new();
    let mut hashes: Vec<Option<String>> = Vec::new();
    let mut depends: Vec<String> = Vec::new();
    let mut build_script: Option<String> = None;
    let mut install_script: Option<String> = None;

    // (lowercased key, accumulated body lines) while inside a block
    let mut block: Option<(String, Vec<String>)> = None;

    for (lineno, raw) in content.lines().enumerate() {
        if let Some((key, mut body)) = block.take() {
            let is_end = match split_scalar(raw) {
                Some((k, v)) => k.eq_ignore_ascii_case(&key) && v.trim() == "end",
                None => false,
            };
            if is_end {
                let script = body.join("\n");
                match key.as_str() {
                    "build" => build_script = Some(script),
                    "install" => install_script = Some(script),
                    _ => {} // unrecognized block, parsed and dropped
                }
            } else {
                body.push(raw.to_string());
                block = Some((key, body));
            }
            continue;
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = split_scalar(line)
            .ok_or_else(|| malformed(format!("line {}: expected 'Key: value'", lineno + 1)))?;
        let value = value.trim();

        if value == "|" {
            block = Some((key.to_lowercase(), Vec::new()));
            continue;
        }

        match key.to_lowercase().as_str() {
            "name" => parsed_name = value.to_string(),
            "version" => version = value.to_string(),
            "source" => sources.push(value.to_string()),
            "sha256" => hashes.push(Some(value.to_string())),
            "depends" => {
                depends.extend(
                    value
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            other => {
                tracing::debug!("recipe '{}': ignoring unknown key '{}'", name, other);
            }
        }
    }

    if let Some((key, _)) = block {
        return Err(malformed(format!("unterminated '{}' block", key)));
    }
    if parsed_name.is_empty() {
        return Err(malformed("missing or empty Name".to_string()));
    }
    if version.is_empty() {
        return Err(malformed("missing or empty Version".to_string()));
    }
    if parsed_name != name {
        return Err(malformed(format!(
            "Name '{}' does not match recipe filename",
            parsed_name
        )));
    }
    if sources.is_empty() {
        return Err(malformed("at least one Source is required".to_string()));
    }

    // Align hashes positionally with sources.
    hashes.resize(sources.len(), None);

    depends.sort();
    depends.dedup();

    Ok(Recipe {
        name: parsed_name,
        version,
        sources,
        hashes,
        depends,
        build_script,
        install_script,
    })
}

/// Parse a recipe file. The package name is the filename stem.
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::RecipeNotFound(name));
        }
        Err(e) => return Err(e.into()),
    };

    parse_recipe(&name, &content)
}

fn split_scalar(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# the hello package
Name: hello
Version: 2.12
Source: https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz
Sha256: cf04af86dc085268c5f4470fbae49b18afbc221b78096aab842d934a76bad0ab
Depends: gettext, libiconv
Build: |
./configure --prefix=/usr
make
Build: end
Install: |
make install DESTDIR="$DESTDIR"
Install: end
"#;

    #[test]
    fn test_parse_full_recipe() {
        let recipe = parse_recipe("hello", SAMPLE).unwrap();
        assert_eq!(recipe.name, "hello");
        assert_eq!(recipe.version, "2.12");
        assert_eq!(recipe.sources.len(), 1);
        assert_eq!(
            recipe.hash_for(0),
            Some("cf04af86dc085268c5f4470fbae49b18afbc221b78096aab842d934a76bad0ab")
        );
        assert_eq!(recipe.depends, vec!["gettext", "libiconv"]);
        assert_eq!(
            recipe.build_script.as_deref(),
            Some("./configure --prefix=/usr\nmake")
        );
        assert_eq!(
            recipe.install_script.as_deref(),
            Some("make install DESTDIR=\"$DESTDIR\"")
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let content = "name: x\nVERSION: 1\nsOuRcE: x-1.tar.gz\n";
        let recipe = parse_recipe("x", content).unwrap();
        assert_eq!(recipe.version, "1");
    }

    #[test]
    fn test_repeated_sources_accumulate_in_order() {
        let content = "\
Name: multi
Version: 1
Source: first.tar.gz
Sha256: aaaa
Source: second.tar.gz
Source: third.tar.gz
";
        let recipe = parse_recipe("multi", content).unwrap();
        assert_eq!(recipe.sources, vec!["first.tar.gz", "second.tar.gz", "third.tar.gz"]);
        assert_eq!(recipe.hash_for(0), Some("aaaa"));
        assert_eq!(recipe.hash_for(1), None);
        assert_eq!(recipe.hash_for(2), None);
    }

    #[test]
    fn test_depends_split_and_dedup() {
        let content = "Name: x\nVersion: 1\nSource: s.tar\nDepends: b a, a  c\n";
        let recipe = parse_recipe("x", content).unwrap();
        assert_eq!(recipe.depends, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_block_preserves_literal_lines() {
        let content = "\
Name: x
Version: 1
Source: s.tar
Build: |
# this is script content, not a recipe comment
echo 'Name: not-a-key'
Build: end
";
        let recipe = parse_recipe("x", content).unwrap();
        assert_eq!(
            recipe.build_script.as_deref(),
            Some("# this is script content, not a recipe comment\necho 'Name: not-a-key'")
        );
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = parse_recipe("x", "Version: 1\nSource: s.tar\n").unwrap_err();
        assert!(matches!(err, Error::RecipeMalformed { .. }));
    }

    #[test]
    fn test_missing_version_is_malformed() {
        let err = parse_recipe("x", "Name: x\nSource: s.tar\n").unwrap_err();
        assert!(matches!(err, Error::RecipeMalformed { .. }));
    }

    #[test]
    fn test_unterminated_block_is_malformed() {
        let content = "Name: x\nVersion: 1\nSource: s.tar\nBuild: |\necho hi\n";
        let err = parse_recipe("x", content).unwrap_err();
        match err {
            Error::RecipeMalformed { reason, .. } => assert!(reason.contains("unterminated")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_name_mismatch_is_malformed() {
        let err = parse_recipe("y", "Name: x\nVersion: 1\nSource: s.tar\n").unwrap_err();
        assert!(matches!(err, Error::RecipeMalformed { .. }));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = parse_recipe_file(Path::new("/nonexistent/zlib.pkg")).unwrap_err();
        match err {
            Error::RecipeNotFound(name) => assert_eq!(name, "zlib"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
