// src/hash.rs

//! SHA-256 content hashing
//!
//! The only hash this system uses: recipe source verification. Values are
//! lowercase hex strings; comparison is case-insensitive on the expected side
//! since recipe authors paste hashes in either case.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Compute the SHA-256 of a byte slice as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 of a reader's content, streaming.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the SHA-256 of a file's content.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    Ok(hash_reader(&mut file)?)
}

/// Verify a file against an expected hash.
pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let actual = hash_file(path)?;
    if actual == expected.to_lowercase() {
        Ok(())
    } else {
        Err(Error::HashMismatch {
            file: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}
