//! Optional response cache interface (`spec.md` §6 "Response cache
//! interface"). The core dispatch path never constructs or calls this —
//! it exists only as an interface an implementer could wire in later.
//!
//! Grounded in `examples/original_source/src/cache.py`'s `FileCache`, with
//! both documented source bugs fixed (`spec.md` §9 open questions):
//! `has` now returns the boolean it computes instead of discarding it, and
//! cache keys are UTF-8-encoded to bytes before hashing instead of being
//! hashed as if they were already bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn has(&self, key: &str) -> bool {
        self.file_name_of(key).is_file()
    }

    pub fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.file_name_of(key))
    }

    pub fn set(&self, key: &str, value: &[u8]) -> io::Result<()> {
        fs::write(self.file_name_of(key), value)
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        fs::remove_file(self.file_name_of(key))
    }

    fn file_name_of(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        self.dir.join(format!("{}.cache", bytes_to_hex(&digest)))
    }
}

fn bytes_to_hex(b: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut s = String::with_capacity(b.len() * 2);
    for &x in b {
        s.push(HEX[(x >> 4) as usize] as char);
        s.push(HEX[(x & 15) as usize] as char);
    }
    s
}

/// A request fingerprint as described in `spec.md` §6: a key derived from
/// method, target, and a fixed set of headers considered cache-relevant.
pub fn fingerprint(method: &str, target: &str, headers: &[(&str, &str)]) -> String {
    let mut key = format!("{method}\0{target}");
    for (name, value) in headers {
        key.push('\0');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

#[allow(dead_code)]
pub fn dir_exists(dir: &Path) -> bool {
    dir.is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_returns_false_for_missing_key() {
        let dir = std::env::temp_dir().join("wrrproxy-cache-test-missing");
        let _ = fs::create_dir_all(&dir);
        let cache = FileCache::new(&dir);
        assert!(!cache.has("no-such-key"));
    }

    #[test]
    fn set_then_has_then_get_round_trips() {
        let dir = std::env::temp_dir().join("wrrproxy-cache-test-roundtrip");
        let _ = fs::create_dir_all(&dir);
        let cache = FileCache::new(&dir);
        cache.set("k", b"v").unwrap();
        assert!(cache.has("k"));
        assert_eq!(cache.get("k").unwrap(), b"v");
        cache.remove("k").unwrap();
        assert!(!cache.has("k"));
    }

    #[test]
    fn fingerprint_differs_by_method() {
        let a = fingerprint("GET", "/x", &[]);
        let b = fingerprint("POST", "/x", &[]);
        assert_ne!(a, b);
    }
}
