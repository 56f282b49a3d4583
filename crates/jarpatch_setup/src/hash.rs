//! Content hashing of input artifacts.

use crate::error::Result;
use camino::Utf8Path;
use std::fmt;
use std::fs::File;
use std::io::Read;
use xxhash_rust::xxh3::{xxh3_128, Xxh3};

/// 128-bit xxHash3 digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub u128);

impl ContentHash {
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Hash a file by streaming its contents.
pub fn hash_file(path: &Utf8Path) -> Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(ContentHash(hasher.digest128()))
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash(xxh3_128(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(
            ContentHash(0xabc).to_string(),
            "00000000000000000000000000000abc"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("missing.jar")).unwrap();
        assert!(matches!(hash_file(&path), Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_file_hash_is_stable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![7u8; 200_000]).unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();

        assert_eq!(hash_file(path).unwrap(), hash_file(path).unwrap());
    }

    proptest! {
        #[test]
        fn test_hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(hash_bytes(&data), hash_bytes(&data));
        }

        #[test]
        fn test_bit_flip_changes_hash(
            data in proptest::collection::vec(any::<u8>(), 1..4096),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut mutated = data.clone();
            let at = index.index(mutated.len());
            mutated[at] ^= 1 << bit;
            prop_assert_ne!(hash_bytes(&data), hash_bytes(&mutated));
        }

        #[test]
        fn test_bytes_survive_le_encoding(value in any::<u128>()) {
            let hash = ContentHash(value);
            prop_assert_eq!(ContentHash::from_le_bytes(hash.to_le_bytes()), hash);
        }
    }
}
