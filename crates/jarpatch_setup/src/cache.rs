//! Content-addressed cache of transformed artifacts.
//!
//! Each artifact version owns a directory under the work root:
//!
//! ```text
//! <work_root>/<version>/
//!     mapped.jar      transformed artifact
//!     patches.bin     patch metadata (the only file that outlives a run besides mapped.jar)
//!     payload.jar     normalized installer payload (intermediate)
//!     filtered.jar    filter stage output (intermediate)
//!     lambdafix.jar   remap pass 1 output (intermediate)
//!     classes/        debug extraction
//! ```
//!
//! The metadata file is a zstd frame around a little-endian binary record:
//! magic `JPCACHE\0`, format version, the 16-byte input hash, then the split
//! out patch classes as `(name, bytes)` pairs. It is written strictly after the
//! transformed jar it describes is complete, through a temporary file that is
//! renamed into place. A record is only trusted if its hash matches the
//! current input and the transformed jar still exists; anything else deletes
//! the metadata so the pipeline starts from scratch.

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use binrw::{binrw, BinRead, BinWrite};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Cursor, Write};

const FORMAT_VERSION: u32 = 1;

/// Class patches split out of the transformed jar, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    classes: BTreeMap<String, Vec<u8>>,
}

impl PatchSet {
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.classes.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.classes
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// Total size of the class bytes.
    pub fn byte_size(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
struct PatchClassRecord {
    #[bw(try_calc(u32::try_from(name.len())))]
    name_len: u32,
    #[br(count = name_len)]
    name: Vec<u8>,
    #[bw(try_calc(u32::try_from(data.len())))]
    data_len: u32,
    #[br(count = data_len)]
    data: Vec<u8>,
}

#[binrw]
#[brw(little, magic = b"JPCACHE\0")]
#[derive(Debug, Clone, PartialEq, Eq)]
struct PatchCacheFile {
    #[br(assert(version == FORMAT_VERSION, "unsupported patch cache version {}", version))]
    version: u32,
    hash: [u8; 16],
    #[bw(try_calc(u32::try_from(classes.len())))]
    class_count: u32,
    #[br(count = class_count)]
    classes: Vec<PatchClassRecord>,
}

/// A trusted-once-validated cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// The transformed jar.
    pub artifact: Utf8PathBuf,
    pub patches: PatchSet,
    /// Hash of the input the artifact was built from.
    pub hash: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCheck {
    /// Hash matches and the transformed jar exists.
    Valid(CacheRecord),
    /// A record existed but is out of date or its jar is gone.
    Stale,
    /// Nothing usable was on disk.
    Cold,
}

/// File names inside one version directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLayout {
    root: Utf8PathBuf,
}

impl VersionLayout {
    /// `version` is sanitized into a single path component.
    pub fn new(work_root: &Utf8Path, version: &str) -> Self {
        Self {
            root: work_root.join(sanitize_version(version)),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn mapped_jar(&self) -> Utf8PathBuf {
        self.root.join("mapped.jar")
    }

    pub fn metadata(&self) -> Utf8PathBuf {
        self.root.join("patches.bin")
    }

    pub fn payload_jar(&self) -> Utf8PathBuf {
        self.root.join("payload.jar")
    }

    pub fn filtered_jar(&self) -> Utf8PathBuf {
        self.root.join("filtered.jar")
    }

    pub fn lambda_fixed_jar(&self) -> Utf8PathBuf {
        self.root.join("lambdafix.jar")
    }

    pub fn classes_dir(&self) -> Utf8PathBuf {
        self.root.join("classes")
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

fn sanitize_version(version: &str) -> String {
    let cleaned: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "unknown".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Reads, validates and writes the cache of one version directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    layout: VersionLayout,
}

impl ArtifactCache {
    pub fn new(layout: VersionLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &VersionLayout {
        &self.layout
    }

    /// Load the metadata file, if present and readable.
    ///
    /// A missing or corrupt file yields `None`; corruption is logged.
    pub fn load(&self) -> Option<CacheRecord> {
        match self.read_record() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Ignoring patch cache {}: {}", self.layout.metadata(), e);
                None
            }
        }
    }

    /// Check a loaded record against the current input hash.
    ///
    /// A stale record's metadata file is deleted.
    pub fn validate(&self, record: CacheRecord, hash: ContentHash) -> Result<CacheCheck> {
        if Self::is_current(&record, hash) {
            return Ok(CacheCheck::Valid(record));
        }

        tracing::info!(
            "Patch cache is stale (cached {}, current {}, jar present: {})",
            record.hash,
            hash,
            record.artifact.exists()
        );
        crate::jar::remove_if_exists(&self.layout.metadata())?;
        Ok(CacheCheck::Stale)
    }

    /// Load and validate in one step. Only `Valid` leaves metadata on disk.
    pub fn check(&self, hash: ContentHash) -> Result<CacheCheck> {
        match self.read_record() {
            Ok(Some(record)) => self.validate(record, hash),
            Ok(None) => Ok(CacheCheck::Cold),
            Err(e) => {
                tracing::warn!(
                    "Discarding corrupt patch cache {}: {}",
                    self.layout.metadata(),
                    e
                );
                crate::jar::remove_if_exists(&self.layout.metadata())?;
                Ok(CacheCheck::Cold)
            }
        }
    }

    /// Like [`ArtifactCache::check`], but never touches the disk.
    pub fn inspect(&self, hash: ContentHash) -> CacheCheck {
        match self.load() {
            Some(record) if Self::is_current(&record, hash) => CacheCheck::Valid(record),
            Some(_) => CacheCheck::Stale,
            None => CacheCheck::Cold,
        }
    }

    /// Record `patches` for the completed transformed jar.
    pub fn store(&self, patches: PatchSet, hash: ContentHash) -> Result<CacheRecord> {
        let artifact = self.layout.mapped_jar();
        if !artifact.exists() {
            return Err(Error::Cache(format!(
                "refusing to record a cache entry for missing jar {artifact}"
            )));
        }

        let file = PatchCacheFile {
            version: FORMAT_VERSION,
            hash: hash.to_le_bytes(),
            classes: patches
                .iter()
                .map(|(name, data)| PatchClassRecord {
                    name: name.as_bytes().to_vec(),
                    data: data.to_vec(),
                })
                .collect(),
        };
        let mut encoded = Cursor::new(Vec::new());
        file.write(&mut encoded)
            .map_err(|e| Error::Cache(e.to_string()))?;

        self.layout.ensure()?;
        let temp = tempfile::NamedTempFile::new_in(self.layout.root())?;
        {
            let mut encoder = zstd::Encoder::new(BufWriter::new(temp.as_file()), 3)?;
            encoder.write_all(encoded.get_ref())?;
            encoder.finish()?.flush()?;
        }
        temp.persist(self.layout.metadata()).map_err(|e| e.error)?;

        tracing::info!(
            "Stored patch cache: {} classes ({} bytes) for {}",
            patches.len(),
            patches.byte_size(),
            hash
        );
        Ok(CacheRecord {
            artifact,
            patches,
            hash,
        })
    }

    /// Delete the whole version directory.
    pub fn clear(&self) -> Result<bool> {
        if !self.layout.root().exists() {
            return Ok(false);
        }
        fs::remove_dir_all(self.layout.root())?;
        Ok(true)
    }

    fn is_current(record: &CacheRecord, hash: ContentHash) -> bool {
        record.hash == hash && record.artifact.exists()
    }

    fn read_record(&self) -> Result<Option<CacheRecord>> {
        let path = self.layout.metadata();
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let decoded = zstd::decode_all(compressed.as_slice())
            .map_err(|e| Error::Cache(format!("zstd: {e}")))?;
        let file = PatchCacheFile::read(&mut Cursor::new(decoded))
            .map_err(|e| Error::Cache(e.to_string()))?;

        let mut patches = PatchSet::default();
        for class in file.classes {
            let name = String::from_utf8(class.name)
                .map_err(|_| Error::Cache("class name is not UTF-8".to_string()))?;
            patches.insert(name, class.data);
        }

        Ok(Some(CacheRecord {
            artifact: self.layout.mapped_jar(),
            patches,
            hash: ContentHash::from_le_bytes(file.hash),
        }))
    }
}
