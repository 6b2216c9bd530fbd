//! On-disk artifact storage.
//!
//! Each artifact is a pair of files in the cache directory:
//!
//! - `sheaf_<key>-<digest>.css`: the compiled stylesheet, served as-is by the
//!   web server. `<digest>` is taken from the hash of the CSS itself.
//! - `sheaf_<key>.meta`: 4-byte little-endian header length + bincode
//!   [`ArtifactMeta`], naming the current stylesheet file.
//!
//! When an imported file changes, the key stays the same but the stylesheet
//! gets a new name and therefore a new URL. A stylesheet file is never
//! rewritten with different contents; superseded ones stay in place until
//! garbage collection.
//!
//! Both files are written to a temporary file and renamed into place, CSS
//! first, so a reader that finds the metadata always finds the complete
//! stylesheet.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sheaf_common::{unix_now, ContentHash};

use crate::deps::Dependency;
use crate::error::CacheError;

/// Magic bytes identifying a sheaf artifact header.
const ARTIFACT_MAGIC: [u8; 4] = *b"SHEF";

/// Current metadata format version. Increment on breaking changes.
const ARTIFACT_FORMAT_VERSION: u32 = 2;

/// Hex digits of the CSS hash used in stylesheet file names.
const DIGEST_LEN: usize = 16;

/// Every file the store owns starts with this prefix.
const FILE_PREFIX: &str = "sheaf_";

const CSS_EXT: &str = "css";
const META_EXT: &str = "meta";
const TMP_EXT: &str = "tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metadata stored next to every compiled stylesheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Magic bytes: must be `b"SHEF"`.
    pub magic: [u8; 4],

    /// Metadata format version.
    pub format_version: u32,

    /// sheaf version that produced this artifact.
    pub sheaf_version: String,

    /// Content hash of the CSS file.
    pub checksum: ContentHash,

    /// File name of the stylesheet within the cache directory.
    pub css_file: String,

    /// Seconds since the Unix epoch when the artifact was written.
    pub created_at: u64,

    /// Every file the compile read, with its hash at the time.
    pub dependencies: Vec<Dependency>,
}

/// A validated artifact read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Storage key.
    pub key: String,
    /// File name of the stylesheet within the cache directory.
    pub file_name: String,
    /// Path of the CSS file.
    pub css_path: PathBuf,
    /// The stylesheet itself.
    pub css: String,
    /// When the artifact was written.
    pub created_at: u64,
}

/// Reads and writes artifacts in a single cache directory.
///
/// Reads are fail-safe: a missing, truncated, corrupt or stale artifact is
/// reported by [`ArtifactStore::read`] as `None`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`. Nothing is created until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the stylesheet with hash `checksum` stored under `key`.
    pub fn css_file_name(key: &str, checksum: &ContentHash) -> String {
        let digest = checksum.to_string();
        let digest = digest.get(..DIGEST_LEN).unwrap_or(&digest);
        format!("{FILE_PREFIX}{key}-{digest}.{CSS_EXT}")
    }

    /// Path of the metadata for `key`.
    pub fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{key}.{META_EXT}"))
    }

    /// Persists `css` under `key`.
    pub fn write(
        &self,
        key: &str,
        css: &str,
        dependencies: Vec<Dependency>,
    ) -> Result<StoredArtifact, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let checksum = ContentHash::from_bytes(css.as_bytes());
        let file_name = Self::css_file_name(key, &checksum);
        let meta = ArtifactMeta {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            sheaf_version: env!("CARGO_PKG_VERSION").to_string(),
            checksum,
            css_file: file_name.clone(),
            created_at: unix_now(),
            dependencies,
        };

        let header = bincode::serde::encode_to_vec(&meta, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        let header_len = u32::try_from(header.len()).map_err(|_| CacheError::Serialization {
            reason: format!("artifact header too large ({} bytes)", header.len()),
        })?;
        let mut framed = Vec::with_capacity(4 + header.len());
        framed.extend_from_slice(&header_len.to_le_bytes());
        framed.extend_from_slice(&header);

        // Same name means same bytes, so an existing file is left as it is.
        let css_path = self.dir.join(&file_name);
        let unchanged = std::fs::read(&css_path)
            .is_ok_and(|existing| ContentHash::from_bytes(&existing) == checksum);
        if !unchanged {
            write_atomic(&css_path, css.as_bytes())?;
        }
        write_atomic(&self.meta_path(key), &framed)?;

        Ok(StoredArtifact {
            key: key.to_string(),
            file_name,
            css_path,
            css: css.to_string(),
            created_at: meta.created_at,
        })
    }

    /// Reads and validates the artifact for `key`, or `None` on any problem.
    pub fn read(&self, key: &str) -> Option<StoredArtifact> {
        match self.load(key) {
            Ok(artifact) => Some(artifact),
            Err(CacheError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                None
            }
            Err(e) => {
                tracing::debug!("discarding cached artifact {key}: {e}");
                None
            }
        }
    }

    /// Reads and validates the artifact for `key`.
    ///
    /// Checks, in order: header framing, magic, format version, that the
    /// named stylesheet belongs to `key`, the CSS checksum, then every
    /// recorded dependency.
    pub fn load(&self, key: &str) -> Result<StoredArtifact, CacheError> {
        let meta_path = self.meta_path(key);
        let raw = std::fs::read(&meta_path).map_err(|e| CacheError::io(&meta_path, e))?;
        let meta = decode_meta(&meta_path, &raw)?;

        if meta.css_file != Self::css_file_name(key, &meta.checksum) {
            return Err(CacheError::InvalidHeader {
                path: meta_path,
                reason: format!("stylesheet '{}' does not belong to this artifact", meta.css_file),
            });
        }
        let css_path = self.dir.join(&meta.css_file);
        let css = std::fs::read(&css_path).map_err(|e| CacheError::io(&css_path, e))?;
        let actual = ContentHash::from_bytes(&css);
        if actual != meta.checksum {
            return Err(CacheError::ChecksumMismatch {
                path: css_path,
                expected: meta.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        for dep in &meta.dependencies {
            dep.verify()?;
        }

        let css = String::from_utf8(css).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        Ok(StoredArtifact {
            key: key.to_string(),
            file_name: meta.css_file,
            css_path,
            css,
            created_at: meta.created_at,
        })
    }

    /// Keys of every artifact with at least one file in the store.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self
            .owned_files()?
            .into_iter()
            .filter(|f| f.ext == CSS_EXT || f.ext == META_EXT)
            .map(|f| f.key)
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Removes every file of `key`. Returns `true` if anything was deleted.
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        // Metadata first so a concurrent reader never validates a half-removed pair.
        let mut removed = remove_if_present(&self.meta_path(key))?;
        for file in self.owned_files()? {
            if file.key == key && file.ext == CSS_EXT {
                removed |= remove_if_present(&self.dir.join(&file.name))?;
            }
        }
        Ok(removed)
    }

    /// Removes stylesheets of `key` other than `keep`, returning how many went.
    pub fn remove_superseded(&self, key: &str, keep: &str) -> Result<usize, CacheError> {
        let mut removed = 0;
        for file in self.owned_files()? {
            if file.key == key
                && file.ext == CSS_EXT
                && file.name != keep
                && remove_if_present(&self.dir.join(&file.name))?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Deletes temporary files left behind by interrupted writes.
    pub fn remove_temp_files(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for file in self.owned_files()? {
            if file.ext.ends_with(TMP_EXT) && remove_if_present(&self.dir.join(&file.name))? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every file carrying the store prefix.
    fn owned_files(&self) -> Result<Vec<OwnedFile>, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(FILE_PREFIX) else {
                continue;
            };
            let Some((stem, ext)) = rest.split_once('.') else {
                continue;
            };
            let key = stem.split_once('-').map_or(stem, |(key, _)| key);
            files.push(OwnedFile {
                name: name.to_string(),
                key: key.to_string(),
                ext: ext.to_string(),
            });
        }
        Ok(files)
    }
}

/// A file in the cache directory that carries the store prefix.
struct OwnedFile {
    name: String,
    key: String,
    /// Everything after the first dot, e.g. `css` or `meta.123-0.tmp`.
    ext: String,
}

fn remove_if_present(path: &Path) -> Result<bool, CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

fn decode_meta(path: &Path, raw: &[u8]) -> Result<ArtifactMeta, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid("truncated length prefix"))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header = raw
        .get(4..4 + header_len)
        .ok_or_else(|| invalid("truncated header"))?;

    let (meta, _): (ArtifactMeta, usize) =
        bincode::serde::decode_from_slice(header, bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if meta.magic != ARTIFACT_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if meta.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: ARTIFACT_FORMAT_VERSION,
            actual: meta.format_version,
        });
    }
    Ok(meta)
}

/// Writes `data` next to `path` under a unique temporary name, then renames it
/// over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let unique = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!(
        "{ext}.{}-{unique}.{TMP_EXT}",
        std::process::id()
    ));

    std::fs::write(&tmp, data).map_err(|e| CacheError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(CacheError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_compiler::InputFile;

    fn make_store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("css"));
        (dir, store)
    }

    fn file_names(store: &ArtifactStore) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn write_then_read() {
        let (_dir, store) = make_store();
        let written = store.write("k1", ".a{color:red}", Vec::new()).unwrap();
        let read = store.read("k1").unwrap();
        assert_eq!(read, written);
        assert_eq!(read.css, ".a{color:red}");
        assert!(read.file_name.starts_with("sheaf_k1-"));
        assert!(read.css_path.ends_with(&read.file_name));
    }

    #[test]
    fn css_file_is_plain_stylesheet() {
        let (_dir, store) = make_store();
        let written = store.write("k1", ".a{color:red}", Vec::new()).unwrap();
        let raw = std::fs::read_to_string(&written.css_path).unwrap();
        assert_eq!(raw, ".a{color:red}");
    }

    #[test]
    fn file_name_follows_content() {
        let red = ContentHash::from_bytes(b".a{color:red}");
        let blue = ContentHash::from_bytes(b".a{color:blue}");
        let name = ArtifactStore::css_file_name("k1", &red);
        assert_eq!(name.len(), "sheaf_k1-".len() + DIGEST_LEN + ".css".len());
        assert_eq!(name, ArtifactStore::css_file_name("k1", &red));
        assert_ne!(name, ArtifactStore::css_file_name("k1", &blue));
    }

    #[test]
    fn rewriting_a_key_never_touches_the_old_stylesheet() {
        let (_dir, store) = make_store();
        let first = store.write("k1", ".a{color:red}", Vec::new()).unwrap();
        let second = store.write("k1", ".a{color:blue}", Vec::new()).unwrap();

        assert_ne!(first.css_path, second.css_path);
        assert_eq!(std::fs::read_to_string(&first.css_path).unwrap(), ".a{color:red}");
        assert_eq!(store.read("k1").unwrap().css, ".a{color:blue}");
        assert_eq!(store.keys().unwrap(), vec!["k1"]);
    }

    #[test]
    fn identical_rewrite_keeps_the_same_file() {
        let (_dir, store) = make_store();
        let first = store.write("k1", "x", Vec::new()).unwrap();
        let second = store.write("k1", "x", Vec::new()).unwrap();
        assert_eq!(first.file_name, second.file_name);
        assert_eq!(file_names(&store).len(), 2);
    }

    #[test]
    fn missing_is_none() {
        let (_dir, store) = make_store();
        assert!(store.read("nope").is_none());
    }

    #[test]
    fn no_temp_files_remain_after_write() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        let names = file_names(&store);
        assert_eq!(names.len(), 2, "{names:?}");
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn corrupt_css_is_miss() {
        let (_dir, store) = make_store();
        let written = store.write("k1", ".a{color:red}", Vec::new()).unwrap();
        std::fs::write(&written.css_path, ".a{color:").unwrap();
        assert!(store.read("k1").is_none());
        assert!(matches!(
            store.load("k1"),
            Err(CacheError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn missing_css_with_meta_is_miss() {
        let (_dir, store) = make_store();
        let written = store.write("k1", "x", Vec::new()).unwrap();
        std::fs::remove_file(&written.css_path).unwrap();
        assert!(store.read("k1").is_none());
    }

    #[test]
    fn truncated_meta_is_miss() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        std::fs::write(store.meta_path("k1"), [1u8, 0]).unwrap();
        assert!(matches!(
            store.load("k1"),
            Err(CacheError::InvalidHeader { .. })
        ));
        assert!(store.read("k1").is_none());
    }

    #[test]
    fn garbage_meta_is_miss() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        let mut garbage = 8u32.to_le_bytes().to_vec();
        garbage.extend_from_slice(b"NOTSHEEF");
        std::fs::write(store.meta_path("k1"), garbage).unwrap();
        assert!(store.read("k1").is_none());
    }

    fn write_meta(store: &ArtifactStore, key: &str, meta: &ArtifactMeta) {
        let header = bincode::serde::encode_to_vec(meta, bincode::config::standard()).unwrap();
        let mut framed = (header.len() as u32).to_le_bytes().to_vec();
        framed.extend_from_slice(&header);
        std::fs::write(store.meta_path(key), framed).unwrap();
    }

    fn meta_for(key: &str, css: &[u8]) -> ArtifactMeta {
        let checksum = ContentHash::from_bytes(css);
        ArtifactMeta {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            sheaf_version: "0.0.0".to_string(),
            checksum,
            css_file: ArtifactStore::css_file_name(key, &checksum),
            created_at: 0,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn wrong_version_is_version_mismatch() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        let meta = ArtifactMeta {
            format_version: ARTIFACT_FORMAT_VERSION + 1,
            ..meta_for("k1", b"x")
        };
        write_meta(&store, "k1", &meta);
        assert!(matches!(
            store.load("k1"),
            Err(CacheError::VersionMismatch { actual, .. }) if actual == ARTIFACT_FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn meta_naming_a_foreign_file_is_rejected() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        std::fs::write(store.dir().join("site.css"), "x").unwrap();
        let meta = ArtifactMeta {
            css_file: "site.css".to_string(),
            ..meta_for("k1", b"x")
        };
        write_meta(&store, "k1", &meta);
        assert!(matches!(
            store.load("k1"),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn stale_dependency_is_miss() {
        let (dir, store) = make_store();
        let partial = dir.path().join("_colors.scss");
        std::fs::write(&partial, "$c: red;").unwrap();
        let deps = vec![Dependency::from(InputFile::new(&partial, b"$c: red;"))];
        store.write("k1", "x", deps).unwrap();
        assert!(store.read("k1").is_some());

        std::fs::write(&partial, "$c: blue;").unwrap();
        assert!(matches!(
            store.load("k1"),
            Err(CacheError::StaleDependency { .. })
        ));
    }

    #[test]
    fn keys_ignore_foreign_files() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        store.write("k2", "y", Vec::new()).unwrap();
        std::fs::write(store.dir().join("site.css"), "body{}").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["k1", "k2"]);
    }

    #[test]
    fn keys_of_missing_dir_is_empty() {
        let (_dir, store) = make_store();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn remove_deletes_every_file_of_the_key() {
        let (_dir, store) = make_store();
        let old = store.write("k1", "x", Vec::new()).unwrap();
        let new = store.write("k1", "y", Vec::new()).unwrap();
        store.write("k2", "z", Vec::new()).unwrap();
        assert!(store.remove("k1").unwrap());
        assert!(!old.css_path.exists());
        assert!(!new.css_path.exists());
        assert!(!store.meta_path("k1").exists());
        assert!(!store.remove("k1").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["k2"]);
    }

    #[test]
    fn superseded_stylesheets_are_removed() {
        let (_dir, store) = make_store();
        let old = store.write("k1", "x", Vec::new()).unwrap();
        let new = store.write("k1", "y", Vec::new()).unwrap();
        assert_eq!(store.remove_superseded("k1", &new.file_name).unwrap(), 1);
        assert!(!old.css_path.exists());
        assert_eq!(store.read("k1").unwrap().css, "y");
    }

    #[test]
    fn temp_files_are_cleaned() {
        let (_dir, store) = make_store();
        store.write("k1", "x", Vec::new()).unwrap();
        std::fs::write(
            store.dir().join("sheaf_k2-0011223344556677.css.99-0.tmp"),
            "partial",
        )
        .unwrap();
        std::fs::write(store.dir().join("sheaf_k3.meta.99-1.tmp"), "partial").unwrap();
        assert_eq!(store.remove_temp_files().unwrap(), 2);
        assert_eq!(store.keys().unwrap(), vec!["k1"]);
    }
}
