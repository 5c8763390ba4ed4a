//! Bead archives
//!
//! A bead archive is a zip container with this layout:
//!
//! ```text
//! meta/bead        JSON metadata (format version, kind, freeze time, name, inputs)
//! meta/manifest    JSON map: entry path -> content hash
//! meta/input.map   optional JSON map: input nickname -> bead name
//! code/...         source files of the bead
//! data/...         output files of the bead
//! ```
//!
//! The manifest is the allow-list of `code/` and `data/` entries. A bead's
//! content id is the hash of the manifest bytes, so it identifies every
//! tracked file transitively without rehashing them.

use crate::bead::Bead;
use crate::error::{BeadError, InvalidReason, Result};
use crate::hash;
use crate::layout;
use crate::meta::{self, BeadMeta, Input, InputMap, Manifest, META_VERSION};
use crate::timestamp::{self, FreezeTime};
use crate::workspace::Workspace;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Read-only view of a bead archive on disk
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    box_name: String,
    meta: Map<String, Value>,
    content_id: OnceLock<String>,
}

impl Archive {
    /// Open an archive, loading its metadata
    ///
    /// Fails with `InvalidArchive` when the file is not a zip container or
    /// has no readable `meta/bead` entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_in_box(path, "")
    }

    /// Open an archive found in the box named `box_name`
    pub fn open_in_box<P: AsRef<Path>>(path: P, box_name: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening archive {:?}", path);

        let mut zip = open_zip(&path)?;
        let meta = match load_json::<Value>(&mut zip, layout::archive::BEAD_META) {
            Ok(Value::Object(meta)) => meta,
            _ => return Err(BeadError::invalid(&path, InvalidReason::UnreadableMeta)),
        };

        Ok(Archive {
            path,
            box_name: box_name.to_string(),
            meta,
            content_id: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn box_name(&self) -> &str {
        &self.box_name
    }

    /// Independent copy of the parsed metadata
    pub fn metadata(&self) -> Map<String, Value> {
        self.meta.clone()
    }

    /// Typed copy of the metadata
    pub fn bead_meta(&self) -> Result<BeadMeta> {
        serde_json::from_value(Value::Object(self.meta.clone())).map_err(|e| {
            BeadError::invalid(&self.path, InvalidReason::MalformedMeta(e.to_string()))
        })
    }

    pub fn meta_version(&self) -> Result<&str> {
        self.meta_str(meta::KEY_META_VERSION)
    }

    pub fn kind(&self) -> Result<&str> {
        self.meta_str(meta::KEY_KIND)
    }

    /// Name the bead was frozen under
    pub fn name(&self) -> Result<&str> {
        self.meta_str(meta::KEY_FREEZE_NAME)
    }

    pub fn freeze_time(&self) -> Result<FreezeTime> {
        self.meta_str(meta::KEY_FREEZE_TIME).map(FreezeTime::from)
    }

    /// Stable identity shared by all versions of this bead
    pub fn bead_uuid(&self) -> Result<&str> {
        match self.meta.get(meta::KEY_BEAD_UUID).and_then(Value::as_str) {
            Some(uuid) => Ok(uuid),
            None => self.kind(),
        }
    }

    /// Inputs sorted by nickname
    pub fn inputs(&self) -> Result<Vec<Input>> {
        Ok(self.bead_meta()?.inputs())
    }

    pub fn manifest(&self) -> Result<Manifest> {
        let mut zip = self.zip()?;
        load_json(&mut zip, layout::archive::MANIFEST)
            .map_err(|_| BeadError::invalid(&self.path, InvalidReason::UnreadableManifest))
    }

    /// Input nickname -> bead name map, empty when the archive has none
    pub fn input_map(&self) -> InputMap {
        self.zip()
            .ok()
            .and_then(|mut zip| load_json(&mut zip, layout::archive::INPUT_MAP).ok())
            .unwrap_or_default()
    }

    /// Hash of the manifest entry, computed on first use
    ///
    /// Fails with `UnsupportedFormat` for any metadata version other than
    /// [`META_VERSION`]: the layout of such archives is unknown, so no
    /// content id can be trusted for them.
    pub fn content_id(&self) -> Result<String> {
        if let Some(content_id) = self.content_id.get() {
            return Ok(content_id.clone());
        }
        let content_id = self.calculate_content_id()?;
        Ok(self.content_id.get_or_init(|| content_id).clone())
    }

    fn calculate_content_id(&self) -> Result<String> {
        let version = self.meta_version()?;
        if version != META_VERSION {
            return Err(BeadError::UnsupportedFormat {
                path: self.path.clone(),
                found: version.to_string(),
            });
        }

        let mut zip = self.zip()?;
        let entry = zip
            .by_name(layout::archive::MANIFEST)
            .map_err(|_| BeadError::invalid(&self.path, InvalidReason::UnreadableManifest))?;
        let size = entry.size();
        hash::reader(entry, size)
            .map_err(|_| BeadError::invalid(&self.path, InvalidReason::UnreadableManifest))
    }

    /// Verify metadata and every tracked file against the manifest
    pub fn validate(&self) -> Result<()> {
        self.check_meta_keys()?;
        self.check_frozen_in_past()?;

        let manifest = self.manifest()?;
        let mut zip = self.zip()?;
        self.check_no_extra_file(&zip, &manifest)?;
        self.check_hashes(&mut zip, &manifest)?;

        debug!("Archive {:?} is valid", self.path);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn check_meta_keys(&self) -> Result<()> {
        for key in meta::REQUIRED_KEYS {
            if !self.meta.contains_key(key) {
                return Err(self.rejected(InvalidReason::MissingMetaKey(key)));
            }
        }
        Ok(())
    }

    fn check_frozen_in_past(&self) -> Result<()> {
        let freeze_time = self.meta_str(meta::KEY_FREEZE_TIME)?;
        let frozen = timestamp::parse(freeze_time)
            .ok_or_else(|| self.rejected(InvalidReason::BadFreezeTime(freeze_time.to_string())))?;
        // coarse clocks may hand out the freeze time itself as "now"
        if frozen.with_timezone(&Utc) <= Utc::now() {
            Ok(())
        } else {
            Err(self.rejected(InvalidReason::FrozenInFuture(freeze_time.to_string())))
        }
    }

    fn check_no_extra_file(&self, zip: &ZipArchive<File>, manifest: &Manifest) -> Result<()> {
        let extra = zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .find(|name| layout::archive::is_tracked(name) && !manifest.contains_key(*name));
        match extra {
            Some(name) => Err(self.rejected(InvalidReason::ExtraFile(name.to_string()))),
            None => Ok(()),
        }
    }

    fn check_hashes(&self, zip: &mut ZipArchive<File>, manifest: &Manifest) -> Result<()> {
        for (name, recorded) in manifest {
            let entry = match zip.by_name(name) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => {
                    return Err(self.rejected(InvalidReason::MissingFile(name.clone())))
                }
                Err(e) => return Err(self.rejected(InvalidReason::Unreadable(e.to_string()))),
            };
            let size = entry.size();
            let actual = hash::reader(entry, size)
                .map_err(|e| self.rejected(InvalidReason::Unreadable(e.to_string())))?;
            if &actual != recorded {
                return Err(self.rejected(InvalidReason::HashMismatch(name.clone())));
            }
        }
        Ok(())
    }

    /// Descriptor used by boxes and clusters
    pub fn to_bead(&self) -> Result<Bead> {
        let meta = self.bead_meta()?;
        Ok(Bead {
            bead_uuid: meta.uuid().to_string(),
            name: meta.freeze_name.clone(),
            content_id: self.content_id()?,
            freeze_time: meta.freeze_time.clone(),
            kind: meta.kind.clone(),
            box_name: self.box_name.clone(),
            inputs: meta.inputs(),
        })
    }

    pub fn unpack_code_to<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        self.extract_dir(layout::archive::CODE_PREFIX, dir.as_ref())
    }

    pub fn unpack_data_to<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        self.extract_dir(layout::archive::DATA_PREFIX, dir.as_ref())
    }

    /// Hand metadata and input map over to a workspace
    pub fn unpack_meta_to(&self, workspace: &Workspace) -> Result<()> {
        workspace.set_meta(&self.bead_meta()?.thaw())?;
        workspace.set_input_map(&self.input_map())
    }

    /// Develop the bead: workspace layout, code and metadata (no data)
    pub fn unpack_to(&self, workspace: &Workspace) -> Result<()> {
        workspace.create_directories()?;
        self.unpack_code_to(workspace.directory())?;
        self.unpack_meta_to(workspace)?;
        info!("Unpacked {:?} into {:?}", self.path, workspace.directory());
        Ok(())
    }

    fn extract_dir(&self, prefix: &str, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut zip = self.zip()?;

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            let Some(relative) = entry.name().strip_prefix(prefix).map(str::to_string) else {
                continue;
            };
            if entry.is_dir() || relative.is_empty() {
                continue;
            }
            let target = dir.join(safe_relative_path(&relative).ok_or_else(|| {
                self.rejected(InvalidReason::Unreadable(format!(
                    "entry '{}' escapes the target directory",
                    entry.name()
                )))
            })?);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            debug!("Extracting {} -> {:?}", entry.name(), target);
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }
        Ok(())
    }

    fn zip(&self) -> Result<ZipArchive<File>> {
        open_zip(&self.path)
    }

    fn meta_str(&self, key: &'static str) -> Result<&str> {
        match self.meta.get(key) {
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(self.rejected(InvalidReason::MalformedMeta(format!(
                "'{}' is not a string",
                key
            )))),
            None => Err(self.rejected(InvalidReason::MissingMetaKey(key))),
        }
    }

    fn rejected(&self, reason: InvalidReason) -> BeadError {
        BeadError::invalid(&self.path, reason)
    }
}

fn open_zip(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)
        .map_err(|e| BeadError::invalid(path, InvalidReason::Unreadable(e.to_string())))?;
    ZipArchive::new(file).map_err(|e| BeadError::invalid(path, InvalidReason::Unreadable(e.to_string())))
}

fn load_json<T: DeserializeOwned>(zip: &mut ZipArchive<File>, name: &str) -> Result<T> {
    let mut entry = zip.by_name(name)?;
    let mut buffer = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buffer)?;
    Ok(serde_json::from_slice(&buffer)?)
}

/// Relative path with only normal components, if `name` has no `..`, root or prefix
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

/// Builds a new archive, recording a manifest entry for every file added
pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
    hashes: Manifest,
}

impl ArchiveWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(ArchiveWriter {
            zip: ZipWriter::new(file),
            path,
            hashes: Manifest::new(),
        })
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    /// Copy a file from disk into the archive, hashing it on the way
    pub fn add_file(&mut self, fs_path: &Path, zip_path: &str) -> Result<()> {
        let mut source = File::open(fs_path)?;
        let len = source.metadata()?.len();
        self.zip.start_file(zip_path, Self::options())?;

        let mut hasher = hash::ContentHasher::new(len);
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let n = source.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            self.zip.write_all(&buffer[..n])?;
        }
        // a file growing while packed would be recorded inconsistently
        let digest = hasher.finish()?;
        self.hashes.insert(zip_path.to_string(), digest);
        Ok(())
    }

    pub fn add_bytes(&mut self, zip_path: &str, content: &[u8]) -> Result<()> {
        self.zip.start_file(zip_path, Self::options())?;
        self.zip.write_all(content)?;
        self.hashes.insert(zip_path.to_string(), hash::bytes(content));
        Ok(())
    }

    /// Write metadata and manifest, then close the container
    pub fn finish(mut self, meta: &BeadMeta, input_map: &InputMap, comment: &str) -> Result<PathBuf> {
        let meta_bytes = serde_json::to_vec_pretty(meta)?;
        self.add_bytes(layout::archive::BEAD_META, &meta_bytes)?;
        if !input_map.is_empty() {
            let input_map_bytes = serde_json::to_vec_pretty(input_map)?;
            self.add_bytes(layout::archive::INPUT_MAP, &input_map_bytes)?;
        }

        // the manifest is not listed in itself
        let manifest = serde_json::to_vec_pretty(&self.hashes)?;
        self.zip.start_file(layout::archive::MANIFEST, Self::options())?;
        self.zip.write_all(&manifest)?;

        self.zip.set_comment(comment);
        self.zip.finish()?;
        debug!("Wrote archive {:?} with {} entries", self.path, self.hashes.len());
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::WorkspaceMeta;
    use tempfile::TempDir;

    fn write_archive(dir: &Path, freeze_time: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("bead.zip");
        let mut writer = ArchiveWriter::create(&path).unwrap();
        for (name, content) in files {
            writer.add_bytes(name, content).unwrap();
        }
        let meta = WorkspaceMeta::new("test-kind", "uuid-1").freeze(freeze_time.into(), "bead");
        writer.finish(&meta, &InputMap::new(), "test").unwrap()
    }

    #[test]
    fn test_written_archive_is_valid() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(
            dir.path(),
            "20150930T093724802366+0200",
            &[("code/main.py", b"print(1)"), ("data/out.csv", b"1,2")],
        );

        let archive = Archive::open(&path).unwrap();
        archive.validate().unwrap();
        assert_eq!(archive.name().unwrap(), "bead");
        assert_eq!(archive.bead_uuid().unwrap(), "uuid-1");
        assert_eq!(archive.kind().unwrap(), "test-kind");

        let manifest = archive.manifest().unwrap();
        assert!(manifest.contains_key("code/main.py"));
        assert!(manifest.contains_key("data/out.csv"));
        assert!(manifest.contains_key(layout::archive::BEAD_META));
        assert!(!manifest.contains_key(layout::archive::MANIFEST));
    }

    #[test]
    fn test_metadata_is_an_independent_copy() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), "20150930T093724802366+0200", &[]);
        let archive = Archive::open(&path).unwrap();

        let mut copy = archive.metadata();
        copy.insert(meta::KEY_KIND.to_string(), Value::from("hijacked"));
        copy.remove(meta::KEY_FREEZE_NAME);

        assert_eq!(archive.kind().unwrap(), "test-kind");
        assert_eq!(archive.name().unwrap(), "bead");
    }

    #[test]
    fn test_content_id_is_cached_and_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), "20150930T093724802366+0200", &[("code/a", b"a")]);

        let archive = Archive::open(&path).unwrap();
        let first = archive.content_id().unwrap();
        assert_eq!(first, archive.content_id().unwrap());
        assert_eq!(first, Archive::open(&path).unwrap().content_id().unwrap());
    }

    #[test]
    fn test_future_freeze_time_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), "29990101T000000000000+0000", &[]);
        let err = Archive::open(&path).unwrap().validate().unwrap_err();
        assert!(matches!(
            err,
            BeadError::InvalidArchive {
                reason: InvalidReason::FrozenInFuture(_),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_input_map_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), "20150930T093724802366+0200", &[]);
        assert!(Archive::open(&path).unwrap().input_map().is_empty());
    }

    #[test]
    fn test_not_a_zip_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.zip");
        std::fs::write(&path, b"random bits").unwrap();
        assert!(matches!(
            Archive::open(&path),
            Err(BeadError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn test_safe_relative_path() {
        assert!(safe_relative_path("a/b/c.txt").is_some());
        assert!(safe_relative_path("../etc/passwd").is_none());
        assert!(safe_relative_path("/etc/passwd").is_none());
    }
}
