//! Workspaces: mutable, unpacked beads under development
//!
//! ```text
//! <workspace>/
//!   .bead-meta/bead        workspace metadata (kind, uuid, inputs)
//!   .bead-meta/input.map   input nickname -> bead name
//!   input/                 loaded inputs (never packed)
//!   output/                results, packed as data/
//!   temp/                  scratch space (never packed)
//!   ...                    everything else is packed as code/
//! ```

use crate::archive::ArchiveWriter;
use crate::error::{BeadError, Result};
use crate::layout;
use crate::meta::{Input, InputMap, WorkspaceMeta};
use crate::timestamp::FreezeTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    directory: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Workspace {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Name of the bead developed here: the directory name
    ///
    /// Paths ending in `.` or `..` are resolved first; the root directory has
    /// no name and yields an empty string.
    pub fn bead_name(&self) -> String {
        let resolved;
        let directory = match self.directory.file_name() {
            Some(_) => &self.directory,
            None => {
                resolved = self
                    .directory
                    .canonicalize()
                    .unwrap_or_else(|_| self.directory.clone());
                &resolved
            }
        };
        directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_valid(&self) -> bool {
        self.meta().is_ok()
    }

    /// Initialize a new bead of `kind` with a fresh uuid
    pub fn create(&self, kind: &str) -> Result<()> {
        self.create_directories()?;
        let bead_uuid = uuid::Uuid::new_v4().to_string();
        self.set_meta(&WorkspaceMeta::new(kind, bead_uuid))?;
        info!("Created workspace {:?} of kind '{}'", self.directory, kind);
        Ok(())
    }

    pub fn create_directories(&self) -> Result<()> {
        for sub in [
            layout::workspace::INPUT,
            layout::workspace::OUTPUT,
            layout::workspace::TEMP,
            layout::workspace::META,
        ] {
            std::fs::create_dir_all(self.directory.join(sub))?;
        }
        Ok(())
    }

    pub fn meta(&self) -> Result<WorkspaceMeta> {
        let bytes = std::fs::read(self.directory.join(layout::workspace::BEAD_META))
            .map_err(|_| BeadError::InvalidWorkspace(self.directory.clone()))?;
        serde_json::from_slice(&bytes).map_err(|_| BeadError::InvalidWorkspace(self.directory.clone()))
    }

    pub fn set_meta(&self, meta: &WorkspaceMeta) -> Result<()> {
        std::fs::create_dir_all(self.directory.join(layout::workspace::META))?;
        let path = self.directory.join(layout::workspace::BEAD_META);
        std::fs::write(path, serde_json::to_vec_pretty(meta)?)?;
        Ok(())
    }

    /// Empty when the workspace has no input map yet
    pub fn input_map(&self) -> InputMap {
        std::fs::read(self.directory.join(layout::workspace::INPUT_MAP))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    pub fn set_input_map(&self, input_map: &InputMap) -> Result<()> {
        std::fs::create_dir_all(self.directory.join(layout::workspace::META))?;
        let path = self.directory.join(layout::workspace::INPUT_MAP);
        std::fs::write(path, serde_json::to_vec_pretty(input_map)?)?;
        Ok(())
    }

    pub fn kind(&self) -> Result<String> {
        Ok(self.meta()?.kind)
    }

    pub fn bead_uuid(&self) -> Result<String> {
        let meta = self.meta()?;
        Ok(meta.bead_uuid.unwrap_or(meta.kind))
    }

    pub fn inputs(&self) -> Result<Vec<Input>> {
        Ok(self
            .meta()?
            .inputs
            .iter()
            .map(|(name, spec)| Input::new(name.clone(), spec))
            .collect())
    }

    /// Freeze the workspace into a new archive at `path`
    pub fn pack<P: AsRef<Path>>(
        &self,
        path: P,
        freeze_time: &FreezeTime,
        comment: &str,
    ) -> Result<PathBuf> {
        let bead_name = self.bead_name();
        if bead_name.is_empty() {
            return Err(BeadError::InvalidWorkspace(self.directory.clone()));
        }
        let meta = self.meta()?;
        let mut writer = ArchiveWriter::create(path.as_ref())?;

        for (fs_path, relative) in self.code_files()? {
            writer.add_file(&fs_path, &format!("{}{}", layout::archive::CODE_PREFIX, relative))?;
        }
        for (fs_path, relative) in self.data_files()? {
            writer.add_file(&fs_path, &format!("{}{}", layout::archive::DATA_PREFIX, relative))?;
        }

        let bead_meta = meta.freeze(freeze_time.clone(), bead_name);
        let written = writer.finish(&bead_meta, &self.input_map(), comment)?;
        info!("Packed {:?} into {:?}", self.directory, written);
        Ok(written)
    }

    fn code_files(&self) -> Result<Vec<(PathBuf, String)>> {
        let walker = WalkDir::new(&self.directory)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() != 1
                    || !layout::workspace::NOT_CODE
                        .iter()
                        .any(|excluded| entry.file_name() == *excluded)
            });
        self.collect_files(walker, &self.directory)
    }

    fn data_files(&self) -> Result<Vec<(PathBuf, String)>> {
        let output = self.directory.join(layout::workspace::OUTPUT);
        if !output.is_dir() {
            return Ok(Vec::new());
        }
        let walker = WalkDir::new(&output).sort_by_file_name().into_iter();
        self.collect_files(walker, &output)
    }

    fn collect_files(
        &self,
        walker: impl Iterator<Item = walkdir::Result<walkdir::DirEntry>>,
        root: &Path,
    ) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| BeadError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .ok()
                .and_then(archive_path)
                .ok_or_else(|| BeadError::InvalidWorkspace(entry.path().to_path_buf()))?;
            debug!("Packing {:?} as {}", entry.path(), relative);
            files.push((entry.path().to_path_buf(), relative));
        }
        Ok(files)
    }
}

/// `/` separated form of a relative path, if it is valid UTF-8
fn archive_path(relative: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|parts| parts.join("/"))
}
