//! Boxes: named locations holding bead archives
//!
//! [`BeadBox`] is the capability interface the resolver and the CLI work
//! against; [`DirectoryBox`] implements it over a plain directory of
//! archives. Boxes take no locks: every query re-reads the directory, so
//! archives stored concurrently by another process simply show up (or
//! disappear) between two queries.

use crate::archive::Archive;
use crate::bead::Bead;
use crate::error::{BeadError, NotFound, Result, StoreFailure};
use crate::timestamp::FreezeTime;
use crate::workspace::Workspace;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ARCHIVE_COMMENT: &str = "This file is a bead: code, data and references to its inputs, \
frozen together. It is a zip archive; `meta/manifest` lists the hash of every tracked file.";

/// Names recovered for an input reference, see [`BeadBox::find_names`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMatches {
    /// Name of the bead with the same uuid and content id
    pub exact_match: Option<String>,
    /// Name of the latest version frozen at or before the reference time
    pub best_guess: Option<String>,
    pub best_guess_time: Option<FreezeTime>,
    /// Every other name used by the uuid in this box
    pub names: BTreeSet<String>,
}

/// Storage location of bead archives
pub trait BeadBox {
    fn name(&self) -> &str;

    /// Human readable location, for diagnostics
    fn location(&self) -> String;

    /// Descriptors of every readable bead; unreadable archives are skipped
    fn list(&self) -> Box<dyn Iterator<Item = Bead> + '_>;

    fn find_by_content_id(&self, content_id: &str) -> Result<Archive>;

    /// All versions sharing `uuid`, in no particular order
    fn find_by_uuid(&self, uuid: &str) -> Result<Vec<Archive>>;

    /// Recover human names for an input known by uuid and content id
    fn find_names(&self, uuid: &str, content_id: &str, as_of: &FreezeTime) -> NameMatches {
        let mut exact_match = None;
        let mut best: Option<(FreezeTime, String)> = None;
        let mut names = BTreeSet::new();

        for bead in self.list().filter(|bead| bead.bead_uuid == uuid) {
            if bead.content_id == content_id {
                exact_match = Some(bead.name.clone());
            }
            let newer = best
                .as_ref()
                .map_or(true, |(best_time, _)| bead.freeze_time > *best_time);
            if bead.freeze_time <= *as_of && newer {
                best = Some((bead.freeze_time.clone(), bead.name.clone()));
            }
            names.insert(bead.name);
        }

        if let Some(exact) = &exact_match {
            names.remove(exact);
        }
        let (best_guess_time, best_guess) = best.unzip();
        NameMatches {
            exact_match,
            best_guess,
            best_guess_time,
            names,
        }
    }

    /// Freeze `workspace` into this box
    ///
    /// Storing content that is already present is a no-op that returns the
    /// existing archive.
    fn store(&self, workspace: &Workspace, freeze_time: &FreezeTime) -> Result<Archive>;

    /// Descriptors of the beads currently named `name`
    fn find_by_name(&self, name: &str) -> Vec<Bead> {
        self.list().filter(|bead| bead.name == name).collect()
    }
}

/// A box backed by a directory of zip archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBox {
    name: String,
    directory: PathBuf,
}

impl DirectoryBox {
    pub fn new<P: AsRef<Path>>(name: impl Into<String>, directory: P) -> Self {
        DirectoryBox {
            name: name.into(),
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every openable archive, re-read from the directory on each call
    pub fn archives(&self) -> impl Iterator<Item = Archive> + '_ {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Box '{}' at {:?} is not readable: {}", self.name, self.directory, e);
                None
            }
        };

        entries
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && !is_hidden(path))
            .filter_map(move |path| match Archive::open_in_box(&path, &self.name) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    warn!("Skipping {:?} in box '{}': {}", path, self.name, e);
                    None
                }
            })
    }

    fn archive_file_name(workspace: &Workspace, freeze_time: &FreezeTime) -> String {
        format!("{}_{}.zip", workspace.bead_name(), freeze_time)
    }

    fn write_error(&self, path: &Path, source: std::io::Error) -> BeadError {
        StoreFailure::Write {
            path: path.to_path_buf(),
            source,
        }
        .into()
    }

    /// Failures writing the staged archive are store failures; a workspace
    /// that cannot be packed is reported as is
    fn staging_error(&self, staging: &Path, error: BeadError) -> BeadError {
        match error {
            BeadError::Io(source) => self.write_error(staging, source),
            BeadError::Zip(source) => {
                self.write_error(staging, std::io::Error::new(std::io::ErrorKind::Other, source))
            }
            other => other,
        }
    }
}

impl BeadBox for DirectoryBox {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> String {
        self.directory.display().to_string()
    }

    fn list(&self) -> Box<dyn Iterator<Item = Bead> + '_> {
        Box::new(self.archives().filter_map(move |archive| match archive.to_bead() {
            Ok(bead) => Some(bead),
            Err(e) => {
                warn!("Skipping {:?} in box '{}': {}", archive.path(), self.name, e);
                None
            }
        }))
    }

    fn find_by_content_id(&self, content_id: &str) -> Result<Archive> {
        debug!("Looking up content id {} in box '{}'", content_id, self.name);
        self.archives()
            .find(|archive| {
                archive
                    .content_id()
                    .map(|id| id == content_id)
                    .unwrap_or(false)
            })
            .ok_or_else(|| NotFound::ContentId(content_id.to_string()).into())
    }

    fn find_by_uuid(&self, uuid: &str) -> Result<Vec<Archive>> {
        debug!("Looking up uuid {} in box '{}'", uuid, self.name);
        Ok(self
            .archives()
            .filter(|archive| archive.bead_uuid().map(|id| id == uuid).unwrap_or(false))
            .collect())
    }

    fn store(&self, workspace: &Workspace, freeze_time: &FreezeTime) -> Result<Archive> {
        if !workspace.is_valid() {
            return Err(BeadError::InvalidWorkspace(workspace.directory().to_path_buf()));
        }
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(".zip")
            .tempfile_in(&self.directory)
            .map_err(|e| self.write_error(&self.directory, e))?;

        workspace
            .pack(staging.path(), freeze_time, ARCHIVE_COMMENT)
            .map_err(|e| self.staging_error(staging.path(), e))?;
        let content_id = Archive::open_in_box(staging.path(), &self.name)?.content_id()?;

        if let Ok(existing) = self.find_by_content_id(&content_id) {
            info!(
                "Bead {} is already stored in box '{}' as {:?}",
                content_id,
                self.name,
                existing.path()
            );
            return Ok(existing);
        }

        let target = self
            .directory
            .join(Self::archive_file_name(workspace, freeze_time));
        if target.exists() {
            return Err(StoreFailure::Collision { path: target }.into());
        }
        staging.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                BeadError::from(StoreFailure::Collision {
                    path: target.clone(),
                })
            } else {
                self.write_error(&target, e.error)
            }
        })?;

        info!("Stored {} in box '{}' as {:?}", content_id, self.name, target);
        Archive::open_in_box(&target, &self.name)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with('.'))
}
