//! Resolving references to exactly one bead
//!
//! A resolver searches an ordered list of boxes. Candidates for a name are
//! merged into one logical cluster; a bead present in several boxes (same
//! content id) is the same bead and is kept once, from the first box
//! listing it.

use crate::archive::Archive;
use crate::bead::{Bead, MetaBead};
use crate::bead_box::BeadBox;
use crate::cluster::Cluster;
use crate::config::BoxRegistry;
use crate::error::{NotFound, Result};
use crate::reference::{BeadReference, VersionSpec};
use tracing::debug;

pub struct VersionResolver<'a> {
    boxes: Vec<&'a dyn BeadBox>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(boxes: impl IntoIterator<Item = &'a dyn BeadBox>) -> Self {
        VersionResolver {
            boxes: boxes.into_iter().collect(),
        }
    }

    /// Search one box only
    pub fn single(bead_box: &'a dyn BeadBox) -> Self {
        VersionResolver {
            boxes: vec![bead_box],
        }
    }

    /// Search every configured box, in configuration order
    pub fn from_registry(registry: &'a BoxRegistry) -> Self {
        Self::new(registry.iter())
    }

    /// All versions of `name` across the searched boxes
    pub fn cluster(&self, name: &str) -> Cluster {
        let mut cluster = Cluster::new(name);
        for bead_box in &self.boxes {
            for bead in bead_box.find_by_name(name) {
                if !cluster.contains(&bead.content_id) {
                    cluster.add(bead);
                }
            }
        }
        cluster
    }

    /// Versions of `name`, most recent first (for display)
    pub fn versions(&self, name: &str) -> Vec<MetaBead> {
        self.cluster(name).ordered_versions()
    }

    /// Resolve a reference
    ///
    /// A plain name resolves to the cluster head, which is a phantom when
    /// the name has no stored version; use [`Self::resolve_real`] to treat
    /// that as not found.
    pub fn resolve(&self, reference: &BeadReference) -> Result<MetaBead> {
        debug!("Resolving {}", reference);
        resolve_in(&self.cluster(&reference.name), &reference.version)
    }

    pub fn resolve_str(&self, reference: &str) -> Result<MetaBead> {
        self.resolve(&BeadReference::parse(reference)?)
    }

    /// Resolve to a stored bead, failing on a phantom result
    pub fn resolve_real(&self, reference: &BeadReference) -> Result<Bead> {
        let cluster = self.cluster(&reference.name);
        match resolve_in(&cluster, &reference.version)? {
            MetaBead::Real(bead) => Ok(bead),
            MetaBead::Phantom(_) if cluster.is_empty() => {
                Err(NotFound::UnknownName(reference.name.clone()).into())
            }
            MetaBead::Phantom(_) => Err(NotFound::NoRealVersion(reference.name.clone()).into()),
        }
    }

    /// Open the archive behind a resolved bead
    ///
    /// The box the bead was listed from is asked first, then all others.
    pub fn archive(&self, bead: &Bead) -> Result<Archive> {
        let preferred = self.boxes.iter().filter(|b| b.name() == bead.box_name);
        let others = self.boxes.iter().filter(|b| b.name() != bead.box_name);
        for bead_box in preferred.chain(others) {
            match bead_box.find_by_content_id(&bead.content_id) {
                Ok(archive) => return Ok(archive),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(NotFound::ContentId(bead.content_id.clone()).into())
    }
}

/// Apply a version selector to one cluster
pub fn resolve_in(cluster: &Cluster, version: &VersionSpec) -> Result<MetaBead> {
    let name = cluster.name();
    if cluster.is_empty() && *version != VersionSpec::Head {
        return Err(NotFound::UnknownName(name.to_string()).into());
    }

    let versions = cluster.ordered_versions();
    let position = match version {
        VersionSpec::Head => return Ok(cluster.head().clone()),
        VersionSpec::Latest => versions
            .iter()
            .position(|bead| !bead.is_phantom())
            .ok_or_else(|| NotFound::NoRealVersion(name.to_string()))?,
        VersionSpec::Exact(freeze_time) => versions
            .iter()
            .position(|bead| bead.freeze_time() == freeze_time)
            .ok_or_else(|| NotFound::NoSuchVersion {
                name: name.to_string(),
                freeze_time: freeze_time.to_string(),
            })?,
        VersionSpec::Offset(offset) => *offset,
        VersionSpec::Relative { anchor, offset } => {
            let anchored = versions
                .iter()
                .position(|bead| bead.freeze_time() <= anchor)
                .ok_or_else(|| NotFound::NothingBefore {
                    name: name.to_string(),
                    freeze_time: anchor.to_string(),
                })?;
            anchored.saturating_add(*offset)
        }
    };

    let available = versions.len();
    versions.into_iter().nth(position).ok_or_else(|| {
        NotFound::OffsetOutOfRange {
            name: name.to_string(),
            position,
            available,
        }
        .into()
    })
}
