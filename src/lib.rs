//! # Bead - Content-Addressed Archives of Code and Data
//!
//! A *bead* is a frozen computation: the code that ran, the data it produced
//! and references to the beads it consumed, packed into one zip archive with
//! a manifest of content hashes. Beads are kept in *boxes* (directories of
//! archives) and looked up by name, by content id, or by a temporal
//! reference such as `name@-1` (the version before the latest).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bead::{BeadBox, DirectoryBox, FreezeTime, VersionResolver, Workspace, Result};
//!
//! # fn main() -> Result<()> {
//! let workspace = Workspace::new("/work/my-analysis");
//! workspace.create("my-analysis-kind")?;
//!
//! let bead_box = DirectoryBox::new("main", "/data/beads");
//! let archive = bead_box.store(&workspace, &FreezeTime::now())?;
//! archive.validate()?;
//!
//! // the version frozen before the latest one
//! let resolver = VersionResolver::single(&bead_box);
//! let previous = resolver.resolve_str("my-analysis@-1")?;
//! println!("{} frozen at {}", previous.name(), previous.freeze_time());
//! # Ok(())
//! # }
//! ```
//!
//! ## Archive Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              bead archive (.zip)             │
//! ├──────────────────────────────────────────────┤
//! │ meta/bead       format version, kind, uuid,  │
//! │                 freeze time/name, inputs     │
//! │ meta/manifest   entry path -> content hash   │
//! │ meta/input.map  input nickname -> bead name  │
//! ├──────────────────────────────────────────────┤
//! │ code/...        sources                      │
//! │ data/...        results                      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The content id of a bead is the hash of its manifest. Tampering with a
//! packed file leaves the content id unchanged but makes
//! [`Archive::validate`] fail.

// Engine implementation
pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    archive, bead, bead_box, cluster, config, error, hash, layout, meta, reference, resolver,
    timestamp, workspace,
};

pub use crate::core::{
    create_cluster_index, Archive, ArchiveWriter, Bead, BeadBox, BeadError, BeadReference,
    BoxConfig, BoxRegistry, Cluster, ClusterIndex, Config, DirectoryBox, FreezeTime, Input,
    InputMap, InputSpec, InvalidReason, Manifest, MetaBead, NameMatches, NotFound, PhantomBead,
    Result, StoreFailure, VersionResolver, VersionSpec, Workspace, META_VERSION, PHANTOM_KIND,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
