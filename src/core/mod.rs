//! Bead engine
//!
//! - [`error`] - Error taxonomy shared by every layer
//! - [`hash`] - Length-prefixed SHA-512 content hashing
//! - [`timestamp`] - Freeze timestamps
//! - [`layout`] - Persisted entry paths of archives and workspaces
//! - [`meta`] - Typed bead metadata
//! - [`archive`] - Reading, validating and writing bead archives
//! - [`bead`] - Storage independent bead descriptors
//! - [`bead_box`] - Boxes and their directory implementation
//! - [`cluster`] - Versions of one name and their head
//! - [`reference`] - `NAME@TS-N` reference grammar
//! - [`resolver`] - Reference resolution over one or more boxes
//! - [`workspace`] - Unpacked beads under development
//! - [`config`] - Box configuration and registry

pub mod archive;
pub mod bead;
pub mod bead_box;
pub mod cluster;
pub mod config;
pub mod error;
pub mod hash;
pub mod layout;
pub mod meta;
pub mod reference;
pub mod resolver;
pub mod timestamp;
pub mod workspace;

pub use archive::{Archive, ArchiveWriter};
pub use bead::{Bead, MetaBead, PhantomBead, PHANTOM_KIND};
pub use bead_box::{BeadBox, DirectoryBox, NameMatches};
pub use cluster::{create_cluster_index, Cluster, ClusterIndex};
pub use config::{BoxConfig, BoxRegistry, Config};
pub use error::{BeadError, InvalidReason, NotFound, Result, StoreFailure};
pub use meta::{Input, InputMap, InputSpec, Manifest, META_VERSION};
pub use reference::{BeadReference, VersionSpec};
pub use resolver::VersionResolver;
pub use timestamp::FreezeTime;
pub use workspace::Workspace;
