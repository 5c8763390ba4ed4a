use std::path::PathBuf;
use thiserror::Error;

/// Why an archive was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The file is not a readable zip container
    #[error("not a readable container ({0})")]
    Unreadable(String),

    #[error("bead metadata is missing or unreadable")]
    UnreadableMeta,

    #[error("manifest is missing or unreadable")]
    UnreadableManifest,

    #[error("metadata has no '{0}'")]
    MissingMetaKey(&'static str),

    /// Metadata is present but does not have the expected shape
    #[error("malformed metadata: {0}")]
    MalformedMeta(String),

    #[error("unparseable freeze time '{0}'")]
    BadFreezeTime(String),

    #[error("freeze time '{0}' is in the future")]
    FrozenInFuture(String),

    /// A code/data file is present in the container but not in the manifest
    #[error("file '{0}' is not in the manifest")]
    ExtraFile(String),

    /// A manifest entry has no corresponding container entry
    #[error("manifest entry '{0}' is missing from the container")]
    MissingFile(String),

    #[error("content of '{0}' was modified")]
    HashMismatch(String),
}

/// A reference, content id or uuid matched nothing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("Bead '{0}' not found")]
    UnknownName(String),

    #[error("Bead '{0}' has no stored versions")]
    NoRealVersion(String),

    #[error("Bead '{name}' has no version frozen at {freeze_time}")]
    NoSuchVersion { name: String, freeze_time: String },

    #[error("Bead '{name}' has no version frozen at or before {freeze_time}")]
    NothingBefore { name: String, freeze_time: String },

    #[error("Bead '{name}' has {available} versions, position {position} is out of range")]
    OffsetOutOfRange {
        name: String,
        position: usize,
        available: usize,
    },

    #[error("No bead with content id {0}")]
    ContentId(String),

    #[error("No bead with uuid {0}")]
    Uuid(String),
}

/// Storing a workspace into a box failed
#[derive(Error, Debug)]
pub enum StoreFailure {
    #[error("{path:?} already holds a bead with a different content id")]
    Collision { path: PathBuf },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BeadError {
    #[error("Invalid archive {path:?}: {reason}")]
    InvalidArchive { path: PathBuf, reason: InvalidReason },

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("Store failed: {0}")]
    Store(#[from] StoreFailure),

    #[error("Unsupported bead format in {path:?}: meta_version '{found}'")]
    UnsupportedFormat { path: PathBuf, found: String },

    #[error("Invalid bead reference: {0}")]
    InvalidReference(String),

    #[error("Invalid workspace {0:?}")]
    InvalidWorkspace(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl BeadError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: InvalidReason) -> Self {
        BeadError::InvalidArchive {
            path: path.into(),
            reason,
        }
    }

    /// True for every lookup miss, whatever its cause
    pub fn is_not_found(&self) -> bool {
        matches!(self, BeadError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, BeadError>;
