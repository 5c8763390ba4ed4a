//! Bead metadata as stored in archives and workspaces

use crate::timestamp::FreezeTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The one metadata format this engine reads and writes
pub const META_VERSION: &str = "aaa947a6-1f7a-11e6-ba3a-0021cc73492e";

pub const KEY_META_VERSION: &str = "meta_version";
pub const KEY_KIND: &str = "kind";
pub const KEY_BEAD_UUID: &str = "bead_uuid";
pub const KEY_FREEZE_TIME: &str = "freeze_time";
pub const KEY_FREEZE_NAME: &str = "freeze_name";
pub const KEY_INPUTS: &str = "inputs";

/// Keys every archived `meta/bead` must carry
pub const REQUIRED_KEYS: [&str; 5] = [
    KEY_META_VERSION,
    KEY_KIND,
    KEY_FREEZE_TIME,
    KEY_FREEZE_NAME,
    KEY_INPUTS,
];

/// Archive path -> content hash, for every tracked entry
pub type Manifest = BTreeMap<String, String>;

/// Input nickname -> bead name used when the input was loaded
pub type InputMap = BTreeMap<String, String>;

/// Reference to an upstream bead, as recorded by its consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bead_uuid: Option<String>,

    pub content_id: String,

    pub freeze_time: FreezeTime,

    /// Name of the upstream bead when it was loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl InputSpec {
    /// Stable identity of the upstream bead
    ///
    /// Beads frozen without an explicit uuid are identified by their kind.
    pub fn uuid(&self) -> &str {
        self.bead_uuid.as_deref().unwrap_or(&self.kind)
    }
}

/// A named input of a bead
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Input {
    /// Local nickname; the input is mounted under `input/<name>`
    pub name: String,
    pub bead_uuid: String,
    pub kind: String,
    pub content_id: String,
    pub freeze_time: FreezeTime,
    /// Name of the upstream bead when it was loaded, if recorded
    pub bead_name: Option<String>,
}

impl Input {
    pub fn new(name: impl Into<String>, spec: &InputSpec) -> Self {
        Input {
            name: name.into(),
            bead_uuid: spec.uuid().to_string(),
            kind: spec.kind.clone(),
            content_id: spec.content_id.clone(),
            freeze_time: spec.freeze_time.clone(),
            bead_name: spec.name.clone(),
        }
    }
}

/// Metadata of a workspace under development (`.bead-meta/bead`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub meta_version: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bead_uuid: Option<String>,

    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,
}

impl WorkspaceMeta {
    pub fn new(kind: impl Into<String>, bead_uuid: impl Into<String>) -> Self {
        WorkspaceMeta {
            meta_version: META_VERSION.to_string(),
            kind: kind.into(),
            bead_uuid: Some(bead_uuid.into()),
            inputs: BTreeMap::new(),
        }
    }

    /// Freeze into archive metadata
    pub fn freeze(&self, freeze_time: FreezeTime, freeze_name: impl Into<String>) -> BeadMeta {
        BeadMeta {
            meta_version: self.meta_version.clone(),
            kind: self.kind.clone(),
            bead_uuid: self.bead_uuid.clone(),
            freeze_time,
            freeze_name: freeze_name.into(),
            inputs: self.inputs.clone(),
        }
    }
}

/// Metadata of a frozen bead (`meta/bead` inside an archive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadMeta {
    pub meta_version: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bead_uuid: Option<String>,

    pub freeze_time: FreezeTime,
    pub freeze_name: String,
    pub inputs: BTreeMap<String, InputSpec>,
}

impl BeadMeta {
    pub fn uuid(&self) -> &str {
        self.bead_uuid.as_deref().unwrap_or(&self.kind)
    }

    /// Inputs sorted by nickname
    pub fn inputs(&self) -> Vec<Input> {
        self.inputs
            .iter()
            .map(|(name, spec)| Input::new(name.clone(), spec))
            .collect()
    }

    /// The metadata a workspace developed from this bead starts with
    pub fn thaw(&self) -> WorkspaceMeta {
        WorkspaceMeta {
            meta_version: self.meta_version.clone(),
            kind: self.kind.clone(),
            bead_uuid: self.bead_uuid.clone(),
            inputs: self.inputs.clone(),
        }
    }
}
