//! Clusters: all versions of one bead name

use crate::bead::{Bead, MetaBead, PhantomBead};
use std::collections::{BTreeMap, HashMap};

/// Versions sharing a name, with the head (latest real version) tracked
/// incrementally as beads are added
#[derive(Debug, Clone)]
pub struct Cluster {
    name: String,
    beads: Vec<MetaBead>,
    by_content_id: HashMap<String, usize>,
    head: MetaBead,
}

impl Cluster {
    /// An empty cluster; its head is a phantom until a real bead arrives
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Cluster {
            head: PhantomBead::empty_cluster(name.clone()).into(),
            name,
            beads: Vec::new(),
            by_content_id: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a version
    ///
    /// # Panics
    ///
    /// If the bead has no content id, if another version with the same
    /// content id is already present, or if the bead belongs to another
    /// name. All three are caller bugs.
    pub fn add(&mut self, bead: impl Into<MetaBead>) {
        let bead = bead.into();
        assert_eq!(bead.name(), self.name, "bead added to the wrong cluster");
        let content_id = bead
            .content_id()
            .map(str::to_string)
            .unwrap_or_else(|| panic!("bead '{}' has no content id", self.name));
        assert!(
            !self.by_content_id.contains_key(&content_id),
            "bead {} is already in cluster '{}'",
            content_id,
            self.name
        );

        // ties go to the later insert
        if bead.head_order() >= self.head.head_order() {
            self.head = bead.clone();
        }
        self.by_content_id.insert(content_id, self.beads.len());
        self.beads.push(bead);
    }

    pub fn head(&self) -> &MetaBead {
        &self.head
    }

    pub fn len(&self) -> usize {
        self.beads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beads.is_empty()
    }

    /// All versions, most recent first; equal freeze times keep insertion order
    pub fn ordered_versions(&self) -> Vec<MetaBead> {
        let mut versions = self.beads.clone();
        versions.sort_by(|a, b| b.freeze_time().cmp(a.freeze_time()));
        versions
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.by_content_id.contains_key(content_id)
    }

    pub fn get(&self, content_id: &str) -> Option<&MetaBead> {
        self.by_content_id.get(content_id).map(|&i| &self.beads[i])
    }
}

/// Clusters keyed by bead name
pub type ClusterIndex = BTreeMap<String, Cluster>;

/// Group beads by name; repeated content ids are kept once
pub fn create_cluster_index<I>(beads: I) -> ClusterIndex
where
    I: IntoIterator<Item = Bead>,
{
    let mut index = ClusterIndex::new();
    for bead in beads {
        let cluster = index
            .entry(bead.name.clone())
            .or_insert_with(|| Cluster::new(bead.name.clone()));
        if !cluster.contains(&bead.content_id) {
            cluster.add(bead);
        }
    }
    index
}
