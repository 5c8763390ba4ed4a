//! Storage independent bead descriptors

use crate::meta::Input;
use crate::timestamp::FreezeTime;

/// Kind reported by the placeholder head of a cluster without versions
pub const PHANTOM_KIND: &str = "EMPTY CLUSTER";

/// Lightweight descriptor of a stored bead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bead {
    pub bead_uuid: String,
    pub name: String,
    pub content_id: String,
    pub freeze_time: FreezeTime,
    pub kind: String,
    /// Box the bead was found in (empty when not stored in a box)
    pub box_name: String,
    pub inputs: Vec<Input>,
}

/// A bead known only by reference (e.g. an input whose archive is not available)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhantomBead {
    pub name: String,
    pub kind: String,
    pub content_id: Option<String>,
    pub freeze_time: FreezeTime,
}

impl PhantomBead {
    /// Placeholder for a name with no versions at all
    pub fn empty_cluster(name: impl Into<String>) -> Self {
        PhantomBead {
            name: name.into(),
            kind: PHANTOM_KIND.to_string(),
            content_id: None,
            freeze_time: FreezeTime::epoch(),
        }
    }
}

/// A bead as seen by clusters and the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaBead {
    Real(Bead),
    Phantom(PhantomBead),
}

impl MetaBead {
    pub fn name(&self) -> &str {
        match self {
            MetaBead::Real(bead) => &bead.name,
            MetaBead::Phantom(phantom) => &phantom.name,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            MetaBead::Real(bead) => &bead.kind,
            MetaBead::Phantom(phantom) => &phantom.kind,
        }
    }

    pub fn content_id(&self) -> Option<&str> {
        match self {
            MetaBead::Real(bead) => Some(&bead.content_id),
            MetaBead::Phantom(phantom) => phantom.content_id.as_deref(),
        }
    }

    pub fn freeze_time(&self) -> &FreezeTime {
        match self {
            MetaBead::Real(bead) => &bead.freeze_time,
            MetaBead::Phantom(phantom) => &phantom.freeze_time,
        }
    }

    pub fn is_phantom(&self) -> bool {
        matches!(self, MetaBead::Phantom(_))
    }

    pub fn as_real(&self) -> Option<&Bead> {
        match self {
            MetaBead::Real(bead) => Some(bead),
            MetaBead::Phantom(_) => None,
        }
    }

    pub fn into_real(self) -> Option<Bead> {
        match self {
            MetaBead::Real(bead) => Some(bead),
            MetaBead::Phantom(_) => None,
        }
    }

    /// Key the cluster head is chosen by: real beads outrank phantoms,
    /// then later freeze times win.
    pub fn head_order(&self) -> (bool, &FreezeTime) {
        (!self.is_phantom(), self.freeze_time())
    }
}

impl From<Bead> for MetaBead {
    fn from(bead: Bead) -> Self {
        MetaBead::Real(bead)
    }
}

impl From<PhantomBead> for MetaBead {
    fn from(phantom: PhantomBead) -> Self {
        MetaBead::Phantom(phantom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(freeze_time: &str) -> MetaBead {
        MetaBead::Real(Bead {
            bead_uuid: "uuid".to_string(),
            name: "bead".to_string(),
            content_id: format!("id-{}", freeze_time),
            freeze_time: FreezeTime::new(freeze_time),
            kind: "kind".to_string(),
            box_name: String::new(),
            inputs: Vec::new(),
        })
    }

    #[test]
    fn test_real_outranks_any_phantom() {
        let old_real = real("19990101T000000000000+0000");
        let future_phantom = MetaBead::Phantom(PhantomBead {
            name: "bead".to_string(),
            kind: "kind".to_string(),
            content_id: Some("x".to_string()),
            freeze_time: FreezeTime::new("29990101T000000000000+0000"),
        });
        assert!(old_real.head_order() > future_phantom.head_order());
    }

    #[test]
    fn test_empty_cluster_placeholder() {
        let phantom = MetaBead::from(PhantomBead::empty_cluster("nothing"));
        assert!(phantom.is_phantom());
        assert_eq!(phantom.kind(), PHANTOM_KIND);
        assert_eq!(phantom.content_id(), None);
        assert_eq!(phantom.name(), "nothing");
        assert!(phantom.as_real().is_none());
    }
}
