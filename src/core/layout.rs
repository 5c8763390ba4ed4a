//! Persisted layout of archives and workspaces
//!
//! These paths are part of the archive format: existing archives are only
//! readable if they stay byte-for-byte identical.

/// Entry paths inside a bead archive
pub mod archive {
    pub const META: &str = "meta";
    pub const CODE: &str = "code";
    pub const DATA: &str = "data";
    pub const BEAD_META: &str = "meta/bead";
    pub const MANIFEST: &str = "meta/manifest";
    pub const INPUT_MAP: &str = "meta/input.map";

    pub const CODE_PREFIX: &str = "code/";
    pub const DATA_PREFIX: &str = "data/";

    /// True for entries the manifest must account for
    pub fn is_tracked(entry: &str) -> bool {
        entry.starts_with(CODE_PREFIX) || entry.starts_with(DATA_PREFIX)
    }
}

/// Paths relative to a workspace root
pub mod workspace {
    pub const INPUT: &str = "input";
    pub const OUTPUT: &str = "output";
    pub const TEMP: &str = "temp";
    pub const META: &str = ".bead-meta";
    pub const BEAD_META: &str = ".bead-meta/bead";
    pub const INPUT_MAP: &str = ".bead-meta/input.map";

    /// Top level names that are never packed as code
    pub const NOT_CODE: [&str; 4] = [INPUT, OUTPUT, TEMP, META];
}
