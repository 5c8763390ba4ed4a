//! Textual bead references: `NAME[@[TIMESTAMP][OFFSET]]`
//!
//! | reference        | meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `name`           | cluster head                                         |
//! | `name@`          | most recent real version                             |
//! | `name@TS`        | version frozen exactly at `TS`                       |
//! | `name@-2`        | two versions before the most recent                  |
//! | `name@TS-1`      | one version before the one current as of `TS`        |
//!
//! The offset magnitude is a distance into the past; its sign carries no
//! meaning, `name@+1` and `name@-1` name the same version. Only a
//! timestamp can carry an offset; other text after `@` must match a freeze
//! time exactly.

use crate::error::{BeadError, Result};
use crate::timestamp::{self, FreezeTime};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which version of a name a reference selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// No `@`: the cluster head, which is a phantom for an empty cluster
    Head,
    /// `@` alone
    Latest,
    /// `@TS`
    Exact(FreezeTime),
    /// `@N`: position in the most-recent-first version list
    Offset(usize),
    /// `@TS N`: positions before the version current as of `anchor`
    Relative { anchor: FreezeTime, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeadReference {
    pub name: String,
    pub version: VersionSpec,
}

fn offset_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]\d+$").expect("valid offset regex"))
}

fn timestamp_with_offset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{8}T\d{12}[+-]\d{4})([+-]\d+)?$").expect("valid timestamp regex")
    })
}

fn anything_with_offset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)([+-]\d+)?$").expect("valid reference regex"))
}

impl BeadReference {
    pub fn parse(reference: &str) -> Result<Self> {
        let (name, version) = match reference.split_once('@') {
            None => (reference, VersionSpec::Head),
            Some((name, rest)) => (name, parse_version(reference, rest)?),
        };
        if name.is_empty() {
            return Err(BeadError::InvalidReference(format!(
                "'{}' has no bead name",
                reference
            )));
        }
        Ok(BeadReference {
            name: name.to_string(),
            version,
        })
    }
}

fn parse_version(reference: &str, rest: &str) -> Result<VersionSpec> {
    if rest.is_empty() {
        return Ok(VersionSpec::Latest);
    }
    if offset_only().is_match(rest) {
        return Ok(VersionSpec::Offset(parse_offset(reference, rest)?));
    }

    // A well-formed timestamp ends in a UTC offset, which must not be
    // mistaken for a version offset.
    let captures = timestamp_with_offset()
        .captures(rest)
        .or_else(|| anything_with_offset().captures(rest))
        .ok_or_else(|| BeadError::InvalidReference(reference.to_string()))?;
    let anchor = captures.get(1).map_or("", |m| m.as_str());

    match captures.get(2) {
        // only a real timestamp can anchor an offset
        Some(offset) if timestamp::parse(anchor).is_some() => Ok(VersionSpec::Relative {
            anchor: FreezeTime::new(anchor),
            offset: parse_offset(reference, offset.as_str())?,
        }),
        _ => Ok(VersionSpec::Exact(FreezeTime::new(rest))),
    }
}

fn parse_offset(reference: &str, offset: &str) -> Result<usize> {
    offset
        .trim_start_matches(['+', '-'])
        .parse()
        .map_err(|_| BeadError::InvalidReference(format!("offset in '{}' is too large", reference)))
}

impl FromStr for BeadReference {
    type Err = BeadError;

    fn from_str(s: &str) -> Result<Self> {
        BeadReference::parse(s)
    }
}

impl fmt::Display for BeadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            VersionSpec::Head => write!(f, "{}", self.name),
            VersionSpec::Latest => write!(f, "{}@", self.name),
            VersionSpec::Exact(ts) => write!(f, "{}@{}", self.name, ts),
            VersionSpec::Offset(n) => write!(f, "{}@-{}", self.name, n),
            VersionSpec::Relative { anchor, offset } => {
                write!(f, "{}@{}-{}", self.name, anchor, offset)
            }
        }
    }
}
