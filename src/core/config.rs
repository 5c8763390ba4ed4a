//! Box configuration
//!
//! Boxes are configured in a TOML file:
//!
//! ```toml
//! [[boxes]]
//! name = "main"
//! directory = "/data/beads"
//! ```
//!
//! The loaded [`Config`] builds a [`BoxRegistry`], which is the context
//! object handed to resolvers and commands.

use crate::bead_box::{BeadBox, DirectoryBox};
use crate::error::{BeadError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "BEAD_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxConfig {
    pub name: String,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub boxes: Vec<BoxConfig>,
}

impl Config {
    /// `$BEAD_CONFIG`, else `$HOME/.config/bead/boxes.toml`
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("bead").join("boxes.toml"))
    }

    /// Load from `path`; a missing file is an empty configuration
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {:?}, starting empty", path);
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Register an existing directory as a box
    pub fn add_box<P: AsRef<Path>>(&mut self, name: &str, directory: P) -> Result<()> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(BeadError::Config(format!("{:?} is not a directory", directory)));
        }
        let directory = directory.canonicalize()?;

        if self.boxes.iter().any(|b| b.name == name) {
            return Err(BeadError::Config(format!("box '{}' already exists", name)));
        }
        if let Some(existing) = self.boxes.iter().find(|b| b.directory == directory) {
            return Err(BeadError::Config(format!(
                "{:?} is already registered as box '{}'",
                directory, existing.name
            )));
        }

        info!("Added box '{}' at {:?}", name, directory);
        self.boxes.push(BoxConfig {
            name: name.to_string(),
            directory,
        });
        Ok(())
    }

    /// Remove a box by name; true if it was configured
    pub fn forget_box(&mut self, name: &str) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|b| b.name != name);
        self.boxes.len() != before
    }

    pub fn registry(&self) -> BoxRegistry {
        let mut registry = BoxRegistry::new();
        for b in &self.boxes {
            registry.register(Box::new(DirectoryBox::new(b.name.clone(), &b.directory)));
        }
        registry
    }
}

/// Configured boxes, by name, in configuration order
#[derive(Default)]
pub struct BoxRegistry {
    boxes: Vec<Box<dyn BeadBox>>,
}

impl BoxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bead_box: Box<dyn BeadBox>) {
        self.boxes.push(bead_box);
    }

    pub fn get(&self, name: &str) -> Option<&dyn BeadBox> {
        self.iter().find(|b| b.name() == name)
    }

    /// Box `name`, or a configuration error naming it
    pub fn require(&self, name: &str) -> Result<&dyn BeadBox> {
        self.get(name)
            .ok_or_else(|| BeadError::Config(format!("unknown box '{}'", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BeadBox> + '_ {
        self.boxes.iter().map(|b| b.as_ref() as &dyn BeadBox)
    }

    /// The box to use when none is named: the only one configured
    pub fn only_box(&self) -> Option<&dyn BeadBox> {
        match self.boxes.as_slice() {
            [only] => Some(only.as_ref()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl std::fmt::Debug for BoxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|b| (b.name().to_string(), b.location())))
            .finish()
    }
}
