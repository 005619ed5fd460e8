//! Per-folder metadata file: child order and child expansion flags.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the hidden metadata file kept in every opened folder.
pub const META_FILE_NAME: &str = ".nbtree.json";
/// Current metadata format version.
pub const META_VERSION: u32 = 1;

/// One child folder entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubDirMeta {
    pub name: String,
    #[serde(default)]
    pub expanded: bool,
}

/// Contents of a folder's metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirMeta {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub sub_directories: Vec<SubDirMeta>,
}

impl DirMeta {
    /// Read the metadata file of `dir`. Returns `None` if the file doesn't
    /// exist or can't be parsed (with a warning logged).
    pub fn load(dir: &Path) -> Option<DirMeta> {
        let path = dir.join(META_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return None,
        };
        match serde_json::from_str::<DirMeta>(&content) {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("Ignoring malformed folder metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the metadata file of `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(META_FILE_NAME), content)?;
        Ok(())
    }

    /// Combine persisted entries with the folders actually on disk.
    ///
    /// Persisted entries that still exist keep their order and flags; folders
    /// only found on disk are appended in the order given (already sorted).
    pub fn merge_with_disk(meta: Option<&DirMeta>, on_disk: Vec<String>) -> Vec<SubDirMeta> {
        let present: HashSet<&str> = on_disk.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(on_disk.len());

        if let Some(meta) = meta {
            for sub in &meta.sub_directories {
                if present.contains(sub.name.as_str()) && seen.insert(sub.name.clone()) {
                    merged.push(sub.clone());
                }
            }
        }

        for name in on_disk {
            if !seen.contains(&name) {
                seen.insert(name.clone());
                merged.push(SubDirMeta {
                    name,
                    expanded: false,
                });
            }
        }
        merged
    }
}
