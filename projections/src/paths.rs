//! On-disk layout for one registered projection (§6):
//!
//! ```text
//! <store-root>/projections/<proj-name>/
//!   <key>.json                  # projection state file
//!   indices/<key>_<value>.json  # projection tag index (lowercased)
//!   metadata/index.json         # per-key { created, updated, version, size }
//!   checkpoint.json             # { name, last_processed_position, updated, total }
//! ```

use std::path::{Path, PathBuf};

/// Resolves every path one projection's store touches.
#[derive(Clone, Debug)]
pub struct ProjectionLayout {
    root: PathBuf,
}

impl ProjectionLayout {
    /// Build a layout for `projection_name` under `projections_root`
    /// (typically `dcb_store::StoreLayout::projections_dir()`).
    #[must_use]
    pub fn new(projections_root: &Path, projection_name: &str) -> Self {
        Self {
            root: projections_root.join(projection_name),
        }
    }

    /// This projection's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The state file for `key`.
    #[must_use]
    pub fn state_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", escape_path_component(key)))
    }

    /// The directory holding this projection's tag indices.
    #[must_use]
    pub fn indices_dir(&self) -> PathBuf {
        self.root.join("indices")
    }

    /// The index file for a lowercased `(key, value)` tag pair.
    #[must_use]
    pub fn tag_index_path(&self, lowercase_key: &str, lowercase_value: &str) -> PathBuf {
        self.indices_dir().join(format!(
            "{}_{}.json",
            escape_path_component(lowercase_key),
            escape_path_component(lowercase_value)
        ))
    }

    /// The metadata directory.
    #[must_use]
    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    /// The single metadata index file for this projection.
    #[must_use]
    pub fn metadata_index_path(&self) -> PathBuf {
        self.metadata_dir().join("index.json")
    }

    /// The checkpoint file for this projection.
    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.root.join("checkpoint.json")
    }
}

fn escape_path_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
