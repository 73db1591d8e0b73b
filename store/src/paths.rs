//! On-disk layout (§6): deterministic paths for the ledger, event files, and
//! indices beneath a store's root directory.

use dcb_core::tag::Tag;
use std::path::{Path, PathBuf};

/// Resolves every path the store touches beneath `<root>/<store-name>/`.
#[derive(Clone, Debug)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Build a layout rooted at `root_path/store_name`.
    #[must_use]
    pub fn new(root_path: &Path, store_name: &str) -> Self {
        Self {
            root: root_path.join(store_name),
        }
    }

    /// The store's root directory (`<root>/<store-name>/`).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The ledger file, `.ledger`.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(".ledger")
    }

    /// The directory holding one file per event.
    #[must_use]
    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    /// The path for the event at `position`, zero-padded for stable
    /// lexicographic ordering on directory listing.
    #[must_use]
    pub fn event_path(&self, position: u64) -> PathBuf {
        self.events_dir().join(format!("{position:020}.json"))
    }

    /// The directory holding event-type index files.
    #[must_use]
    pub fn event_type_index_dir(&self) -> PathBuf {
        self.root.join("indices").join("event-type")
    }

    /// The index file for a given event type.
    #[must_use]
    pub fn event_type_index_path(&self, event_type: &str) -> PathBuf {
        self.event_type_index_dir()
            .join(format!("{}.json", escape_path_component(event_type)))
    }

    /// The directory holding tag index files.
    #[must_use]
    pub fn tag_index_dir(&self) -> PathBuf {
        self.root.join("indices").join("tags")
    }

    /// The index file for a given tag.
    #[must_use]
    pub fn tag_index_path(&self, tag: &Tag) -> PathBuf {
        self.tag_index_dir()
            .join(format!("{}.json", tag.index_file_stem()))
    }

    /// The root directory under which every registered projection stores its
    /// keyed state, tag indices, metadata, and checkpoint.
    #[must_use]
    pub fn projections_dir(&self) -> PathBuf {
        self.root.join("projections")
    }
}

/// Percent-escape everything but `[A-Za-z0-9-]` so the result is safe to use
/// verbatim as a single path component (mirrors `Tag::index_file_stem`'s
/// escaping, applied here to event-type names instead of tag pairs).
#[must_use]
pub fn escape_path_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_path_is_zero_padded() {
        let layout = StoreLayout::new(Path::new("/tmp"), "s");
        assert_eq!(
            layout.event_path(42).file_name().unwrap().to_str().unwrap(),
            "00000000000000000042.json"
        );
    }

    #[test]
    fn event_type_index_path_escapes_slashes() {
        let layout = StoreLayout::new(Path::new("/tmp"), "s");
        let path = layout.event_type_index_path("Order/Placed");
        assert!(!path.file_name().unwrap().to_str().unwrap().contains('/'));
    }

    #[test]
    fn tag_index_path_uses_tag_stem() {
        let layout = StoreLayout::new(Path::new("/tmp"), "s");
        let tag = Tag::new("tier", "premium").unwrap();
        let path = layout.tag_index_path(&tag);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "tier_premium.json"
        );
    }
}
