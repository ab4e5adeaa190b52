//! Numbered version store.
//!
//! A directory of `NNN_label.docx` documents, each with an `NNN_label.md`
//! sidecar holding the text it was rendered from.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use sop_render::{render_to_path, RenderError, RenderMetadata};

/// Author recorded on saved versions when metadata has none.
pub const DEFAULT_AUTHOR: &str = "Writer Agent";

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("version store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("version {0} not found")]
    NotFound(u32),
}

/// One stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub index: u32,
    pub label: String,
    pub docx_path: PathBuf,
    pub text_path: PathBuf,
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{3,})_(.+)\.docx$").expect("version pattern is valid"))
}

/// File-name-safe label.
fn clean_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "draft".to_string()
    } else {
        cleaned
    }
}

/// Directory-backed version store.
#[derive(Debug, Clone)]
pub struct VersionStore {
    dir: PathBuf,
}

impl VersionStore {
    /// Open `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, VersionError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| VersionError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored versions sorted by index.
    pub fn list(&self) -> Result<Vec<VersionEntry>, VersionError> {
        let io_err = |source| VersionError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let name = dir_entry.map_err(io_err)?.file_name();
            let name = name.to_string_lossy();
            let Some(caps) = version_re().captures(&name) else {
                continue;
            };
            let Ok(index) = caps[1].parse::<u32>() else {
                continue;
            };
            let stem = format!("{}_{}", &caps[1], &caps[2]);
            entries.push(VersionEntry {
                index,
                label: caps[2].to_string(),
                docx_path: self.dir.join(format!("{stem}.docx")),
                text_path: self.dir.join(format!("{stem}.md")),
            });
        }
        entries.sort_by_key(|e| e.index);
        Ok(entries)
    }

    /// One past the highest stored index; 1 for an empty store.
    pub fn next_index(&self) -> Result<u32, VersionError> {
        Ok(self.list()?.last().map_or(1, |e| e.index + 1))
    }

    /// Version with `index`.
    pub fn get(&self, index: u32) -> Result<VersionEntry, VersionError> {
        self.list()?
            .into_iter()
            .find(|e| e.index == index)
            .ok_or(VersionError::NotFound(index))
    }

    /// Render `text` as the next version and store its sidecar.
    ///
    /// Metadata `version` and `author` are filled in when absent.
    pub fn save(
        &self,
        text: &str,
        meta: &RenderMetadata,
        label: &str,
    ) -> Result<VersionEntry, VersionError> {
        let index = self.next_index()?;
        let stem = format!("{index:03}_{}", clean_label(label));

        let mut meta = meta.clone();
        meta.version.get_or_insert(index);
        meta.author.get_or_insert_with(|| DEFAULT_AUTHOR.to_string());

        let entry = VersionEntry {
            index,
            label: clean_label(label),
            docx_path: self.dir.join(format!("{stem}.docx")),
            text_path: self.dir.join(format!("{stem}.md")),
        };

        render_to_path(text, &meta, &entry.docx_path)?;
        std::fs::write(&entry.text_path, text).map_err(|source| VersionError::Io {
            path: entry.text_path.clone(),
            source,
        })?;

        tracing::info!(index, path = %entry.docx_path.display(), "saved version");
        Ok(entry)
    }

    /// Text a version was rendered from.
    pub fn read_text(&self, entry: &VersionEntry) -> Result<String, VersionError> {
        std::fs::read_to_string(&entry.text_path).map_err(|source| VersionError::Io {
            path: entry.text_path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::open(dir.path().join("versions")).unwrap();
        assert_eq!(store.next_index().unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_next_index_skips_past_highest() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["001_draft.docx", "007_approved.docx", "notes.txt", "12_bad.docx"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let store = VersionStore::open(dir.path()).unwrap();
        let indices: Vec<u32> = store.list().unwrap().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 7]);
        assert_eq!(store.next_index().unwrap(), 8);
    }

    #[test]
    fn test_save_writes_document_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::open(dir.path()).unwrap();

        let first = store.save("# Scope\nv1", &RenderMetadata::titled("SOP"), "draft").unwrap();
        let second = store.save("# Scope\nv2", &RenderMetadata::titled("SOP"), "approved").unwrap();

        assert_eq!(first.index, 1);
        assert!(first.docx_path.ends_with("001_draft.docx"));
        assert!(second.docx_path.ends_with("002_approved.docx"));
        assert!(second.docx_path.exists());
        assert_eq!(store.read_text(&second).unwrap(), "# Scope\nv2");
        assert_eq!(store.get(1).unwrap(), first);
        assert!(matches!(store.get(9), Err(VersionError::NotFound(9))));
    }

    #[test]
    fn test_labels_are_file_name_safe() {
        assert_eq!(clean_label("needs review/2"), "needs_review_2");
        assert_eq!(clean_label("  "), "draft");
    }
}
