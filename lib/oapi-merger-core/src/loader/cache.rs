use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indexmap::map::Entry;
use jsonptr::resolve::Resolve;
use serde_json::Value;
use tracing::debug;

use crate::{LoadError, RefTarget, SourceFormat};

/// A parsed file, identified by its absolute path.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    path: PathBuf,
    format: SourceFormat,
    content: Value,
}

impl LoadedFile {
    /// Reads and parses a file.
    pub(crate) fn read(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let format = SourceFormat::detect(path, &text);
        let content = format
            .parse(&text)
            .map_err(|message| LoadError::Malformed {
                path: path.to_path_buf(),
                format,
                message,
            })?;
        debug!(path = %path.display(), %format, "file loaded");

        Ok(Self {
            path: path.to_path_buf(),
            format,
            content,
        })
    }

    /// The absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The detected encoding.
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// The parsed content.
    pub fn content(&self) -> &Value {
        &self.content
    }
}

/// Every file reached from the root, parsed once, plus the resolution of each `$ref` string.
///
/// Files are kept in load order.
#[derive(Debug, Clone, Default)]
pub struct FileCache {
    files: IndexMap<PathBuf, LoadedFile>,
    links: HashMap<PathBuf, HashMap<String, RefTarget>>,
}

impl FileCache {
    /// Finds a loaded file.
    pub fn get(&self, path: &Path) -> Option<&LoadedFile> {
        self.files.get(path)
    }

    /// The loaded files, in load order.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedFile> {
        self.files.values()
    }

    /// The number of loaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` when nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Finds the object a target denotes.
    pub fn resolve(&self, target: &RefTarget) -> Option<&Value> {
        let file = self.files.get(target.file())?;
        file.content.resolve(target.pointer()).ok()
    }

    /// The target a `$ref` string read from `file` was resolved to while loading.
    pub fn target_of(&self, file: &Path, reference: &str) -> Option<&RefTarget> {
        self.links.get(file)?.get(reference)
    }

    /// Returns the cached file, reading it on first use.
    pub(crate) fn load(&mut self, path: &Path) -> Result<&LoadedFile, LoadError> {
        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = LoadedFile::read(path)?;
                Ok(entry.insert(file))
            }
        }
    }

    pub(crate) fn link(&mut self, file: &Path, reference: &str, target: RefTarget) {
        self.links
            .entry(file.to_path_buf())
            .or_default()
            .insert(reference.to_string(), target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonptr::PointerBuf;
    use serde_json::json;

    fn cache_with(path: &str, content: Value) -> FileCache {
        let mut cache = FileCache::default();
        cache.files.insert(
            PathBuf::from(path),
            LoadedFile {
                path: PathBuf::from(path),
                format: SourceFormat::Yaml,
                content,
            },
        );
        cache
    }

    #[test]
    fn should_resolve_target_in_loaded_file() {
        let cache = cache_with("/api/common.yaml", json!({"Error": {"type": "object"}}));

        let target = RefTarget::new("/api/common.yaml", PointerBuf::from_tokens(["Error"]));
        assert_eq!(cache.resolve(&target), Some(&json!({"type": "object"})));

        let missing = RefTarget::new("/api/common.yaml", PointerBuf::from_tokens(["Nope"]));
        assert_eq!(cache.resolve(&missing), None);

        let unknown = RefTarget::new("/api/other.yaml", PointerBuf::new());
        assert_eq!(cache.resolve(&unknown), None);
    }

    #[test]
    fn should_remember_links_per_file() {
        let mut cache = cache_with("/api/openapi.yaml", json!({}));
        let target = RefTarget::new("/api/common.yaml", PointerBuf::new());

        cache.link(Path::new("/api/openapi.yaml"), "./common.yaml", target.clone());

        assert_eq!(
            cache.target_of(Path::new("/api/openapi.yaml"), "./common.yaml"),
            Some(&target)
        );
        assert_eq!(cache.target_of(Path::new("/api/common.yaml"), "./common.yaml"), None);
    }

    #[test]
    fn should_report_missing_file() {
        let mut cache = FileCache::default();

        let result = cache.load(Path::new("/definitely/not/here.yaml"));

        assert!(matches!(result, Err(LoadError::Unreadable { .. })));
        assert!(cache.is_empty());
    }
}
