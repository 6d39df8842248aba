//! Loading a multi-file OpenAPI document.
//!
//! The [`Loader`] parses the root file, then follows every reference found by the
//! structural walk, loading each referenced file once. A successful load guarantees
//! that every reference of the graph resolves: nothing is left to load later.

mod cache;

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use jsonptr::PointerBuf;
use jsonptr::resolve::Resolve;
use tracing::{debug, trace};

pub use self::cache::{FileCache, LoadedFile};

use crate::reference::{RawReference, RawReferenceError};
use crate::visit::{NodeKind, ref_sites};
use crate::{Document, LoadError, RefTarget};

/// Loads a root document and every file it transitively references.
///
/// # Example
///
/// ```rust,no_run
/// use oapi_merger_core::Loader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut loader = Loader::new();
/// let document = loader.load("api/openapi.yaml")?;
///
/// println!("{} file(s) loaded for {}", loader.files().len(), document.path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Loader {
    files: FileCache,
}

impl Loader {
    /// Creates a loader with an empty file cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The files loaded so far.
    pub fn files(&self) -> &FileCache {
        &self.files
    }

    /// Consumes the loader, keeping its files.
    pub fn into_files(self) -> FileCache {
        self.files
    }

    /// Loads the root document and the files it references.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when a file is missing, unreadable or malformed,
    /// when a reference is invalid or remote, or when a pointer does not resolve.
    pub fn load(&mut self, root: impl AsRef<Path>) -> Result<Document, LoadError> {
        let root = canonical_path(root.as_ref())?;
        let content = self.files.load(&root)?.content().clone();

        let mut visited = HashSet::new();
        let mut pending = VecDeque::from([(root.clone(), PointerBuf::new(), NodeKind::Document)]);

        while let Some((file, pointer, kind)) = pending.pop_front() {
            let sites = self
                .files
                .get(&file)
                .and_then(|loaded| loaded.content().resolve(&pointer).ok())
                .map(|value| ref_sites(value, kind))
                .unwrap_or_default();

            for site in sites {
                let target = self.resolve_reference(&file, &site.reference)?;
                trace!(from = %file.display(), reference = %site.reference, %target, "reference resolved");

                // the root is walked as a whole from the document node
                if target.file() == root.as_path() {
                    continue;
                }
                // a target is walked once per kind it is used as
                if visited.insert((target.clone(), site.kind)) {
                    pending.push_back((
                        target.file().to_path_buf(),
                        target.pointer().to_buf(),
                        site.kind,
                    ));
                }
            }
        }

        debug!(root = %root.display(), files = self.files.len(), "document loaded");
        Ok(Document::new(root, content))
    }

    fn resolve_reference(&mut self, file: &Path, reference: &str) -> Result<RefTarget, LoadError> {
        if let Some(target) = self.files.target_of(file, reference) {
            return Ok(target.clone());
        }

        let raw = RawReference::parse(reference).map_err(|err| match err {
            RawReferenceError::Remote => LoadError::RemoteReference {
                reference: reference.to_string(),
                file: file.to_path_buf(),
            },
            RawReferenceError::Invalid(reason) => LoadError::InvalidReference {
                reference: reference.to_string(),
                file: file.to_path_buf(),
                reason,
            },
        })?;

        let target_file = match &raw.file {
            None => file.to_path_buf(),
            Some(relative) => {
                let base = file.parent().unwrap_or_else(|| Path::new(""));
                canonical_path(&base.join(relative))?
            }
        };

        let loaded = self.files.load(&target_file)?;
        if loaded.content().resolve(&raw.pointer).is_err() {
            return Err(LoadError::UnresolvedPointer {
                reference: reference.to_string(),
                target: target_file,
                pointer: raw.pointer.to_string(),
            });
        }

        let target = RefTarget::new(target_file, raw.pointer);
        self.files.link(file, reference, target.clone());
        Ok(target)
    }
}

fn canonical_path(path: &Path) -> Result<PathBuf, LoadError> {
    fs::canonicalize(path).map_err(|source| LoadError::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a root document with a fresh [`Loader`], returning the document and the loaded files.
///
/// # Errors
///
/// See [`Loader::load`].
pub fn load(root: impl AsRef<Path>) -> Result<(Document, FileCache), LoadError> {
    let mut loader = Loader::new();
    let document = loader.load(root)?;
    Ok((document, loader.into_files()))
}
