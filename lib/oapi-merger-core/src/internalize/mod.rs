//! Turning external references into local components.
//!
//! The [`Internalizer`] walks the loaded document with a worklist. Each external
//! reference is hoisted into the component registry under a fresh name, and the
//! reference is rewritten to the local pointer. Hoisted bodies are queued and walked
//! in turn, with their own file as the base for relative references, until no
//! external reference is left.
//!
//! Targets are identified by their canonical (file, pointer) pair. A target already
//! hoisted is never hoisted again: a second path to it (diamond) or a path back to
//! it (cycle) is rewritten to the name it already has.

mod naming;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use jsonptr::resolve::ResolveMut;
use jsonptr::{Pointer, PointerBuf};
use serde_json::Value;
use tracing::{debug, trace, warn};

use self::naming::NameAllocator;
use crate::reference::local_reference;
use crate::visit::{NodeKind, ref_sites};
use crate::{ComponentKind, Document, FileCache, InternalizeError, RefTarget};

/// What an internalization run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Objects copied into the component registry.
    pub hoisted: usize,
    /// Path items copied in place of their reference.
    pub inlined: usize,
    /// `$ref` strings rewritten to local pointers.
    pub rewritten: usize,
}

impl Summary {
    /// Returns `true` when the document was left untouched.
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// Where a target was internalized, and as what.
#[derive(Debug, Clone)]
struct Assigned {
    pointer: PointerBuf,
    category: ComponentKind,
}

/// A subtree of the root document waiting to be walked.
#[derive(Debug)]
struct Job {
    location: PointerBuf,
    kind: NodeKind,
    /// The file relative references of the subtree are resolved against.
    origin: PathBuf,
    /// Path items inlined on the way to this subtree.
    inlined: Vec<RefTarget>,
}

/// Internalizes the external references of a [`Document`].
///
/// # Example
///
/// ```rust,no_run
/// use oapi_merger_core::{Internalizer, Loader};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut loader = Loader::new();
/// let mut document = loader.load("api/openapi.yaml")?;
///
/// let summary = Internalizer::new(loader.files()).internalize(&mut document)?;
/// println!("{} component(s) hoisted", summary.hoisted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Internalizer<'f> {
    files: &'f FileCache,
    /// Every target already internalized, with its local pointer.
    assigned: IndexMap<RefTarget, Assigned>,
    pending: VecDeque<Job>,
    summary: Summary,
}

impl<'f> Internalizer<'f> {
    /// Creates an internalizer reading through the loaded files.
    pub fn new(files: &'f FileCache) -> Self {
        Self {
            files,
            assigned: IndexMap::new(),
            pending: VecDeque::new(),
            summary: Summary::default(),
        }
    }

    /// Rewrites every external reference of the document to a local one.
    ///
    /// The component registry only grows: existing components keep their names,
    /// and local references already in the root document are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an [`InternalizeError`] when the document refers to something the
    /// loader did not resolve, or when no free name is found for a component.
    pub fn internalize(mut self, document: &mut Document) -> Result<Summary, InternalizeError> {
        let mut names = NameAllocator::from_document(document);
        let root = document.path().to_path_buf();

        // registry entries that are references keep their name
        let (slots, sites): (Vec<_>, Vec<_>) = ref_sites(document.root(), NodeKind::Document)
            .into_iter()
            .partition(|site| registry_slot(&site.pointer).is_some());

        for site in slots {
            self.adopt_slot(document, &site.pointer, site.kind, &site.reference)?;
        }
        for site in sites {
            self.visit_site(
                document,
                &mut names,
                &site.pointer,
                site.kind,
                &site.reference,
                &root,
                &[],
            )?;
        }

        while let Some(job) = self.pending.pop_front() {
            self.run(document, &mut names, &job)?;
        }

        debug!(
            hoisted = self.summary.hoisted,
            inlined = self.summary.inlined,
            rewritten = self.summary.rewritten,
            "references internalized"
        );
        Ok(self.summary)
    }

    fn run(
        &mut self,
        document: &mut Document,
        names: &mut NameAllocator,
        job: &Job,
    ) -> Result<(), InternalizeError> {
        let value = document
            .resolve(&job.location)
            .ok_or_else(|| InternalizeError::MissingLocation {
                location: job.location.to_string(),
            })?;

        for site in ref_sites(value, job.kind) {
            let location = job.location.concat(&site.pointer);
            self.visit_site(
                document,
                names,
                &location,
                site.kind,
                &site.reference,
                &job.origin,
                &job.inlined,
            )?;
        }
        Ok(())
    }

    /// Inlines the target of a registry entry that is itself an external reference.
    fn adopt_slot(
        &mut self,
        document: &mut Document,
        slot: &Pointer,
        kind: NodeKind,
        reference: &str,
    ) -> Result<(), InternalizeError> {
        let root = document.path().to_path_buf();
        let target = self.target_of(&root, reference)?;

        if target.file() == root.as_path() {
            return self.rewrite_root_reference(document, slot, reference, &root, &target);
        }
        if let Some(local) = self.local_pointer(&target, kind)? {
            return self.rewrite(document, slot, &local);
        }
        let Some(category) = kind.category() else {
            return Ok(());
        };

        let content = self.content_of(&target)?;
        *node_mut(document, slot)? = content;
        debug!(%target, slot = %slot, "registry entry inlined");
        self.summary.hoisted += 1;
        self.assigned.insert(
            target.clone(),
            Assigned {
                pointer: slot.to_buf(),
                category,
            },
        );
        self.pending.push_back(Job {
            location: slot.to_buf(),
            kind,
            origin: target.file().to_path_buf(),
            inlined: Vec::new(),
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_site(
        &mut self,
        document: &mut Document,
        names: &mut NameAllocator,
        location: &Pointer,
        kind: NodeKind,
        reference: &str,
        origin: &Path,
        inlined: &[RefTarget],
    ) -> Result<(), InternalizeError> {
        let target = self.target_of(origin, reference)?;

        if target.file() == document.path() {
            return self.rewrite_root_reference(document, location, reference, origin, &target);
        }
        if let Some(local) = self.local_pointer(&target, kind)? {
            return self.rewrite(document, location, &local);
        }

        let content = self.content_of(&target)?;
        let Some(category) = kind.category() else {
            return self.inline(document, location, kind, target, content, inlined);
        };

        let name = names.allocate(category, &target.suggested_name())?;
        let pointer = category.pointer(&name);
        debug!(%target, %category, %name, "component hoisted");

        let previous = document.insert_component(category, &name, content);
        debug_assert!(previous.is_none(), "allocated names are free");
        self.summary.hoisted += 1;
        self.rewrite(document, location, &local_reference(&pointer))?;

        self.pending.push_back(Job {
            location: pointer.clone(),
            kind,
            origin: target.file().to_path_buf(),
            inlined: Vec::new(),
        });
        self.assigned.insert(target, Assigned { pointer, category });
        Ok(())
    }

    /// Replaces a reference without a registry category (path items) by its target.
    fn inline(
        &mut self,
        document: &mut Document,
        location: &Pointer,
        kind: NodeKind,
        target: RefTarget,
        content: Value,
        inlined: &[RefTarget],
    ) -> Result<(), InternalizeError> {
        if inlined.contains(&target) {
            return Err(InternalizeError::CircularInline {
                target: target.to_string(),
            });
        }

        *node_mut(document, location)? = content;
        debug!(%target, location = %location, "path item inlined");
        self.summary.inlined += 1;

        let mut chain = inlined.to_vec();
        let origin = target.file().to_path_buf();
        chain.push(target);
        self.pending.push_back(Job {
            location: location.to_buf(),
            kind,
            origin,
            inlined: chain,
        });
        Ok(())
    }

    /// The local reference of a target already internalized.
    ///
    /// A target is internalized once, into one category: reaching it again as
    /// another kind of object is an error.
    fn local_pointer(
        &self,
        target: &RefTarget,
        kind: NodeKind,
    ) -> Result<Option<String>, InternalizeError> {
        let Some(assigned) = self.assigned.get(target) else {
            return Ok(None);
        };
        if kind.category() != Some(assigned.category) {
            return Err(InternalizeError::KindMismatch {
                target: target.to_string(),
                assigned: assigned.pointer.to_string(),
                found: kind,
            });
        }
        Ok(Some(local_reference(&assigned.pointer)))
    }

    /// A reference into the root document becomes a plain local pointer, without copying.
    ///
    /// Local references written in the root document itself are kept as written.
    fn rewrite_root_reference(
        &mut self,
        document: &mut Document,
        location: &Pointer,
        reference: &str,
        origin: &Path,
        target: &RefTarget,
    ) -> Result<(), InternalizeError> {
        if origin == document.path() && reference.starts_with('#') {
            return Ok(());
        }
        let local = local_reference(target.pointer());
        if local == reference {
            return Ok(());
        }
        self.rewrite(document, location, &local)
    }

    fn rewrite(
        &mut self,
        document: &mut Document,
        location: &Pointer,
        reference: &str,
    ) -> Result<(), InternalizeError> {
        let node = node_mut(document, location)?;
        let Some(object) = node.as_object_mut() else {
            return Err(InternalizeError::MissingLocation {
                location: location.to_string(),
            });
        };
        if object.len() > 1 {
            warn!(location = %location, "siblings of $ref are ignored");
        }
        trace!(location = %location, %reference, "reference rewritten");
        object.insert("$ref".to_string(), Value::String(reference.to_string()));
        self.summary.rewritten += 1;
        Ok(())
    }

    fn target_of(&self, origin: &Path, reference: &str) -> Result<RefTarget, InternalizeError> {
        self.files
            .target_of(origin, reference)
            .cloned()
            .ok_or_else(|| InternalizeError::UnresolvedReference {
                reference: reference.to_string(),
                file: origin.to_path_buf(),
            })
    }

    fn content_of(&self, target: &RefTarget) -> Result<Value, InternalizeError> {
        self.files
            .resolve(target)
            .cloned()
            .ok_or_else(|| InternalizeError::MissingTarget {
                target: target.to_string(),
            })
    }
}

fn node_mut<'d>(
    document: &'d mut Document,
    location: &Pointer,
) -> Result<&'d mut Value, InternalizeError> {
    document
        .root_mut()
        .resolve_mut(location)
        .map_err(|_| InternalizeError::MissingLocation {
            location: location.to_string(),
        })
}

/// Returns the category and name when the pointer is `/components/{category}/{name}`.
fn registry_slot(pointer: &Pointer) -> Option<(ComponentKind, String)> {
    let mut tokens = pointer.tokens();
    let (Some(first), Some(category), Some(name), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return None;
    };
    if first.decoded() != "components" {
        return None;
    }
    let kind = ComponentKind::from_key(&category.decoded())?;
    Some((kind, name.decoded().into_owned()))
}

/// Internalizes a document with the files its loader read.
///
/// # Errors
///
/// See [`Internalizer::internalize`].
pub fn internalize(document: &mut Document, files: &FileCache) -> Result<Summary, InternalizeError> {
    Internalizer::new(files).internalize(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/components/schemas/Error", Some((ComponentKind::Schemas, "Error")))]
    #[case("/components/requestBodies/a~1b", Some((ComponentKind::RequestBodies, "a/b")))]
    #[case("/components/schemas/Error/properties", None)]
    #[case("/components/pathItems/Users", None)]
    #[case("/paths/~1users/get", None)]
    fn should_detect_registry_slot(
        #[case] pointer: &str,
        #[case] expected: Option<(ComponentKind, &str)>,
    ) {
        let pointer = Pointer::parse(pointer).expect("valid pointer");

        let slot = registry_slot(pointer);

        assert_eq!(
            slot,
            expected.map(|(kind, name)| (kind, name.to_string()))
        );
    }

    #[test]
    fn should_report_unresolved_reference() {
        let files = FileCache::default();
        let mut document = Document::new(
            "/api/openapi.yaml",
            serde_json::json!({
                "paths": {"/users": {"get": {"responses": {"200": {"$ref": "responses.yaml"}}}}}
            }),
        );

        let result = internalize(&mut document, &files);

        assert!(matches!(
            result,
            Err(InternalizeError::UnresolvedReference { ref reference, .. }) if reference == "responses.yaml"
        ));
    }

    #[test]
    fn should_leave_document_without_references_unchanged() {
        let files = FileCache::default();
        let content = serde_json::json!({
            "openapi": "3.0.3",
            "paths": {"/users": {"get": {"responses": {"200": {"description": "ok"}}}}}
        });
        let mut document = Document::new("/api/openapi.yaml", content.clone());

        let summary = internalize(&mut document, &files).expect("should internalize");

        assert!(summary.is_unchanged());
        assert_eq!(document.root(), &content);
    }
}
