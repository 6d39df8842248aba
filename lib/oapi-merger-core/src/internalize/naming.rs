use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::{ComponentKind, Document, InternalizeError};

/// Suffixes tried before giving up on a candidate.
pub(crate) const MAX_SUFFIX: u32 = 10_000;

/// Hands out component names that are free in their category.
///
/// A name is never handed out twice, and names already present in the document
/// are never reused. Each category has its own namespace.
#[derive(Debug, Default)]
pub(crate) struct NameAllocator {
    taken: HashMap<ComponentKind, HashSet<String>>,
}

impl NameAllocator {
    /// Creates an allocator aware of the components already in the document.
    pub(crate) fn from_document(document: &Document) -> Self {
        let registry = document.registry();
        let taken = ComponentKind::ALL
            .into_iter()
            .map(|kind| (kind, registry.names(kind).map(str::to_string).collect()))
            .collect();
        Self { taken }
    }

    /// Reserves the first free name among `candidate`, `candidate2`, `candidate3`, ...
    pub(crate) fn allocate(
        &mut self,
        kind: ComponentKind,
        candidate: &str,
    ) -> Result<String, InternalizeError> {
        let base = sanitize(candidate);
        let taken = self.taken.entry(kind).or_default();

        if taken.insert(base.clone()) {
            return Ok(base);
        }
        for suffix in 2..=MAX_SUFFIX {
            let name = format!("{base}{suffix}");
            if taken.insert(name.clone()) {
                return Ok(name);
            }
        }

        Err(InternalizeError::NamingExhausted {
            category: kind,
            candidate: base,
        })
    }
}

/// Replaces characters not allowed in component names with `_`.
pub(crate) fn sanitize(candidate: &str) -> String {
    let name: String = candidate
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        return "component".to_string();
    }
    if name != candidate {
        warn!(%candidate, %name, "component name sanitized");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn should_suffix_colliding_names() {
        let mut names = NameAllocator::default();

        let first = names.allocate(ComponentKind::Schemas, "error");
        let second = names.allocate(ComponentKind::Schemas, "error");
        let third = names.allocate(ComponentKind::Schemas, "error");

        assert_eq!(first.ok().as_deref(), Some("error"));
        assert_eq!(second.ok().as_deref(), Some("error2"));
        assert_eq!(third.ok().as_deref(), Some("error3"));
    }

    #[test]
    fn should_count_each_category_independently() {
        let mut names = NameAllocator::default();

        names.allocate(ComponentKind::Schemas, "error").ok();
        let response = names.allocate(ComponentKind::Responses, "error");

        assert_eq!(response.ok().as_deref(), Some("error"));
    }

    #[test]
    fn should_avoid_names_already_in_document() {
        let document = crate::Document::new(
            "/api/openapi.yaml",
            json!({"components": {"schemas": {"Error": {}, "Error2": {}}}}),
        );
        let mut names = NameAllocator::from_document(&document);

        let name = names.allocate(ComponentKind::Schemas, "Error");

        assert_eq!(name.ok().as_deref(), Some("Error3"));
    }

    #[test]
    fn should_skip_suffixed_name_already_taken() {
        let mut names = NameAllocator::default();

        names.allocate(ComponentKind::Schemas, "error2").ok();
        names.allocate(ComponentKind::Schemas, "error").ok();
        let name = names.allocate(ComponentKind::Schemas, "error");

        assert_eq!(name.ok().as_deref(), Some("error3"));
    }

    #[rstest]
    #[case("User", "User")]
    #[case("user-v1.2_beta", "user-v1.2_beta")]
    #[case("a/b", "a_b")]
    #[case("Pet Store", "Pet_Store")]
    #[case("", "component")]
    fn should_sanitize_name(#[case] candidate: &str, #[case] expected: &str) {
        assert_eq!(sanitize(candidate), expected);
    }
}
