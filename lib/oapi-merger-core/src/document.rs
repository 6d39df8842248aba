//! The root API description and its component registry.

use std::path::{Path, PathBuf};

use jsonptr::Pointer;
use jsonptr::resolve::Resolve;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ComponentKind;
use crate::reference::RawReference;

/// The root OpenAPI document.
///
/// Created by the [`Loader`](crate::Loader), mutated in place by the
/// [`Internalizer`](crate::Internalizer), then only read by validation and serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: PathBuf,
    root: Value,
}

impl Document {
    /// Creates a document from its parsed content.
    pub fn new(path: impl Into<PathBuf>, root: Value) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// The absolute path of the root file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document content.
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Consumes the document, returning its content.
    pub fn into_value(self) -> Value {
        self.root
    }

    /// The value of the `openapi` field.
    pub fn openapi_version(&self) -> Option<&str> {
        self.root.get("openapi").and_then(Value::as_str)
    }

    /// A read-only view of `components`.
    pub fn registry(&self) -> ComponentRegistry<'_> {
        ComponentRegistry {
            components: self.root.get("components").and_then(Value::as_object),
        }
    }

    /// Resolves a pointer into the document.
    pub fn resolve(&self, pointer: &Pointer) -> Option<&Value> {
        self.root.resolve(pointer).ok()
    }

    /// Resolves a local `$ref` string (`#/components/schemas/User`).
    ///
    /// Returns `None` for references to other files and for dangling pointers.
    pub fn resolve_local(&self, reference: &str) -> Option<&Value> {
        let raw = RawReference::parse(reference).ok()?;
        if !raw.is_same_file() {
            return None;
        }
        self.resolve(&raw.pointer)
    }

    /// Inserts a component, creating `components` and the category map when missing.
    ///
    /// Returns the previous value under that name, if any. Nothing is inserted when
    /// the document root is not an object.
    pub(crate) fn insert_component(
        &mut self,
        kind: ComponentKind,
        name: &str,
        component: Value,
    ) -> Option<Value> {
        let root = self.root.as_object_mut()?;
        let components = object_entry(root, "components")?;
        let category = object_entry(components, kind.as_str())?;
        category.insert(name.to_string(), component)
    }
}

/// The object under `key`, replacing a missing or non-object value with an empty map.
fn object_entry<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
) -> Option<&'m mut Map<String, Value>> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

/// A view of the root document's `components`, by category.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRegistry<'d> {
    components: Option<&'d Map<String, Value>>,
}

impl<'d> ComponentRegistry<'d> {
    /// The components of a category, in declaration order.
    pub fn category(&self, kind: ComponentKind) -> Option<&'d Map<String, Value>> {
        self.components?.get(kind.as_str())?.as_object()
    }

    /// Finds a component by category and name.
    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&'d Value> {
        self.category(kind)?.get(name)
    }

    /// Returns `true` if the category holds a component with that name.
    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// The component names of a category, in declaration order.
    pub fn names(&self, kind: ComponentKind) -> impl Iterator<Item = &'d str> + use<'d> {
        self.category(kind)
            .into_iter()
            .flat_map(|category| category.keys().map(String::as_str))
    }

    /// The number of components in a category.
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.category(kind).map_or(0, Map::len)
    }

    /// Returns `true` when no category holds any component.
    pub fn is_empty(&self) -> bool {
        ComponentKind::ALL.into_iter().all(|kind| self.len(kind) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        Document::new(
            "/api/openapi.yaml",
            json!({
                "openapi": "3.0.3",
                "info": {"title": "Pets", "version": "1.0.0"},
                "paths": {},
                "components": {
                    "schemas": {
                        "Pet": {"type": "object"},
                        "Error": {"type": "object"}
                    }
                }
            }),
        )
    }

    #[test]
    fn should_list_component_names_in_declaration_order() {
        let document = document();

        let names: Vec<_> = document.registry().names(ComponentKind::Schemas).collect();

        assert_eq!(names, ["Pet", "Error"]);
        assert_eq!(document.registry().len(ComponentKind::Parameters), 0);
    }

    #[test]
    fn should_insert_component_in_new_category() {
        let mut document = document();

        let previous = document.insert_component(
            ComponentKind::Parameters,
            "limit",
            json!({"name": "limit", "in": "query"}),
        );

        assert!(previous.is_none());
        assert!(document.registry().contains(ComponentKind::Parameters, "limit"));
    }

    #[test]
    fn should_create_components_when_missing() {
        let mut document = Document::new("/api/openapi.yaml", json!({"openapi": "3.0.3"}));
        assert!(document.registry().is_empty());

        document.insert_component(ComponentKind::Schemas, "Pet", json!({"type": "object"}));

        assert_eq!(
            document.registry().get(ComponentKind::Schemas, "Pet"),
            Some(&json!({"type": "object"}))
        );
    }

    #[test]
    fn should_replace_non_object_category() {
        let mut document = Document::new(
            "/api/openapi.yaml",
            json!({"components": {"schemas": "not a map"}}),
        );

        let previous =
            document.insert_component(ComponentKind::Schemas, "Pet", json!({"type": "object"}));

        assert!(previous.is_none());
        assert_eq!(document.registry().names(ComponentKind::Schemas).count(), 1);
    }

    #[test]
    fn should_not_insert_into_non_object_root() {
        let mut document = Document::new("/api/openapi.yaml", json!(["not", "a", "document"]));

        document.insert_component(ComponentKind::Schemas, "Pet", json!({"type": "object"}));

        assert_eq!(document.root(), &json!(["not", "a", "document"]));
    }

    #[test]
    fn should_resolve_local_reference() {
        let document = document();

        assert_eq!(
            document.resolve_local("#/components/schemas/Pet"),
            Some(&json!({"type": "object"}))
        );
        assert_eq!(document.resolve_local("#/components/schemas/Dog"), None);
        assert_eq!(document.resolve_local("pet.yaml#/Pet"), None);
        assert_eq!(document.openapi_version(), Some("3.0.3"));
    }
}
