//! Structural traversal of OpenAPI documents.
//!
//! References are only looked for where the OpenAPI object model allows them, so
//! example payloads and `x-` extensions holding a `$ref` key are left alone.
//! The walk uses an explicit stack: its depth does not depend on the input.

use jsonptr::{Pointer, PointerBuf};
use serde_json::{Map, Value};

use crate::ComponentKind;

/// The kind of OpenAPI object found at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NodeKind {
    /// The root OpenAPI object.
    Document,
    /// A path item, under `paths`, `webhooks` or a callback.
    PathItem,
    /// An operation of a path item.
    Operation,
    /// A parameter.
    Parameter,
    /// A request body.
    RequestBody,
    /// A response.
    Response,
    /// A header.
    Header,
    /// A media type entry of a `content` map.
    MediaType,
    /// An encoding entry of a media type.
    Encoding,
    /// A JSON schema.
    Schema,
    /// An example.
    Example,
    /// A link.
    Link,
    /// A callback: a map of expressions to path items.
    Callback,
    /// A security scheme.
    SecurityScheme,
}

impl NodeKind {
    /// The registry category holding objects of this kind.
    ///
    /// Path items and the document itself have none.
    pub fn category(self) -> Option<ComponentKind> {
        match self {
            Self::Schema => Some(ComponentKind::Schemas),
            Self::Parameter => Some(ComponentKind::Parameters),
            Self::Response => Some(ComponentKind::Responses),
            Self::Header => Some(ComponentKind::Headers),
            Self::RequestBody => Some(ComponentKind::RequestBodies),
            Self::SecurityScheme => Some(ComponentKind::SecuritySchemes),
            Self::Link => Some(ComponentKind::Links),
            Self::Callback => Some(ComponentKind::Callbacks),
            Self::Example => Some(ComponentKind::Examples),
            Self::Document
            | Self::PathItem
            | Self::Operation
            | Self::MediaType
            | Self::Encoding => None,
        }
    }
}

impl From<ComponentKind> for NodeKind {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Schemas => Self::Schema,
            ComponentKind::Parameters => Self::Parameter,
            ComponentKind::Responses => Self::Response,
            ComponentKind::Headers => Self::Header,
            ComponentKind::RequestBodies => Self::RequestBody,
            ComponentKind::SecuritySchemes => Self::SecurityScheme,
            ComponentKind::Links => Self::Link,
            ComponentKind::Callbacks => Self::Callback,
            ComponentKind::Examples => Self::Example,
        }
    }
}

pub(crate) const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMA_FIELDS: [&str; 11] = [
    "items",
    "additionalItems",
    "not",
    "if",
    "then",
    "else",
    "contains",
    "propertyNames",
    "unevaluatedItems",
    "unevaluatedProperties",
    "contentSchema",
];

const SCHEMA_LISTS: [&str; 4] = ["allOf", "oneOf", "anyOf", "prefixItems"];

const SCHEMA_MAPS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// A structural node met during a walk.
#[derive(Debug, Clone)]
pub struct Node<'v> {
    /// The location of the node, relative to where the walk started.
    pub pointer: PointerBuf,
    /// The kind of object expected at this location.
    pub kind: NodeKind,
    /// The node itself.
    pub value: &'v Value,
}

impl<'v> Node<'v> {
    /// The `$ref` string when this node is a reference object.
    pub fn reference(&self) -> Option<&'v str> {
        self.value.get("$ref").and_then(Value::as_str)
    }
}

/// A reference object found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSite {
    /// The location of the reference object, relative to where the walk started.
    pub pointer: PointerBuf,
    /// The kind of object the reference stands for.
    pub kind: NodeKind,
    /// The raw `$ref` string.
    pub reference: String,
}

/// Visits every structural node of `value`, in document order.
///
/// Reference objects are visited but not descended into.
pub fn walk<'v>(value: &'v Value, kind: NodeKind, mut visit: impl FnMut(&Node<'v>)) {
    let mut stack = vec![Node {
        pointer: PointerBuf::new(),
        kind,
        value,
    }];

    while let Some(node) = stack.pop() {
        visit(&node);
        if node.kind == NodeKind::Document || node.reference().is_none() {
            let mut children = Children::new(&node.pointer);
            children.collect(node.value, node.kind);
            stack.extend(children.nodes.into_iter().rev());
        }
    }
}

/// Collects every reference object of `value`, in document order.
pub fn ref_sites(value: &Value, kind: NodeKind) -> Vec<RefSite> {
    let mut sites = Vec::new();
    walk(value, kind, |node| {
        if node.kind == NodeKind::Document {
            return;
        }
        if let Some(reference) = node.reference() {
            sites.push(RefSite {
                pointer: node.pointer.clone(),
                kind: node.kind,
                reference: reference.to_string(),
            });
        }
    });
    sites
}

struct Children<'p, 'v> {
    parent: &'p Pointer,
    nodes: Vec<Node<'v>>,
}

impl<'p, 'v> Children<'p, 'v> {
    fn new(parent: &'p Pointer) -> Self {
        Self {
            parent,
            nodes: Vec::new(),
        }
    }

    fn collect(&mut self, value: &'v Value, kind: NodeKind) {
        let Some(object) = value.as_object() else {
            return;
        };

        match kind {
            NodeKind::Document => {
                self.map(object, &["paths"], NodeKind::PathItem, true);
                self.map(object, &["webhooks"], NodeKind::PathItem, true);
                for category in ComponentKind::ALL {
                    self.map(
                        object,
                        &["components", category.as_str()],
                        category.into(),
                        false,
                    );
                }
                self.map(object, &["components", "pathItems"], NodeKind::PathItem, false);
            }
            NodeKind::PathItem => {
                self.list(object, "parameters", NodeKind::Parameter);
                for method in HTTP_METHODS {
                    self.field(object, method, NodeKind::Operation);
                }
            }
            NodeKind::Operation => {
                self.list(object, "parameters", NodeKind::Parameter);
                self.field(object, "requestBody", NodeKind::RequestBody);
                self.map(object, &["responses"], NodeKind::Response, true);
                self.map(object, &["callbacks"], NodeKind::Callback, false);
            }
            NodeKind::Parameter | NodeKind::Header => {
                self.field(object, "schema", NodeKind::Schema);
                self.map(object, &["content"], NodeKind::MediaType, false);
                self.map(object, &["examples"], NodeKind::Example, false);
            }
            NodeKind::RequestBody => {
                self.map(object, &["content"], NodeKind::MediaType, false);
            }
            NodeKind::MediaType => {
                self.field(object, "schema", NodeKind::Schema);
                self.map(object, &["examples"], NodeKind::Example, false);
                self.map(object, &["encoding"], NodeKind::Encoding, false);
            }
            NodeKind::Encoding => {
                self.map(object, &["headers"], NodeKind::Header, false);
            }
            NodeKind::Response => {
                self.map(object, &["headers"], NodeKind::Header, false);
                self.map(object, &["content"], NodeKind::MediaType, false);
                self.map(object, &["links"], NodeKind::Link, false);
            }
            NodeKind::Callback => {
                self.entries(object, &[], NodeKind::PathItem, true);
            }
            NodeKind::Schema => {
                for key in SCHEMA_MAPS {
                    self.map(object, &[key], NodeKind::Schema, false);
                }
                for key in SCHEMA_FIELDS {
                    // draft-04 tuples: `items` as an array
                    if key == "items" && object.get(key).is_some_and(Value::is_array) {
                        self.list(object, key, NodeKind::Schema);
                    } else {
                        self.field(object, key, NodeKind::Schema);
                    }
                }
                self.field(object, "additionalProperties", NodeKind::Schema);
                for key in SCHEMA_LISTS {
                    self.list(object, key, NodeKind::Schema);
                }
            }
            NodeKind::Example | NodeKind::Link | NodeKind::SecurityScheme => {}
        }
    }

    fn push(&mut self, tokens: &[&str], value: &'v Value, kind: NodeKind) {
        // booleans are valid schemas and `additionalProperties: true` is common
        if !value.is_object() {
            return;
        }
        let mut pointer = self.parent.to_buf();
        for token in tokens {
            pointer.push_back(*token);
        }
        self.nodes.push(Node {
            pointer,
            kind,
            value,
        });
    }

    fn field(&mut self, object: &'v Map<String, Value>, key: &str, kind: NodeKind) {
        if let Some(value) = object.get(key) {
            self.push(&[key], value, kind);
        }
    }

    fn list(&mut self, object: &'v Map<String, Value>, key: &str, kind: NodeKind) {
        let Some(items) = object.get(key).and_then(Value::as_array) else {
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.push(&[key, &index.to_string()], item, kind);
        }
    }

    fn map(
        &mut self,
        object: &'v Map<String, Value>,
        path: &[&str],
        kind: NodeKind,
        skip_extensions: bool,
    ) {
        let mut current = object;
        for key in path {
            match current.get(*key).and_then(Value::as_object) {
                Some(next) => current = next,
                None => return,
            }
        }
        self.entries(current, path, kind, skip_extensions);
    }

    fn entries(
        &mut self,
        object: &'v Map<String, Value>,
        path: &[&str],
        kind: NodeKind,
        skip_extensions: bool,
    ) {
        for (name, value) in object {
            if skip_extensions && name.starts_with("x-") {
                continue;
            }
            let mut tokens = path.to_vec();
            tokens.push(name);
            self.push(&tokens, value, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site_pointers(value: &Value, kind: NodeKind) -> Vec<(String, NodeKind)> {
        ref_sites(value, kind)
            .into_iter()
            .map(|site| (site.pointer.to_string(), site.kind))
            .collect()
    }

    #[test]
    fn should_find_references_with_their_kind() {
        let document = json!({
            "openapi": "3.0.3",
            "paths": {
                "/users/{id}": {
                    "parameters": [{"$ref": "params.yaml#/Id"}],
                    "get": {
                        "requestBody": {"$ref": "bodies.yaml"},
                        "responses": {
                            "200": {
                                "description": "ok",
                                "headers": {"X-Rate": {"$ref": "headers.yaml#/Rate"}},
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "user.yaml"}
                                    }
                                }
                            },
                            "default": {"$ref": "responses.yaml#/Error"}
                        }
                    }
                },
                "/legacy": {"$ref": "legacy.yaml"}
            }
        });

        assert_eq!(
            site_pointers(&document, NodeKind::Document),
            [
                ("/paths/~1users~1{id}/parameters/0".to_string(), NodeKind::Parameter),
                ("/paths/~1users~1{id}/get/requestBody".to_string(), NodeKind::RequestBody),
                (
                    "/paths/~1users~1{id}/get/responses/200/headers/X-Rate".to_string(),
                    NodeKind::Header
                ),
                (
                    "/paths/~1users~1{id}/get/responses/200/content/application~1json/schema"
                        .to_string(),
                    NodeKind::Schema
                ),
                ("/paths/~1users~1{id}/get/responses/default".to_string(), NodeKind::Response),
                ("/paths/~1legacy".to_string(), NodeKind::PathItem),
            ]
        );
    }

    #[test]
    fn should_descend_into_nested_schemas() {
        let schema = json!({
            "type": "object",
            "properties": {
                "owner": {"$ref": "#/components/schemas/User"},
                "tags": {"type": "array", "items": {"$ref": "tag.yaml"}}
            },
            "additionalProperties": {"$ref": "extra.yaml"},
            "allOf": [{"$ref": "base.yaml"}]
        });

        let pointers: Vec<_> = site_pointers(&schema, NodeKind::Schema)
            .into_iter()
            .map(|(pointer, _)| pointer)
            .collect();

        assert_eq!(
            pointers,
            [
                "/properties/owner",
                "/properties/tags/items",
                "/additionalProperties",
                "/allOf/0"
            ]
        );
    }

    #[test]
    fn should_ignore_examples_and_extensions() {
        let document = json!({
            "paths": {
                "x-internal": {"$ref": "internal.yaml"},
                "/pets": {
                    "get": {
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": {
                                        "example": {"$ref": "not-a-reference"}
                                    }
                                }
                            }
                        },
                        "x-codegen": {"$ref": "codegen.yaml"}
                    }
                }
            }
        });

        assert!(ref_sites(&document, NodeKind::Document).is_empty());
    }

    #[test]
    fn should_report_root_reference() {
        let value = json!({"$ref": "user.yaml", "description": "ignored sibling"});

        let sites = ref_sites(&value, NodeKind::Schema);

        assert_eq!(
            sites,
            [RefSite {
                pointer: PointerBuf::new(),
                kind: NodeKind::Schema,
                reference: "user.yaml".to_string(),
            }]
        );
    }

    #[test]
    fn should_walk_components_by_category() {
        let document = json!({
            "components": {
                "schemas": {"Pet": {"$ref": "pet.yaml"}},
                "callbacks": {
                    "onEvent": {
                        "{$request.body#/url}": {
                            "post": {"requestBody": {"$ref": "event.yaml"}}
                        }
                    }
                }
            }
        });

        assert_eq!(
            site_pointers(&document, NodeKind::Document),
            [
                ("/components/schemas/Pet".to_string(), NodeKind::Schema),
                (
                    "/components/callbacks/onEvent/{$request.body#~1url}/post/requestBody"
                        .to_string(),
                    NodeKind::RequestBody
                ),
            ]
        );
    }
}
