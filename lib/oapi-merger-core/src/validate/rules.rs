use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use jsonptr::Pointer;
use regex::Regex;
use serde_json::{Map, Value};

use super::{Rule, Violation};
use crate::reference::RawReference;
use crate::visit::{HTTP_METHODS, NodeKind, walk};
use crate::{ComponentKind, Document};

static COMPONENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("a valid regex"));

static PATH_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>[^{}/]+)\}").expect("a valid regex"));

const PARAMETER_LOCATIONS: [&str; 4] = ["query", "header", "path", "cookie"];

fn child(pointer: &str, key: &str) -> String {
    let mut location = Pointer::parse(pointer)
        .map(Pointer::to_buf)
        .unwrap_or_default();
    location.push_back(key);
    location.to_string()
}

fn require_string(
    object: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) {
    if !object.get(key).is_some_and(Value::is_string) {
        violations.push(Violation::new(child(parent, key), "missing string"));
    }
}

/// The `openapi` field is a 3.x version.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionRule;

impl Rule for VersionRule {
    fn name(&self) -> &'static str {
        "version"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        match document.openapi_version() {
            None => violations.push(Violation::new("/openapi", "missing string")),
            Some(version) if !version.starts_with("3.") => violations.push(Violation::new(
                "/openapi",
                format!("unsupported version '{version}', expected 3.x"),
            )),
            Some(_) => {}
        }
    }
}

/// The `info` object has a `title` and a `version`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoRule;

impl Rule for InfoRule {
    fn name(&self) -> &'static str {
        "info"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        let Some(info) = document.root().get("info").and_then(Value::as_object) else {
            violations.push(Violation::new("/info", "missing object"));
            return;
        };
        require_string(info, "/info", "title", violations);
        require_string(info, "/info", "version", violations);
    }
}

/// OpenAPI 3.0 requires `paths`, 3.1 requires one of `paths`, `components` or `webhooks`.
///
/// Path keys start with `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathsRule;

impl Rule for PathsRule {
    fn name(&self) -> &'static str {
        "paths"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        let root = document.root();
        let paths = root.get("paths").and_then(Value::as_object);

        if document
            .openapi_version()
            .is_some_and(|version| version.starts_with("3.0"))
        {
            if paths.is_none() {
                violations.push(Violation::new("/paths", "missing object"));
            }
        } else if ["paths", "components", "webhooks"]
            .iter()
            .all(|key| root.get(*key).is_none())
        {
            violations.push(Violation::new(
                "",
                "expected at least one of 'paths', 'components' or 'webhooks'",
            ));
        }

        for path in paths.into_iter().flat_map(Map::keys) {
            if !path.starts_with('/') && !path.starts_with("x-") {
                violations.push(Violation::new(child("/paths", path), "path must start with '/'"));
            }
        }
    }
}

/// Every reference is local and resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReferencesRule;

impl Rule for LocalReferencesRule {
    fn name(&self) -> &'static str {
        "local-references"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        walk(document.root(), NodeKind::Document, |node| {
            if node.kind == NodeKind::Document {
                return;
            }
            let Some(reference) = node.reference() else {
                return;
            };
            let location = child(&node.pointer.to_string(), "$ref");
            let message = match RawReference::parse(reference) {
                Err(_) => format!("invalid reference '{reference}'"),
                Ok(raw) if !raw.is_same_file() => format!("external reference '{reference}'"),
                Ok(raw) if document.resolve(&raw.pointer).is_none() => {
                    format!("unresolved reference '{reference}'")
                }
                Ok(_) => return,
            };
            violations.push(Violation::new(location, message));
        });
    }
}

/// Component names match `^[a-zA-Z0-9.\-_]+$`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentNamesRule;

impl Rule for ComponentNamesRule {
    fn name(&self) -> &'static str {
        "component-names"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        let registry = document.registry();
        for kind in ComponentKind::ALL {
            for name in registry.names(kind) {
                if !COMPONENT_NAME.is_match(name) {
                    violations.push(Violation::new(
                        kind.pointer(name).to_string(),
                        format!("invalid component name '{name}'"),
                    ));
                }
            }
        }
    }
}

/// Parameters have a `name` and a valid `in`; path parameters are required.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParametersRule;

impl Rule for ParametersRule {
    fn name(&self) -> &'static str {
        "parameters"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        walk(document.root(), NodeKind::Document, |node| {
            if node.kind != NodeKind::Parameter || node.reference().is_some() {
                return;
            }
            let Some(parameter) = node.value.as_object() else {
                return;
            };
            let pointer = node.pointer.to_string();

            require_string(parameter, &pointer, "name", violations);
            match parameter.get("in").and_then(Value::as_str) {
                None => violations.push(Violation::new(child(&pointer, "in"), "missing string")),
                Some(location) if !PARAMETER_LOCATIONS.contains(&location) => {
                    violations.push(Violation::new(
                        child(&pointer, "in"),
                        format!("invalid parameter location '{location}'"),
                    ));
                }
                Some("path") if parameter.get("required") != Some(&Value::Bool(true)) => {
                    violations.push(Violation::new(
                        child(&pointer, "required"),
                        "path parameters must be required",
                    ));
                }
                Some(_) => {}
            }
        });
    }
}

/// Every `{name}` of a path template is declared as a path parameter by each operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTemplateRule;

impl PathTemplateRule {
    fn declared<'d>(document: &'d Document, object: &'d Map<String, Value>) -> HashSet<&'d str> {
        object
            .get("parameters")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|parameter| match parameter.get("$ref").and_then(Value::as_str) {
                Some(reference) => document.resolve_local(reference),
                None => Some(parameter),
            })
            .filter(|parameter| parameter.get("in").and_then(Value::as_str) == Some("path"))
            .filter_map(|parameter| parameter.get("name").and_then(Value::as_str))
            .collect()
    }
}

impl Rule for PathTemplateRule {
    fn name(&self) -> &'static str {
        "path-template"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        let Some(paths) = document.root().get("paths").and_then(Value::as_object) else {
            return;
        };

        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            if item.contains_key("$ref") {
                continue;
            }
            let template: Vec<&str> = PATH_TEMPLATE
                .captures_iter(path)
                .filter_map(|captures| captures.name("name"))
                .map(|name| name.as_str())
                .collect();
            if template.is_empty() {
                continue;
            }

            let shared = Self::declared(document, item);
            for method in HTTP_METHODS {
                let Some(operation) = item.get(method).and_then(Value::as_object) else {
                    continue;
                };
                let own = Self::declared(document, operation);
                let location = child(&child("/paths", path), method);
                for name in &template {
                    if !shared.contains(name) && !own.contains(name) {
                        violations.push(Violation::new(
                            location.clone(),
                            format!("path parameter '{name}' is not declared"),
                        ));
                    }
                }
            }
        }
    }
}

/// Operations have responses, and each response has a description.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsesRule;

impl Rule for ResponsesRule {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        walk(document.root(), NodeKind::Document, |node| {
            if node.reference().is_some() {
                return;
            }
            let Some(object) = node.value.as_object() else {
                return;
            };
            let pointer = node.pointer.to_string();

            match node.kind {
                NodeKind::Operation => {
                    let has_responses = object
                        .get("responses")
                        .and_then(Value::as_object)
                        .is_some_and(|responses| !responses.is_empty());
                    if !has_responses {
                        violations.push(Violation::new(
                            child(&pointer, "responses"),
                            "missing responses",
                        ));
                    }
                }
                NodeKind::Response => require_string(object, &pointer, "description", violations),
                _ => {}
            }
        });
    }
}

/// `operationId` values are unique across the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationIdRule;

impl Rule for OperationIdRule {
    fn name(&self) -> &'static str {
        "operation-id"
    }

    fn check(&self, document: &Document, violations: &mut Vec<Violation>) {
        let mut seen: HashMap<String, String> = HashMap::new();
        walk(document.root(), NodeKind::Document, |node| {
            if node.kind != NodeKind::Operation {
                return;
            }
            let Some(id) = node.value.get("operationId").and_then(Value::as_str) else {
                return;
            };
            let pointer = node.pointer.to_string();
            if let Some(first) = seen.get(id) {
                violations.push(Violation::new(
                    child(&pointer, "operationId"),
                    format!("duplicate operationId '{id}', first used at {first}"),
                ));
            } else {
                seen.insert(id.to_string(), pointer);
            }
        });
    }
}
