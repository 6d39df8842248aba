//! Validation of the internalized document.
//!
//! The pipeline only depends on the [`Validator`] trait. [`OpenApiValidator`] is the
//! default implementation: a list of [`Rule`]s, each reporting [`Violation`]s.
//!
//! # Example
//!
//! ```rust
//! use oapi_merger_core::{Document, OpenApiValidator, Validator};
//! use serde_json::json;
//!
//! let document = Document::new("openapi.yaml", json!({"openapi": "3.0.3", "paths": {}}));
//! let violations = OpenApiValidator::default().validate(&document);
//!
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].to_string(), "/info: missing object");
//! ```

mod rules;

use std::fmt;

pub use self::rules::{
    ComponentNamesRule, InfoRule, LocalReferencesRule, OperationIdRule, ParametersRule,
    PathTemplateRule, PathsRule, ResponsesRule, VersionRule,
};

use crate::Document;

/// A problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
    /// JSON pointer of the offending location, empty for the whole document.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "(document): {}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// Checks a document, returning every violation found.
///
/// An empty list means the document is valid. Any closure taking a [`Document`]
/// and returning violations is a validator.
pub trait Validator {
    /// Validates the document.
    fn validate(&self, document: &Document) -> Vec<Violation>;
}

impl<F> Validator for F
where
    F: Fn(&Document) -> Vec<Violation>,
{
    fn validate(&self, document: &Document) -> Vec<Violation> {
        self(document)
    }
}

/// A single validation rule.
pub trait Rule {
    /// A short identifier of the rule, used in logs.
    fn name(&self) -> &'static str;

    /// Appends the violations of this rule to `violations`.
    fn check(&self, document: &Document, violations: &mut Vec<Violation>);
}

/// The default OpenAPI 3.x rule set.
pub struct OpenApiValidator {
    rules: Vec<Box<dyn Rule>>,
}

impl OpenApiValidator {
    /// A validator without any rule.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// The names of the rules, in evaluation order.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }
}

impl Default for OpenApiValidator {
    fn default() -> Self {
        Self::empty()
            .with_rule(VersionRule)
            .with_rule(InfoRule)
            .with_rule(PathsRule)
            .with_rule(LocalReferencesRule)
            .with_rule(ComponentNamesRule)
            .with_rule(ParametersRule)
            .with_rule(PathTemplateRule)
            .with_rule(ResponsesRule)
            .with_rule(OperationIdRule)
    }
}

impl fmt::Debug for OpenApiValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiValidator")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Validator for OpenApiValidator {
    fn validate(&self, document: &Document) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            let before = violations.len();
            rule.check(document, &mut violations);
            if violations.len() > before {
                tracing::debug!(
                    rule = rule.name(),
                    count = violations.len() - before,
                    "rule violated"
                );
            }
        }
        violations
    }
}

/// A validator accepting every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _document: &Document) -> Vec<Violation> {
        Vec::new()
    }
}
