use std::fmt;
use std::path::PathBuf;

use crate::validate::Violation;

/// Errors raised while loading the root document and the files it references.
///
/// Every variant is fatal: the merge stops at the first file that cannot be
/// read, parsed or navigated.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum LoadError {
    /// The file does not exist or cannot be resolved to an absolute path.
    #[display("File not found '{}': {source}", path.display())]
    NotFound {
        /// The path as it was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file exists but cannot be read.
    #[display("Cannot read '{}': {source}", path.display())]
    Unreadable {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file content is neither valid YAML nor valid JSON.
    #[display("Cannot parse '{}' as {format}: {message}", path.display())]
    Malformed {
        /// The file being parsed.
        path: PathBuf,
        /// The format the parser was selected for.
        format: crate::SourceFormat,
        /// The parser error message.
        message: String,
    },

    /// A `$ref` value cannot be understood.
    #[display("Invalid reference '{reference}' in '{}': {reason}", file.display())]
    InvalidReference {
        /// The raw reference string.
        reference: String,
        /// The file holding the reference.
        file: PathBuf,
        /// Why the reference was rejected.
        reason: String,
    },

    /// A reference targets a remote document.
    #[display("Remote reference '{reference}' in '{}' is not supported", file.display())]
    RemoteReference {
        /// The raw reference string.
        reference: String,
        /// The file holding the reference.
        file: PathBuf,
    },

    /// The pointer part of a reference does not resolve inside its target file.
    #[display("Pointer '{pointer}' does not resolve in '{}' (referenced as '{reference}')", target.display())]
    UnresolvedPointer {
        /// The raw reference string.
        reference: String,
        /// The target file.
        target: PathBuf,
        /// The JSON pointer that failed.
        pointer: String,
    },
}

/// Errors raised by the internalizer.
///
/// These are invariant violations: a successful load guarantees every reference
/// resolves, so seeing one of them means the loaded graph and the document
/// disagree.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum InternalizeError {
    /// A reference was never registered by the loader.
    #[display("Reference '{reference}' from '{}' was not resolved while loading", file.display())]
    UnresolvedReference {
        /// The raw reference string.
        reference: String,
        /// The file the reference was read from.
        file: PathBuf,
    },

    /// A reference target is missing from the loaded files.
    #[display("Target '{target}' is missing from the loaded files")]
    MissingTarget {
        /// The target that could not be found.
        target: String,
    },

    /// A location in the document vanished while it was being rewritten.
    #[display("Location '{location}' is missing from the document")]
    MissingLocation {
        /// The JSON pointer of the location.
        location: String,
    },

    /// No free component name was found for a candidate.
    #[display("Cannot find a free name for '{candidate}' in '{category}'")]
    NamingExhausted {
        /// The component category.
        category: crate::ComponentKind,
        /// The candidate name.
        candidate: String,
    },

    /// A target already internalized is reached again as another kind of object.
    #[display("Target '{target}' is used as {found} but was internalized at '{assigned}'")]
    KindMismatch {
        /// The target reached twice.
        target: String,
        /// The local pointer the target was first internalized to.
        assigned: String,
        /// The kind of the second site.
        found: crate::visit::NodeKind,
    },

    /// A path item reference inlines itself.
    #[display("Circular path item reference '{target}'")]
    CircularInline {
        /// The target that loops back on itself.
        target: String,
    },
}

/// The validator reported at least one violation.
#[derive(Debug, derive_more::Error)]
pub struct ValidationError {
    /// All violations, in document order.
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

/// Errors raised while encoding the merged document.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum SerializationError {
    /// JSON encoding failed.
    #[display("JSON encoding failed: {_0}")]
    Json(serde_json::Error),

    /// YAML encoding failed.
    #[display("YAML encoding failed: {message}")]
    #[from(skip)]
    Yaml {
        /// The encoder error message.
        message: String,
    },
}

/// Any error of the merge pipeline.
///
/// Each pipeline stage converts into this type, so the whole run propagates with `?`.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum MergeError {
    /// Loading failed.
    #[display("Error loading file: {_0}")]
    Load(LoadError),

    /// Internalizing failed.
    #[display("Error internalizing references: {_0}")]
    Internalize(InternalizeError),

    /// Validation failed.
    #[display("Error validating document: {_0}")]
    Validation(ValidationError),

    /// Encoding failed.
    #[display("Error serializing document: {_0}")]
    Serialization(SerializationError),

    /// Writing the output failed.
    #[display("Error writing output: {_0}")]
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_list_every_violation() {
        let error = ValidationError {
            violations: vec![
                Violation::new("/info", "missing 'title'"),
                Violation::new("/paths/~1users/get", "missing 'responses'"),
            ],
        };

        assert_eq!(
            error.to_string(),
            "2 validation error(s)\n  - /info: missing 'title'\n  - /paths/~1users/get: missing 'responses'"
        );
    }

    #[test]
    fn should_name_both_uses_of_mismatched_target() {
        let error = InternalizeError::KindMismatch {
            target: "/api/thing.yaml#".to_string(),
            assigned: "/components/schemas/thing".to_string(),
            found: crate::visit::NodeKind::Parameter,
        };

        assert_eq!(
            error.to_string(),
            "Target '/api/thing.yaml#' is used as Parameter but was internalized at '/components/schemas/thing'"
        );
    }

    #[test]
    fn should_prefix_stage_in_merge_error() {
        let error = MergeError::from(InternalizeError::MissingTarget {
            target: "/tmp/a.yaml#/x".to_string(),
        });

        assert_eq!(
            error.to_string(),
            "Error internalizing references: Target '/tmp/a.yaml#/x' is missing from the loaded files"
        );
    }
}
