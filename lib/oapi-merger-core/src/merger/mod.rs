//! The load, internalize, validate and serialize pipeline.

mod builder;

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

pub use self::builder::MergerBuilder;

use crate::{
    Document, Internalizer, Loader, MergeError, OutputFormat, ValidationError, Validator,
};

/// Merges a multi-file OpenAPI document into a single one.
///
/// The stages run in order and the first failure stops the run. Output is only
/// produced once every stage has succeeded.
///
/// # Example
///
/// ```rust,no_run
/// use oapi_merger_core::Merger;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let merger = Merger::builder().build();
/// merger.merge_to("api/openapi.yaml", std::io::stdout().lock())?;
/// # Ok(())
/// # }
/// ```
pub struct Merger {
    output_format: OutputFormat,
    validator: Box<dyn Validator>,
}

impl Merger {
    /// Creates a [`MergerBuilder`].
    pub fn builder() -> MergerBuilder {
        MergerBuilder::default()
    }

    /// The encoding of the merged document.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Loads the root file and internalizes its references, without validating.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Load`] or [`MergeError::Internalize`].
    pub fn internalize_file(&self, root: impl AsRef<Path>) -> Result<Document, MergeError> {
        let root = root.as_ref();
        let mut loader = Loader::new();
        let mut document = loader.load(root)?;

        let summary = Internalizer::new(loader.files()).internalize(&mut document)?;
        debug!(
            root = %document.path().display(),
            files = loader.files().len(),
            hoisted = summary.hoisted,
            inlined = summary.inlined,
            "document internalized"
        );
        Ok(document)
    }

    /// Runs the validator on a document.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation found.
    pub fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        let violations = self.validator.validate(document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Merges the root file and returns the encoded document.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] naming the stage that failed.
    pub fn merge_file(&self, root: impl AsRef<Path>) -> Result<String, MergeError> {
        let root = root.as_ref();
        let document = self.internalize_file(root)?;
        self.validate(&document)?;
        let output = self.output_format.serialize(&document)?;

        info!(root = %root.display(), format = %self.output_format, "document merged");
        Ok(output)
    }

    /// Merges the root file and writes the encoded document.
    ///
    /// Nothing is written when a stage fails.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] naming the stage that failed, or [`MergeError::Io`]
    /// when writing fails.
    pub fn merge_to(&self, root: impl AsRef<Path>, mut out: impl Write) -> Result<(), MergeError> {
        let output = self.merge_file(root)?;
        out.write_all(output.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Merger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger")
            .field("output_format", &self.output_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopValidator;

    #[test]
    fn should_report_missing_root_as_load_error() {
        let merger = Merger::default();

        let result = merger.merge_file("/does/not/exist/openapi.yaml");

        assert!(matches!(result, Err(MergeError::Load(_))));
    }

    #[test]
    fn should_not_write_when_merge_fails() {
        let merger = Merger::builder().with_validator(NoopValidator).build();
        let mut out = Vec::new();

        let result = merger.merge_to("/does/not/exist/openapi.yaml", &mut out);

        assert!(result.is_err());
        assert!(out.is_empty());
    }
}
