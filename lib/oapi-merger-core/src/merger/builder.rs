use super::Merger;
use crate::{OpenApiValidator, OutputFormat, Validator};

/// Builder for [`Merger`] instances.
///
/// # Default Configuration
///
/// - **Output format**: YAML
/// - **Validator**: [`OpenApiValidator::default()`]
///
/// # Example
///
/// ```rust
/// use oapi_merger_core::{Merger, NoopValidator, OutputFormat};
///
/// let merger = Merger::builder()
///     .with_output_format(OutputFormat::Json)
///     .with_validator(NoopValidator)
///     .build();
///
/// assert_eq!(merger.output_format(), OutputFormat::Json);
/// ```
pub struct MergerBuilder {
    output_format: OutputFormat,
    validator: Box<dyn Validator>,
}

impl MergerBuilder {
    /// Sets the encoding of the merged document.
    #[must_use]
    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// Replaces the validator run on the internalized document.
    ///
    /// Use [`NoopValidator`](crate::NoopValidator) to skip validation.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Builds the [`Merger`].
    pub fn build(self) -> Merger {
        let Self {
            output_format,
            validator,
        } = self;

        Merger {
            output_format,
            validator,
        }
    }
}

impl Default for MergerBuilder {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            validator: Box::new(OpenApiValidator::default()),
        }
    }
}

impl std::fmt::Debug for MergerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergerBuilder")
            .field("output_format", &self.output_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Violation};

    #[test]
    fn should_default_to_yaml() {
        let merger = MergerBuilder::default().build();

        assert_eq!(merger.output_format(), OutputFormat::Yaml);
    }

    #[test]
    fn should_use_given_validator() {
        let merger = MergerBuilder::default()
            .with_validator(|_: &Document| vec![Violation::new("", "always wrong")])
            .build();
        let document = Document::new("/api/openapi.yaml", serde_json::json!({}));

        let result = merger.validate(&document);

        let error = result.expect_err("should reject document");
        assert_eq!(error.violations.len(), 1);
    }
}
