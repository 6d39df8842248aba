//! # OAPI Merger Core
//!
//! Turn a multi-file OpenAPI 3.x description into one self-contained document.
//!
//! A large API description is usually split across files: schemas in one
//! directory, shared responses in another, each referenced with `$ref`. Many tools
//! only accept a single file. This crate loads the root document and every file it
//! references, copies each referenced object into the root document's
//! `components`, and rewrites every reference to a local pointer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oapi_merger_core::{Merger, OutputFormat};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let merger = Merger::builder()
//!     .with_output_format(OutputFormat::Json)
//!     .build();
//!
//! let merged = merger.merge_file("api/openapi.yaml")?;
//! println!("{merged}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! The [`Merger`] runs four stages, each with its own error type:
//!
//! 1. **Load**: the [`Loader`] parses the root file (YAML or JSON), follows every
//!    `$ref`, and caches each file once by canonical path. See [`LoadError`].
//! 2. **Internalize**: the [`Internalizer`] hoists each external target into
//!    `components/{category}/{name}` and rewrites the references. See [`InternalizeError`].
//! 3. **Validate**: a [`Validator`] checks the result. See [`ValidationError`].
//! 4. **Serialize**: the document is encoded as YAML or JSON. See [`SerializationError`].
//!
//! Every stage error converts into [`MergeError`], and nothing is written unless
//! all stages succeed.
//!
//! ## Naming
//!
//! A hoisted component is named after the last token of its pointer, or after the
//! file name (without extension) when the reference targets a whole file:
//!
//! | Reference                              | Component name |
//! |----------------------------------------|----------------|
//! | `./schemas/pet.yaml`                   | `pet`          |
//! | `./common.yaml#/components/schemas/Id` | `Id`           |
//!
//! When the name is taken in its category, a numeric suffix is added: `error`,
//! `error2`, `error3`. Names already in the root document are never replaced.
//!
//! ## Identity
//!
//! Two references to the same file and pointer share one component, whatever the
//! relative path used to reach it. Cycles between external files terminate: the
//! second visit reuses the name given on the first.
//!
//! ## Working with stages directly
//!
//! ```rust,no_run
//! use oapi_merger_core::{Internalizer, Loader, OpenApiValidator, Validator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut loader = Loader::new();
//! let mut document = loader.load("api/openapi.yaml")?;
//!
//! let summary = Internalizer::new(loader.files()).internalize(&mut document)?;
//! println!("{} hoisted, {} rewritten", summary.hoisted, summary.rewritten);
//!
//! for violation in OpenApiValidator::default().validate(&document) {
//!     eprintln!("{violation}");
//! }
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod format;
mod internalize;
mod loader;
mod merger;
mod reference;
mod validate;

pub mod visit;

pub use self::document::{ComponentRegistry, Document};
pub use self::error::{
    InternalizeError, LoadError, MergeError, SerializationError, ValidationError,
};
pub use self::format::{OutputFormat, SourceFormat, UnsupportedFormat};
pub use self::internalize::{Internalizer, Summary, internalize};
pub use self::loader::{FileCache, LoadedFile, Loader, load};
pub use self::merger::{Merger, MergerBuilder};
pub use self::reference::{ComponentKind, RefTarget, local_reference};
pub use self::validate::{
    ComponentNamesRule, InfoRule, LocalReferencesRule, NoopValidator, OpenApiValidator,
    OperationIdRule, ParametersRule, PathTemplateRule, PathsRule, ResponsesRule, Rule, Validator,
    VersionRule, Violation,
};
