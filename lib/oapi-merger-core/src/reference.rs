//! References between documents.
//!
//! A `$ref` string is split into an optional file part and a JSON pointer
//! (RFC 6901) carried in a percent-encoded URI fragment. Once the file part is
//! resolved against the referencing file, the pair becomes a [`RefTarget`]: the
//! canonical identity of the referenced object.

use std::fmt;
use std::path::{Path, PathBuf};

use jsonptr::{Pointer, PointerBuf};
use percent_encoding::percent_decode_str;
use url::Url;

/// The categories of the root document's component registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// `components/schemas`
    Schemas,
    /// `components/parameters`
    Parameters,
    /// `components/responses`
    Responses,
    /// `components/headers`
    Headers,
    /// `components/requestBodies`
    RequestBodies,
    /// `components/securitySchemes`
    SecuritySchemes,
    /// `components/links`
    Links,
    /// `components/callbacks`
    Callbacks,
    /// `components/examples`
    Examples,
}

impl ComponentKind {
    /// Every category, in the order OpenAPI lists them.
    pub const ALL: [Self; 9] = [
        Self::Schemas,
        Self::Responses,
        Self::Parameters,
        Self::Examples,
        Self::RequestBodies,
        Self::Headers,
        Self::SecuritySchemes,
        Self::Links,
        Self::Callbacks,
    ];

    /// The key of this category under `components`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Parameters => "parameters",
            Self::Responses => "responses",
            Self::Headers => "headers",
            Self::RequestBodies => "requestBodies",
            Self::SecuritySchemes => "securitySchemes",
            Self::Links => "links",
            Self::Callbacks => "callbacks",
            Self::Examples => "examples",
        }
    }

    /// Finds the category for a `components` key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    /// The pointer of a component in the root document: `/components/{kind}/{name}`.
    pub fn pointer(self, name: &str) -> PointerBuf {
        PointerBuf::from_tokens(["components", self.as_str(), name])
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical identity of a referenced object: an absolute file path and an in-file pointer.
///
/// Two reference strings denote the same object exactly when they resolve to the same target,
/// whatever their spelling (`a.yaml`, `./a.yaml#`, `../dir/a.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefTarget {
    file: PathBuf,
    pointer: PointerBuf,
}

impl RefTarget {
    /// Creates a target. The file path should already be canonical.
    pub fn new(file: impl Into<PathBuf>, pointer: PointerBuf) -> Self {
        Self {
            file: file.into(),
            pointer,
        }
    }

    /// The absolute path of the file holding the object.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The pointer of the object inside its file.
    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// The component name this target suggests.
    ///
    /// This is the last pointer token (`common.yaml#/components/schemas/Error` gives `Error`),
    /// or the file name without its extension when the target is a whole file
    /// (`errors/not-found.yaml` gives `not-found`).
    pub fn suggested_name(&self) -> String {
        if let Some(token) = self.pointer.last() {
            return token.decoded().into_owned();
        }
        self.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.pointer)
    }
}

/// Builds the `$ref` string of a pointer into the root document.
pub fn local_reference(pointer: &Pointer) -> String {
    format!("#{pointer}")
}

/// A `$ref` string split into parts, before its file part is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawReference {
    /// The file part, `None` for a reference into the referencing file itself.
    pub(crate) file: Option<PathBuf>,
    /// The decoded in-file pointer.
    pub(crate) pointer: PointerBuf,
}

/// Why a `$ref` string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawReferenceError {
    /// The reference points at a non-`file:` URL.
    Remote,
    /// The reference is malformed.
    Invalid(String),
}

impl RawReference {
    /// Splits a `$ref` string into its file and pointer parts.
    pub(crate) fn parse(reference: &str) -> Result<Self, RawReferenceError> {
        let (location, fragment) = match reference.split_once('#') {
            Some((location, fragment)) => (location, Some(fragment)),
            None => (reference, None),
        };

        let file = if location.is_empty() {
            None
        } else {
            Some(parse_location(location)?)
        };

        let pointer = match fragment {
            None | Some("") => PointerBuf::new(),
            Some(fragment) => {
                let decoded = decode(fragment)?;
                Pointer::parse(&decoded)
                    .map_err(|err| {
                        RawReferenceError::Invalid(format!("invalid pointer '{decoded}': {err}"))
                    })?
                    .to_buf()
            }
        };

        Ok(Self { file, pointer })
    }

    /// Returns `true` when the reference stays inside the referencing file.
    pub(crate) fn is_same_file(&self) -> bool {
        self.file.is_none()
    }
}

fn parse_location(location: &str) -> Result<PathBuf, RawReferenceError> {
    // single letter schemes are Windows drive letters
    if let Ok(url) = Url::parse(location)
        && url.scheme().len() > 1
    {
        if url.scheme() != "file" {
            return Err(RawReferenceError::Remote);
        }
        return url
            .to_file_path()
            .map_err(|()| RawReferenceError::Invalid(format!("invalid file URL '{location}'")));
    }

    decode(location).map(PathBuf::from)
}

fn decode(input: &str) -> Result<String, RawReferenceError> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| RawReferenceError::Invalid(format!("invalid percent-encoding: {err}")))
}
