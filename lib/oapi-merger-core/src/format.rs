//! Input and output encodings.
//!
//! Input files are YAML or JSON, detected per file. The merged document is
//! written as YAML (through serde-saphyr) or JSON (through serde_json), both
//! indented with two spaces and ending with a single newline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::SerializationError;

/// The encoding of a loaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// YAML, the default for unknown extensions.
    Yaml,
    /// JSON.
    Json,
}

impl SourceFormat {
    /// Detects the format from the file extension, falling back on the content.
    pub fn detect(path: &Path, content: &str) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ if content.trim_start().starts_with('{') => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Parses the content into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the parser message when the content is not valid in this format.
    pub fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|err| err.to_string()),
            Self::Yaml => serde_saphyr::from_str::<YamlValue>(content)
                .map(|YamlValue(value)| value)
                .map_err(|err| err.to_string()),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("YAML"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// A YAML node read into a JSON value.
///
/// YAML mapping keys may be plain integers or booleans (`200:` under `responses`),
/// they are kept as their string form.
struct YamlValue(Value);

/// A YAML mapping key read as a string.
struct YamlKey(String);

impl<'de> Deserialize<'de> for YamlValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(YamlValueVisitor)
    }
}

impl<'de> Deserialize<'de> for YamlKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(YamlValueVisitor)
            .and_then(|YamlValue(value)| match value {
                Value::String(key) => Ok(Self(key)),
                Value::Bool(_) | Value::Number(_) => Ok(Self(value.to_string())),
                Value::Null => Ok(Self("null".to_string())),
                Value::Array(_) | Value::Object(_) => {
                    Err(de::Error::custom("mapping keys must be scalars"))
                }
            })
    }
}

struct YamlValueVisitor;

impl<'de> Visitor<'de> for YamlValueVisitor {
    type Value = YamlValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a YAML value")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::Bool(value)))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::from(value)))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::from(value)))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(YamlValue(Number::from_f64(value).map_or(Value::Null, Value::Number)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::String(value.to_string())))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::String(value)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::Null))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(YamlValue(Value::Null))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        YamlValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(YamlValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(YamlValue(Value::Array(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut object = Map::new();
        while let Some((YamlKey(key), YamlValue(value))) = map.next_entry()? {
            object.insert(key, value);
        }
        Ok(YamlValue(Value::Object(object)))
    }
}

/// The encoding of the merged document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// YAML output.
    #[default]
    Yaml,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Encodes a value.
    ///
    /// Maps keep their insertion order, so encoding the same document twice
    /// gives the same bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the encoder fails.
    pub fn serialize<T: Serialize>(self, value: &T) -> Result<String, SerializationError> {
        let mut output = match self {
            Self::Json => serde_json::to_string_pretty(value)?,
            Self::Yaml => {
                serde_saphyr::to_string(value).map_err(|err| SerializationError::Yaml {
                    message: err.to_string(),
                })?
            }
        };
        if !output.ends_with('\n') {
            output.push('\n');
        }
        Ok(output)
    }

    /// The usual file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An output format name was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
#[display("unsupported output format: {value}, expected 'yaml' or 'json'")]
pub struct UnsupportedFormat {
    /// The rejected name.
    pub value: String,
}

impl FromStr for OutputFormat {
    type Err = UnsupportedFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(UnsupportedFormat {
                value: value.to_string(),
            }),
        }
    }
}
