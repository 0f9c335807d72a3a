//! JSON bundle format for exchanging attestations.
//!
//! ```json
//! {
//!   "comment": "Downloaded from attest-with.eth - Verify at https://attest-with.eth.link",
//!   "content": "<statement>",
//!   "attestations": [{ "account": "0x...", "signature": "0x..." }],
//!   "version": 1
//! }
//! ```
//!
//! Reading is strict about types and names the offending field on failure.
//! The tolerated defaults are a missing (or `null`) `content`, read as an
//! empty statement, and a missing (or `null`) `attestations` array.
//! `version` is advisory: other values are accepted with a warning.
//! Unknown top-level fields are kept in [`Bundle::extra`] and written back out.

use crate::attestation::AttestationEntry;
use crate::account::AccountId;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Current bundle schema version
pub const BUNDLE_VERSION: u64 = 1;

/// Provenance note written into every exported bundle
pub const BUNDLE_COMMENT: &str =
    "Downloaded from attest-with.eth - Verify at https://attest-with.eth.link";

/// Exported file name without extension
pub const BUNDLE_FILE_STEM: &str = "attest";

/// Exported file extension
pub const BUNDLE_FILE_EXTENSION: &str = "json";

const RESERVED_FIELDS: [&str; 4] = ["comment", "content", "attestations", "version"];

/// Malformed bundle input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleFormatError {
    /// Not parseable as JSON at all
    #[error("bundle is not valid JSON: {0}")]
    Syntax(String),

    /// Root value is not an object
    #[error("bundle root must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` must be {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },
}

impl BundleFormatError {
    /// Name of the offending field (`$` for the root), if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Syntax(_) => None,
            Self::NotAnObject => Some("$"),
            Self::MissingField { field } | Self::InvalidType { field, .. } => Some(field),
        }
    }

    fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected,
        }
    }
}

/// A statement with its collected attestations, in exchangeable form.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    content: String,
    attestations: Vec<AttestationEntry>,
    version: u64,
    extra: Map<String, Value>,
}

impl Bundle {
    /// Bundle at the current schema version
    pub fn new(content: impl Into<String>, attestations: Vec<AttestationEntry>) -> Self {
        Self {
            content: content.into(),
            attestations,
            version: BUNDLE_VERSION,
            extra: Map::new(),
        }
    }

    /// Attach unknown fields to carry through. Reserved names are dropped.
    pub fn with_extra(mut self, mut extra: Map<String, Value>) -> Self {
        for field in RESERVED_FIELDS {
            extra.remove(field);
        }
        self.extra = extra;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attestations(&self) -> &[AttestationEntry] {
        &self.attestations
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Top-level fields this version does not understand
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Split into `(content, attestations)`
    pub fn into_parts(self) -> (String, Vec<AttestationEntry>) {
        (self.content, self.attestations)
    }

    /// File name used for exports (`attest.json`)
    pub fn file_name() -> String {
        format!("{BUNDLE_FILE_STEM}.{BUNDLE_FILE_EXTENSION}")
    }

    /// Parse raw file bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BundleFormatError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| BundleFormatError::Syntax(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, BundleFormatError> {
        let Value::Object(mut root) = value else {
            return Err(BundleFormatError::NotAnObject);
        };

        let content = match root.remove("content") {
            Some(Value::String(content)) => content,
            None | Some(Value::Null) => String::new(),
            Some(_) => return Err(BundleFormatError::invalid("content", "a string")),
        };

        let attestations = match root.remove("attestations") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| parse_entry(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(BundleFormatError::invalid("attestations", "an array")),
        };

        let version = match root.remove("version") {
            None => BUNDLE_VERSION,
            Some(value) => value
                .as_u64()
                .ok_or_else(|| BundleFormatError::invalid("version", "a non-negative integer"))?,
        };
        if version != BUNDLE_VERSION {
            warn!(
                version,
                supported = BUNDLE_VERSION,
                "bundle has unknown version, reading as version 1"
            );
        }

        root.remove("comment");

        Ok(Self {
            content,
            attestations,
            version,
            extra: root,
        })
    }

    /// Pretty-printed JSON, as written to `attest.json`.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn parse_entry(index: usize, item: Value) -> Result<AttestationEntry, BundleFormatError> {
    let Value::Object(mut fields) = item else {
        return Err(BundleFormatError::invalid(
            format!("attestations[{index}]"),
            "an object",
        ));
    };

    let mut string_field = |name: &str| match fields.remove(name) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(BundleFormatError::invalid(
            format!("attestations[{index}].{name}"),
            "a string",
        )),
        None => Err(BundleFormatError::missing(format!(
            "attestations[{index}].{name}"
        ))),
    };

    let account = string_field("account")?;
    let signature = string_field("signature")?;
    Ok(AttestationEntry::new(AccountId::new(account), signature))
}

/// Wire layout: field order matches the files the web app produces.
#[derive(Serialize)]
struct WireBundle<'a> {
    comment: &'static str,
    content: &'a str,
    attestations: &'a [AttestationEntry],
    version: u64,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl Serialize for Bundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireBundle {
            comment: BUNDLE_COMMENT,
            content: &self.content,
            attestations: &self.attestations,
            version: self.version,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}
