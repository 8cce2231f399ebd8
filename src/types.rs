//! Domain types carried through the pipeline stages.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

/// Bound for caller-defined extraction schemas.
///
/// Blanket-implemented: any serde-able, cloneable, thread-safe type is a
/// schema. The type parameter itself is the schema definition, so stage calls
/// carry no runtime schema argument.
pub trait ExtractionSchema: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> ExtractionSchema for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{}

/// Opaque reference to a document source. Identity key for a unit of work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathIdentifier {
    pub path: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl PathIdentifier {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Key under which the orchestrator tracks this unit of work.
    pub fn key(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for PathIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Raw document payload produced by a [`crate::ports::Reader`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentBytes {
    pub path_identifier: PathIdentifier,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl DocumentBytes {
    pub fn new(path_identifier: PathIdentifier, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            path_identifier,
            bytes,
            mime_type: mime_type.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Declared payload kind of a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => f.write_str("text"),
            ContentType::Image => f.write_str("image"),
        }
    }
}

/// Payload of a single page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageData {
    Text { content: String },
    Image { bytes: Vec<u8> },
}

impl PageData {
    pub fn content_type(&self) -> ContentType {
        match self {
            PageData::Text { .. } => ContentType::Text,
            PageData::Image { .. } => ContentType::Image,
        }
    }
}

/// A single page within a document. Page numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub data: PageData,
}

impl Page {
    pub fn text(page_number: u32, content: impl Into<String>) -> Self {
        Self {
            page_number,
            data: PageData::Text {
                content: content.into(),
            },
        }
    }

    pub fn image(page_number: u32, bytes: Vec<u8>) -> Self {
        Self {
            page_number,
            data: PageData::Image { bytes },
        }
    }
}

/// A fully parsed document.
///
/// Construction validates that every page payload matches the declared
/// content type; fields are private so the invariant cannot be bypassed.
#[derive(Clone, Debug, Serialize)]
pub struct Document {
    id: String,
    path_identifier: PathIdentifier,
    content_type: ContentType,
    pages: Vec<Page>,
    metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        path_identifier: PathIdentifier,
        content_type: ContentType,
        pages: Vec<Page>,
        metadata: HashMap<String, Value>,
    ) -> Result<Self, DocumentError> {
        let id = id.into();
        for page in &pages {
            if page.page_number == 0 {
                return Err(DocumentError::ZeroPageNumber { document_id: id });
            }
            let found = page.data.content_type();
            if found != content_type {
                return Err(DocumentError::ContentTypeMismatch {
                    document_id: id,
                    page_number: page.page_number,
                    declared: content_type,
                    found,
                });
            }
        }
        Ok(Self {
            id,
            path_identifier,
            content_type,
            pages,
            metadata,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path_identifier(&self) -> &PathIdentifier {
        &self.path_identifier
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }
}

/// Structured output of an [`crate::ports::Extractor`] call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionResult<S> {
    pub data: S,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl<S> ExtractionResult<S> {
    pub fn new(data: S) -> Self {
        Self {
            data,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Ground-truth pairing consumed by the evaluation pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationExample<S> {
    pub id: String,
    pub path_identifier: PathIdentifier,
    pub truth: ExtractionResult<S>,
}

impl<S> EvaluationExample<S> {
    pub fn new(id: impl Into<String>, path_identifier: PathIdentifier, truth: ExtractionResult<S>) -> Self {
        Self {
            id: id.into(),
            path_identifier,
            truth,
        }
    }
}

/// One metric computed by one evaluator for one example.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub name: String,
    pub result: f64,
    pub description: String,
}
