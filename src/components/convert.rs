//! Plain-text conversion.

use std::path::Path;

use anyhow::{Context, Result};

use crate::context::RunContext;
use crate::ports::Converter;
use crate::types::{ContentType, Document, DocumentBytes, Page};

/// Decodes UTF-8 bytes into a single-page text document. The document id is
/// the source file stem, falling back to the full path.
#[derive(Debug, Default)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for PlainTextConverter {
    fn convert(&self, document_bytes: DocumentBytes, _ctx: &RunContext) -> Result<Document> {
        let DocumentBytes {
            path_identifier,
            bytes,
            mime_type: _,
            metadata,
        } = document_bytes;

        let content = String::from_utf8(bytes).with_context(|| {
            format!("document {} is not valid UTF-8", path_identifier.key())
        })?;

        let id = Path::new(&path_identifier.path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path_identifier.path.clone());

        let document = Document::new(
            id,
            path_identifier,
            ContentType::Text,
            vec![Page::text(1, content)],
            metadata,
        )?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageData, PathIdentifier};

    #[test]
    fn test_converts_utf8_to_single_text_page() {
        let bytes = DocumentBytes::new(
            PathIdentifier::new("docs/lease.txt"),
            "first page".as_bytes().to_vec(),
            "text/plain",
        );

        let ctx = RunContext::new();
        let document = PlainTextConverter::new().convert(bytes, &ctx).unwrap();

        assert_eq!(document.id(), "lease");
        assert_eq!(document.content_type(), ContentType::Text);
        assert_eq!(document.pages().len(), 1);
        assert_eq!(document.pages()[0].page_number, 1);
        match &document.pages()[0].data {
            PageData::Text { content } => assert_eq!(content, "first page"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let bytes = DocumentBytes::new(
            PathIdentifier::new("bad.txt"),
            vec![0xFF, 0xFE, 0x00],
            "text/plain",
        );

        let ctx = RunContext::new();
        let result = PlainTextConverter::new().convert(bytes, &ctx);
        assert!(result.is_err());
    }
}
