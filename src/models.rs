//! Core data models used throughout the stimulus harness.
//!
//! These types represent the documents and context items that flow through
//! the retrieval → selection → generation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters kept from a document body at ingestion.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Identifies which adapter (or synthetic tier) produced a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    AcademicIndex,
    Encyclopedia,
    NewsIndex,
    GovernmentIndex,
    Fallback,
    EducationalContent,
}

impl SourceTag {
    /// Stable identifier used in config files and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::AcademicIndex => "academic-index",
            SourceTag::Encyclopedia => "encyclopedia",
            SourceTag::NewsIndex => "news-index",
            SourceTag::GovernmentIndex => "government-index",
            SourceTag::Fallback => "fallback",
            SourceTag::EducationalContent => "educational-content",
        }
    }

    /// Human-readable name of the backing service, used in prompt context lines.
    pub fn label(&self) -> &'static str {
        match self {
            SourceTag::AcademicIndex => "OpenAlex",
            SourceTag::Encyclopedia => "Wikipedia",
            SourceTag::NewsIndex => "GDELT",
            SourceTag::GovernmentIndex => "GOV.UK",
            SourceTag::Fallback => "fallback",
            SourceTag::EducationalContent => "Educational Content",
        }
    }

    /// True for tags that never correspond to an external source.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, SourceTag::Fallback | SourceTag::EducationalContent)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of retrieved content.
///
/// Construct through [`Document::new`], which enforces the
/// [`MAX_TEXT_CHARS`] truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub title: String,
    pub url: String,
    pub source: SourceTag,
    pub published: Option<String>,
}

impl Document {
    pub fn new(
        text: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: SourceTag,
        published: Option<String>,
    ) -> Self {
        Self {
            text: truncate_chars(text.into().trim(), MAX_TEXT_CHARS),
            title: title.into(),
            url: url.into(),
            source,
            published,
        }
    }

    /// True if the body carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Metadata carried alongside a context item's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub url: String,
    pub source: SourceTag,
    pub published: Option<String>,
}

/// A unit of context handed from the selector to the prompt assembler.
///
/// `distance` is present only for items that came out of the
/// [`ContextStore`](crate::store::ContextStore) nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub distance: Option<f32>,
}

impl ContextItem {
    pub fn source(&self) -> SourceTag {
        self.metadata.source
    }
}

impl From<Document> for ContextItem {
    fn from(doc: Document) -> Self {
        Self {
            text: doc.text,
            metadata: DocumentMetadata {
                title: doc.title,
                url: doc.url,
                source: doc.source,
                published: doc.published,
            },
            distance: None,
        }
    }
}

/// Which rung of the fallback ladder produced the selected context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTier {
    /// Nearest-neighbor results from the context store.
    VectorSearch,
    /// First deduplicated documents, insertion order.
    RawDocuments,
    /// Single synthetic document built from the topic.
    Placeholder,
}

impl fmt::Display for ContextTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextTier::VectorSearch => "vector-search",
            ContextTier::RawDocuments => "raw-documents",
            ContextTier::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

/// Truncate `s` to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text_truncated() {
        let doc = Document::new("x".repeat(2500), "t", "", SourceTag::NewsIndex, None);
        assert_eq!(doc.text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "é".repeat(5);
        assert_eq!(truncate_chars(&s, 3), "ééé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_source_tag_serde_matches_as_str() {
        let json = serde_json::to_string(&SourceTag::GovernmentIndex).unwrap();
        assert_eq!(json, "\"government-index\"");
        let tag: SourceTag = serde_json::from_str("\"academic-index\"").unwrap();
        assert_eq!(tag, SourceTag::AcademicIndex);
    }

    #[test]
    fn test_synthetic_tags() {
        assert!(SourceTag::Fallback.is_synthetic());
        assert!(SourceTag::EducationalContent.is_synthetic());
        assert!(!SourceTag::Encyclopedia.is_synthetic());
    }

    #[test]
    fn test_context_item_from_document() {
        let doc = Document::new(
            "body",
            "Title",
            "https://a",
            SourceTag::AcademicIndex,
            Some("2024-01-01".into()),
        );
        let item = ContextItem::from(doc);
        assert_eq!(item.text, "body");
        assert_eq!(item.metadata.url, "https://a");
        assert_eq!(item.source(), SourceTag::AcademicIndex);
        assert!(item.distance.is_none());
    }
}
