//! The unit of extraction: one quote with attribution and tags
//!
//! Records are validated at construction rather than at storage time.
//! Identity for deduplication is the `(text, author)` pair; tags never
//! participate in identity.

use thiserror::Error;

/// Errors raised when constructing a [`Record`] from extracted fields
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Quote text is empty")]
    EmptyText,

    #[error("Quote author is empty")]
    EmptyAuthor,
}

/// One extracted quote: text, attribution, and ordered category tags
///
/// Fields are private so a `Record` can only exist with non-empty text
/// and author. Tag order matches document order on the source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    text: String,
    author: String,
    tags: Vec<String>,
}

impl Record {
    /// Builds a record, trimming whitespace and rejecting empty text/author
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self, RecordError> {
        let text = text.into().trim().to_string();
        let author = author.into().trim().to_string();

        if text.is_empty() {
            return Err(RecordError::EmptyText);
        }
        if author.is_empty() {
            return Err(RecordError::EmptyAuthor);
        }

        Ok(Self { text, author, tags })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The deduplication key: two records with the same pair are the same
    /// logical entity regardless of tag differences.
    pub fn key(&self) -> (&str, &str) {
        (&self.text, &self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = Record::new(
            "The world as we have created it is a process of our thinking.",
            "Albert Einstein",
            vec!["change".to_string(), "deep-thoughts".to_string()],
        )
        .unwrap();

        assert_eq!(record.author(), "Albert Einstein");
        assert_eq!(record.tags().len(), 2);
        assert_eq!(record.tags()[0], "change");
    }

    #[test]
    fn test_whitespace_trimmed() {
        let record = Record::new("  some text  ", "  Someone  ", vec![]).unwrap();
        assert_eq!(record.text(), "some text");
        assert_eq!(record.author(), "Someone");
    }

    #[test]
    fn test_empty_text_rejected() {
        let result = Record::new("", "Someone", vec![]);
        assert_eq!(result.unwrap_err(), RecordError::EmptyText);
    }

    #[test]
    fn test_whitespace_only_text_rejected() {
        let result = Record::new("   ", "Someone", vec![]);
        assert_eq!(result.unwrap_err(), RecordError::EmptyText);
    }

    #[test]
    fn test_empty_author_rejected() {
        let result = Record::new("some text", "", vec![]);
        assert_eq!(result.unwrap_err(), RecordError::EmptyAuthor);
    }

    #[test]
    fn test_empty_tags_allowed() {
        let record = Record::new("some text", "Someone", vec![]).unwrap();
        assert!(record.tags().is_empty());
    }

    #[test]
    fn test_key_ignores_tags() {
        let a = Record::new("text", "author", vec!["x".to_string()]).unwrap();
        let b = Record::new("text", "author", vec!["y".to_string()]).unwrap();
        assert_eq!(a.key(), b.key());
    }
}
