//! Request/response types shared with the HTTP layer and the level router.

use serde::{Deserialize, Serialize};

use crate::level::{Level, ResolvedLevel};

/// One question. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// Fills fields absent here from `other` (e.g. query params under a body).
    pub fn or(self, other: QueryRequest) -> Self {
        Self {
            question: if self.question.trim().is_empty() {
                other.question
            } else {
                self.question
            },
            top_k: self.top_k.or(other.top_k),
            max_output_tokens: self.max_output_tokens.or(other.max_output_tokens),
            level: self.level.or(other.level),
        }
    }
}

/// Where a statement in the answer came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_file: String,
    pub page_start: u32,
    pub page_end: u32,
    pub score: f32,
    pub snippet: String,
}

/// Final answer together with its citations and the exact prompt sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub prompt: String,
    pub level: ResolvedLevel,
    pub used_top_k: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ignores_unknown_fields_and_merges() {
        let body: QueryRequest =
            serde_json::from_str(r#"{"question":"q","debug":true,"level":"Summary"}"#).unwrap();
        assert_eq!(body.level, Some(Level::Summary));

        let params = QueryRequest {
            question: "ignored".into(),
            top_k: Some(3),
            ..QueryRequest::default()
        };
        let merged = body.or(params);
        assert_eq!(merged.question, "q");
        assert_eq!(merged.top_k, Some(3));

        let empty: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.question.is_empty());
    }
}
