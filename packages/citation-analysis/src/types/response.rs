//! Raw answer-engine responses and the company they are analysed for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a raw response row.
pub type ResponseId = i64;

/// Identifier of the company under analysis.
pub type CompanyId = i64;

/// A free-text answer produced by an AI answer engine.
///
/// Owned by the ingestion system; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: ResponseId,
    pub company_id: CompanyId,
    pub query_id: i64,
    /// Answer engine that produced the text (e.g. "chatgpt", "perplexity")
    pub engine: String,
    pub text: String,
    /// URLs the engine cited alongside its answer
    #[serde(default)]
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Response {
    /// Create a response with no citations, timestamped now.
    pub fn new(
        id: ResponseId,
        company_id: CompanyId,
        engine: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            company_id,
            query_id: 0,
            engine: engine.into(),
            text: text.into(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the originating query id.
    pub fn with_query_id(mut self, query_id: i64) -> Self {
        self.query_id = query_id;
        self
    }

    /// Add a cited URL.
    pub fn with_citation(mut self, url: impl Into<String>) -> Self {
        self.citations.push(url.into());
        self
    }

    /// Add multiple cited URLs.
    pub fn with_citations(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.citations.extend(urls.into_iter().map(|u| u.into()));
        self
    }

    /// Override the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// The company under analysis and the competitors it is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub competitors: Vec<String>,
}

impl CompanyProfile {
    pub fn new(id: CompanyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            competitors: Vec::new(),
        }
    }

    /// Add competitor names, in priority order.
    pub fn with_competitors(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.competitors.extend(names.into_iter().map(|n| n.into()));
        self
    }
}

/// Inclusive range of response ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: ResponseId,
    pub end: ResponseId,
}

impl IdRange {
    pub fn new(start: ResponseId, end: ResponseId) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one id.
    pub fn single(id: ResponseId) -> Self {
        Self { start: id, end: id }
    }

    pub fn contains(&self, id: ResponseId) -> bool {
        id >= self.start && id <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_range_is_inclusive() {
        let range = IdRange::new(100, 103);
        assert!(range.contains(100));
        assert!(range.contains(103));
        assert!(!range.contains(99));
        assert!(!range.contains(104));
        assert!(!range.is_empty());
        assert!(IdRange::new(5, 4).is_empty());
        assert!(IdRange::single(7).contains(7));
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = Response::new(1, 2, "perplexity", "text").with_citation("https://a.com");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["companyId"], 2);
        assert_eq!(json["citations"][0], "https://a.com");
    }
}
