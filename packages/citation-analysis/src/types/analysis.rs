//! Structured analysis output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::{CompanyId, ResponseId};
use crate::error::FailureKind;

/// Ownership category of a cited source, relative to the analysed company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// The company's own domain
    Owned,
    /// A named competitor's domain
    Competitor,
    /// Review sites, forums, communities
    Ugc,
    /// Everything else (press, blogs, directories)
    #[default]
    Earned,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Owned => "OWNED",
            SourceType::Competitor => "COMPETITOR",
            SourceType::Ugc => "UGC",
            SourceType::Earned => "EARNED",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the response says the company offers the feature asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeaturePresence {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl FeaturePresence {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "YES" => Some(FeaturePresence::Yes),
            "NO" => Some(FeaturePresence::No),
            "N/A" => Some(FeaturePresence::NotApplicable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionAnalysis {
    pub has_feature: FeaturePresence,
}

/// A citation URL with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCitation {
    pub url: String,
    pub source_type: SourceType,
}

/// One structured judgement per response.
///
/// At most one record exists per response id; writing again overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub response_id: ResponseId,
    pub company_mentioned: bool,
    pub mentioned_companies: Vec<String>,
    pub rank_list: Option<String>,
    /// Only set when the model returned a well-typed integer
    pub ranking_position: Option<i64>,
    pub sentiment_score: Option<f64>,
    pub solution_analysis: Option<SolutionAnalysis>,
    #[serde(default)]
    pub classified_citations: Vec<ClassifiedCitation>,
}

impl AnalysisRecord {
    /// Record with no mention and no citations.
    pub fn empty(response_id: ResponseId) -> Self {
        Self {
            response_id,
            company_mentioned: false,
            mentioned_companies: Vec::new(),
            rank_list: None,
            ranking_position: None,
            sentiment_score: None,
            solution_analysis: None,
            classified_citations: Vec::new(),
        }
    }

    /// Count citations of one source type.
    pub fn citations_of(&self, source_type: SourceType) -> usize {
        self.classified_citations
            .iter()
            .filter(|c| c.source_type == source_type)
            .count()
    }
}

/// Audit row written when a work unit fails permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAudit {
    pub response_id: ResponseId,
    pub company_id: CompanyId,
    pub attempts: u32,
    pub kind: FailureKind,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_wire_names() {
        assert_eq!(serde_json::to_string(&SourceType::Ugc).unwrap(), "\"UGC\"");
        assert_eq!(
            serde_json::to_string(&SourceType::Competitor).unwrap(),
            "\"COMPETITOR\""
        );
        for source_type in [
            SourceType::Owned,
            SourceType::Competitor,
            SourceType::Ugc,
            SourceType::Earned,
        ] {
            let json = serde_json::to_string(&source_type).unwrap();
            assert_eq!(json, format!("\"{source_type}\""));
        }
        let stored: SourceType = serde_json::from_str("\"OWNED\"").unwrap();
        assert_eq!(stored, SourceType::Owned);
        assert!(serde_json::from_str::<SourceType>("\"garbage\"").is_err());
        assert_eq!(SourceType::default(), SourceType::Earned);
    }

    #[test]
    fn test_feature_presence_wire_names() {
        let analysis = SolutionAnalysis {
            has_feature: FeaturePresence::NotApplicable,
        };
        let json = serde_json::to_value(analysis).unwrap();
        assert_eq!(json, serde_json::json!({"hasFeature": "N/A"}));
        assert_eq!(FeaturePresence::parse("YES"), Some(FeaturePresence::Yes));
        assert_eq!(FeaturePresence::parse("yes"), None);
    }

    #[test]
    fn test_citations_of() {
        let mut record = AnalysisRecord::empty(1);
        record.classified_citations = vec![
            ClassifiedCitation {
                url: "https://reddit.com/r/x".into(),
                source_type: SourceType::Ugc,
            },
            ClassifiedCitation {
                url: "https://acme.com".into(),
                source_type: SourceType::Owned,
            },
            ClassifiedCitation {
                url: "https://quora.com/q".into(),
                source_type: SourceType::Ugc,
            },
        ];
        assert_eq!(record.citations_of(SourceType::Ugc), 2);
        assert_eq!(record.citations_of(SourceType::Earned), 0);
    }
}
