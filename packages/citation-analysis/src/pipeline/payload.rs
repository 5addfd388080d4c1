//! Parse and validate the completion service's JSON payload.
//!
//! Policy is reject-and-report: a payload with a missing key or a wrongly
//! typed value is a validation failure, never coerced into a guess.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{AnalysisRecord, ClassifiedCitation, FeaturePresence, ResponseId, SolutionAnalysis};

/// The model's judgement, after shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPayload {
    pub company_mentioned: bool,
    pub mentioned_companies: Vec<String>,
    pub rank_list: Option<String>,
    pub ranking_position: Option<i64>,
    pub sentiment_score: Option<f64>,
    pub solution_analysis: Option<SolutionAnalysis>,
}

impl AnalysisPayload {
    /// Compose the record for `response_id` with classified citations attached.
    pub fn into_record(
        self,
        response_id: ResponseId,
        classified_citations: Vec<ClassifiedCitation>,
    ) -> AnalysisRecord {
        AnalysisRecord {
            response_id,
            company_mentioned: self.company_mentioned,
            mentioned_companies: self.mentioned_companies,
            rank_list: self.rank_list,
            ranking_position: self.ranking_position,
            sentiment_score: self.sentiment_score,
            solution_analysis: self.solution_analysis,
            classified_citations,
        }
    }
}

/// Parse a raw completion payload.
///
/// A surrounding Markdown code fence is tolerated; nothing else is repaired.
pub fn parse_analysis_payload(raw: &str) -> Result<AnalysisPayload, ValidationError> {
    let value: Value = serde_json::from_str(raw)
        .or_else(|_| {
            // Try to extract JSON from markdown code block
            let json_str = raw
                .trim()
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim();
            serde_json::from_str(json_str)
        })
        .map_err(|e: serde_json::Error| ValidationError::NotJson(e.to_string()))?;

    validate_payload(&value)
}

/// Validate an already-parsed JSON value.
pub fn validate_payload(value: &Value) -> Result<AnalysisPayload, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let company_mentioned = match required(obj, "companyMentioned")? {
        Value::Bool(b) => *b,
        _ => return Err(wrong_type("companyMentioned", "a boolean")),
    };

    let mentioned_companies = match required(obj, "mentionedCompanies")? {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(wrong_type("mentionedCompanies", "a list of strings")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(wrong_type("mentionedCompanies", "a list of strings")),
    };

    let rank_list = match required(obj, "rankList")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        _ => return Err(wrong_type("rankList", "a string or null")),
    };

    let ranking_position = match required(obj, "rankingPosition")? {
        Value::Null => None,
        Value::Number(n) => match n.as_i64() {
            Some(position) => Some(position),
            None => return Err(wrong_type("rankingPosition", "an integer or null")),
        },
        _ => return Err(wrong_type("rankingPosition", "an integer or null")),
    };

    let sentiment_score = match obj.get("sentimentScore") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => return Err(wrong_type("sentimentScore", "a number or null")),
    };

    let solution_analysis = match obj.get("solutionAnalysis") {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(parse_solution_analysis(inner)?),
        Some(_) => return Err(wrong_type("solutionAnalysis", "an object or null")),
    };

    Ok(AnalysisPayload {
        company_mentioned,
        mentioned_companies,
        rank_list,
        ranking_position,
        sentiment_score,
        solution_analysis,
    })
}

fn parse_solution_analysis(inner: &Map<String, Value>) -> Result<SolutionAnalysis, ValidationError> {
    let raw = match inner.get("hasFeature") {
        None => return Err(ValidationError::MissingField("solutionAnalysis.hasFeature")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(wrong_type("solutionAnalysis.hasFeature", "a string")),
    };

    let has_feature = FeaturePresence::parse(raw).ok_or_else(|| ValidationError::InvalidValue {
        field: "solutionAnalysis.hasFeature",
        value: raw.clone(),
    })?;

    Ok(SolutionAnalysis { has_feature })
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    obj.get(field).ok_or(ValidationError::MissingField(field))
}

fn wrong_type(field: &'static str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType { field, expected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "companyMentioned": true,
            "mentionedCompanies": ["Beta", "Acme"],
            "rankList": "1. Beta\n2. Acme",
            "rankingPosition": 2
        })
    }

    fn with(key: &str, value: Value) -> Value {
        let mut v = valid();
        v[key] = value;
        v
    }

    fn without(key: &str) -> Value {
        let mut v = valid();
        v.as_object_mut().unwrap().remove(key);
        v
    }

    #[test]
    fn test_valid_payload_mirrors_fields() {
        let payload = validate_payload(&valid()).unwrap();
        assert!(payload.company_mentioned);
        assert_eq!(payload.mentioned_companies, vec!["Beta", "Acme"]);
        assert_eq!(payload.rank_list.as_deref(), Some("1. Beta\n2. Acme"));
        assert_eq!(payload.ranking_position, Some(2));
        assert_eq!(payload.sentiment_score, None);
        assert_eq!(payload.solution_analysis, None);
    }

    #[test]
    fn test_nulls_are_accepted() {
        let v = json!({
            "companyMentioned": false,
            "mentionedCompanies": [],
            "rankList": null,
            "rankingPosition": null,
            "sentimentScore": null,
            "solutionAnalysis": null
        });
        let payload = validate_payload(&v).unwrap();
        assert!(!payload.company_mentioned);
        assert!(payload.mentioned_companies.is_empty());
        assert_eq!(payload.rank_list, None);
        assert_eq!(payload.ranking_position, None);
    }

    #[test]
    fn test_optional_fields() {
        let mut v = valid();
        v["sentimentScore"] = json!(0.75);
        v["solutionAnalysis"] = json!({"hasFeature": "N/A"});
        let payload = validate_payload(&v).unwrap();
        assert_eq!(payload.sentiment_score, Some(0.75));
        assert_eq!(
            payload.solution_analysis,
            Some(SolutionAnalysis {
                has_feature: FeaturePresence::NotApplicable
            })
        );
    }

    #[test]
    fn test_missing_required_keys() {
        for key in ["companyMentioned", "mentionedCompanies", "rankList", "rankingPosition"] {
            let err = validate_payload(&without(key)).unwrap_err();
            assert!(
                matches!(err, ValidationError::MissingField(field) if field == key),
                "{key}: {err:?}"
            );
        }
    }

    #[test]
    fn test_wrong_types_are_rejected_not_coerced() {
        let cases = [
            ("companyMentioned", json!("true")),
            ("companyMentioned", json!(1)),
            ("mentionedCompanies", json!("Beta, Acme")),
            ("mentionedCompanies", json!(["Beta", 3])),
            ("rankList", json!(["1. Beta"])),
            ("rankingPosition", json!("2")),
            ("rankingPosition", json!(2.0)),
            ("rankingPosition", json!(2.5)),
            ("rankingPosition", json!(true)),
            ("sentimentScore", json!("positive")),
            ("solutionAnalysis", json!("YES")),
        ];

        for (key, bad) in cases {
            let err = validate_payload(&with(key, bad.clone())).unwrap_err();
            assert!(
                matches!(err, ValidationError::WrongType { field, .. } if field == key),
                "{key}={bad}: {err:?}"
            );
        }
    }

    #[test]
    fn test_invalid_feature_value() {
        let err = validate_payload(&with("solutionAnalysis", json!({"hasFeature": "MAYBE"})))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                field: "solutionAnalysis.hasFeature",
                value: "MAYBE".into()
            }
        );

        let err = validate_payload(&with("solutionAnalysis", json!({}))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField("solutionAnalysis.hasFeature")
        );
    }

    #[test]
    fn test_non_json_and_non_object() {
        assert!(matches!(
            parse_analysis_payload("Sure! Acme is ranked second."),
            Err(ValidationError::NotJson(_))
        ));
        assert!(matches!(
            parse_analysis_payload("[1, 2]"),
            Err(ValidationError::NotAnObject)
        ));
        assert!(matches!(
            parse_analysis_payload(""),
            Err(ValidationError::NotJson(_))
        ));
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let raw = format!("```json\n{}\n```", valid());
        let payload = parse_analysis_payload(&raw).unwrap();
        assert_eq!(payload.ranking_position, Some(2));
    }

    #[test]
    fn test_negative_and_large_integers_kept_verbatim() {
        let payload = validate_payload(&with("rankingPosition", json!(-1))).unwrap();
        assert_eq!(payload.ranking_position, Some(-1));

        let err = validate_payload(&with("rankingPosition", json!(u64::MAX))).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { .. }));
    }

    #[test]
    fn test_into_record() {
        let citations = vec![ClassifiedCitation {
            url: "https://acme.com".into(),
            source_type: crate::types::SourceType::Owned,
        }];
        let record = validate_payload(&valid())
            .unwrap()
            .into_record(42, citations.clone());
        assert_eq!(record.response_id, 42);
        assert_eq!(record.classified_citations, citations);
        assert_eq!(record.ranking_position, Some(2));
    }
}
