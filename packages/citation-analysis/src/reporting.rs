//! Pure aggregation over analysed responses.
//!
//! Every function takes the full row set and returns fresh values; means are
//! true arithmetic means over the rows that carry a value.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{AnalysisRecord, Response, SourceType};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total: usize,
    pub mentioned: usize,
    /// `mentioned / total`, 0 when there are no records
    pub mention_rate: f64,
    /// Mean ranking position where one was reported
    pub average_rank: Option<f64>,
    pub average_sentiment: Option<f64>,
    /// Citation counts per source type
    pub source_types: BTreeMap<SourceType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub responses: usize,
    /// Responses that carried a sentiment score
    pub scored: usize,
    pub average_sentiment: Option<f64>,
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn summarize<'a>(records: impl IntoIterator<Item = &'a AnalysisRecord>) -> AnalysisSummary {
    let records: Vec<&AnalysisRecord> = records.into_iter().collect();
    let total = records.len();
    let mentioned = records.iter().filter(|r| r.company_mentioned).count();

    let source_types = records
        .iter()
        .flat_map(|r| r.classified_citations.iter())
        .fold(BTreeMap::new(), |mut acc, c| {
            *acc.entry(c.source_type).or_insert(0) += 1;
            acc
        });

    AnalysisSummary {
        total,
        mentioned,
        mention_rate: if total == 0 {
            0.0
        } else {
            mentioned as f64 / total as f64
        },
        average_rank: mean(records.iter().filter_map(|r| r.ranking_position).map(|p| p as f64)),
        average_sentiment: mean(records.iter().filter_map(|r| r.sentiment_score)),
        source_types,
    }
}

/// One summary per answer engine.
pub fn summarize_by_engine(
    rows: &[(Response, AnalysisRecord)],
) -> BTreeMap<String, AnalysisSummary> {
    let mut grouped: BTreeMap<&str, Vec<&AnalysisRecord>> = BTreeMap::new();
    for (response, record) in rows {
        grouped.entry(response.engine.as_str()).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(engine, records)| (engine.to_string(), summarize(records)))
        .collect()
}

/// Per-day sentiment by response creation date (UTC), ascending.
pub fn daily_sentiment(rows: &[(Response, AnalysisRecord)]) -> Vec<DailySentiment> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&AnalysisRecord>> = BTreeMap::new();
    for (response, record) in rows {
        grouped
            .entry(response.created_at.date_naive())
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .map(|(date, records)| DailySentiment {
            date,
            responses: records.len(),
            scored: records.iter().filter(|r| r.sentiment_score.is_some()).count(),
            average_sentiment: mean(records.iter().filter_map(|r| r.sentiment_score)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassifiedCitation;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, mentioned: bool, rank: Option<i64>, sentiment: Option<f64>) -> AnalysisRecord {
        AnalysisRecord {
            company_mentioned: mentioned,
            ranking_position: rank,
            sentiment_score: sentiment,
            ..AnalysisRecord::empty(id)
        }
    }

    fn row(id: i64, engine: &str, day: u32, sentiment: Option<f64>) -> (Response, AnalysisRecord) {
        let created = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        (
            Response::new(id, 1, engine, "text").with_created_at(created),
            record(id, true, None, sentiment),
        )
    }

    #[test]
    fn test_summarize() {
        let mut with_citations = record(1, true, Some(1), Some(0.5));
        with_citations.classified_citations = vec![
            ClassifiedCitation {
                url: "https://acme.com".into(),
                source_type: SourceType::Owned,
            },
            ClassifiedCitation {
                url: "https://reddit.com".into(),
                source_type: SourceType::Ugc,
            },
        ];
        let records = vec![
            with_citations,
            record(2, true, Some(3), None),
            record(3, false, None, Some(-0.5)),
            record(4, false, None, None),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.mentioned, 2);
        assert_eq!(summary.mention_rate, 0.5);
        assert_eq!(summary.average_rank, Some(2.0));
        assert_eq!(summary.average_sentiment, Some(0.0));
        assert_eq!(summary.source_types.get(&SourceType::Ugc), Some(&1));
        assert_eq!(summary.source_types.get(&SourceType::Earned), None);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&Vec::<AnalysisRecord>::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.mention_rate, 0.0);
        assert_eq!(summary.average_rank, None);
    }

    #[test]
    fn test_daily_sentiment_is_true_mean() {
        // A pairwise blend would give ((0.9 + 0.0) / 2 + 0.3) / 2 = 0.375
        let rows = vec![
            row(1, "chatgpt", 1, Some(0.9)),
            row(2, "chatgpt", 1, Some(0.0)),
            row(3, "gemini", 1, Some(0.3)),
            row(4, "gemini", 2, None),
        ];

        let days = daily_sentiment(&rows);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].responses, 3);
        assert!((days[0].average_sentiment.unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(days[1].scored, 0);
        assert_eq!(days[1].average_sentiment, None);
    }

    #[test]
    fn test_summarize_by_engine() {
        let rows = vec![
            row(1, "chatgpt", 1, Some(1.0)),
            row(2, "perplexity", 1, None),
            row(3, "chatgpt", 2, Some(0.0)),
        ];

        let by_engine = summarize_by_engine(&rows);
        assert_eq!(by_engine.len(), 2);
        assert_eq!(by_engine["chatgpt"].total, 2);
        assert_eq!(by_engine["chatgpt"].average_sentiment, Some(0.5));
        assert_eq!(by_engine["perplexity"].average_sentiment, None);
    }
}
