//! Source classifier.
//!
//! Buckets each cited URL into OWNED, COMPETITOR, UGC or EARNED by its base
//! domain. Checks run in a fixed order and the first hit wins:
//!
//! ```text
//! UGC table ─► company name ─► competitor names (in order) ─► EARNED
//! ```
//!
//! A known review site is UGC even when the company's name appears in the
//! URL. Classification never fails: anything unparseable is EARNED.

pub mod domain;
pub mod tables;

use std::sync::Arc;

pub use domain::{domain_parts, extract_domain, DomainParts};
pub use tables::DomainTables;

use crate::types::{ClassifiedCitation, SourceType};

/// Name tokens too generic to identify a company on their own.
const GENERIC_NAME_TOKENS: &[&str] = &[
    "inc", "llc", "ltd", "limited", "corp", "corporation", "co", "company", "the", "group",
    "gmbh", "plc", "sa", "ag", "and",
];

/// Minimum compact-name length for substring matching against a host.
const MIN_CONTAINS_LEN: usize = 3;

/// Deterministic domain-based source classifier.
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    tables: Arc<DomainTables>,
}

impl Default for SourceClassifier {
    fn default() -> Self {
        Self::new(DomainTables::shared())
    }
}

impl SourceClassifier {
    pub fn new(tables: Arc<DomainTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &DomainTables {
        &self.tables
    }

    /// Classify one URL relative to a company and its competitors.
    pub fn classify(&self, url: &str, company_name: &str, competitors: &[String]) -> SourceType {
        let Some(parts) = extract_domain(url, &self.tables) else {
            return SourceType::Earned;
        };

        if self.tables.is_ugc(&parts.base) || self.tables.is_ugc(&parts.registrable) {
            return SourceType::Ugc;
        }

        if name_matches_domain(company_name, &parts) {
            return SourceType::Owned;
        }

        if competitors
            .iter()
            .any(|competitor| name_matches_domain(competitor, &parts))
        {
            return SourceType::Competitor;
        }

        SourceType::Earned
    }

    /// Classify every URL, preserving input order.
    pub fn classify_all(
        &self,
        urls: &[String],
        company_name: &str,
        competitors: &[String],
    ) -> Vec<ClassifiedCitation> {
        urls.iter()
            .map(|url| ClassifiedCitation {
                url: url.clone(),
                source_type: self.classify(url, company_name, competitors),
            })
            .collect()
    }
}

/// Classify with the built-in domain tables.
pub fn classify(url: &str, company_name: &str, competitors: &[String]) -> SourceType {
    SourceClassifier::default().classify(url, company_name, competitors)
}

/// Lowercase, drop punctuation, and split on whitespace/hyphen/underscore runs.
pub fn normalize_name(name: &str) -> Vec<String> {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Fuzzy match of a company name against a domain.
///
/// Only the labels left of the suffix take part. Matches when they (hyphens
/// removed) contain the separator-free name, or when a distinctive name token
/// equals one of them.
fn name_matches_domain(name: &str, parts: &DomainParts) -> bool {
    let tokens = normalize_name(name);
    if tokens.is_empty() {
        return false;
    }

    let owner = parts.without_suffix();
    let compact_name = tokens.concat();
    let compact_owner = owner.replace(&['-', '_'][..], "");
    if compact_name.chars().count() >= MIN_CONTAINS_LEN && compact_owner.contains(&compact_name) {
        return true;
    }

    let labels: Vec<&str> = owner.split('.').filter(|l| !l.is_empty()).collect();
    tokens
        .iter()
        .filter(|t| t.chars().count() >= 2 && !GENERIC_NAME_TOKENS.contains(&t.as_str()))
        .any(|t| labels.contains(&t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn beta() -> Vec<String> {
        vec!["Beta".to_string()]
    }

    #[test]
    fn test_ugc_short_circuits_owned() {
        assert_eq!(classify("https://reddit.com/r/acme", "Acme", &beta()), SourceType::Ugc);
        assert_eq!(
            classify("https://www.g2.com/products/acme/reviews", "Acme", &beta()),
            SourceType::Ugc
        );
    }

    #[test]
    fn test_owned() {
        assert_eq!(classify("https://acme.com/blog", "Acme", &beta()), SourceType::Owned);
        assert_eq!(classify("https://docs.acme.io", "Acme", &beta()), SourceType::Owned);
        assert_eq!(classify("https://acme.co.uk", "Acme", &[]), SourceType::Owned);
    }

    #[test]
    fn test_competitor() {
        assert_eq!(classify("https://beta.io", "Acme", &beta()), SourceType::Competitor);
    }

    #[test]
    fn test_earned_fallbacks() {
        assert_eq!(
            classify("https://news.example.com", "Acme", &beta()),
            SourceType::Earned
        );
        assert_eq!(classify("not a url", "Acme", &beta()), SourceType::Earned);
        assert_eq!(classify("", "Acme", &beta()), SourceType::Earned);
        assert_eq!(classify("https://10.0.0.1/", "Acme", &beta()), SourceType::Earned);
    }

    #[test]
    fn test_multi_word_names() {
        // Separator-free containment
        assert_eq!(
            classify("https://acme-corp.com/pricing", "Acme Corp", &[]),
            SourceType::Owned
        );
        assert_eq!(
            classify("https://acmecorp.com", "Acme Corp.", &[]),
            SourceType::Owned
        );
        // Token match on a distinctive token
        assert_eq!(
            classify("https://blog.acme.dev", "Acme Software Inc", &[]),
            SourceType::Owned
        );
    }

    #[test]
    fn test_generic_tokens_do_not_match() {
        assert_eq!(
            classify("https://corp.example.com", "Acme Corp", &[]),
            SourceType::Earned
        );
        assert_eq!(
            classify("https://the.example.com", "The Widget Company", &[]),
            SourceType::Earned
        );
    }

    #[test]
    fn test_suffix_never_identifies_a_company() {
        assert_eq!(classify("https://example.shop", "Shop", &[]), SourceType::Earned);
        assert_eq!(classify("https://foo.cloud/docs", "Cloud", &[]), SourceType::Earned);
        assert_eq!(
            classify("https://widgets.co.uk", "Acme", &["UK".to_string()]),
            SourceType::Earned
        );
        // Unknown TLDs are stripped the same way
        assert_eq!(classify("https://example.zz", "ZZ Top", &[]), SourceType::Earned);
        assert_eq!(classify("https://shop.example.com", "Shop", &[]), SourceType::Owned);
    }

    #[test]
    fn test_empty_names_never_match() {
        assert_eq!(classify("https://acme.com", "", &[]), SourceType::Earned);
        assert_eq!(
            classify("https://acme.com", "!!!", &["".to_string()]),
            SourceType::Earned
        );
    }

    #[test]
    fn test_competitor_order_and_owned_priority() {
        let competitors = vec!["Gamma".to_string(), "Acme".to_string()];
        assert_eq!(
            classify("https://acme.com", "Acme", &competitors),
            SourceType::Owned
        );
        assert_eq!(
            classify("https://gamma.ai", "Acme", &competitors),
            SourceType::Competitor
        );
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Acme, Inc."), vec!["acme", "inc"]);
        assert_eq!(normalize_name("  Foo--Bar_baz "), vec!["foo", "bar", "baz"]);
        assert_eq!(normalize_name("AT&T"), vec!["att"]);
        assert!(normalize_name("...").is_empty());
    }

    #[test]
    fn test_custom_tables() {
        let tables = DomainTables::builtin().with_ugc_domains(["community.acme.com", "forum"]);
        let classifier = SourceClassifier::new(Arc::new(tables));
        assert_eq!(
            classifier.classify("https://forum.io/t/1", "Acme", &[]),
            SourceType::Ugc
        );
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let urls = vec![
            "https://beta.io".to_string(),
            "https://reddit.com/r/x".to_string(),
            "https://acme.com".to_string(),
        ];
        let classified = SourceClassifier::default().classify_all(&urls, "Acme", &beta());
        let types: Vec<_> = classified.iter().map(|c| c.source_type).collect();
        assert_eq!(
            types,
            vec![SourceType::Competitor, SourceType::Ugc, SourceType::Owned]
        );
        assert_eq!(classified[1].url, "https://reddit.com/r/x");
    }

    proptest! {
        #[test]
        fn prop_classify_never_panics_and_is_deterministic(
            url in ".{0,80}",
            name in "[a-zA-Z &.-]{0,20}",
        ) {
            let competitors = vec!["Beta".to_string()];
            let first = classify(&url, &name, &competitors);
            let second = classify(&url, &name, &competitors);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_ugc_wins_regardless_of_path(path in "[a-z0-9/]{0,30}") {
            let url = format!("https://reddit.com/{}", path);
            prop_assert_eq!(classify(&url, "Reddit Fans", &[]), SourceType::Ugc);
        }
    }
}
