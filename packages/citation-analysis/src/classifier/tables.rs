//! Static domain lookup tables.
//!
//! The built-in tables are loaded once per process. Deployments can replace
//! them with a JSON file of the same shape at startup.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

/// Two-label public suffixes checked before single-level TLDs.
const MULTI_LEVEL_TLDS: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "co.nz", "org.nz", "net.nz",
    "co.jp", "ne.jp", "or.jp", "ac.jp",
    "co.kr", "or.kr",
    "co.in", "net.in", "org.in", "firm.in",
    "co.za", "org.za",
    "com.br", "net.br", "org.br",
    "com.mx", "org.mx",
    "com.ar", "com.co", "com.pe", "com.tr",
    "com.cn", "net.cn", "org.cn",
    "com.hk", "com.tw", "com.sg", "com.my", "com.ph", "com.vn",
    "co.id", "co.il", "co.th",
    "com.eg", "com.sa", "com.ng", "co.ke",
];

/// Single-label TLDs recognised as a suffix.
const SINGLE_LEVEL_TLDS: &[&str] = &[
    "com", "org", "net", "edu", "gov", "mil", "int",
    "io", "ai", "co", "app", "dev", "tech", "cloud", "so", "sh", "gg", "me", "tv", "fm",
    "info", "biz", "xyz", "site", "online", "store", "shop", "blog", "news", "page",
    "us", "uk", "ca", "au", "nz", "ie", "de", "fr", "es", "it", "nl", "be", "ch", "at",
    "se", "no", "dk", "fi", "pl", "pt", "cz", "ru", "ua", "jp", "kr", "cn", "in", "sg",
    "hk", "tw", "br", "mx", "ar", "za", "il", "ae", "eu",
];

/// User-generated content, review and community sites.
///
/// Entries are base labels or registrable domains.
const UGC_DOMAINS: &[&str] = &[
    "reddit", "quora", "stackoverflow", "stackexchange", "superuser",
    "medium", "substack", "dev.to", "hashnode", "hackernews", "ycombinator",
    "g2", "capterra", "trustradius", "getapp", "softwareadvice", "trustpilot",
    "producthunt", "glassdoor", "indeed", "yelp", "tripadvisor", "sitejabber",
    "gartner", "peerspot", "saasworthy", "alternativeto", "slashdot", "sourceforge",
    "youtube", "vimeo", "tiktok", "instagram", "facebook", "linkedin", "twitter", "x.com",
    "pinterest", "tumblr", "discord", "github", "gitlab",
    "wikipedia", "fandom", "wikihow",
];

/// Lookup tables used by the source classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainTables {
    pub multi_level_tlds: HashSet<String>,
    pub single_level_tlds: HashSet<String>,
    pub ugc_domains: HashSet<String>,
}

lazy_static! {
    static ref DEFAULT_TABLES: Arc<DomainTables> = Arc::new(DomainTables::builtin());
}

impl DomainTables {
    /// The compiled-in tables.
    pub fn builtin() -> Self {
        fn set(items: &[&str]) -> HashSet<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            multi_level_tlds: set(MULTI_LEVEL_TLDS),
            single_level_tlds: set(SINGLE_LEVEL_TLDS),
            ugc_domains: set(UGC_DOMAINS),
        }
    }

    /// Process-wide shared copy of the built-in tables.
    pub fn shared() -> Arc<DomainTables> {
        Arc::clone(&DEFAULT_TABLES)
    }

    /// Load tables from a JSON file with the same field names.
    ///
    /// Entries are lowercased on load.
    pub fn from_json_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::NotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let tables: DomainTables = serde_json::from_str(raw)?;
        Ok(tables.normalized())
    }

    /// Add UGC entries on top of the current set.
    pub fn with_ugc_domains(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ugc_domains
            .extend(domains.into_iter().map(|d| d.into().to_lowercase()));
        self
    }

    /// Recognise extra single-label TLDs.
    pub fn with_single_level_tlds(mut self, tlds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.single_level_tlds
            .extend(tlds.into_iter().map(|t| t.into().to_lowercase()));
        self
    }

    pub fn is_multi_level_tld(&self, suffix: &str) -> bool {
        self.multi_level_tlds.contains(suffix)
    }

    pub fn is_single_level_tld(&self, label: &str) -> bool {
        self.single_level_tlds.contains(label)
    }

    pub fn is_ugc(&self, entry: &str) -> bool {
        self.ugc_domains.contains(entry)
    }

    fn normalized(self) -> Self {
        fn lower(set: HashSet<String>) -> HashSet<String> {
            set.into_iter().map(|s| s.trim().to_lowercase()).collect()
        }

        Self {
            multi_level_tlds: lower(self.multi_level_tlds),
            single_level_tlds: lower(self.single_level_tlds),
            ugc_domains: lower(self.ugc_domains),
        }
    }
}

impl Default for DomainTables {
    fn default() -> Self {
        Self::builtin()
    }
}
