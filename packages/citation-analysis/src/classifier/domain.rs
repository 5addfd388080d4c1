//! Base-domain extraction from citation URLs.

use url::{Host, Url};

use super::tables::DomainTables;

/// The pieces of a URL host the classifier matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParts {
    /// Lowercased host with a leading `www.` removed
    pub host: String,
    /// Label immediately preceding the public suffix (e.g. `acme`)
    pub base: String,
    /// Base label plus suffix (e.g. `acme.co.uk`)
    pub registrable: String,
    /// Public suffix following the base label (e.g. `co.uk`), empty for
    /// single-label hosts
    pub suffix: String,
    /// Whether `suffix` came from the TLD tables rather than the
    /// last-label fallback
    pub known_suffix: bool,
}

impl DomainParts {
    /// Dot-separated labels of the host.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.host.split('.').filter(|l| !l.is_empty())
    }

    /// Host with the suffix removed (`docs.acme` for `docs.acme.co.uk`).
    pub fn without_suffix(&self) -> &str {
        if self.suffix.is_empty() {
            return &self.host;
        }
        self.host
            .strip_suffix(self.suffix.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(&self.host)
    }
}

/// Extract the domain parts of `raw_url`.
///
/// Returns `None` for unparseable URLs, URLs without a host, and IP-literal
/// hosts.
pub fn extract_domain(raw_url: &str, tables: &DomainTables) -> Option<DomainParts> {
    let url = Url::parse(raw_url.trim()).ok()?;
    let host = match url.host()? {
        Host::Domain(domain) => domain.to_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return None,
    };

    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    domain_parts(host, tables)
}

/// Split a bare host into base label, suffix and registrable domain.
///
/// Multi-level suffixes are tried first, then single-level ones. A host
/// whose last label is in neither table still treats that label as the
/// suffix.
pub fn domain_parts(host: &str, tables: &DomainTables) -> Option<DomainParts> {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.is_empty() {
        return None;
    }

    let n = labels.len();
    let (suffix_len, known_suffix) =
        if n >= 3 && tables.is_multi_level_tld(&labels[n - 2..].join(".")) {
            (2, true)
        } else if n >= 2 {
            (1, tables.is_single_level_tld(labels[n - 1]))
        } else {
            (0, false)
        };

    let base_index = n - 1 - suffix_len;
    Some(DomainParts {
        host: labels.join("."),
        base: labels[base_index].to_string(),
        registrable: labels[base_index..].join("."),
        suffix: labels[n - suffix_len..].join("."),
        known_suffix,
    })
}
