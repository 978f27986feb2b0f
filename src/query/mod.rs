//! Single-query plumbing shared by every check.
//!
//! All DNS traffic funnels through [`lookup`] / [`lookup_raw`]: a query is
//! issued under an explicit [`QueryPolicy`], backstopped by a task-level
//! timeout, and its failure is classified into a
//! [`QueryOutcome`][crate::models::QueryOutcome] tag instead of an error.
//! A single slow or broken query therefore degrades one field of a report
//! rather than aborting the whole check.

use std::time::Duration;

use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::lookup::Lookup;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::dnssec::rdata::DNSSECRData;
use hickory_resolver::proto::rr::{Name, RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::config::{DNS_TIMEOUT_SECS, QUERY_TIMEOUT_SLACK_MS};
use crate::models::{QueryOutcome, RecordKind, ResolverResult};

/// How a single query is issued: how long to wait and how often to retry.
///
/// Retries apply to timeouts only; a negative answer (NXDOMAIN, no data) is
/// a response and is never retried.
#[derive(Debug, Clone)]
pub struct QueryPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Additional attempts after a timed-out one.
    pub retries: u32,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        QueryPolicy {
            timeout: Duration::from_secs(DNS_TIMEOUT_SECS),
            retries: 0,
        }
    }
}

impl QueryPolicy {
    /// A policy with the given per-attempt timeout and no retries.
    pub fn with_timeout(timeout: Duration) -> Self {
        QueryPolicy {
            timeout,
            retries: 0,
        }
    }

    /// The same policy with a different retry count.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Classifies a resolver error into an outcome tag.
pub(crate) fn classify(err: &ResolveError) -> QueryOutcome {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                QueryOutcome::Nxdomain
            } else {
                QueryOutcome::NoData
            }
        }
        ResolveErrorKind::Timeout => QueryOutcome::Timeout,
        _ => QueryOutcome::Error,
    }
}

/// Issues one query under `policy` and returns the raw lookup.
///
/// On failure the error is classified into the outcome the caller should
/// report. Timed-out attempts are retried up to `policy.retries` times; the
/// task-level timeout adds a small slack over the resolver's own so the
/// resolver's timeout fires first under normal conditions.
pub(crate) async fn lookup_raw(
    resolver: &TokioAsyncResolver,
    name: &str,
    record_type: RecordType,
    policy: &QueryPolicy,
) -> Result<Lookup, QueryOutcome> {
    let backstop = policy.timeout + Duration::from_millis(QUERY_TIMEOUT_SLACK_MS);
    let mut attempt = 0;
    loop {
        let result = tokio::time::timeout(backstop, resolver.lookup(name, record_type)).await;
        let outcome = match result {
            Ok(Ok(lookup)) => return Ok(lookup),
            Ok(Err(err)) => {
                debug!("{} {} query failed: {}", name, record_type, err);
                classify(&err)
            }
            Err(_) => {
                debug!("{} {} query hit the task-level timeout", name, record_type);
                QueryOutcome::Timeout
            }
        };
        if outcome == QueryOutcome::Timeout && attempt < policy.retries {
            attempt += 1;
            debug!(
                "{} {} retrying after timeout (attempt {})",
                name,
                record_type,
                attempt + 1
            );
            continue;
        }
        return Err(outcome);
    }
}

/// Issues one query and folds the answer into a [`ResolverResult`].
///
/// Values are rendered in presentation form (names lowercased without the
/// trailing dot, TXT segments joined); the TTL is the minimum across the
/// answer set.
pub(crate) async fn lookup(
    resolver: &TokioAsyncResolver,
    name: &str,
    kind: RecordKind,
    policy: &QueryPolicy,
) -> ResolverResult {
    match lookup_raw(resolver, name, kind.to_record_type(), policy).await {
        Ok(lookup) => fold_answers(&lookup, kind),
        Err(outcome) => ResolverResult::empty(kind, outcome),
    }
}

/// Folds a raw lookup's answer section into a [`ResolverResult`].
pub(crate) fn fold_answers(lookup: &Lookup, kind: RecordKind) -> ResolverResult {
    let record_type = kind.to_record_type();
    let mut values = Vec::new();
    let mut ttl: Option<u32> = None;
    for record in lookup.record_iter() {
        if record.record_type() != record_type {
            continue;
        }
        let Some(rdata) = record.data() else { continue };
        if let Some(value) = presentation_value(rdata) {
            values.push(value);
            ttl = Some(ttl.map_or(record.ttl(), |t| t.min(record.ttl())));
        }
    }
    if values.is_empty() {
        // Answer section held nothing of the requested type
        return ResolverResult::empty(kind, QueryOutcome::NoData);
    }
    ResolverResult {
        record_type: kind,
        values,
        ttl,
        outcome: QueryOutcome::Answered,
    }
}

/// Renders a record's data in presentation form.
pub(crate) fn presentation_value(rdata: &RData) -> Option<String> {
    match rdata {
        RData::A(a) => Some(a.to_string()),
        RData::AAAA(aaaa) => Some(aaaa.to_string()),
        RData::NS(ns) => Some(normalize_name(&ns.0)),
        RData::CNAME(cname) => Some(normalize_name(&cname.0)),
        RData::MX(mx) => Some(format!(
            "{} {}",
            mx.preference(),
            normalize_name(mx.exchange())
        )),
        RData::TXT(txt) => Some(
            txt.txt_data()
                .iter()
                .map(|segment| String::from_utf8_lossy(segment).into_owned())
                .collect::<Vec<_>>()
                .join(""),
        ),
        RData::SOA(soa) => Some(soa.to_string()),
        RData::DNSSEC(DNSSECRData::DS(ds)) => Some(ds.to_string()),
        RData::DNSSEC(DNSSECRData::DNSKEY(key)) => Some(key.to_string()),
        RData::DNSSEC(DNSSECRData::RRSIG(sig)) => Some(sig.to_string()),
        _ => None,
    }
}

/// Lowercases a name and strips its trailing dot.
pub(crate) fn normalize_name(name: &Name) -> String {
    let mut s = name.to_utf8().to_lowercase();
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timeout() {
        let err = ResolveError::from(ResolveErrorKind::Timeout);
        assert_eq!(classify(&err), QueryOutcome::Timeout);
    }

    #[test]
    fn test_classify_other_errors() {
        let err = ResolveError::from(ResolveErrorKind::Msg("connection refused".to_string()));
        assert_eq!(classify(&err), QueryOutcome::Error);
    }

    #[test]
    fn test_default_policy() {
        let policy = QueryPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(DNS_TIMEOUT_SECS));
        assert_eq!(policy.retries, 0);
    }

    #[test]
    fn test_policy_builders() {
        let policy = QueryPolicy::with_timeout(Duration::from_secs(1)).retries(2);
        assert_eq!(policy.timeout, Duration::from_secs(1));
        assert_eq!(policy.retries, 2);
    }

    #[test]
    fn test_normalize_name() {
        let name = Name::from_ascii("NS1.Example.COM.").unwrap();
        assert_eq!(normalize_name(&name), "ns1.example.com");

        let name = Name::from_ascii("example.com").unwrap();
        assert_eq!(normalize_name(&name), "example.com");
    }

    #[test]
    fn test_presentation_value_txt_joins_segments() {
        use hickory_resolver::proto::rr::rdata::TXT;
        let txt = TXT::new(vec!["v=spf1 ".to_string(), "-all".to_string()]);
        let rdata = RData::TXT(txt);
        assert_eq!(presentation_value(&rdata).unwrap(), "v=spf1 -all");
    }

    #[test]
    fn test_presentation_value_mx() {
        use hickory_resolver::proto::rr::rdata::MX;
        let mx = MX::new(10, Name::from_ascii("Mail.Example.COM.").unwrap());
        let rdata = RData::MX(mx);
        assert_eq!(presentation_value(&rdata).unwrap(), "10 mail.example.com");
    }

    #[test]
    fn test_presentation_value_addresses() {
        use hickory_resolver::proto::rr::rdata::{A, AAAA};
        assert_eq!(
            presentation_value(&RData::A(A::new(192, 0, 2, 1))).unwrap(),
            "192.0.2.1"
        );
        assert_eq!(
            presentation_value(&RData::AAAA(AAAA::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)))
                .unwrap(),
            "2001:db8::1"
        );
    }
}
