//! The four diagnostic checks.
//!
//! [`Evaluator`] owns the recursive resolver, the query policy, and the
//! interaction journal; each check is an independent, stateless method on
//! it. One `impl` block per check keeps each check's queries, heuristics,
//! and findings together:
//!
//! - `health.rs` — A/AAAA/NS/SOA via recursive and authoritative paths,
//!   wildcard and dangling-CNAME detection, TTL heuristics.
//! - `mail.rs` — MX, SPF, DMARC.
//! - `dnssec.rs` — DS/DNSKEY digest match and RRSIG-over-SOA verification.
//! - `propagation.rs` — cross-resolver consistency.

mod dnssec;
mod health;
mod mail;
mod propagation;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use log::{debug, info};

use crate::config::MAX_AUTHORITATIVE_SERVERS;
use crate::journal::{EventSink, InvocationEvent};
use crate::models::{Finding, Severity};
use crate::query::{lookup_raw, normalize_name, QueryPolicy};

/// Runs diagnostic checks against the live DNS.
///
/// Holds no per-domain state: every check validates its input, issues its
/// queries under the evaluator's [`QueryPolicy`], and returns a fresh
/// report. The journal sink is injected so embedders and tests control
/// where invocation records go.
pub struct Evaluator {
    resolver: Arc<TokioAsyncResolver>,
    policy: QueryPolicy,
    journal: Arc<dyn EventSink>,
}

impl Evaluator {
    /// Creates an evaluator over the given recursive resolver.
    pub fn new(
        resolver: Arc<TokioAsyncResolver>,
        policy: QueryPolicy,
        journal: Arc<dyn EventSink>,
    ) -> Self {
        Evaluator {
            resolver,
            policy,
            journal,
        }
    }

    /// Resolves a zone's authoritative nameserver addresses.
    ///
    /// NS targets are resolved to IPs (A before AAAA), deduplicated in
    /// first-seen order, and capped at [`MAX_AUTHORITATIVE_SERVERS`].
    /// Returns an empty list when the NS lookup fails; callers decide
    /// whether that is a finding or a fallback.
    pub(crate) async fn authoritative_ips(&self, zone: &str, policy: &QueryPolicy) -> Vec<IpAddr> {
        let ns_lookup = match lookup_raw(&self.resolver, zone, RecordType::NS, policy).await {
            Ok(lookup) => lookup,
            Err(outcome) => {
                debug!("{} NS lookup failed ({:?})", zone, outcome);
                return Vec::new();
            }
        };
        let ns_names: Vec<String> = ns_lookup
            .record_iter()
            .filter_map(|record| match record.data() {
                Some(RData::NS(ns)) => Some(normalize_name(&ns.0)),
                _ => None,
            })
            .collect();

        let mut ips: Vec<IpAddr> = Vec::new();
        for ns_name in &ns_names {
            for record_type in [RecordType::A, RecordType::AAAA] {
                let Ok(lookup) = lookup_raw(&self.resolver, ns_name, record_type, policy).await
                else {
                    continue;
                };
                for record in lookup.record_iter() {
                    let ip = match record.data() {
                        Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
                        Some(RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
                        _ => None,
                    };
                    if let Some(ip) = ip {
                        if !ips.contains(&ip) {
                            ips.push(ip);
                        }
                        if ips.len() >= MAX_AUTHORITATIVE_SERVERS {
                            return ips;
                        }
                    }
                }
            }
        }
        ips
    }

    /// Appends one journal line for a finished check and logs a summary.
    pub(crate) fn journal_invocation(
        &self,
        operation: &'static str,
        domain: &str,
        started: Instant,
        findings: &[Finding],
    ) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let summary = severity_counts(findings);
        info!(
            "{} for {} finished in {}ms ({} findings)",
            operation,
            domain,
            duration_ms,
            findings.len()
        );
        self.journal
            .record(&InvocationEvent::now(operation, domain, duration_ms, summary));
    }
}

/// Finding counts keyed by severity, for journal summaries.
pub(crate) fn severity_counts(findings: &[Finding]) -> serde_json::Value {
    let mut info = 0;
    let mut warning = 0;
    let mut error = 0;
    for finding in findings {
        match finding.severity {
            Severity::Info => info += 1,
            Severity::Warning => warning += 1,
            Severity::Error => error += 1,
        }
    }
    serde_json::json!({ "info": info, "warning": warning, "error": error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckCategory;

    #[test]
    fn test_severity_counts() {
        let findings = vec![
            Finding::info(CheckCategory::Health, "a"),
            Finding::warning(CheckCategory::Health, "b"),
            Finding::warning(CheckCategory::Health, "c"),
            Finding::error(CheckCategory::Health, "d"),
        ];
        let counts = severity_counts(&findings);
        assert_eq!(counts["info"], 1);
        assert_eq!(counts["warning"], 2);
        assert_eq!(counts["error"], 1);
    }

    #[test]
    fn test_severity_counts_empty() {
        let counts = severity_counts(&[]);
        assert_eq!(counts["info"], 0);
        assert_eq!(counts["warning"], 0);
        assert_eq!(counts["error"], 0);
    }
}
