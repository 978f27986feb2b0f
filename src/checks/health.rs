//! Record health check: apex records through the recursive and
//! authoritative paths, wildcard detection, dangling-CNAME detection, and
//! TTL heuristics.

use std::collections::BTreeMap;
use std::time::Instant;

use hickory_resolver::proto::rr::{RData, RecordType};
use log::debug;

use crate::config::TTL_IMBALANCE_FACTOR;
use crate::domain::DomainQuery;
use crate::error_handling::CheckError;
use crate::initialization::resolver_for_ips;
use crate::models::{
    CheckCategory, Finding, HealthReport, QueryOutcome, RecordKind, ResolverResult,
};
use crate::query::{fold_answers, lookup, lookup_raw, normalize_name};

use super::Evaluator;

/// The apex record types the health check looks at.
const APEX_KINDS: [RecordKind; 4] = [
    RecordKind::A,
    RecordKind::Aaaa,
    RecordKind::Ns,
    RecordKind::Soa,
];

impl Evaluator {
    /// Checks the basic record health of a domain.
    ///
    /// Resolves A/AAAA/NS/SOA through the recursive resolver and directly
    /// against the zone's authoritative nameservers, probes for wildcard
    /// DNS, follows an apex CNAME to detect a dangling target, and flags
    /// SOA serial skew and strongly unbalanced TTLs.
    ///
    /// Individual query failures become outcome tags, never errors; only
    /// a syntactically invalid domain is rejected.
    pub async fn health_check(&self, domain: &str) -> Result<HealthReport, CheckError> {
        let query = DomainQuery::parse(domain)?;
        let started = Instant::now();
        let mut findings = Vec::new();

        let mut recursive = BTreeMap::new();
        for kind in APEX_KINDS {
            let result = lookup(&self.resolver, query.as_str(), kind, &self.policy).await;
            recursive.insert(kind, result);
        }

        let nameserver_ips = self.authoritative_ips(query.as_str(), &self.policy).await;

        // Nothing answered anywhere: report one error and stop probing.
        let recursive_dead = recursive.values().all(|r| !r.outcome.is_response());
        if recursive_dead && nameserver_ips.is_empty() {
            findings.push(Finding::error(
                CheckCategory::Health,
                format!("all DNS queries for {} failed", query),
            ));
            self.journal_invocation("health_check", query.as_str(), started, &findings);
            return Ok(HealthReport {
                domain: query.as_str().to_string(),
                recursive: BTreeMap::new(),
                authoritative: BTreeMap::new(),
                findings,
            });
        }

        let mut authoritative = BTreeMap::new();
        if nameserver_ips.is_empty() {
            findings.push(Finding::warning(
                CheckCategory::Health,
                "could not determine authoritative nameservers; authoritative queries skipped",
            ));
        } else {
            let mut per_server: BTreeMap<RecordKind, Vec<ResolverResult>> = BTreeMap::new();
            let mut serials: Vec<(String, u32)> = Vec::new();
            for ip in &nameserver_ips {
                let server = resolver_for_ips(&[*ip], &self.policy, false);
                for kind in APEX_KINDS {
                    let result = if kind == RecordKind::Soa {
                        // The raw lookup keeps the serial visible for skew detection
                        match lookup_raw(&server, query.as_str(), RecordType::SOA, &self.policy)
                            .await
                        {
                            Ok(raw) => {
                                if let Some(serial) = soa_serial(&raw) {
                                    serials.push((ip.to_string(), serial));
                                }
                                fold_answers(&raw, kind)
                            }
                            Err(outcome) => ResolverResult::empty(kind, outcome),
                        }
                    } else {
                        lookup(&server, query.as_str(), kind, &self.policy).await
                    };
                    per_server.entry(kind).or_default().push(result);
                }
            }
            for (kind, results) in per_server {
                authoritative.insert(kind, merge_results(kind, &results));
            }

            if let Some(soa) = authoritative.get(&RecordKind::Soa) {
                if !soa.outcome.is_response() || soa.values.is_empty() {
                    findings.push(Finding::warning(
                        CheckCategory::Health,
                        "no SOA record visible on the authoritative nameservers",
                    ));
                }
            }
            if serials_disagree(&serials) {
                findings.push(
                    Finding::warning(
                        CheckCategory::Health,
                        "SOA serial differs between authoritative nameservers",
                    )
                    .with_data(serde_json::json!({
                        "serials": serials
                            .iter()
                            .map(|(server, serial)| (server.clone(), *serial))
                            .collect::<BTreeMap<String, u32>>(),
                    })),
                );
            }
        }

        if let Some((min_ttl, max_ttl)) = ttl_imbalance(recursive.values()) {
            findings.push(
                Finding::info(
                    CheckCategory::Health,
                    "apex record TTLs are strongly unbalanced",
                )
                .with_data(serde_json::json!({ "min_ttl": min_ttl, "max_ttl": max_ttl })),
            );
        }

        self.probe_wildcard(&query, &mut findings).await;
        self.probe_apex_cname(&query, &mut findings).await;

        self.journal_invocation("health_check", query.as_str(), started, &findings);
        Ok(HealthReport {
            domain: query.as_str().to_string(),
            recursive,
            authoritative,
            findings,
        })
    }

    /// Queries a randomized label under the domain; an answer means a
    /// wildcard record is catching nonexistent names.
    async fn probe_wildcard(&self, query: &DomainQuery, findings: &mut Vec<Finding>) {
        let probe = query.probe_name();
        let result = lookup(&self.resolver, &probe, RecordKind::A, &self.policy).await;
        debug!("wildcard probe {} -> {:?}", probe, result.outcome);
        if result.outcome == QueryOutcome::Answered {
            findings.push(
                Finding::info(CheckCategory::Health, "wildcard DNS is active")
                    .with_data(serde_json::json!({
                        "probe": probe,
                        "values": result.values,
                    })),
            );
        }
    }

    /// Follows an apex CNAME (nonstandard but seen in the wild) and flags
    /// a target that resolves to neither A nor AAAA.
    async fn probe_apex_cname(&self, query: &DomainQuery, findings: &mut Vec<Finding>) {
        let Ok(raw) =
            lookup_raw(&self.resolver, query.as_str(), RecordType::CNAME, &self.policy).await
        else {
            return;
        };
        let Some(target) = raw.record_iter().find_map(|record| match record.data() {
            Some(RData::CNAME(cname)) => Some(normalize_name(&cname.0)),
            _ => None,
        }) else {
            return;
        };

        let a = lookup(&self.resolver, &target, RecordKind::A, &self.policy).await;
        let aaaa = lookup(&self.resolver, &target, RecordKind::Aaaa, &self.policy).await;
        let dangling = [&a, &aaaa].iter().all(|r| {
            matches!(r.outcome, QueryOutcome::NoData | QueryOutcome::Nxdomain)
        });
        if dangling {
            findings.push(
                Finding::warning(CheckCategory::Health, "CNAME target does not resolve")
                    .with_data(serde_json::json!({ "target": target })),
            );
        }
    }
}

/// Merges per-server results for one record type: values are deduplicated
/// and sorted, the TTL is the minimum across answers, and the outcome is
/// the best any server produced.
fn merge_results(kind: RecordKind, results: &[ResolverResult]) -> ResolverResult {
    let mut values: Vec<String> = Vec::new();
    let mut ttl: Option<u32> = None;
    for result in results {
        if result.outcome != QueryOutcome::Answered {
            continue;
        }
        values.extend(result.values.iter().cloned());
        if let Some(t) = result.ttl {
            ttl = Some(ttl.map_or(t, |cur| cur.min(t)));
        }
    }
    values.sort();
    values.dedup();

    if !values.is_empty() {
        return ResolverResult {
            record_type: kind,
            values,
            ttl,
            outcome: QueryOutcome::Answered,
        };
    }
    // No answers anywhere: prefer a negative response over a transport failure
    let outcome = [
        QueryOutcome::NoData,
        QueryOutcome::Nxdomain,
        QueryOutcome::Timeout,
        QueryOutcome::Error,
    ]
    .into_iter()
    .find(|candidate| results.iter().any(|r| r.outcome == *candidate))
    .unwrap_or(QueryOutcome::Error);
    ResolverResult::empty(kind, outcome)
}

/// True when the authoritative servers disagree on the SOA serial.
fn serials_disagree(serials: &[(String, u32)]) -> bool {
    match serials.first() {
        Some((_, first)) => serials.iter().any(|(_, serial)| serial != first),
        None => false,
    }
}

/// Detects strongly unbalanced TTLs among the answered apex records:
/// flags `max >= TTL_IMBALANCE_FACTOR * max(1, min)`.
fn ttl_imbalance<'a>(
    results: impl IntoIterator<Item = &'a ResolverResult>,
) -> Option<(u32, u32)> {
    let ttls: Vec<u32> = results.into_iter().filter_map(|r| r.ttl).collect();
    let min = *ttls.iter().min()?;
    let max = *ttls.iter().max()?;
    if max >= TTL_IMBALANCE_FACTOR * min.max(1) {
        Some((min, max))
    } else {
        None
    }
}

/// Extracts the SOA serial from a raw lookup, if one is present.
fn soa_serial(lookup: &hickory_resolver::lookup::Lookup) -> Option<u32> {
    lookup.record_iter().find_map(|record| match record.data() {
        Some(RData::SOA(soa)) => Some(soa.serial()),
        _ => None,
    })
}
