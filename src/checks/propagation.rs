//! Propagation check: the same records asked of several independent
//! recursive resolvers, compared after normalization.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Instant;

use futures::future::join_all;

use crate::config::DEFAULT_PROPAGATION_RESOLVERS;
use crate::domain::DomainQuery;
use crate::error_handling::CheckError;
use crate::initialization::resolver_for_ips;
use crate::models::{
    CheckCategory, Finding, PropagationReport, RecordKind, ResolverResult,
};
use crate::query::lookup;

use super::Evaluator;

/// The record types compared across resolvers.
const PROPAGATION_KINDS: [RecordKind; 3] = [RecordKind::A, RecordKind::Aaaa, RecordKind::Ns];

impl Evaluator {
    /// Compares how a set of recursive resolvers see a domain.
    ///
    /// All resolvers are queried concurrently; a slow resolver costs at
    /// most its own per-query timeouts and never delays the others. With
    /// `None` or an empty list the three default public resolvers are
    /// used.
    pub async fn propagation_check(
        &self,
        domain: &str,
        resolvers: Option<Vec<IpAddr>>,
    ) -> Result<PropagationReport, CheckError> {
        let query = DomainQuery::parse(domain)?;
        let started = Instant::now();
        let resolvers: Vec<IpAddr> = match resolvers {
            Some(list) if !list.is_empty() => list,
            _ => DEFAULT_PROPAGATION_RESOLVERS.to_vec(),
        };

        let tasks = resolvers.iter().map(|ip| {
            let ip = *ip;
            let name = query.as_str();
            async move {
                let server = resolver_for_ips(&[ip], &self.policy, true);
                let mut per_kind = BTreeMap::new();
                for kind in PROPAGATION_KINDS {
                    per_kind.insert(kind, lookup(&server, name, kind, &self.policy).await);
                }
                (ip.to_string(), per_kind)
            }
        });
        let responses: BTreeMap<String, BTreeMap<RecordKind, ResolverResult>> =
            join_all(tasks).await.into_iter().collect();

        let (differences, findings) = compare_responses(&responses);

        self.journal_invocation("propagation_check", query.as_str(), started, &findings);
        Ok(PropagationReport {
            domain: query.as_str().to_string(),
            resolvers,
            responses,
            differences,
            findings,
        })
    }
}

/// Compares per-resolver value sets and reports disagreements.
///
/// A resolver counts as responsive when at least one of its queries got a
/// response (even a negative one). Fewer than two responsive resolvers
/// make comparison meaningless, so that case is an `error` finding and an
/// empty difference list rather than a false "no differences".
fn compare_responses(
    responses: &BTreeMap<String, BTreeMap<RecordKind, ResolverResult>>,
) -> (Vec<Finding>, Vec<Finding>) {
    let mut findings = Vec::new();
    let responders: Vec<&String> = responses
        .iter()
        .filter(|(_, per_kind)| per_kind.values().any(|r| r.outcome.is_response()))
        .map(|(resolver, _)| resolver)
        .collect();
    if responders.len() < 2 {
        findings.push(Finding::error(
            CheckCategory::Propagation,
            "insufficient responses to compare",
        ));
        return (Vec::new(), findings);
    }

    let mut differences = Vec::new();
    for kind in PROPAGATION_KINDS {
        let sets: Vec<(&str, Vec<String>)> = responders
            .iter()
            .filter_map(|resolver| {
                let result = responses[*resolver].get(&kind)?;
                result
                    .outcome
                    .is_response()
                    .then(|| (resolver.as_str(), normalized_set(&result.values)))
            })
            .collect();
        let Some((_, first)) = sets.first() else {
            continue;
        };
        if sets.iter().any(|(_, set)| set != first) {
            differences.push(
                Finding::warning(
                    CheckCategory::Propagation,
                    format!("resolvers disagree on {} records", kind),
                )
                .with_data(serde_json::json!({
                    "sets": sets
                        .iter()
                        .map(|(resolver, set)| (resolver.to_string(), set.clone()))
                        .collect::<BTreeMap<String, Vec<String>>>(),
                })),
            );
        }
    }
    (differences, findings)
}

/// Lowercases, strips trailing dots, sorts, and dedups a value list so
/// cosmetic differences between resolvers don't count as disagreement.
fn normalized_set(values: &[String]) -> Vec<String> {
    let mut set: Vec<String> = values
        .iter()
        .map(|v| v.trim_end_matches('.').to_lowercase())
        .collect();
    set.sort();
    set.dedup();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryOutcome, Severity};

    fn answered(kind: RecordKind, values: &[&str]) -> ResolverResult {
        ResolverResult {
            record_type: kind,
            values: values.iter().map(|v| v.to_string()).collect(),
            ttl: Some(300),
            outcome: QueryOutcome::Answered,
        }
    }

    fn timed_out_resolver() -> BTreeMap<RecordKind, ResolverResult> {
        PROPAGATION_KINDS
            .iter()
            .map(|kind| (*kind, ResolverResult::empty(*kind, QueryOutcome::Timeout)))
            .collect()
    }

    fn agreeing_resolver(a_values: &[&str]) -> BTreeMap<RecordKind, ResolverResult> {
        let mut per_kind = BTreeMap::new();
        per_kind.insert(RecordKind::A, answered(RecordKind::A, a_values));
        per_kind.insert(
            RecordKind::Aaaa,
            ResolverResult::empty(RecordKind::Aaaa, QueryOutcome::NoData),
        );
        per_kind.insert(
            RecordKind::Ns,
            answered(RecordKind::Ns, &["ns1.example.com", "ns2.example.com"]),
        );
        per_kind
    }

    #[test]
    fn test_all_resolvers_unreachable_is_an_error_not_agreement() {
        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), timed_out_resolver());
        responses.insert("1.1.1.1".to_string(), timed_out_resolver());
        responses.insert("9.9.9.9".to_string(), timed_out_resolver());

        let (differences, findings) = compare_responses(&responses);
        assert!(differences.is_empty());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("insufficient responses"));
    }

    #[test]
    fn test_single_responder_is_insufficient() {
        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), agreeing_resolver(&["192.0.2.1"]));
        responses.insert("1.1.1.1".to_string(), timed_out_resolver());

        let (differences, findings) = compare_responses(&responses);
        assert!(differences.is_empty());
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_agreement_produces_no_differences() {
        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), agreeing_resolver(&["192.0.2.1"]));
        responses.insert("1.1.1.1".to_string(), agreeing_resolver(&["192.0.2.1"]));

        let (differences, findings) = compare_responses(&responses);
        assert!(differences.is_empty());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_disagreement_is_reported_per_record_type() {
        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), agreeing_resolver(&["192.0.2.1"]));
        responses.insert(
            "1.1.1.1".to_string(),
            agreeing_resolver(&["192.0.2.1", "192.0.2.2"]),
        );

        let (differences, findings) = compare_responses(&responses);
        assert!(findings.is_empty());
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].severity, Severity::Warning);
        assert!(differences[0].message.contains("A records"));
        let data = differences[0].data.as_ref().unwrap();
        assert!(data["sets"]["8.8.8.8"].is_array());
        assert!(data["sets"]["1.1.1.1"].is_array());
    }

    #[test]
    fn test_cosmetic_differences_are_normalized_away() {
        let mut left = agreeing_resolver(&["192.0.2.1"]);
        left.insert(
            RecordKind::Ns,
            answered(RecordKind::Ns, &["NS2.Example.COM.", "ns1.example.com"]),
        );
        let right = agreeing_resolver(&["192.0.2.1"]);

        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), left);
        responses.insert("1.1.1.1".to_string(), right);

        let (differences, _) = compare_responses(&responses);
        assert!(differences.is_empty());
    }

    #[test]
    fn test_timed_out_resolver_excluded_from_comparison() {
        let mut responses = BTreeMap::new();
        responses.insert("8.8.8.8".to_string(), agreeing_resolver(&["192.0.2.1"]));
        responses.insert("1.1.1.1".to_string(), agreeing_resolver(&["192.0.2.1"]));
        responses.insert("9.9.9.9".to_string(), timed_out_resolver());

        let (differences, findings) = compare_responses(&responses);
        assert!(differences.is_empty());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_normalized_set() {
        let values = vec![
            "NS1.Example.COM.".to_string(),
            "ns2.example.com".to_string(),
            "ns1.example.com.".to_string(),
        ];
        assert_eq!(
            normalized_set(&values),
            vec!["ns1.example.com", "ns2.example.com"]
        );
    }
}
