//! DNSSEC chain-of-trust check.
//!
//! Two facts are established: the DS digest published by the parent zone
//! matches a DNSKEY published by the zone (the delegation is intact), and
//! the RRSIG over the zone's SOA verifies cryptographically against the
//! matching DNSKEY (the zone is actually signing).
//!
//! Ambiguity is never collapsed into "insecure": a query that cannot be
//! completed produces an explicit "could not determine" error finding, so
//! a timeout can't masquerade as an unsigned zone.

use std::time::Instant;

use hickory_resolver::lookup::Lookup;
use hickory_resolver::proto::rr::dnssec::rdata::{DNSKEY, DNSSECRData, DS, RRSIG};
use hickory_resolver::proto::rr::dnssec::Verifier;
use hickory_resolver::proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::config::DNSSEC_TIMEOUT_RETRIES;
use crate::domain::DomainQuery;
use crate::error_handling::CheckError;
use crate::initialization::resolver_for_ips;
use crate::models::{
    CheckCategory, DnssecDetails, DnssecReport, DsSummary, Finding, QueryOutcome, RrsigSummary,
};
use crate::query::{lookup_raw, QueryPolicy};

use super::Evaluator;

impl Evaluator {
    /// Evaluates the DNSSEC state of a domain.
    ///
    /// DS records are fetched from the parent zone's authoritative servers
    /// (falling back to the recursive resolver), DNSKEY and RRSIG(SOA)
    /// from the domain's own. Timed-out queries are retried once before
    /// they surface as findings.
    pub async fn dnssec_status(&self, domain: &str) -> Result<DnssecReport, CheckError> {
        let query = DomainQuery::parse(domain)?;
        let owner = Name::from_ascii(format!("{}.", query))
            .map_err(|_| CheckError::InvalidDomain(domain.to_string()))?;
        let started = Instant::now();
        let policy = self.policy.clone().retries(DNSSEC_TIMEOUT_RETRIES);
        let mut findings = Vec::new();
        let mut details = DnssecDetails::default();

        // DS lives in the parent zone, so it is asked for there.
        let mut ds_records: Vec<DS> = Vec::new();
        let mut ds_known = false;
        let parent = query.parent_zone();
        if let Some(parent) = &parent {
            let parent_ips = self.authoritative_ips(parent, &policy).await;
            let direct =
                (!parent_ips.is_empty()).then(|| resolver_for_ips(&parent_ips, &policy, false));
            match self
                .lookup_with_fallback(direct.as_ref(), query.as_str(), RecordType::DS, &policy)
                .await
            {
                Ok(lookup) => {
                    ds_records = extract_ds(&lookup);
                    ds_known = true;
                }
                Err(outcome) if outcome.is_response() => {
                    // Authoritative negative answer: the delegation is insecure
                    ds_known = true;
                }
                Err(outcome) => {
                    findings.push(Finding::error(
                        CheckCategory::Dnssec,
                        format!(
                            "could not determine DS records in the parent zone (query ended in {:?})",
                            outcome
                        ),
                    ));
                }
            }
        }
        let has_ds_in_parent = !ds_records.is_empty();
        details.ds_records = ds_records
            .iter()
            .map(|ds| DsSummary {
                key_tag: ds.key_tag(),
                algorithm: u8::from(ds.algorithm()),
                digest_type: u8::from(ds.digest_type()),
            })
            .collect();
        if ds_known && !has_ds_in_parent {
            findings.push(Finding::info(
                CheckCategory::Dnssec,
                "zone is not in a secure delegation (no DS in parent)",
            ));
        }

        // A parent that delegates DS without signing anything itself leaves
        // the chain unanchored; report that, don't guess a verdict.
        if has_ds_in_parent {
            if let Some(parent) = &parent {
                if let Err(outcome) =
                    lookup_raw(&self.resolver, parent, RecordType::DNSKEY, &policy).await
                {
                    if outcome.is_response() {
                        findings.push(Finding::error(
                            CheckCategory::Dnssec,
                            format!(
                                "parent zone {} delegates DS but publishes no DNSKEY; insufficient data to evaluate the chain",
                                parent
                            ),
                        ));
                    }
                }
            }
        }

        // DNSKEY, SOA, and RRSIG(SOA) come from the zone itself.
        let zone_ips = self.authoritative_ips(query.as_str(), &policy).await;
        let direct = (!zone_ips.is_empty()).then(|| resolver_for_ips(&zone_ips, &policy, false));

        let mut dnskeys: Vec<DNSKEY> = Vec::new();
        match self
            .lookup_with_fallback(direct.as_ref(), query.as_str(), RecordType::DNSKEY, &policy)
            .await
        {
            Ok(lookup) => dnskeys = extract_dnskeys(&lookup),
            Err(outcome) if outcome.is_response() => {}
            Err(outcome) => {
                findings.push(Finding::error(
                    CheckCategory::Dnssec,
                    format!(
                        "could not determine DNSKEY records (query ended in {:?})",
                        outcome
                    ),
                ));
            }
        }
        if dnskeys.is_empty() {
            if has_ds_in_parent {
                findings.push(Finding::warning(
                    CheckCategory::Dnssec,
                    "DS present in parent but zone publishes no DNSKEY: broken chain",
                ));
            } else {
                findings.push(Finding::info(
                    CheckCategory::Dnssec,
                    "zone publishes no DNSKEY",
                ));
            }
        }
        let mut dnskey_algorithms: Vec<u8> = Vec::new();
        for key in &dnskeys {
            let algorithm = u8::from(key.algorithm());
            if !dnskey_algorithms.contains(&algorithm) {
                dnskey_algorithms.push(algorithm);
            }
        }
        details.dnskey_tags = dnskeys
            .iter()
            .filter_map(|key| key.calculate_key_tag().ok())
            .collect();

        // Delegation: some DS digest must match some zone key.
        if has_ds_in_parent && !dnskeys.is_empty() {
            let matched = ds_records.iter().find_map(|ds| {
                dnskeys
                    .iter()
                    .filter(|key| key.zone_key())
                    .find(|key| ds_matches_key(&owner, ds, key))
                    .and_then(|key| key.calculate_key_tag().ok())
            });
            match matched {
                Some(key_tag) => details.matched_key_tag = Some(key_tag),
                None => findings.push(Finding::error(
                    CheckCategory::Dnssec,
                    "no DNSKEY digest matches any DS record: chain of trust is broken",
                )),
            }
        }

        // Proof of live signing: verify the RRSIG over the SOA record set.
        let mut soa_signature_valid = false;
        if !dnskeys.is_empty() {
            soa_signature_valid = self
                .verify_soa_signature(
                    direct.as_ref(),
                    &query,
                    &owner,
                    &dnskeys,
                    has_ds_in_parent,
                    &policy,
                    &mut details,
                    &mut findings,
                )
                .await;
        }

        self.journal_invocation("dnssec_status", query.as_str(), started, &findings);
        Ok(DnssecReport {
            domain: query.as_str().to_string(),
            has_ds_in_parent,
            dnskey_algorithms,
            soa_signature_valid,
            details,
            findings,
        })
    }

    /// Fetches the SOA record set and its RRSIGs and verifies one
    /// signature against the zone keys. Returns whether verification
    /// succeeded; failure modes land in `findings`.
    #[allow(clippy::too_many_arguments)]
    async fn verify_soa_signature(
        &self,
        direct: Option<&TokioAsyncResolver>,
        query: &DomainQuery,
        owner: &Name,
        dnskeys: &[DNSKEY],
        has_ds_in_parent: bool,
        policy: &QueryPolicy,
        details: &mut DnssecDetails,
        findings: &mut Vec<Finding>,
    ) -> bool {
        let soa_records = match self
            .lookup_with_fallback(direct, query.as_str(), RecordType::SOA, policy)
            .await
        {
            Ok(lookup) => extract_soa_records(&lookup),
            Err(outcome) => {
                if has_ds_in_parent {
                    findings.push(Finding::error(
                        CheckCategory::Dnssec,
                        format!(
                            "could not retrieve the SOA record set for signature verification (query ended in {:?})",
                            outcome
                        ),
                    ));
                }
                return false;
            }
        };
        if soa_records.is_empty() {
            if has_ds_in_parent {
                findings.push(Finding::error(
                    CheckCategory::Dnssec,
                    "could not retrieve the SOA record set for signature verification",
                ));
            }
            return false;
        }

        let rrsigs = match self
            .lookup_with_fallback(direct, query.as_str(), RecordType::RRSIG, policy)
            .await
        {
            Ok(lookup) => extract_soa_rrsigs(&lookup),
            Err(outcome) if outcome.is_response() => Vec::new(),
            Err(outcome) => {
                findings.push(Finding::error(
                    CheckCategory::Dnssec,
                    format!(
                        "could not determine the RRSIG over the SOA record (query ended in {:?})",
                        outcome
                    ),
                ));
                return false;
            }
        };
        if rrsigs.is_empty() {
            if has_ds_in_parent {
                findings.push(Finding::error(
                    CheckCategory::Dnssec,
                    "no RRSIG covers the SOA record even though the delegation is secure",
                ));
            } else {
                findings.push(Finding::warning(
                    CheckCategory::Dnssec,
                    "zone publishes DNSKEY but the SOA record is unsigned",
                ));
            }
            return false;
        }

        let now = chrono::Utc::now().timestamp() as u32;
        let mut matched_any_key = false;
        for sig in &rrsigs {
            let Some(key) = dnskeys
                .iter()
                .find(|key| key.calculate_key_tag().ok() == Some(sig.key_tag()))
            else {
                continue;
            };
            matched_any_key = true;
            if !rrsig_window_contains(now, sig.sig_inception(), sig.sig_expiration()) {
                findings.push(
                    Finding::error(
                        CheckCategory::Dnssec,
                        "RRSIG over SOA is outside its validity window",
                    )
                    .with_data(serde_json::json!({
                        "inception": sig.sig_inception(),
                        "expiration": sig.sig_expiration(),
                        "now": now,
                    })),
                );
                continue;
            }
            match key.verify_rrsig(owner, DNSClass::IN, sig, &soa_records) {
                Ok(()) => {
                    details.soa_rrsig = Some(summarize_rrsig(sig));
                    return true;
                }
                Err(e) => {
                    debug!("{} RRSIG verification failed: {}", query, e);
                    findings.push(Finding::error(
                        CheckCategory::Dnssec,
                        format!("RRSIG over SOA failed cryptographic verification: {}", e),
                    ));
                }
            }
        }
        if !matched_any_key {
            findings.push(Finding::error(
                CheckCategory::Dnssec,
                "no published DNSKEY matches the key tag of any RRSIG over SOA",
            ));
        }
        false
    }

    /// Queries the direct (authoritative) resolver first and falls back to
    /// the recursive one on transport failure. A negative answer from the
    /// authoritative side is final and is not retried recursively.
    async fn lookup_with_fallback(
        &self,
        direct: Option<&TokioAsyncResolver>,
        name: &str,
        record_type: RecordType,
        policy: &QueryPolicy,
    ) -> Result<Lookup, QueryOutcome> {
        if let Some(server) = direct {
            match lookup_raw(server, name, record_type, policy).await {
                Ok(lookup) => return Ok(lookup),
                Err(outcome) if outcome.is_response() => return Err(outcome),
                Err(outcome) => {
                    debug!(
                        "{} {} direct query failed ({:?}); falling back to recursive",
                        name, record_type, outcome
                    );
                }
            }
        }
        lookup_raw(&self.resolver, name, record_type, policy).await
    }
}

fn extract_ds(lookup: &Lookup) -> Vec<DS> {
    lookup
        .record_iter()
        .filter_map(|record| match record.data() {
            Some(RData::DNSSEC(DNSSECRData::DS(ds))) => Some(ds.clone()),
            _ => None,
        })
        .collect()
}

fn extract_dnskeys(lookup: &Lookup) -> Vec<DNSKEY> {
    lookup
        .record_iter()
        .filter_map(|record| match record.data() {
            Some(RData::DNSSEC(DNSSECRData::DNSKEY(key))) => Some(key.clone()),
            _ => None,
        })
        .collect()
}

fn extract_soa_rrsigs(lookup: &Lookup) -> Vec<RRSIG> {
    lookup
        .record_iter()
        .filter_map(|record| match record.data() {
            Some(RData::DNSSEC(DNSSECRData::RRSIG(sig)))
                if sig.type_covered() == RecordType::SOA =>
            {
                Some(sig.clone())
            }
            _ => None,
        })
        .collect()
}

fn extract_soa_records(lookup: &Lookup) -> Vec<Record> {
    lookup
        .records()
        .iter()
        .filter(|record| record.record_type() == RecordType::SOA)
        .cloned()
        .collect()
}

/// True when the digest of `key` under the DS record's digest type equals
/// the DS digest byte for byte.
fn ds_matches_key(owner: &Name, ds: &DS, key: &DNSKEY) -> bool {
    key.to_digest(owner, ds.digest_type())
        .map(|digest| digest.as_ref() == ds.digest())
        .unwrap_or(false)
}

/// RFC 4034 §3.1.5 validity window check using serial-number arithmetic,
/// so timestamps that wrap around the u32 epoch still compare correctly.
fn rrsig_window_contains(now: u32, inception: u32, expiration: u32) -> bool {
    now.wrapping_sub(inception) < (1 << 31) && expiration.wrapping_sub(now) < (1 << 31)
}

fn summarize_rrsig(sig: &RRSIG) -> RrsigSummary {
    RrsigSummary {
        key_tag: sig.key_tag(),
        algorithm: u8::from(sig.algorithm()),
        inception: sig.sig_inception(),
        expiration: sig.sig_expiration(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::dnssec::{Algorithm, DigestType};

    fn test_key(public_key: Vec<u8>) -> DNSKEY {
        DNSKEY::new(true, true, false, Algorithm::RSASHA256, public_key)
    }

    #[test]
    fn test_ds_digest_match() {
        let owner = Name::from_ascii("example.com.").unwrap();
        let key = test_key(vec![0x03, 0x01, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xef]);
        let digest = key.to_digest(&owner, DigestType::SHA256).unwrap();
        let ds = DS::new(
            key.calculate_key_tag().unwrap(),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            digest.as_ref().to_vec(),
        );
        assert!(ds_matches_key(&owner, &ds, &key));
    }

    #[test]
    fn test_ds_digest_mismatch_on_altered_key() {
        let owner = Name::from_ascii("example.com.").unwrap();
        let key = test_key(vec![0x03, 0x01, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xef]);
        let digest = key.to_digest(&owner, DigestType::SHA256).unwrap();
        let ds = DS::new(
            key.calculate_key_tag().unwrap(),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            digest.as_ref().to_vec(),
        );

        // One flipped byte in the key material must break the match
        let altered = test_key(vec![0x03, 0x01, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xee]);
        assert!(!ds_matches_key(&owner, &ds, &altered));
    }

    #[test]
    fn test_ds_digest_mismatch_on_wrong_owner() {
        let owner = Name::from_ascii("example.com.").unwrap();
        let other = Name::from_ascii("example.net.").unwrap();
        let key = test_key(vec![0x03, 0x01, 0x00, 0x01, 0xde, 0xad, 0xbe, 0xef]);
        let digest = key.to_digest(&owner, DigestType::SHA256).unwrap();
        let ds = DS::new(
            key.calculate_key_tag().unwrap(),
            Algorithm::RSASHA256,
            DigestType::SHA256,
            digest.as_ref().to_vec(),
        );
        assert!(!ds_matches_key(&other, &ds, &key));
    }

    #[test]
    fn test_rrsig_window() {
        assert!(rrsig_window_contains(1_500, 1_000, 2_000));
        assert!(rrsig_window_contains(1_000, 1_000, 2_000));
        assert!(rrsig_window_contains(2_000, 1_000, 2_000));
        // Not yet valid
        assert!(!rrsig_window_contains(999, 1_000, 2_000));
        // Expired
        assert!(!rrsig_window_contains(2_001, 1_000, 2_000));
    }

    #[test]
    fn test_rrsig_window_wraps_serial_arithmetic() {
        // Window straddling the u32 wraparound point
        let inception = u32::MAX - 100;
        let expiration = 100;
        assert!(rrsig_window_contains(u32::MAX, inception, expiration));
        assert!(rrsig_window_contains(50, inception, expiration));
        assert!(!rrsig_window_contains(200, inception, expiration));
        assert!(!rrsig_window_contains(u32::MAX - 200, inception, expiration));
    }
}
