//! Core data model: findings, per-query results, and check reports.
//!
//! Every type here is plain data with a stable `serde` shape — the reports
//! are what the caller (and the interaction journal) ultimately see, so the
//! serialized field names and tag strings are part of the tool's contract.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use hickory_resolver::proto::rr::RecordType;
use serde::Serialize;

/// Severity of a diagnostic finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Notable but harmless observation (e.g., wildcard DNS is active).
    Info,
    /// Likely misconfiguration that degrades the zone without breaking it.
    Warning,
    /// Broken or unverifiable state (e.g., DNSSEC chain mismatch).
    Error,
}

/// The check a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckCategory {
    /// Basic record health (A/AAAA/NS/SOA, wildcard, CNAME).
    Health,
    /// Mail policy (MX, SPF, DMARC).
    Mail,
    /// DNSSEC chain of trust.
    Dnssec,
    /// Cross-resolver consistency.
    Propagation,
}

/// The closed set of record types the evaluator handles.
///
/// Each check matches exhaustively over the kinds it queries; anything
/// outside this set is not part of the tool's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Nameserver delegation record.
    Ns,
    /// Start-of-authority record.
    Soa,
    /// Mail exchanger record.
    Mx,
    /// Text record (SPF/DMARC live here).
    Txt,
    /// Delegation signer digest, held by the parent zone.
    Ds,
    /// Public signing key, held by the zone itself.
    Dnskey,
    /// Signature over another record set.
    Rrsig,
}

impl RecordKind {
    /// Maps this kind onto the wire-level `hickory` record type.
    pub(crate) fn to_record_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
            RecordKind::Ns => RecordType::NS,
            RecordKind::Soa => RecordType::SOA,
            RecordKind::Mx => RecordType::MX,
            RecordKind::Txt => RecordType::TXT,
            RecordKind::Ds => RecordType::DS,
            RecordKind::Dnskey => RecordType::DNSKEY,
            RecordKind::Rrsig => RecordType::RRSIG,
        }
    }

    /// Returns the canonical presentation name (e.g., `"AAAA"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Ns => "NS",
            RecordKind::Soa => "SOA",
            RecordKind::Mx => "MX",
            RecordKind::Txt => "TXT",
            RecordKind::Ds => "DS",
            RecordKind::Dnskey => "DNSKEY",
            RecordKind::Rrsig => "RRSIG",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single DNS query, as a closed set of tags.
///
/// Failures are classified here instead of propagating as errors so that an
/// individual query can never abort the check it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryOutcome {
    /// The query returned at least one record of the requested type.
    Answered,
    /// The name exists but has no records of the requested type.
    NoData,
    /// The name does not exist.
    Nxdomain,
    /// The query timed out (after any configured retries).
    Timeout,
    /// Any other resolver or protocol failure.
    Error,
}

impl QueryOutcome {
    /// True when the resolver produced a response at all (even a negative
    /// one). Timeouts and transport errors are not responses.
    pub fn is_response(&self) -> bool {
        !matches!(self, QueryOutcome::Timeout | QueryOutcome::Error)
    }
}

/// Per-resolver, per-record-type query result.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverResult {
    /// The record type that was queried.
    pub record_type: RecordKind,
    /// Returned values in answer order (empty unless `answered`).
    pub values: Vec<String>,
    /// Minimum TTL across the answer set, absent when unanswered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// How the query concluded.
    pub outcome: QueryOutcome,
}

impl ResolverResult {
    /// A result for a query that never produced an answer.
    pub(crate) fn empty(record_type: RecordKind, outcome: QueryOutcome) -> Self {
        ResolverResult {
            record_type,
            values: Vec::new(),
            ttl: None,
            outcome,
        }
    }
}

/// A single diagnostic observation.
///
/// Findings accumulate per check in insertion order; the order matters for
/// readable reporting but not for correctness.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// How serious the observation is.
    pub severity: Severity,
    /// Which check produced it.
    pub category: CheckCategory,
    /// Human-readable description.
    pub message: String,
    /// Supporting raw values, when useful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Finding {
    /// Creates an `info` finding.
    pub fn info(category: CheckCategory, message: impl Into<String>) -> Self {
        Finding {
            severity: Severity::Info,
            category,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a `warning` finding.
    pub fn warning(category: CheckCategory, message: impl Into<String>) -> Self {
        Finding {
            severity: Severity::Warning,
            category,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an `error` finding.
    pub fn error(category: CheckCategory, message: impl Into<String>) -> Self {
        Finding {
            severity: Severity::Error,
            category,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches supporting raw values.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Result of `health_check`: apex records seen through the recursive and
/// authoritative paths, plus findings.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// The domain that was checked.
    pub domain: String,
    /// Records as seen by the configured recursive resolver.
    pub recursive: BTreeMap<RecordKind, ResolverResult>,
    /// Records merged across the zone's authoritative nameservers.
    pub authoritative: BTreeMap<RecordKind, ResolverResult>,
    /// Diagnostic observations, in insertion order.
    pub findings: Vec<Finding>,
}

/// Result of `mail_policy_check`.
#[derive(Debug, Serialize)]
pub struct MailReport {
    /// The domain that was checked.
    pub domain: String,
    /// MX lookup result.
    pub mx: ResolverResult,
    /// The SPF record at the apex, if one exists.
    pub spf: Option<String>,
    /// The DMARC record at `_dmarc.<domain>`, if one exists.
    pub dmarc: Option<String>,
    /// Diagnostic observations, in insertion order.
    pub findings: Vec<Finding>,
}

/// Compact view of one DS record from the parent zone.
#[derive(Debug, Clone, Serialize)]
pub struct DsSummary {
    /// Key tag the DS refers to.
    pub key_tag: u16,
    /// DNSKEY algorithm number.
    pub algorithm: u8,
    /// Digest algorithm number (1 = SHA-1, 2 = SHA-256, ...).
    pub digest_type: u8,
}

/// Compact view of the RRSIG covering the SOA record.
#[derive(Debug, Clone, Serialize)]
pub struct RrsigSummary {
    /// Key tag of the signing DNSKEY.
    pub key_tag: u16,
    /// Signature algorithm number.
    pub algorithm: u8,
    /// Signature inception (epoch seconds).
    pub inception: u32,
    /// Signature expiration (epoch seconds).
    pub expiration: u32,
}

/// Supporting detail for a DNSSEC status report.
///
/// This is the externally visible remnant of the chain state built during
/// the check; it never outlives a single invocation.
#[derive(Debug, Default, Serialize)]
pub struct DnssecDetails {
    /// DS records retrieved from the parent zone.
    pub ds_records: Vec<DsSummary>,
    /// Key tags of the DNSKEYs published by the zone.
    pub dnskey_tags: Vec<u16>,
    /// The key tag whose digest matched a DS record, if any.
    pub matched_key_tag: Option<u16>,
    /// The RRSIG that was checked against the SOA record set, if any.
    pub soa_rrsig: Option<RrsigSummary>,
}

/// Result of `dnssec_status`.
#[derive(Debug, Serialize)]
pub struct DnssecReport {
    /// The domain that was checked.
    pub domain: String,
    /// Whether the parent zone publishes DS records for this domain.
    pub has_ds_in_parent: bool,
    /// Algorithm numbers of the zone's DNSKEYs.
    pub dnskey_algorithms: Vec<u8>,
    /// Whether the RRSIG over the SOA record verified cryptographically.
    pub soa_signature_valid: bool,
    /// Chain-of-trust detail.
    pub details: DnssecDetails,
    /// Diagnostic observations, in insertion order.
    pub findings: Vec<Finding>,
}

/// Result of `propagation_check`.
#[derive(Debug, Serialize)]
pub struct PropagationReport {
    /// The domain that was checked.
    pub domain: String,
    /// Resolvers that were queried.
    pub resolvers: Vec<IpAddr>,
    /// Per-resolver, per-record-type results (keyed by resolver address).
    pub responses: BTreeMap<String, BTreeMap<RecordKind, ResolverResult>>,
    /// One `warning` finding per record type on which two resolvers disagree.
    pub differences: Vec<Finding>,
    /// Non-difference observations (e.g., too few resolvers responded).
    pub findings: Vec<Finding>,
}
