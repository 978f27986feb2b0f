//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the
//! application: timeouts, retry counts, and the default resolver set.

use std::net::{IpAddr, Ipv4Addr};

// Network operation timeouts
/// DNS query timeout in seconds.
/// Most DNS queries complete in <1s; 3s provides a good buffer while
/// failing fast on slow or unresponsive servers.
pub const DNS_TIMEOUT_SECS: u64 = 3;

/// Extra slack added to the task-level timeout that backstops each query,
/// so the resolver's own timeout fires first under normal conditions.
pub const QUERY_TIMEOUT_SLACK_MS: u64 = 250;

// Retry strategy
/// Retries for a timed-out query in the DNSSEC check. One retry keeps
/// "could not determine" findings from firing on a single dropped packet.
pub const DNSSEC_TIMEOUT_RETRIES: u32 = 1;

// Query fan-out limits
/// Maximum number of authoritative nameserver addresses queried directly.
/// Zones commonly publish many NS records; four is enough to detect
/// serial skew without multiplying query latency.
pub const MAX_AUTHORITATIVE_SERVERS: usize = 4;

// Health check heuristics
/// Length of the randomized label used for the wildcard probe.
pub const PROBE_LABEL_LEN: usize = 16;

/// Apex TTLs are flagged as unbalanced when the largest is at least this
/// many times the smallest.
pub const TTL_IMBALANCE_FACTOR: u32 = 4;

// Propagation
/// Default public resolvers for the propagation check:
/// Google, Cloudflare, Quad9.
pub const DEFAULT_PROPAGATION_RESOLVERS: [IpAddr; 3] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)),
];

// Interaction journal
/// Default path of the append-only JSONL interaction journal.
pub const DEFAULT_JOURNAL_PATH: &str = "./dns_triage.log.jsonl";
