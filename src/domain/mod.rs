//! Domain name validation and normalization.
//!
//! This module provides the `DomainQuery` value that every check operates
//! on: a syntactically validated, lowercased domain with helpers for the
//! derived names the checks need (parent zone, `_dmarc.` label, and the
//! randomized wildcard probe).

use rand::Rng;

use crate::config::PROBE_LABEL_LEN;
use crate::error_handling::CheckError;

/// Maximum total length of a domain name in presentation form.
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// An immutable, validated domain name.
///
/// Created once per invocation; normalization lowercases the input and
/// strips a single trailing dot, so `Example.COM.` and `example.com`
/// produce the same query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainQuery {
    name: String,
}

impl DomainQuery {
    /// Validates and normalizes a domain name.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::InvalidDomain` for empty input, IP addresses,
    /// single-label names, overlong names or labels, and labels containing
    /// characters outside `[a-z0-9_-]` (or starting/ending with a hyphen).
    pub fn parse(input: &str) -> Result<Self, CheckError> {
        let normalized = input.trim().to_lowercase();
        let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);

        if normalized.is_empty() {
            return Err(CheckError::InvalidDomain(input.to_string()));
        }
        if normalized.len() > MAX_DOMAIN_LEN {
            return Err(CheckError::InvalidDomain(input.to_string()));
        }
        // IP addresses are not domain names
        if normalized.parse::<std::net::IpAddr>().is_ok() {
            return Err(CheckError::InvalidDomain(input.to_string()));
        }

        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.len() < 2 {
            return Err(CheckError::InvalidDomain(input.to_string()));
        }
        for label in &labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(CheckError::InvalidDomain(input.to_string()));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(CheckError::InvalidDomain(input.to_string()));
            }
            if !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(CheckError::InvalidDomain(input.to_string()));
            }
        }

        Ok(DomainQuery {
            name: normalized.to_string(),
        })
    }

    /// The normalized domain name, without a trailing dot.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The parent zone (leftmost label stripped), or `None` at a TLD.
    ///
    /// For `example.com` this is `com` — the zone that holds the DS
    /// records of a secure delegation.
    pub fn parent_zone(&self) -> Option<String> {
        self.name.split_once('.').map(|(_, rest)| rest.to_string())
    }

    /// The name DMARC policy records live at.
    pub fn dmarc_name(&self) -> String {
        format!("_dmarc.{}", self.name)
    }

    /// A randomized subdomain that should not exist, used to detect
    /// wildcard DNS. A fresh name is generated per call.
    pub fn probe_name(&self) -> String {
        format!("{}.{}", random_label(PROBE_LABEL_LEN), self.name)
    }
}

impl std::fmt::Display for DomainQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Generates a random lowercase-alphanumeric label of length `n`.
fn random_label(n: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..n)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
