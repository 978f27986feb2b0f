//! dns_triage library: DNS diagnostics over live zones.
//!
//! This library provides four independent, stateless checks over a domain
//! name — record health, mail policy (MX/SPF/DMARC), DNSSEC chain of
//! trust, and cross-resolver propagation — each returning a structured,
//! serializable report of findings.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dns_triage::initialization::init_resolver;
//! use dns_triage::journal::NullSink;
//! use dns_triage::{Evaluator, QueryPolicy};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = QueryPolicy::default();
//! let resolver = init_resolver(&policy);
//! let evaluator = Evaluator::new(resolver, policy, Arc::new(NullSink));
//!
//! let report = evaluator.health_check("example.com").await?;
//! println!("{} findings", report.findings.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

mod checks;
pub mod config;
mod domain;
mod error_handling;
pub mod initialization;
pub mod journal;
mod models;
mod query;

// Re-export public API
pub use checks::Evaluator;
pub use config::{CheckKind, LogFormat, LogLevel, Opt};
pub use domain::DomainQuery;
pub use error_handling::{CheckError, InitializationError};
pub use models::{
    CheckCategory, DnssecDetails, DnssecReport, DsSummary, Finding, HealthReport, MailReport,
    PropagationReport, QueryOutcome, RecordKind, ResolverResult, RrsigSummary, Severity,
};
pub use query::QueryPolicy;
