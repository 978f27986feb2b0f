//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument
//! parsing and configuration.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DEFAULT_JOURNAL_PATH, DNS_TIMEOUT_SECS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which diagnostic check(s) to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CheckKind {
    /// Record health (A/AAAA/NS/SOA, wildcard, dangling CNAME)
    Health,
    /// Mail policy (MX, SPF, DMARC)
    Mail,
    /// DNSSEC chain of trust
    Dnssec,
    /// Cross-resolver propagation consistency
    Propagation,
    /// All of the above
    All,
}

/// Command-line options.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dns_triage",
    about = "DNS health, mail policy, DNSSEC, and propagation diagnostics",
    version
)]
pub struct Opt {
    /// Domains to diagnose (checked independently, in order)
    #[arg(required = true)]
    pub domains: Vec<String>,

    /// Which check to run
    #[arg(long, value_enum, default_value_t = CheckKind::All)]
    pub check: CheckKind,

    /// Resolver address for the propagation check (repeatable; defaults to
    /// three public resolvers)
    #[arg(long = "resolver")]
    pub resolvers: Vec<IpAddr>,

    /// Per-query timeout in seconds
    #[arg(long, default_value_t = DNS_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Path of the append-only interaction journal (JSONL)
    #[arg(long, default_value = DEFAULT_JOURNAL_PATH)]
    pub journal: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_opt_defaults() {
        let opt = Opt::try_parse_from(["dns_triage", "example.com"]).unwrap();
        assert_eq!(opt.domains, vec!["example.com".to_string()]);
        assert_eq!(opt.check, CheckKind::All);
        assert!(opt.resolvers.is_empty());
        assert_eq!(opt.timeout_seconds, DNS_TIMEOUT_SECS);
        assert_eq!(opt.journal, PathBuf::from(DEFAULT_JOURNAL_PATH));
    }

    #[test]
    fn test_opt_requires_a_domain() {
        assert!(Opt::try_parse_from(["dns_triage"]).is_err());
    }

    #[test]
    fn test_opt_repeatable_resolvers() {
        let opt = Opt::try_parse_from([
            "dns_triage",
            "example.com",
            "--resolver",
            "8.8.8.8",
            "--resolver",
            "1.1.1.1",
        ])
        .unwrap();
        assert_eq!(opt.resolvers.len(), 2);
    }

    #[test]
    fn test_opt_rejects_bad_resolver() {
        let result =
            Opt::try_parse_from(["dns_triage", "example.com", "--resolver", "not-an-ip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_opt_check_selection() {
        let opt =
            Opt::try_parse_from(["dns_triage", "example.com", "--check", "dnssec"]).unwrap();
        assert_eq!(opt.check, CheckKind::Dnssec);
    }
}
