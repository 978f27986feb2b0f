//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `dns_triage` library that handles:
//! - Command-line argument parsing
//! - Logger and journal initialization
//! - User-facing JSON output
//!
//! All core functionality is implemented in the library crate.

use std::net::IpAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use dns_triage::initialization::{init_logger_with, init_resolver};
use dns_triage::journal::JsonlJournal;
use dns_triage::{CheckKind, Evaluator, Opt, QueryPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    // Initialize logger based on CLI options
    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let journal = JsonlJournal::open(&opt.journal)
        .with_context(|| format!("Failed to open journal at {}", opt.journal.display()))?;

    let policy = QueryPolicy::with_timeout(Duration::from_secs(opt.timeout_seconds));
    let resolver = init_resolver(&policy);
    let evaluator = Evaluator::new(resolver, policy, Arc::new(journal));

    let resolvers = (!opt.resolvers.is_empty()).then(|| opt.resolvers.clone());

    // One domain's failure never stops the next; invalid input only
    // affects the final exit code.
    let mut had_invalid_input = false;
    for domain in &opt.domains {
        match run_checks(&evaluator, domain, opt.check, resolvers.clone()).await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => {
                error!("{}: {:#}", domain, e);
                had_invalid_input = true;
            }
        }
    }

    if had_invalid_input {
        process::exit(1);
    }
    Ok(())
}

/// Runs the selected check(s) and assembles one JSON document per domain.
async fn run_checks(
    evaluator: &Evaluator,
    domain: &str,
    check: CheckKind,
    resolvers: Option<Vec<IpAddr>>,
) -> Result<serde_json::Value> {
    let mut report = serde_json::Map::new();

    if matches!(check, CheckKind::Health | CheckKind::All) {
        let health = evaluator.health_check(domain).await?;
        report.insert("health".to_string(), serde_json::to_value(health)?);
    }
    if matches!(check, CheckKind::Mail | CheckKind::All) {
        let mail = evaluator.mail_policy_check(domain).await?;
        report.insert("mail".to_string(), serde_json::to_value(mail)?);
    }
    if matches!(check, CheckKind::Dnssec | CheckKind::All) {
        let dnssec = evaluator.dnssec_status(domain).await?;
        report.insert("dnssec".to_string(), serde_json::to_value(dnssec)?);
    }
    if matches!(check, CheckKind::Propagation | CheckKind::All) {
        let propagation = evaluator.propagation_check(domain, resolvers).await?;
        report.insert("propagation".to_string(), serde_json::to_value(propagation)?);
    }

    Ok(serde_json::Value::Object(report))
}
