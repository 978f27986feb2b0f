//! Mail policy check: MX presence, SPF at the apex, DMARC at
//! `_dmarc.<domain>`.
//!
//! Validation here is prefix/shape only. An SPF record is any apex TXT
//! starting with `v=spf1`; a DMARC record is any TXT at the `_dmarc` name
//! starting with `v=DMARC1`. Full policy grammar parsing is out of scope,
//! but the DMARC `p=` tag is extracted and surfaced because it is the one
//! value operators actually ask about.

use std::time::Instant;

use crate::domain::DomainQuery;
use crate::error_handling::CheckError;
use crate::models::{CheckCategory, Finding, MailReport, QueryOutcome, RecordKind, ResolverResult};
use crate::query::lookup;

use super::Evaluator;

impl Evaluator {
    /// Checks the mail-sending and mail-receiving policy records of a
    /// domain.
    ///
    /// A domain without MX records is only a `warning`: it may legitimately
    /// send no mail, in which case a null SPF record is exactly what it
    /// should publish — so SPF and DMARC are checked regardless.
    pub async fn mail_policy_check(&self, domain: &str) -> Result<MailReport, CheckError> {
        let query = DomainQuery::parse(domain)?;
        let started = Instant::now();

        let mx = lookup(&self.resolver, query.as_str(), RecordKind::Mx, &self.policy).await;
        let apex_txt = lookup(&self.resolver, query.as_str(), RecordKind::Txt, &self.policy).await;
        let dmarc_txt = lookup(&self.resolver, &query.dmarc_name(), RecordKind::Txt, &self.policy)
            .await;

        let (spf, dmarc, findings) = evaluate_mail(&mx, &apex_txt, &dmarc_txt);

        self.journal_invocation("mail_policy_check", query.as_str(), started, &findings);
        Ok(MailReport {
            domain: query.as_str().to_string(),
            mx,
            spf,
            dmarc,
            findings,
        })
    }
}

/// Turns the three raw lookups into the SPF/DMARC values and findings.
fn evaluate_mail(
    mx: &ResolverResult,
    apex_txt: &ResolverResult,
    dmarc_txt: &ResolverResult,
) -> (Option<String>, Option<String>, Vec<Finding>) {
    let mut findings = Vec::new();

    if mx.outcome != QueryOutcome::Answered {
        findings.push(Finding::warning(
            CheckCategory::Mail,
            "no mail exchanger configured",
        ));
    }

    let spf_records: Vec<&String> = apex_txt
        .values
        .iter()
        .filter(|txt| txt.starts_with("v=spf1"))
        .collect();
    let spf = match spf_records.as_slice() {
        [] => {
            findings.push(Finding::warning(CheckCategory::Mail, "no SPF record"));
            None
        }
        [record] => Some((*record).clone()),
        records => {
            findings.push(
                Finding::warning(
                    CheckCategory::Mail,
                    "multiple SPF records (RFC 7208 permits at most one)",
                )
                .with_data(serde_json::json!({
                    "records": records.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
                })),
            );
            None
        }
    };

    let dmarc_record = dmarc_txt
        .values
        .iter()
        .find(|txt| txt.starts_with("v=DMARC1"));
    let dmarc = match dmarc_record {
        None => {
            findings.push(Finding::warning(CheckCategory::Mail, "no DMARC record"));
            None
        }
        Some(record) => {
            match dmarc_policy(record) {
                Some(policy) => findings.push(Finding::info(
                    CheckCategory::Mail,
                    format!("DMARC policy: {}", policy),
                )),
                None => findings.push(Finding::warning(
                    CheckCategory::Mail,
                    "DMARC record has no parsable p= tag",
                )),
            }
            Some(record.clone())
        }
    };

    (spf, dmarc, findings)
}

/// Extracts the value of the `p=` tag from a DMARC record.
fn dmarc_policy(record: &str) -> Option<&str> {
    record
        .split(';')
        .map(str::trim)
        .find_map(|tag| tag.strip_prefix("p="))
        .map(str::trim)
        .filter(|policy| !policy.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn txt(values: &[&str]) -> ResolverResult {
        ResolverResult {
            record_type: RecordKind::Txt,
            values: values.iter().map(|v| v.to_string()).collect(),
            ttl: Some(300),
            outcome: QueryOutcome::Answered,
        }
    }

    fn answered_mx() -> ResolverResult {
        ResolverResult {
            record_type: RecordKind::Mx,
            values: vec!["10 mail.example.com".to_string()],
            ttl: Some(300),
            outcome: QueryOutcome::Answered,
        }
    }

    fn no_dmarc() -> ResolverResult {
        ResolverResult::empty(RecordKind::Txt, QueryOutcome::Nxdomain)
    }

    #[test]
    fn test_single_spf_record_accepted_without_warning() {
        let (spf, _, findings) = evaluate_mail(
            &answered_mx(),
            &txt(&["v=spf1 -all", "google-site-verification=abc"]),
            &no_dmarc(),
        );
        assert_eq!(spf.as_deref(), Some("v=spf1 -all"));
        assert!(!findings
            .iter()
            .any(|f| f.message.contains("SPF") && f.severity == Severity::Warning));
    }

    #[test]
    fn test_multiple_spf_records_warn() {
        let (spf, _, findings) = evaluate_mail(
            &answered_mx(),
            &txt(&["v=spf1 -all", "v=spf1 include:_spf.example.com ~all"]),
            &no_dmarc(),
        );
        assert!(spf.is_none());
        let warning = findings
            .iter()
            .find(|f| f.message.contains("multiple SPF records"))
            .expect("multiple-SPF warning");
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.data.is_some());
    }

    #[test]
    fn test_missing_spf_warns() {
        let (spf, _, findings) = evaluate_mail(&answered_mx(), &txt(&[]), &no_dmarc());
        assert!(spf.is_none());
        assert!(findings.iter().any(|f| f.message == "no SPF record"));
    }

    #[test]
    fn test_dmarc_policy_surfaced() {
        let (_, dmarc, findings) = evaluate_mail(
            &answered_mx(),
            &txt(&["v=spf1 -all"]),
            &txt(&["v=DMARC1; p=reject; rua=mailto:dmarc@example.com"]),
        );
        assert_eq!(
            dmarc.as_deref(),
            Some("v=DMARC1; p=reject; rua=mailto:dmarc@example.com")
        );
        let policy = findings
            .iter()
            .find(|f| f.message.starts_with("DMARC policy"))
            .expect("policy finding");
        assert_eq!(policy.severity, Severity::Info);
        assert!(policy.message.contains("reject"));
        assert!(!findings
            .iter()
            .any(|f| f.message.contains("DMARC") && f.severity == Severity::Warning));
    }

    #[test]
    fn test_dmarc_without_policy_tag_warns() {
        let (_, dmarc, findings) = evaluate_mail(
            &answered_mx(),
            &txt(&["v=spf1 -all"]),
            &txt(&["v=DMARC1; rua=mailto:dmarc@example.com"]),
        );
        assert!(dmarc.is_some());
        assert!(findings
            .iter()
            .any(|f| f.message.contains("no parsable p= tag")));
    }

    #[test]
    fn test_missing_mx_warns_but_spf_still_checked() {
        let mx = ResolverResult::empty(RecordKind::Mx, QueryOutcome::NoData);
        let (spf, _, findings) = evaluate_mail(&mx, &txt(&["v=spf1 -all"]), &no_dmarc());
        assert!(findings
            .iter()
            .any(|f| f.message == "no mail exchanger configured"));
        assert_eq!(spf.as_deref(), Some("v=spf1 -all"));
    }

    #[test]
    fn test_dmarc_policy_parsing() {
        assert_eq!(dmarc_policy("v=DMARC1; p=none"), Some("none"));
        assert_eq!(dmarc_policy("v=DMARC1; p=quarantine; pct=50"), Some("quarantine"));
        assert_eq!(dmarc_policy("v=DMARC1;p=reject"), Some("reject"));
        assert_eq!(dmarc_policy("v=DMARC1; sp=none"), None);
        assert_eq!(dmarc_policy("v=DMARC1; p="), None);
    }
}
