//! Demo data for local development.
//!
//! Loads two organizations, four claimed domains, one scan of each kind,
//! and a few months of DMARC summaries through the repository write paths.
//! Safe to re-run: everything is upserted.

use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use tracker_core::models::{
    CategoryTotals, ComplianceStatus, DmarcPhase, DmarcSummary, Domain, Organization, Scan,
    ScanKind,
};
use tracker_core::ports::Repositories;

pub async fn seed_demo(repos: &dyn Repositories) -> Result<()> {
    let created_at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
    let scanned_at = Utc.with_ymd_and_hms(2025, 6, 2, 4, 30, 0).unwrap();

    let organizations = vec![
        Organization {
            key: "organizations/1".into(),
            slug: "treasury-board".into(),
            name: "Treasury Board Secretariat".into(),
            acronym: "TBS".into(),
            sector: "government".into(),
            verified: true,
            domain_count: 0,
            created_at,
        },
        Organization {
            key: "organizations/2".into(),
            slug: "cyber-centre".into(),
            name: "Canadian Centre for Cyber Security".into(),
            acronym: "CCCS".into(),
            sector: "government".into(),
            verified: true,
            domain_count: 0,
            created_at,
        },
    ];
    repos.organizations().upsert_organizations(&organizations).await?;

    let domain = |key: &str, fqdn: &str, dmarc: ComplianceStatus, phase: DmarcPhase| Domain {
        key: key.into(),
        domain: fqdn.into(),
        last_ran: scanned_at,
        selectors: vec!["selector1".into()],
        https_status: ComplianceStatus::Pass,
        ssl_status: ComplianceStatus::Pass,
        spf_status: ComplianceStatus::Pass,
        dkim_status: ComplianceStatus::Info,
        dmarc_status: dmarc,
        dmarc_phase: phase,
        claimed_by: None,
    };
    let domains = vec![
        domain(
            "domains/1",
            "canada.example.ca",
            ComplianceStatus::Pass,
            DmarcPhase::Enforce,
        ),
        domain(
            "domains/2",
            "stats.example.ca",
            ComplianceStatus::Fail,
            DmarcPhase::Deploy,
        ),
        domain(
            "domains/3",
            "cyber.example.ca",
            ComplianceStatus::Pass,
            DmarcPhase::Maintain,
        ),
        domain(
            "domains/4",
            "mail.example.ca",
            ComplianceStatus::Info,
            DmarcPhase::Assess,
        ),
    ];
    repos.domains().upsert_domains(&domains).await?;

    for (org, dom) in [
        ("organizations/1", "domains/1"),
        ("organizations/1", "domains/2"),
        ("organizations/2", "domains/3"),
        ("organizations/2", "domains/4"),
    ] {
        repos.domains().claim_domain(org, dom).await?;
    }

    let scan = |key: &str, kind: ScanKind, status: ComplianceStatus, data: serde_json::Value| Scan {
        key: key.into(),
        domain_key: "domains/1".into(),
        kind,
        scanned_at,
        status,
        data,
    };
    let scans = vec![
        scan(
            "scans/https-1",
            ScanKind::Https,
            ComplianceStatus::Pass,
            json!({
                "implementation": "Valid HTTPS",
                "enforced": "Strict",
                "hsts": "HSTS Fully Implemented",
                "preloaded": true,
            }),
        ),
        scan(
            "scans/ssl-1",
            ScanKind::Ssl,
            ComplianceStatus::Pass,
            json!({
                "acceptable_certificate": true,
                "strong_ciphers": ["TLS_AES_256_GCM_SHA384"],
                "weak_ciphers": [],
            }),
        ),
        scan(
            "scans/dkim-1",
            ScanKind::Dkim,
            ComplianceStatus::Info,
            json!({
                "selector": "selector1",
                "key_length": 2048,
                "record": "v=DKIM1; k=rsa; p=MIIBIjANBg...",
            }),
        ),
        scan(
            "scans/spf-1",
            ScanKind::Spf,
            ComplianceStatus::Pass,
            json!({
                "record": "v=spf1 include:_spf.example.ca -all",
                "lookups": 4,
                "spf_default": "-all",
            }),
        ),
        scan(
            "scans/dmarc-1",
            ScanKind::Dmarc,
            ComplianceStatus::Pass,
            json!({
                "record": "v=DMARC1; p=reject; pct=100; rua=mailto:dmarc@example.ca",
                "p_policy": "reject",
                "sp_policy": "reject",
                "pct": 100,
            }),
        ),
    ];
    repos.scans().insert_scans(&scans).await?;

    let summary = |key: &str, year: i32, month: u32, totals: CategoryTotals| DmarcSummary {
        key: key.into(),
        domain_key: "domains/1".into(),
        period: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
        total_messages: totals.full_pass + totals.pass_dkim_only + totals.pass_spf_only + totals.fail,
        categories: totals,
    };
    let summaries = vec![
        summary(
            "dmarcSummaries/2025-03",
            2025,
            3,
            CategoryTotals {
                full_pass: 9_200,
                pass_dkim_only: 410,
                pass_spf_only: 280,
                fail: 310,
            },
        ),
        summary(
            "dmarcSummaries/2025-04",
            2025,
            4,
            CategoryTotals {
                full_pass: 10_450,
                pass_dkim_only: 380,
                pass_spf_only: 190,
                fail: 145,
            },
        ),
        summary(
            "dmarcSummaries/2025-05",
            2025,
            5,
            CategoryTotals {
                full_pass: 11_020,
                pass_dkim_only: 260,
                pass_spf_only: 170,
                fail: 90,
            },
        ),
    ];
    repos.summaries().upsert_summaries(&summaries).await?;

    Ok(())
}
