//! Domain models for tracked organizations, domains, and scan results.
//!
//! These models are storage-agnostic snapshots of the records the external
//! scanners produce. The core does not own their lifecycle; it reads them
//! through the repository ports and pages over them through connections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Keys
// =============================================================================

/// A record with a stable, unique string key within its collection.
///
/// Connection cursors are encoded over this key, and [`crate::ports::BatchKeyLoader`]
/// maps batched results back to requested keys through it.
pub trait Keyed {
    /// Stable unique key of the record within its collection.
    fn key(&self) -> &str;
}

// =============================================================================
// Compliance
// =============================================================================

/// Rolled-up compliance status of a protocol check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// The check passed.
    Pass,
    /// The check failed.
    Fail,
    /// No conclusive result yet (never scanned, or scan inconclusive).
    Info,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Pass => "pass",
            ComplianceStatus::Fail => "fail",
            ComplianceStatus::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(ComplianceStatus::Pass),
            "fail" => Some(ComplianceStatus::Fail),
            "info" => Some(ComplianceStatus::Info),
            _ => None,
        }
    }
}

/// DMARC deployment phase of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmarcPhase {
    Assess,
    Deploy,
    Enforce,
    Maintain,
    NotImplemented,
}

impl DmarcPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DmarcPhase::Assess => "assess",
            DmarcPhase::Deploy => "deploy",
            DmarcPhase::Enforce => "enforce",
            DmarcPhase::Maintain => "maintain",
            DmarcPhase::NotImplemented => "not_implemented",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assess" => Some(DmarcPhase::Assess),
            "deploy" => Some(DmarcPhase::Deploy),
            "enforce" => Some(DmarcPhase::Enforce),
            "maintain" => Some(DmarcPhase::Maintain),
            "not_implemented" => Some(DmarcPhase::NotImplemented),
            _ => None,
        }
    }
}

// =============================================================================
// Organizations
// =============================================================================

/// An organization that claims and monitors domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique document key.
    pub key: String,
    /// URL-safe identifier (e.g. "treasury-board").
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Short acronym (e.g. "TBS").
    pub acronym: String,
    /// Sector the organization belongs to.
    pub sector: String,
    /// Whether ownership of the organization has been verified.
    pub verified: bool,
    /// Denormalized count of claimed domains.
    pub domain_count: u32,
    /// When the organization was registered.
    pub created_at: DateTime<Utc>,
}

impl Keyed for Organization {
    fn key(&self) -> &str {
        &self.key
    }
}

// =============================================================================
// Domains
// =============================================================================

/// A registered domain whose security posture is tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    /// Unique document key.
    pub key: String,
    /// Fully-qualified domain name.
    pub domain: String,
    /// When the scanners last ran against this domain.
    pub last_ran: DateTime<Utc>,
    /// DKIM selectors known for this domain.
    pub selectors: Vec<String>,
    /// Rolled-up HTTPS compliance.
    pub https_status: ComplianceStatus,
    /// Rolled-up SSL/TLS compliance.
    pub ssl_status: ComplianceStatus,
    /// Rolled-up SPF compliance.
    pub spf_status: ComplianceStatus,
    /// Rolled-up DKIM compliance.
    pub dkim_status: ComplianceStatus,
    /// Rolled-up DMARC compliance.
    pub dmarc_status: ComplianceStatus,
    /// DMARC deployment phase.
    pub dmarc_phase: DmarcPhase,
    /// Key of the organization this domain was listed through.
    ///
    /// Not stored: populated by the connection decorate step when the domain
    /// is reached through an organization's claimed-domains connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
}

impl Keyed for Domain {
    fn key(&self) -> &str {
        &self.key
    }
}

// =============================================================================
// Scans
// =============================================================================

/// The protocol a scan result covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Https,
    Ssl,
    Dkim,
    Spf,
    Dmarc,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Https => "https",
            ScanKind::Ssl => "ssl",
            ScanKind::Dkim => "dkim",
            ScanKind::Spf => "spf",
            ScanKind::Dmarc => "dmarc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "https" => Some(ScanKind::Https),
            "ssl" => Some(ScanKind::Ssl),
            "dkim" => Some(ScanKind::Dkim),
            "spf" => Some(ScanKind::Spf),
            "dmarc" => Some(ScanKind::Dmarc),
            _ => None,
        }
    }
}

/// One scan result produced by the external scanners.
///
/// Kind-specific fields (HSTS headers, cipher suites, DKIM key lengths,
/// SPF lookups, DMARC policy tags) live in the `data` payload; the scanners
/// own that shape, the API serves it opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    /// Unique document key.
    pub key: String,
    /// Key of the scanned domain.
    pub domain_key: String,
    /// Which protocol this scan covers.
    pub kind: ScanKind,
    /// When the scan ran.
    pub scanned_at: DateTime<Utc>,
    /// Rolled-up result of the scan.
    pub status: ComplianceStatus,
    /// Kind-specific payload as JSON.
    pub data: serde_json::Value,
}

impl Keyed for Scan {
    fn key(&self) -> &str {
        &self.key
    }
}

// =============================================================================
// DMARC Summaries
// =============================================================================

/// Aggregate message counts by DMARC disposition category.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    /// Messages passing both DKIM and SPF.
    pub full_pass: u64,
    /// Messages passing DKIM only.
    pub pass_dkim_only: u64,
    /// Messages passing SPF only.
    pub pass_spf_only: u64,
    /// Messages failing both.
    pub fail: u64,
}

/// Monthly DMARC aggregate-report summary for one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmarcSummary {
    /// Unique document key.
    pub key: String,
    /// Key of the domain the summary covers.
    pub domain_key: String,
    /// First day of the month the summary covers.
    pub period: NaiveDate,
    /// Total messages observed in the period.
    pub total_messages: u64,
    /// Message counts by disposition category.
    pub categories: CategoryTotals,
}

impl Keyed for DmarcSummary {
    fn key(&self) -> &str {
        &self.key
    }
}

// =============================================================================
// Viewer
// =============================================================================

/// Identity of the requesting user, carried for diagnostics only.
///
/// Loaders and paginators include the user key in their error logs when it is
/// known. Authorization decisions happen outside this layer.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user_key: Option<String>,
}

impl Viewer {
    /// An unauthenticated viewer.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A viewer identified by a user key.
    pub fn known(user_key: impl Into<String>) -> Self {
        Self {
            user_key: Some(user_key.into()),
        }
    }

    /// The user key, or "anonymous" for log fields.
    pub fn log_key(&self) -> &str {
        self.user_key.as_deref().unwrap_or("anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_status_str_roundtrip() {
        for status in [
            ComplianceStatus::Pass,
            ComplianceStatus::Fail,
            ComplianceStatus::Info,
        ] {
            assert_eq!(ComplianceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ComplianceStatus::parse("unknown"), None);
    }

    #[test]
    fn scan_kind_str_roundtrip() {
        for kind in [
            ScanKind::Https,
            ScanKind::Ssl,
            ScanKind::Dkim,
            ScanKind::Spf,
            ScanKind::Dmarc,
        ] {
            assert_eq!(ScanKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn dmarc_phase_str_roundtrip() {
        for phase in [
            DmarcPhase::Assess,
            DmarcPhase::Deploy,
            DmarcPhase::Enforce,
            DmarcPhase::Maintain,
            DmarcPhase::NotImplemented,
        ] {
            assert_eq!(DmarcPhase::parse(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn viewer_log_key_defaults_to_anonymous() {
        assert_eq!(Viewer::anonymous().log_key(), "anonymous");
        assert_eq!(Viewer::known("users/123").log_key(), "users/123");
    }
}
