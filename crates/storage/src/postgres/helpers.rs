//! Shared row-mapping and error-translation helpers.

use tracker_core::error::FetchError;
use tracker_core::models::{ComplianceStatus, DmarcPhase, ScanKind};

/// Translate a sqlx failure into the core's fetch-error taxonomy.
///
/// Failures that occur while materializing rows (decode, missing columns,
/// unknown types) count as cursor failures; everything else is a rejected
/// query.
pub(crate) fn fetch_err(e: sqlx::Error) -> FetchError {
    match &e {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => FetchError::Cursor(e.to_string()),
        _ => FetchError::Query(e.to_string()),
    }
}

/// Decode a stored compliance status, naming the field on failure.
pub(crate) fn decode_status(value: &str, field: &str) -> Result<ComplianceStatus, String> {
    ComplianceStatus::parse(value)
        .ok_or_else(|| format!("{} holds invalid status {:?}", field, value))
}

/// Decode a stored DMARC phase.
pub(crate) fn decode_phase(value: &str) -> Result<DmarcPhase, String> {
    DmarcPhase::parse(value).ok_or_else(|| format!("dmarc_phase holds invalid value {:?}", value))
}

/// Decode a stored scan kind.
pub(crate) fn decode_kind(value: &str) -> Result<ScanKind, String> {
    ScanKind::parse(value).ok_or_else(|| format!("kind holds invalid value {:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_status_names_the_field() {
        let err = decode_status("maybe", "domains.https_status").unwrap_err();
        assert!(err.contains("domains.https_status") && err.contains("maybe"));
        assert_eq!(
            decode_status("pass", "x").unwrap(),
            ComplianceStatus::Pass
        );
    }

    #[test]
    fn decode_kind_rejects_unknown_values() {
        assert!(decode_kind("mx").is_err());
        assert_eq!(decode_kind("dmarc").unwrap(), ScanKind::Dmarc);
    }
}
