//! Human-readable folio identifiers.
//!
//! Reports are numbered per office and type: `ORC-AP-001`, `ORC-AP-002`, ...
//! Actions without a caller-supplied folio get a timestamp folio.

use chrono::NaiveDateTime;

use crate::status::ReportKind;

/// Sequence scope for a report folio, e.g. `ORC-AP`.
pub fn report_prefix(office_abbreviation: &str, kind: ReportKind) -> String {
    format!("{}-{}", office_abbreviation.trim(), kind.abbreviation())
}

/// Formats a report folio. The counter is zero-padded to three digits and
/// keeps growing past 999.
///
/// ```
/// use vigia_common::folio::report_folio;
///
/// assert_eq!(report_folio("ORC-AP", 1), "ORC-AP-001");
/// assert_eq!(report_folio("ORN-CON", 1200), "ORN-CON-1200");
/// ```
pub fn report_folio(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence:03}")
}

/// Timestamp folio for an action, to the second in local time.
pub fn action_folio(now: NaiveDateTime, draft: bool) -> String {
    let stamp = now.format("%Y%m%d%H%M%S");
    if draft {
        format!("AP-DRAFT-{stamp}")
    } else {
        format!("AP-{stamp}")
    }
}
