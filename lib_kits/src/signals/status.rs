//! # Signal Status Records
//!
//! Raw-row parsing and normalization for the signal-status pipeline: status
//! decoding, identifier stringification, numeric coercion and timestamp
//! formatting. Every function here is a pure transformation over fetched
//! rows; nothing touches the network.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connections::kits_db::SourceRow;
use crate::error::KitsError;
use crate::localtime;

/// Operation states indicating a flashing signal or a communication outage.
/// Only these are fetched from the live feed.
pub const FLASH_STATUSES: [i64; 3] = [1, 2, 3];

/// State code for a dark (powered off, not reporting) signal.
pub const DARK_STATE: i64 = 4;

/// Plan id stamped on synthesized dark records, which have no live plan.
pub const DARK_PLAN_ID: i64 = -1;

/// Decodes an operation-state code to its display text. Fails closed: a code
/// outside the table propagates as [`KitsError::UnknownStatusCode`].
pub fn decode_operation_state(code: i64) -> Result<&'static str, KitsError> {
    match code {
        1 => Ok("Scheduled flash"),
        2 => Ok("Unscheduled (Conflict) flash"),
        3 => Ok("Communication issue"),
        4 => Ok("Dark"),
        other => Err(KitsError::UnknownStatusCode(other)),
    }
}

/// Query for the live signal statuses, most recent first.
pub fn signal_status_query() -> String {
    let statuses = FLASH_STATUSES
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "SELECT \
            status.datetime AS operation_state_datetime, \
            status.status AS operation_state, \
            status.planid AS plan_id, \
            signal.assetnum AS signal_id \
        FROM intersection signal \
        LEFT OUTER JOIN intersectionstatus status \
        ON signal.intid = status.intid \
        WHERE status.datetime IS NOT NULL \
        AND status.status IN ({statuses}) \
        ORDER BY status.datetime DESC"
    )
}

/// One enriched, portal-ready signal status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatusRecord {
    pub signal_id: String,
    pub operation_state: i64,
    pub operation_text: String,
    pub plan_id: i64,
    /// Zone-naive local timestamp of the state change.
    pub operation_state_datetime: String,
    /// Zone-naive local timestamp of this pipeline run.
    pub processed_datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_st: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_st: Option<String>,
}

fn required_value<'a>(row: &'a SourceRow, column: &str) -> Result<&'a str, KitsError> {
    row.get(column)
        .and_then(|v| v.as_deref())
        .ok_or_else(|| KitsError::MalformedRow(format!("missing column {column}")))
}

/// Coerces a text value to an integer, accepting decimal renderings such as
/// `"3.0"` from NUMERIC columns.
fn coerce_int(value: &str, column: &str) -> Result<i64, KitsError> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.fract() == 0.0 {
            return Ok(f as i64);
        }
    }
    Err(KitsError::MalformedRow(format!(
        "column {column} holds non-integer value {value:?}"
    )))
}

/// Renders an identifier as the catalog's string form. Numeric identifiers
/// lose any decimal rendering (`"100.0"` becomes `"100"`).
fn stringify_id(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.fract() == 0.0 {
                return format!("{}", f as i64);
            }
        }
    }
    trimmed.to_string()
}

/// Builds portal-ready records from raw source rows. Decodes status codes,
/// stringifies identifiers, coerces numerics and normalizes timestamps.
/// Asset metadata fields start empty and are filled by the matcher.
pub fn normalize_rows(
    rows: &[SourceRow],
    processed_datetime: &str,
) -> Result<Vec<SignalStatusRecord>, KitsError> {
    rows.iter()
        .map(|row| {
            let operation_state =
                coerce_int(required_value(row, "operation_state")?, "operation_state")?;
            let plan_id = coerce_int(required_value(row, "plan_id")?, "plan_id")?;
            let naive =
                localtime::parse_db_timestamp(required_value(row, "operation_state_datetime")?)?;

            Ok(SignalStatusRecord {
                signal_id: stringify_id(required_value(row, "signal_id")?),
                operation_state,
                operation_text: decode_operation_state(operation_state)?.to_string(),
                plan_id,
                operation_state_datetime: localtime::to_portal_string(naive)?,
                processed_datetime: processed_datetime.to_string(),
                location: None,
                location_name: None,
                primary_st: None,
                cross_st: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(signal_id: &str, state: &str, plan: &str, dt: &str) -> SourceRow {
        let mut row = SourceRow::new();
        row.insert("signal_id".to_string(), Some(signal_id.to_string()));
        row.insert("operation_state".to_string(), Some(state.to_string()));
        row.insert("plan_id".to_string(), Some(plan.to_string()));
        row.insert("operation_state_datetime".to_string(), Some(dt.to_string()));
        row
    }

    #[test]
    fn test_decode_is_total_over_declared_codes() {
        assert_eq!(decode_operation_state(1).unwrap(), "Scheduled flash");
        assert_eq!(
            decode_operation_state(2).unwrap(),
            "Unscheduled (Conflict) flash"
        );
        assert_eq!(decode_operation_state(3).unwrap(), "Communication issue");
        assert_eq!(decode_operation_state(4).unwrap(), "Dark");
    }

    #[test]
    fn test_decode_fails_closed_on_unknown_code() {
        assert!(matches!(
            decode_operation_state(9),
            Err(KitsError::UnknownStatusCode(9))
        ));
        assert!(matches!(
            decode_operation_state(0),
            Err(KitsError::UnknownStatusCode(0))
        ));
    }

    #[test]
    fn test_normalize_decodes_and_formats() {
        let rows = vec![row("7", "1", "12", "2023-01-01 08:00:00")];
        let records = normalize_rows(&rows, "2023-01-01T08:05:00").unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.signal_id, "7");
        assert_eq!(rec.operation_state, 1);
        assert_eq!(rec.operation_text, "Scheduled flash");
        assert_eq!(rec.plan_id, 12);
        assert_eq!(rec.operation_state_datetime, "2023-01-01T08:00:00");
        assert_eq!(rec.processed_datetime, "2023-01-01T08:05:00");
        assert!(rec.location.is_none());
    }

    #[test]
    fn test_normalize_coerces_decimal_renderings() {
        let rows = vec![row("100.0", "2.0", "3.0", "2023-01-01 08:00:00")];
        let records = normalize_rows(&rows, "2023-01-01T08:05:00").unwrap();
        assert_eq!(records[0].signal_id, "100");
        assert_eq!(records[0].operation_state, 2);
        assert_eq!(records[0].plan_id, 3);
    }

    #[test]
    fn test_normalize_propagates_unknown_code() {
        let rows = vec![row("7", "8", "12", "2023-01-01 08:00:00")];
        assert!(matches!(
            normalize_rows(&rows, "2023-01-01T08:05:00"),
            Err(KitsError::UnknownStatusCode(8))
        ));
    }

    #[test]
    fn test_query_filters_to_flash_statuses() {
        let query = signal_status_query();
        assert!(query.contains("IN (1,2,3)"));
        assert!(query.contains("ORDER BY status.datetime DESC"));
    }
}
