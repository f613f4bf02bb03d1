//! # DMS Message Pipeline
//!
//! Cleanup of raw dynamic-message-sign text and the change detection that
//! keeps Knack writes to a minimum. Sign controllers embed formatting tokens
//! in square brackets; a couple are meaningful, the rest are stripped.

use regex::Regex;
use serde_json::{Value, json};
use static_init::dynamic;
use tracing::warn;

use crate::connections::kits_db::SourceRow;
use crate::error::KitsError;
use crate::localtime;

/// Any bracketed formatting token, non-greedy so adjacent tokens stay separate.
#[dynamic]
static BRACKET_TOKEN: Regex = Regex::new(r"\[.*?\]").unwrap();

/// Knack time format for `MESSAGE_TIME`.
const MESSAGE_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Knack stores line breaks as HTML.
const KNACK_LINE_BREAK: &str = "<br />";

/// Query for the current message on every sign.
pub const DMS_QUERY: &str = "SELECT \
        dmsid AS kits_id, \
        multistring AS dms_message, \
        lastupdated AS message_time \
    FROM dms_realtimedata";

/// Knack field ids for the KITS columns.
#[derive(Debug, Clone)]
pub struct KnackFieldMap {
    pub kits_id: &'static str,
    pub dms_message: &'static str,
    pub message_time: &'static str,
}

impl Default for KnackFieldMap {
    fn default() -> Self {
        Self {
            kits_id: "field_1639",
            dms_message: "field_1794",
            message_time: "field_1795",
        }
    }
}

/// One freshly fetched, cleaned-up sign message.
#[derive(Debug, Clone, PartialEq)]
pub struct DmsRecord {
    pub kits_id: String,
    /// Cleaned display text with real newlines.
    pub message: String,
    pub message_time: String,
}

/// A staged row-level update for one Knack record.
#[derive(Debug, Clone, PartialEq)]
pub struct DmsUpdate {
    /// Knack's opaque row id.
    pub record_id: String,
    pub kits_id: String,
    pub message: String,
    pub message_time: String,
}

impl DmsUpdate {
    /// Partial field set sent to Knack.
    pub fn payload(&self, fields: &KnackFieldMap) -> Value {
        json!({
            (fields.kits_id): self.kits_id,
            (fields.dms_message): self.message,
            (fields.message_time): self.message_time,
        })
    }
}

/// Removes device formatting artifacts from raw sign text: `[np]` is a new
/// line, `[nl]` is a space, every other bracketed token is dropped.
pub fn cleanup_dms_message(message: &str) -> String {
    let message = message.replace("[np]", "\n").replace("[nl]", " ");
    BRACKET_TOKEN.replace_all(&message, "").into_owned()
}

fn required_value<'a>(row: &'a SourceRow, column: &str) -> Result<&'a str, KitsError> {
    row.get(column)
        .and_then(|v| v.as_deref())
        .ok_or_else(|| KitsError::MalformedRow(format!("missing column {column}")))
}

/// Builds cleaned DMS records from raw source rows.
pub fn normalize_rows(rows: &[SourceRow]) -> Result<Vec<DmsRecord>, KitsError> {
    rows.iter()
        .map(|row| {
            let naive = localtime::parse_db_timestamp(required_value(row, "message_time")?)?;
            Ok(DmsRecord {
                kits_id: required_value(row, "kits_id")?.trim().to_string(),
                message: cleanup_dms_message(required_value(row, "dms_message")?),
                message_time: naive.format(MESSAGE_TIME_FORMAT).to_string(),
            })
        })
        .collect()
}

/// Knack represents the KITS id as either a number or a string depending on
/// field configuration; compare everything as strings.
fn knack_field_as_string(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Diffs fresh sign messages against the currently published Knack records
/// and stages updates only where the content actually changed.
///
/// A source record with no matching Knack row is skipped (rows are never
/// created here). Multiple Knack rows sharing one KITS id is ambiguous and
/// the record is skipped with a warning, never guessed at.
pub fn detect_changed_messages(
    kits_records: &[DmsRecord],
    knack_records: &[Value],
    fields: &KnackFieldMap,
) -> Vec<DmsUpdate> {
    let mut updates = Vec::new();

    for record in kits_records {
        let matches: Vec<&Value> = knack_records
            .iter()
            .filter(|k| {
                knack_field_as_string(k, fields.kits_id).as_deref() == Some(&record.kits_id)
            })
            .collect();

        let matched = match matches.as_slice() {
            [] => continue,
            [one] => *one,
            many => {
                warn!(
                    "{} Knack rows share KITS id {}; skipping",
                    many.len(),
                    record.kits_id
                );
                continue;
            }
        };

        let stored = matched
            .get(fields.dms_message)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let encoded = record.message.replace('\n', KNACK_LINE_BREAK);
        if encoded == stored {
            continue;
        }

        let Some(record_id) = matched.get("id").and_then(Value::as_str) else {
            warn!("Knack row for KITS id {} has no row id; skipping", record.kits_id);
            continue;
        };

        updates.push(DmsUpdate {
            record_id: record_id.to_string(),
            kits_id: record.kits_id.clone(),
            message: record.message.clone(),
            message_time: record.message_time.clone(),
        });
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cleanup_substitutes_known_tokens() {
        assert_eq!(
            cleanup_dms_message("SLOW[np]TRAFFIC[nl]AHEAD[cd3]"),
            "SLOW\nTRAFFIC AHEAD"
        );
    }

    #[test]
    fn test_cleanup_strips_all_remaining_brackets() {
        let cleaned = cleanup_dms_message("[jl3][pt15o0]ROAD[fo3] WORK[cd5][g1]");
        assert!(!cleaned.contains('['));
        assert!(!cleaned.contains(']'));
        assert_eq!(cleaned, "ROAD WORK");
    }

    #[test]
    fn test_cleanup_leaves_plain_text_alone() {
        assert_eq!(cleanup_dms_message("ROAD WORK AHEAD"), "ROAD WORK AHEAD");
    }

    #[test]
    fn test_normalize_formats_message_time() {
        let mut row = SourceRow::new();
        row.insert("kits_id".to_string(), Some("12".to_string()));
        row.insert(
            "dms_message".to_string(),
            Some("ICE[np]POSSIBLE".to_string()),
        );
        row.insert(
            "message_time".to_string(),
            Some("2023-01-01 08:00:00".to_string()),
        );
        let records = normalize_rows(&[row]).unwrap();
        assert_eq!(records[0].kits_id, "12");
        assert_eq!(records[0].message, "ICE\nPOSSIBLE");
        assert_eq!(records[0].message_time, "01/01/2023 08:00");
    }

    fn kits(kits_id: &str, message: &str) -> DmsRecord {
        DmsRecord {
            kits_id: kits_id.to_string(),
            message: message.to_string(),
            message_time: "01/01/2023 08:00".to_string(),
        }
    }

    fn knack(id: &str, kits_id: &str, stored: &str) -> Value {
        json!({
            "id": id,
            "field_1639": kits_id,
            "field_1794": stored,
            "field_1795": "12/31/2022 09:00",
        })
    }

    #[test]
    fn test_unchanged_message_is_not_staged() {
        let updates = detect_changed_messages(
            &[kits("12", "ICE\nPOSSIBLE")],
            &[knack("abc", "12", "ICE<br />POSSIBLE")],
            &KnackFieldMap::default(),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_single_character_change_is_staged() {
        let updates = detect_changed_messages(
            &[kits("12", "ICY\nPOSSIBLE")],
            &[knack("abc", "12", "ICE<br />POSSIBLE")],
            &KnackFieldMap::default(),
        );
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].record_id, "abc");
        assert_eq!(updates[0].message, "ICY\nPOSSIBLE");
    }

    #[test]
    fn test_no_matching_knack_row_is_skipped() {
        let updates = detect_changed_messages(
            &[kits("99", "ANYTHING")],
            &[knack("abc", "12", "ICE<br />POSSIBLE")],
            &KnackFieldMap::default(),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_ambiguous_knack_rows_are_skipped() {
        let updates = detect_changed_messages(
            &[kits("12", "CHANGED")],
            &[knack("abc", "12", "OLD"), knack("def", "12", "OLDER")],
            &KnackFieldMap::default(),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_numeric_knack_id_matches_string_kits_id() {
        let mut row = knack("abc", "0", "OLD");
        row["field_1639"] = json!(12);
        let updates =
            detect_changed_messages(&[kits("12", "NEW")], &[row], &KnackFieldMap::default());
        assert_eq!(updates.len(), 1);
    }

    #[test]
    fn test_update_payload_uses_field_mapping() {
        let update = DmsUpdate {
            record_id: "abc".to_string(),
            kits_id: "12".to_string(),
            message: "ICE\nPOSSIBLE".to_string(),
            message_time: "01/01/2023 08:00".to_string(),
        };
        let payload = update.payload(&KnackFieldMap::default());
        assert_eq!(payload["field_1639"], "12");
        assert_eq!(payload["field_1794"], "ICE\nPOSSIBLE");
        assert_eq!(payload["field_1795"], "01/01/2023 08:00");
    }
}
