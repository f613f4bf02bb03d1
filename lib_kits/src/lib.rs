//! Shared library for the KITS publishers: configuration, database access,
//! portal clients and the pure pipeline stages both binaries compose.

// Declare the modules to re-export
pub mod config;
pub mod connections;
pub mod dms;
pub mod error;
pub mod localtime;
pub mod loggers;
pub mod retrieve;
pub mod signals;

// Re-export the common entry points
pub use config::{KitsCredentials, KnackConfig, RetryPolicy, SocrataConfig};
pub use error::KitsError;

#[cfg(test)]
mod pipeline_tests {
    //! End-to-end checks over the pure stages of the signal-status pipeline,
    //! fetch and publish excluded.

    use serde_json::json;

    use crate::connections::kits_db::SourceRow;
    use crate::signals::assets::{self, SignalAsset};
    use crate::signals::dark;
    use crate::signals::status::{self, SignalStatusRecord};

    fn source_row() -> SourceRow {
        let mut row = SourceRow::new();
        row.insert("signal_id".to_string(), Some("7".to_string()));
        row.insert("operation_state".to_string(), Some("1".to_string()));
        row.insert("plan_id".to_string(), Some("12".to_string()));
        row.insert(
            "operation_state_datetime".to_string(),
            Some("2023-01-01 08:00:00".to_string()),
        );
        row
    }

    fn asset_rows() -> Vec<SignalAsset> {
        serde_json::from_value(json!([{
            "signal_id": "7",
            "location": "POINT(1 2)",
            "location_name": "Main & 1st",
            "primary_st": "MAIN ST",
            "cross_st": "1ST ST",
        }]))
        .unwrap()
    }

    fn run_pure_stages(
        rows: &[SourceRow],
        assets_data: &[SignalAsset],
        stamp: &str,
    ) -> Vec<SignalStatusRecord> {
        let records = status::normalize_rows(rows, stamp).unwrap();
        let records = assets::merge_signal_assets(records, assets_data);
        let records = dark::synthesize_dark_signals(records, assets_data, stamp).unwrap();
        assets::drop_unlocated(records)
    }

    #[test]
    fn test_end_to_end_snapshot_shape() {
        let stamp = "2023-01-01T08:05:00";
        let snapshot = run_pure_stages(&[source_row()], &asset_rows(), stamp);

        assert_eq!(snapshot.len(), 1);
        let rec = &snapshot[0];
        assert_eq!(rec.signal_id, "7");
        assert_eq!(rec.operation_text, "Scheduled flash");
        assert_eq!(rec.operation_state_datetime, "2023-01-01T08:00:00");
        assert_eq!(rec.location, Some(json!("POINT(1 2)")));
        assert_eq!(rec.location_name.as_deref(), Some("Main & 1st"));
        assert_eq!(rec.processed_datetime, stamp);
    }

    #[test]
    fn test_snapshot_records_all_carry_locations() {
        // a second operational row with no asset match must not survive
        let mut unmatched = source_row();
        unmatched.insert("signal_id".to_string(), Some("9999".to_string()));

        let snapshot = run_pure_stages(
            &[source_row(), unmatched],
            &asset_rows(),
            "2023-01-01T08:05:00",
        );
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.iter().all(|r| r.location.is_some()));
    }

    #[test]
    fn test_pipeline_is_idempotent_for_fixed_inputs() {
        let rows = vec![source_row()];
        let assets_data = asset_rows();
        let stamp = "2023-01-01T08:05:00";

        let first = run_pure_stages(&rows, &assets_data, stamp);
        let second = run_pure_stages(&rows, &assets_data, stamp);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
