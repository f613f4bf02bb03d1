//! # Dark-Signal Synthesis
//!
//! A dark signal has no power and never appears in the live feed, but the
//! published dataset must still show it with state "Dark". This stage runs
//! after asset enrichment and before the location filter so synthesized
//! records carry location metadata and survive to the snapshot.

use tracing::warn;

use crate::error::KitsError;
use crate::localtime;
use crate::signals::assets::SignalAsset;
use crate::signals::status::{DARK_PLAN_ID, DARK_STATE, SignalStatusRecord, decode_operation_state};

/// State datetime for a dark record comes from the asset's own catalog-side
/// last-modified timestamp; the catalog stores it with a zone suffix that
/// must be trimmed before the wall time parses.
fn dark_state_datetime(asset: &SignalAsset, fallback: &str) -> Result<String, KitsError> {
    match asset.modified_date.as_deref() {
        Some(modified) => {
            let naive = localtime::parse_db_timestamp(localtime::trim_zone_suffix(modified))?;
            localtime::to_portal_string(naive)
        }
        None => {
            warn!(
                "Dark asset {} has no modified_date; using run stamp",
                asset.signal_id
            );
            Ok(fallback.to_string())
        }
    }
}

/// Ensures every dark-flagged asset appears in the output exactly once with
/// state "Dark".
///
/// An asset whose id is absent from `records` gains a synthesized record
/// (dark state, plan id -1, asset metadata copied in). An asset whose id is
/// already present has that record's state, text and state datetime
/// overwritten in place; its other fields are preserved.
pub fn synthesize_dark_signals(
    records: Vec<SignalStatusRecord>,
    assets: &[SignalAsset],
    processed_datetime: &str,
) -> Result<Vec<SignalStatusRecord>, KitsError> {
    let dark_text = decode_operation_state(DARK_STATE)?;
    let mut records = records;

    for asset in assets.iter().filter(|a| a.dark_signal) {
        let state_datetime = dark_state_datetime(asset, processed_datetime)?;

        match records.iter_mut().find(|r| r.signal_id == asset.signal_id) {
            Some(existing) => {
                existing.operation_state = DARK_STATE;
                existing.operation_text = dark_text.to_string();
                existing.operation_state_datetime = state_datetime;
            }
            None => {
                records.push(SignalStatusRecord {
                    signal_id: asset.signal_id.clone(),
                    operation_state: DARK_STATE,
                    operation_text: dark_text.to_string(),
                    plan_id: DARK_PLAN_ID,
                    operation_state_datetime: state_datetime,
                    processed_datetime: processed_datetime.to_string(),
                    location: asset.location.clone(),
                    location_name: asset.location_name.clone(),
                    primary_st: asset.primary_st.clone(),
                    cross_st: asset.cross_st.clone(),
                });
            }
        }
    }

    Ok(records)
}
