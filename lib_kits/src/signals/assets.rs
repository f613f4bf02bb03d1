//! # Signal Asset Matching
//!
//! Enriches live status records with static asset metadata from the
//! open-data catalog. Operational signals unknown to the asset inventory are
//! usually test or lab devices; they pass through unenriched and are dropped
//! later by the location filter.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::signals::status::SignalStatusRecord;

/// Reference metadata for one physical signal, as the catalog publishes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalAsset {
    pub signal_id: String,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub primary_st: Option<String>,
    #[serde(default)]
    pub cross_st: Option<String>,
    /// Set when the signal is powered off and reporting no live status.
    #[serde(default, deserialize_with = "de_flag")]
    pub dark_signal: bool,
    /// Catalog-side last-modified timestamp, used to date synthesized dark
    /// records.
    #[serde(default)]
    pub modified_date: Option<String>,
}

/// The catalog renders boolean flags inconsistently across datasets; accept
/// booleans and the usual string spellings.
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => {
            matches!(s.to_lowercase().as_str(), "true" | "yes" | "y" | "1")
        }
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

/// SoQL filter selecting the assets for the ids seen in the live feed, plus
/// every dark-flagged asset so the synthesizer can see signals outside the
/// feed.
pub fn asset_where_clause(signal_ids: &[String]) -> String {
    format!(
        "signal_id in ({}) OR dark_signal = true",
        signal_ids.join(",")
    )
}

/// Copies asset metadata onto each record whose `signal_id` matches an asset
/// (string equality). Returns a new collection; inputs are not aliased.
///
/// Zero matches leaves the record untouched. Multiple matches take the first
/// in fetch order and log a data-quality warning, never abort.
pub fn merge_signal_assets(
    records: Vec<SignalStatusRecord>,
    assets: &[SignalAsset],
) -> Vec<SignalStatusRecord> {
    records
        .into_iter()
        .map(|mut record| {
            let matches: Vec<&SignalAsset> = assets
                .iter()
                .filter(|a| a.signal_id == record.signal_id)
                .collect();
            if matches.len() > 1 {
                warn!(
                    "{} asset rows share signal_id {}; using the first",
                    matches.len(),
                    record.signal_id
                );
            }
            if let Some(asset) = matches.first() {
                record.location = asset.location.clone();
                record.location_name = asset.location_name.clone();
                record.primary_st = asset.primary_st.clone();
                record.cross_st = asset.cross_st.clone();
            }
            record
        })
        .collect()
}

/// Drops records still lacking a location after enrichment.
pub fn drop_unlocated(records: Vec<SignalStatusRecord>) -> Vec<SignalStatusRecord> {
    records
        .into_iter()
        .filter(|r| r.location.is_some())
        .collect()
}
