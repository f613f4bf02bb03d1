//! Fetch traffic signal statuses from the KITS traffic-management database
//! and publish them to the open-data portal.
//!
//! One run works like this:
//! 1. Query KITS for signals with status 1, 2 or 3 (flashing or comm outage).
//! 2. Fetch asset metadata for those signals, plus every dark-flagged asset.
//! 3. Enrich, synthesize dark records, drop unlocated test signals.
//! 4. Replace the published dataset with the new snapshot.
//!
//! Scheduled externally at 5 minute intervals; feeds the signals-on-flash
//! dashboard.

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use lib_kits::config::{
    KitsCredentials, RetryPolicy, SIGNAL_STATUS_RESOURCE_ID, SIGNALS_RESOURCE_ID, SOCRATA_DOMAIN,
    SocrataConfig,
};
use lib_kits::connections::kits_db;
use lib_kits::localtime;
use lib_kits::loggers::setup_logging;
use lib_kits::retrieve::socrata::SocrataClient;
use lib_kits::signals::assets::{self, SignalAsset};
use lib_kits::signals::{dark, status};

// load .env files before anything else
use static_init::dynamic;

#[dynamic]
static DOTENV_INIT: () = {
    // Set up environment variables
    dotenvy::dotenv().ok();
};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = setup_logging("signal_status_publisher")?;

    let kits_creds = KitsCredentials::from_env()?;
    let socrata_config = SocrataConfig::from_env()?;
    let retry = RetryPolicy::default();

    let rows = kits_db::data_as_dict(&kits_creds, &status::signal_status_query(), retry).await?;
    info!("{} records to process.", rows.len());

    if rows.is_empty() {
        info!("No data returned from KITS DB; nothing to publish.");
        return Ok(());
    }

    let processed_datetime = localtime::run_stamp(Utc::now());
    let records = status::normalize_rows(&rows, &processed_datetime)?;

    // asset data about each signal (street names, location, etc) plus the
    // dark-flagged assets that never appear in the live feed
    let signal_ids: Vec<String> = records.iter().map(|r| r.signal_id.clone()).collect();
    let socrata = SocrataClient::new(SOCRATA_DOMAIN, socrata_config)?;
    let asset_values = socrata
        .get(
            SIGNALS_RESOURCE_ID,
            &[
                ("$where", assets::asset_where_clause(&signal_ids)),
                ("$limit", "99999".to_string()),
            ],
        )
        .await?;
    let asset_records: Vec<SignalAsset> = serde_json::from_value(Value::Array(asset_values))?;
    info!("{} asset records returned from the portal.", asset_records.len());

    let records = assets::merge_signal_assets(records, &asset_records);
    let records = dark::synthesize_dark_signals(records, &asset_records, &processed_datetime)?;

    // any signal still lacking a location is a test/lab device unknown to
    // asset tracking
    let snapshot = assets::drop_unlocated(records);

    socrata.replace(SIGNAL_STATUS_RESOURCE_ID, &snapshot).await?;
    info!("{} records published.", snapshot.len());

    Ok(())
}
