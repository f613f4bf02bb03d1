//! Extract dynamic-message-sign content from the KITS database and push
//! changed messages to the Data Tracker (Knack).
//!
//! Knack rows pre-exist and are only ever updated: each fresh message is
//! matched to its Knack row by KITS id and written back only when the cleaned
//! text differs from what is stored.

use anyhow::Result;
use tracing::info;

use lib_kits::config::{KitsCredentials, KnackConfig, RetryPolicy};
use lib_kits::connections::kits_db;
use lib_kits::dms::message::{self, DMS_QUERY, KnackFieldMap};
use lib_kits::loggers::setup_logging;
use lib_kits::retrieve::knack::KnackClient;

// load .env files before anything else
use static_init::dynamic;

#[dynamic]
static DOTENV_INIT: () = {
    // Set up environment variables
    dotenvy::dotenv().ok();
};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = setup_logging("dms_message_publisher")?;

    let kits_creds = KitsCredentials::from_env()?;
    let knack_config = KnackConfig::from_env()?;
    let retry = RetryPolicy::default();
    let fields = KnackFieldMap::default();

    let rows = kits_db::data_as_dict(&kits_creds, DMS_QUERY, retry).await?;
    info!("{} records returned from KITS DB.", rows.len());

    if rows.is_empty() {
        info!("No data returned from KITS DB; nothing to update.");
        return Ok(());
    }

    let kits_records = message::normalize_rows(&rows)?;

    let knack = KnackClient::new(knack_config)?;
    let knack_records = knack.get_view_records().await?;
    info!("{} records returned from Knack.", knack_records.len());

    let updates = message::detect_changed_messages(&kits_records, &knack_records, &fields);
    info!("Updating {} records in Knack.", updates.len());

    for update in &updates {
        knack
            .update_record(&update.record_id, &update.payload(&fields))
            .await?;
    }

    Ok(())
}
