//! # KITS Database Access
//!
//! Connection bootstrapping with bounded retry and a query helper returning
//! rows as ordered column-name-to-value maps. `simple_query` is used so every
//! value arrives as text; the pipeline stages own any numeric coercion.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{error, warn};

use crate::config::{KitsCredentials, RetryPolicy};
use crate::error::KitsError;

/// Error-text signature of a transient connection failure worth retrying.
/// Anything else aborts on the first attempt.
const TRANSIENT_SIGNATURE: &str = "connection refused";

/// Per-attempt connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One source row: column name to value, `None` for SQL NULL. Row order in a
/// result set follows the query's ORDER BY.
pub type SourceRow = BTreeMap<String, Option<String>>;

fn pg_config(creds: &KitsCredentials) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    // server may carry an explicit port as "host:port"
    match creds.server.split_once(':') {
        Some((host, port)) => {
            config.host(host);
            if let Ok(port) = port.parse::<u16>() {
                config.port(port);
            }
        }
        None => {
            config.host(&creds.server);
        }
    }
    config
        .user(&creds.user)
        .password(&creds.password)
        .dbname(&creds.database)
        .connect_timeout(CONNECT_TIMEOUT);
    config
}

/// Connects to the KITS database, retrying only on the known transient
/// failure signature up to the policy's bound.
pub async fn connect(
    creds: &KitsCredentials,
    retry: RetryPolicy,
) -> Result<Client, KitsError> {
    let config = pg_config(creds);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match config.connect(NoTls).await {
            Ok((client, connection)) => {
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("KITS connection error: {}", e);
                    }
                });
                return Ok(client);
            }
            Err(e) => {
                let transient = e.to_string().to_lowercase().contains(TRANSIENT_SIGNATURE);
                if transient && attempts < retry.max_tries() {
                    warn!(
                        "Transient KITS connection failure (attempt {}/{}): {}",
                        attempts,
                        retry.max_tries(),
                        e
                    );
                    continue;
                }
                if transient {
                    return Err(KitsError::ConnectionFailed {
                        attempts,
                        source: e,
                    });
                }
                return Err(KitsError::Db(e));
            }
        }
    }
}

/// Runs `query` and returns every row as a column-name-to-value map, in the
/// order the server produced them.
pub async fn data_as_dict(
    creds: &KitsCredentials,
    query: &str,
    retry: RetryPolicy,
) -> Result<Vec<SourceRow>, KitsError> {
    let client = connect(creds, retry).await?;

    let messages = client.simple_query(query).await?;

    let mut rows: Vec<SourceRow> = Vec::new();
    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            let mut record = SourceRow::new();
            for (idx, column) in row.columns().iter().enumerate() {
                record.insert(column.name().to_string(), row.get(idx).map(str::to_string));
            }
            rows.push(record);
        }
    }
    Ok(rows)
}
