use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::info;
use watchkeep_contracts::backend::KeyValueBackend;
use watchkeep_core::scheduler::{QueuedScheduler, TokioScheduler};
use watchkeep_core::versioning::RawPayload;
use watchkeep_core::watched::decode_legacy;
use watchkeep_model::legacy::LegacyData;
use watchkeep_model::watch::WatchedStoreData;

use crate::host::Host;

/// Schema version of the flat legacy history.
const LEGACY_VERSION: u32 = 1;

pub fn show(host: &Host) -> Result<()> {
    let Some(bytes) = host.backend().get(host.key())? else {
        println!(
            "no data stored under '{}' in {}",
            host.key(),
            host.backend().root().display()
        );
        return Ok(());
    };

    match RawPayload::from_bytes(&bytes) {
        Ok(raw) => {
            println!("version: {}", raw.version);
            println!("{}", serde_json::to_string_pretty(&raw.body)?);
        }
        Err(err) => println!("unreadable payload: {err}"),
    }
    Ok(())
}

pub async fn load(
    host: &Host,
    reconcile: bool,
    discard_legacy: bool,
) -> Result<()> {
    let data = if host.can_reconcile(reconcile) {
        let scheduler = Arc::new(TokioScheduler::new(Handle::current()));
        let store = host.open(scheduler.clone())?;
        let stored = store.versioned().stored_version()?;
        let migrated = store.load()?;

        let tasks = scheduler.pending();
        if tasks > 0 {
            info!(
                target: "watchkeepctl",
                tasks,
                "waiting for background reconciliation"
            );
        }
        scheduler.drain().await;
        if stored == Some(LEGACY_VERSION) {
            store.load()?
        } else {
            migrated
        }
    } else {
        let scheduler = Arc::new(QueuedScheduler::new());
        let store = host.open(scheduler.clone())?;
        let stored = store.versioned().stored_version()?;
        if stored == Some(LEGACY_VERSION) && !discard_legacy {
            bail!(
                "'{}' holds legacy history that is only recovered by \
                 reconciliation; set TMDB_API_KEY and enable reconciliation, \
                 or pass --discard-legacy to drop it",
                host.key()
            );
        }

        let migrated = store.load()?;
        let skipped = scheduler.pending();
        if skipped > 0 {
            println!("skipped {skipped} background task(s)");
        }
        migrated
    };

    print_items(&data)
}

fn print_items(data: &WatchedStoreData) -> Result<()> {
    println!("{} watched item(s)", data.len());
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn read_legacy(file: &Path) -> Result<LegacyData> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let body = match value {
        Value::Array(items) => json!({ "items": items }),
        other => other,
    };
    Ok(decode_legacy(body)?)
}

pub fn import_legacy(host: &Host, file: &Path, force: bool) -> Result<()> {
    let legacy = read_legacy(file)
        .with_context(|| format!("invalid legacy history {}", file.display()))?;

    if !force && host.backend().get(host.key())?.is_some() {
        bail!(
            "store '{}' already holds data; pass --force to replace it",
            host.key()
        );
    }

    let raw = RawPayload::new(LEGACY_VERSION, serde_json::to_value(&legacy)?);
    host.backend().set(host.key(), &raw.to_bytes()?)?;

    println!(
        "imported {} legacy item(s) into '{}' at version {LEGACY_VERSION}",
        legacy.items.len(),
        host.key()
    );
    Ok(())
}

pub fn reset(host: &Host, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to reset '{}' without --yes", host.key());
    }

    let store = host.open(Arc::new(QueuedScheduler::new()))?;
    store.save(WatchedStoreData::default())?;
    println!(
        "reset '{}' to an empty version {} payload",
        host.key(),
        store.versioned().latest_version()
    );
    Ok(())
}
