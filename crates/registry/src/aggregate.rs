//! Shard aggregation: many hand-edited JSON files in, one deterministic
//! sorted snapshot out.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use svs_model::{Category, Record, Snapshot};
use tokio::fs;
use tracing::instrument;

/// Aggregate every shard of a category into one sorted snapshot.
///
/// Shard files are whatever `*.json` files exist under
/// `<data_dir>/<category>/`. Per-file behaviour:
///
/// - unreadable file: skipped with a warning (a shard being authored in a
///   broken editor session should not block everyone else's build)
/// - file that reads but is not valid JSON: hard error for the category
/// - valid JSON that is not an array: skipped with a warning
/// - array elements that fail to parse or validate as records of this
///   category: hard error for the category
/// - absent category directory: an empty snapshot, not an error
///
/// Records are sorted by id, ascending, byte-wise. Directory enumeration
/// order varies across filesystems and must never leak into the output;
/// the sort is what makes the published hash stable.
///
/// Duplicate ids across shards are kept (and warned about), not
/// deduplicated: preventing them is the submission validator's job, and
/// quietly picking a winner here would hide the conflict.
#[instrument(skip(data_dir), fields(category = %category))]
pub async fn aggregate(data_dir: &Path, category: Category) -> Result<Snapshot> {
    let dir = data_dir.join(category.dir_name());
    let Some(mut shards) = list_shards(&dir).await? else {
        tracing::info!(dir = %dir.display(), "category directory absent, publishing empty snapshot");
        return Ok(Snapshot::empty(category));
    };
    // Deterministic shard visiting order. The output order comes from the
    // id sort below; this only keeps warnings and error reports stable.
    shards.sort();

    let mut items = Vec::new();
    for shard in &shards {
        read_shard(shard, category, &mut items).await?;
    }

    items.sort_by(|a, b| a.id().cmp(b.id()));
    for window in items.windows(2) {
        if window[0].id() == window[1].id() {
            tracing::warn!(id = window[0].id(), "duplicate id across shards, keeping both");
        }
    }

    tracing::debug!(count = items.len(), shards = shards.len(), "aggregated");
    Ok(Snapshot::new(category, items))
}

/// All `*.json` files in the shard directory, or `None` if the directory
/// does not exist yet.
async fn list_shards(dir: &Path) -> Result<Option<Vec<PathBuf>>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ErrorKind::Io(err).into()),
    };
    let mut shards = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            shards.push(path);
        }
    }
    Ok(Some(shards))
}

async fn read_shard(path: &Path, category: Category, items: &mut Vec<Record>) -> Result<()> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(shard = %path.display(), error = %err, "unreadable shard skipped");
            return Ok(());
        },
    };
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).or_raise(|| ErrorKind::ShardParse(path.to_path_buf()))?;
    if !value.is_array() {
        tracing::warn!(shard = %path.display(), "shard is not a JSON array, skipped");
        return Ok(());
    }
    let records: Vec<Record> =
        serde_json::from_value(value).or_raise(|| ErrorKind::InvalidRecord(path.to_path_buf()))?;
    for record in &records {
        record.validate().or_raise(|| ErrorKind::InvalidRecord(path.to_path_buf()))?;
        if record.category() != category {
            exn::bail!(ErrorKind::CategoryMismatch(path.to_path_buf()));
        }
    }
    items.extend(records);
    Ok(())
}
