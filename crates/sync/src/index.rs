//! The in-memory view one category serves from.

use std::collections::HashMap;
use std::sync::Arc;
use svs_model::Record;
use time::UtcDateTime;

/// Merged, ready-to-serve records for one category.
///
/// Holds the ordered record sequence (for listing and search) and an
/// id-keyed map (for O(1) point lookups from the detail view). Built in
/// one shot at the end of a reconciliation and swapped in atomically
/// behind an `Arc`; readers always see either the whole old index or the
/// whole new one, never a mix.
pub struct Index {
    records: Vec<Record>,
    by_id: HashMap<String, usize>,
    built_at: UtcDateTime,
}

impl Index {
    pub(crate) fn build(shards: impl IntoIterator<Item = Arc<Vec<Record>>>) -> Self {
        let mut records = Vec::new();
        for shard in shards {
            records.extend(shard.iter().cloned());
        }
        // On duplicate ids the later record wins the point lookup; the
        // ordered listing keeps both, same as the published snapshot.
        let by_id = records.iter().enumerate().map(|(position, r)| (r.id().to_string(), position)).collect();
        Self { records, by_id, built_at: UtcDateTime::now() }
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id).map(|&position| &self.records[position])
    }

    /// Records in published (id-sorted) order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When this index was assembled; surfaced when serving stale data.
    pub fn built_at(&self) -> UtcDateTime {
        self.built_at
    }
}
