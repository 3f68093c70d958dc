//! Catalog record types and wire envelopes for the svs-index registry.
//!
//! This crate is the shared vocabulary of the build pipeline and the sync
//! client. It defines:
//!
//! - **Records**: [`Singer`] and [`Software`] entries as they appear in
//!   hand-edited shard files, plus the [`Record`] enum that lets both
//!   categories flow through the same aggregation and sync code.
//! - **Envelopes**: the [`Snapshot`] published per category and the
//!   [`Manifest`] that indexes published artifacts by content hash.
//! - **Validation**: the shape rules shard authors must follow (id format,
//!   mandatory English display name, variant prefixing, distribution
//!   pointers). The browser-side submission validator is advisory; the
//!   build is the last gate, so these rules live here.
//!
//! Records are immutable once aggregated into a snapshot. The shard files
//! are the only source of truth; everything in this crate is derived from
//! them and must serialize deterministically (name maps are [`BTreeMap`]s
//! so canonical bytes never depend on input key order).
//!
//! [`BTreeMap`]: std::collections::BTreeMap

mod category;
pub mod error;
mod manifest;
mod record;
mod singer;
mod software;
mod snapshot;

pub use crate::category::Category;
pub use crate::manifest::{MANIFEST_FILE, MANIFEST_VERSION, Manifest, ManifestEntry};
pub use crate::record::{NamesMap, Record};
pub use crate::singer::{Singer, SingerVariant};
pub use crate::software::{Dependency, Mirror, Software, SoftwareCategory, SoftwareVersion};
pub use crate::snapshot::{REGISTRY_TAG, SNAPSHOT_VERSION, Snapshot};
