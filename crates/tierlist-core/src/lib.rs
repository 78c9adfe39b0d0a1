//! # Tier List Core
//!
//! Shared, I/O-free logic for Tier List: the function record model, the
//! view derivation engine, race-safe snapshot loading, and the
//! [`FunctionSource`](source::FunctionSource) trait that backends implement.
//!
//! This crate contains no tokio, HTTP client, or filesystem access.
//! Backends live in the `tierlist` application crate.

pub mod loader;
pub mod models;
pub mod source;
pub mod tier_list;
pub mod view;

pub use loader::{LoadOutcome, LoadTicket, SnapshotLoader};
pub use models::{FunctionRecord, FunctionType, Snapshot, Stats, Tier, TierGroup, TierSummary};
pub use source::{FetchError, FunctionSource};
pub use tier_list::{TierList, TierListState};
pub use view::{SortKey, SortOrder, TierView, ViewQuery};
